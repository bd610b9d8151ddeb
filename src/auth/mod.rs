//! Authentication and authorization module

pub mod credentials;
pub mod guard;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod refresh;

pub use credentials::{extract_api_key, extract_bearer, AuthScheme, Credential, SchemeMatching};
pub use guard::AuthGuard;
pub use jwt::{Claims, SessionTokenCodec};
pub use middleware::{session_auth_middleware, AuthContext};
pub use password::PasswordHasher;
pub use refresh::RefreshTokenManager;
