//! User domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,

    // Membership tier, flipped by the payment webhook
    pub is_chirpy_red: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create user request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
}

/// Update credentials request, as sent by the client.
///
/// Carries no user id: the id always comes from the authenticated session.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: String,
    pub password: String,
}

/// Store command for a credential update.
#[derive(Debug, Clone)]
pub struct UpdateUserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

impl UpdateUserCredentials {
    /// Build the store command from the authenticated id, the request payload
    /// and the already-hashed new password.
    pub fn new(user_id: Uuid, req: UpdateUserRequest, hashed_password: String) -> Self {
        Self {
            user_id,
            email: req.email,
            hashed_password,
        }
    }
}

/// User response (without sensitive data)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            updated_at: user.updated_at,
            email: user.email,
            is_chirpy_red: user.is_chirpy_red,
        }
    }
}
