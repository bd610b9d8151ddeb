//! Credential extraction from `Authorization` headers

use crate::error::AppError;
use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Authorization scheme carried by a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    ApiKey,
}

impl AuthScheme {
    /// Literal marker searched for in the header value, trailing space included
    pub fn marker(self) -> &'static str {
        match self {
            AuthScheme::Bearer => "Bearer ",
            AuthScheme::ApiKey => "ApiKey ",
        }
    }
}

/// How a header value is matched against a scheme marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemeMatching {
    /// The marker may appear anywhere in the value. Only a leading marker is
    /// stripped; a value with the marker further in is returned whole.
    #[default]
    Contains,
    /// The value must start with the marker.
    Prefix,
}

impl SchemeMatching {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            SchemeMatching::Prefix
        } else {
            SchemeMatching::Contains
        }
    }
}

/// A raw credential pulled from a request. Consumed once.
#[derive(Debug, PartialEq, Eq)]
pub struct Credential {
    scheme: AuthScheme,
    value: String,
}

impl Credential {
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

/// Scan every `Authorization` value and return the first one carrying `scheme`.
pub fn extract_credential(
    headers: &HeaderMap,
    scheme: AuthScheme,
    matching: SchemeMatching,
) -> Result<Credential, AppError> {
    let marker = scheme.marker();

    headers
        .get_all(AUTHORIZATION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|value| match matching {
            SchemeMatching::Contains if value.contains(marker) => {
                Some(value.strip_prefix(marker).unwrap_or(value))
            }
            SchemeMatching::Prefix => value.strip_prefix(marker),
            SchemeMatching::Contains => None,
        })
        .map(|value| Credential {
            scheme,
            value: value.to_string(),
        })
        .ok_or(AppError::MissingCredential)
}

/// Bearer token from the request, as a plain string
pub fn extract_bearer(headers: &HeaderMap, matching: SchemeMatching) -> Result<String, AppError> {
    extract_credential(headers, AuthScheme::Bearer, matching).map(Credential::into_value)
}

/// API key from the request, as a plain string
pub fn extract_api_key(headers: &HeaderMap, matching: SchemeMatching) -> Result<String, AppError> {
    extract_credential(headers, AuthScheme::ApiKey, matching).map(Credential::into_value)
}
