//! Error taxonomy shared by the services and the HTTP layer.
//!
//! The store returns `anyhow::Result` like the rest of the data layer; the
//! services translate those into [`ServiceError`] so every failure reaching a
//! handler has a fixed kind and a short client-facing message.

use thiserror::Error;

/// Reasons a caller is refused authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("Authentication required")]
    Unauthenticated,
    /// The presented token does not exist.
    #[error("Invalid token")]
    InvalidCredential,
    /// The presented token exists but its expiry has passed.
    #[error("Token expired")]
    CredentialExpired,
    /// Unknown username/hospital pair or wrong password at login.
    #[error("Invalid credentials")]
    InvalidLogin,
}

/// Errors surfaced by registration, login, token validation and search.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed request shape.
    #[error("{0}")]
    Validation(String),

    /// Unknown hospital or patient identifier.
    #[error("{0}")]
    NotFound(&'static str),

    /// Duplicate username.
    #[error("{0}")]
    Conflict(&'static str),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Storage or hashing failure. `message` is what the client sees.
    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ServiceError {
    /// Builds a `map_err` adapter that wraps any error as [`ServiceError::Internal`].
    pub fn internal<E>(message: &'static str) -> impl FnOnce(E) -> ServiceError
    where
        E: Into<anyhow::Error>,
    {
        move |source| ServiceError::Internal {
            message,
            source: source.into(),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn auth_error_messages_match_wire_contract() {
        assert_eq!(AuthError::Unauthenticated.to_string(), "Authentication required");
        assert_eq!(AuthError::InvalidCredential.to_string(), "Invalid token");
        assert_eq!(AuthError::CredentialExpired.to_string(), "Token expired");
        assert_eq!(AuthError::InvalidLogin.to_string(), "Invalid credentials");
    }

    #[test]
    fn internal_keeps_source_but_shows_short_message() {
        let err = Err::<(), _>(anyhow!("disk I/O error"))
            .map_err(ServiceError::internal("Failed to save token"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to save token");
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk I/O error"));
    }
}
