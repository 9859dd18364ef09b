//! Opaque session tokens.
//!
//! A token is 32 random bytes, hex encoded, with no structure of its own: it is
//! valid only while a matching, unexpired row exists in the store. Expired rows
//! are removed the next time someone presents them.

use std::sync::Arc;

use log::{debug, info};
use rand::rngs::OsRng;
use rand::RngCore;
use time::{Duration, OffsetDateTime};

use crate::db::CredentialStore;
use crate::error::{AuthError, ServiceError, ServiceResult};
use crate::logging::mask;
use crate::models::{AuthContext, NewToken, Token};

/// How long a freshly issued token stays valid unless configured otherwise.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::hours(24);

const TOKEN_BYTES: usize = 32;
const MAX_ISSUE_ATTEMPTS: usize = 5;
const BEARER_PREFIX: &str = "Bearer ";

/// Issues and validates session tokens against a [`CredentialStore`].
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn CredentialStore>,
    ttl: Duration,
}

fn generate_secret() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Strips an optional `Bearer ` scheme marker.
fn strip_scheme(presented: &str) -> &str {
    let presented = presented.trim_start();
    presented
        .strip_prefix(BEARER_PREFIX)
        .unwrap_or(presented)
        .trim()
}

impl TokenService {
    pub fn new(store: Arc<dyn CredentialStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Issues a token for a staff member whose password has already been
    /// checked. The hospital is stored with the token as given.
    pub fn issue(&self, staff_id: i64, hospital_id: i64) -> ServiceResult<Token> {
        let created_at = OffsetDateTime::now_utc()
            .replace_nanosecond(0)
            .map_err(ServiceError::internal("Failed to generate token"))?;
        self.issue_at(staff_id, hospital_id, created_at)
    }

    /// Like [`issue`](Self::issue) with an explicit issuance time, which must
    /// be whole seconds to survive storage unchanged.
    pub fn issue_at(
        &self,
        staff_id: i64,
        hospital_id: i64,
        created_at: OffsetDateTime,
    ) -> ServiceResult<Token> {
        let expires_at = created_at
            .checked_add(self.ttl)
            .ok_or_else(|| ServiceError::Internal {
                message: "Failed to generate token",
                source: anyhow::anyhow!("token lifetime {} overflows the expiry time", self.ttl),
            })?;
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let candidate = NewToken {
                token: generate_secret(),
                staff_id,
                hospital_id,
                created_at,
                expires_at,
            };
            let stored = self
                .store
                .insert_token(&candidate)
                .map_err(ServiceError::internal("Failed to save token"))?;
            match stored {
                Some(token) => {
                    info!(
                        "Issued token {} for staff {} (hospital {}), expires {}",
                        mask(&token.token),
                        staff_id,
                        hospital_id,
                        expires_at
                    );
                    return Ok(token);
                }
                None => debug!("Token collision on attempt {attempt}, regenerating"),
            }
        }
        Err(ServiceError::Internal {
            message: "Failed to save token",
            source: anyhow::anyhow!("no unused token after {MAX_ISSUE_ATTEMPTS} attempts"),
        })
    }

    /// Checks a presented credential and returns who it belongs to.
    pub fn validate(&self, presented: &str) -> ServiceResult<AuthContext> {
        self.validate_at(presented, OffsetDateTime::now_utc())
    }

    /// Like [`validate`](Self::validate) with an explicit clock.
    ///
    /// An expired token is deleted before `CredentialExpired` is returned. The
    /// delete is conditional on the expiry, so a concurrent caller can never
    /// remove a token that is still valid.
    pub fn validate_at(&self, presented: &str, now: OffsetDateTime) -> ServiceResult<AuthContext> {
        let secret = strip_scheme(presented);
        if secret.is_empty() {
            return Err(AuthError::Unauthenticated.into());
        }

        let token = self
            .store
            .find_token(secret)
            .map_err(ServiceError::internal("Failed to validate token"))?
            .ok_or(AuthError::InvalidCredential)?;

        if !token.is_valid_at(now) {
            let removed = self
                .store
                .delete_token_if_expired(secret, now)
                .map_err(ServiceError::internal("Failed to validate token"))?;
            if removed {
                info!("Removed expired token {}", mask(secret));
            }
            return Err(AuthError::CredentialExpired.into());
        }

        Ok(AuthContext {
            staff_id: token.staff_id,
            hospital_id: token.hospital_id,
        })
    }
}
