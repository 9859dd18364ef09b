//! Staff registration and login.

use log::{info, warn};
use serde::Deserialize;

use crate::db::{CredentialStore, StaffCreation};
use crate::error::{AuthError, ServiceError, ServiceResult};
use crate::logging::mask;
use crate::models::{NewStaff, StaffPublic, TokenResponse};
use crate::password::PasswordVerifier;
use crate::token::TokenService;

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// The hospital the staff member claims to belong to.
    #[serde(rename = "hospital")]
    pub hospital_id: i64,
}

/// Registration request body.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "hospital")]
    pub hospital_id: i64,
}

impl Registration {
    fn validate(&self) -> ServiceResult<()> {
        let required = [
            ("username", &self.username),
            ("password", &self.password),
            ("name", &self.name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ServiceError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

/// Creates a staff account.
///
/// The password is hashed first; the hospital check, the username check and
/// the insert then run as one store transaction.
///
/// # Errors
///
/// * `Validation` if a required field is blank.
/// * `NotFound` if the hospital does not exist.
/// * `Conflict` if the username is already taken in any hospital.
/// * `Internal` if hashing or storage fails.
pub fn register(
    store: &dyn CredentialStore,
    passwords: &dyn PasswordVerifier,
    registration: Registration,
) -> ServiceResult<StaffPublic> {
    registration.validate()?;

    let password_hash = passwords
        .hash(&registration.password)
        .map_err(ServiceError::internal("Failed to hash password"))?;

    let new_staff = NewStaff {
        username: registration.username,
        password_hash,
        name: registration.name,
        email: registration.email,
        hospital_id: registration.hospital_id,
    };

    let outcome = store
        .create_staff(&new_staff)
        .map_err(ServiceError::internal("Failed to create staff"))?;

    match outcome {
        StaffCreation::Created(staff) => {
            info!(
                "Registered staff {} (id {}) at hospital {}",
                mask(&staff.username),
                staff.id,
                staff.hospital_id
            );
            Ok(staff.into())
        }
        StaffCreation::HospitalNotFound => Err(ServiceError::NotFound("Hospital not found")),
        StaffCreation::UsernameTaken => Err(ServiceError::Conflict("Username already exists")),
    }
}

/// Verifies a username/password/hospital triple and issues a session token.
///
/// Unknown users, users of another hospital and wrong passwords all produce
/// the same `InvalidLogin` error.
pub fn login(
    store: &dyn CredentialStore,
    passwords: &dyn PasswordVerifier,
    tokens: &TokenService,
    credentials: Credentials,
) -> ServiceResult<TokenResponse> {
    let staff = store
        .find_staff_for_login(&credentials.username, credentials.hospital_id)
        .map_err(ServiceError::internal("Failed to look up staff"))?;

    let Some(staff) = staff else {
        warn!(
            "Login rejected for {} at hospital {}: no such staff",
            mask(&credentials.username),
            credentials.hospital_id
        );
        return Err(AuthError::InvalidLogin.into());
    };

    let matches = passwords
        .verify(&credentials.password, &staff.password_hash)
        .map_err(ServiceError::internal("Failed to verify password"))?;
    if !matches {
        warn!(
            "Login rejected for {} at hospital {}: wrong password",
            mask(&credentials.username),
            credentials.hospital_id
        );
        return Err(AuthError::InvalidLogin.into());
    }

    let token = tokens.issue(staff.id, staff.hospital_id)?;
    info!("Staff {} logged in", mask(&staff.username));

    Ok(TokenResponse {
        token: token.token,
        expires_at: token.expires_at,
        staff: staff.into(),
    })
}
