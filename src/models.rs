//! Data models for patientdesk.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// A hospital that owns staff accounts and patient records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hospital {
    /// The hospital's unique ID.
    pub id: i64,
    /// The hospital's name.
    pub name: String,
    /// Where the hospital is located.
    pub location: String,
}

/// A staff account as stored, including the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staff {
    /// The staff member's unique ID.
    pub id: i64,
    /// Login name. Case-sensitive and unique across all hospitals.
    pub username: String,
    /// bcrypt hash of the password.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Contact email, may be empty.
    pub email: String,
    /// The hospital this staff member belongs to.
    pub hospital_id: i64,
}

/// Staff data safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffPublic {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub hospital_id: i64,
}

impl From<Staff> for StaffPublic {
    fn from(staff: Staff) -> Self {
        Self {
            id: staff.id,
            username: staff.username,
            name: staff.name,
            email: staff.email,
            hospital_id: staff.hospital_id,
        }
    }
}

/// A staff account about to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewStaff {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub hospital_id: i64,
}

/// Represents the gender of a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    /// The single-letter code stored in the database and sent on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// A patient record as stored.
///
/// Names are kept in both Thai and English script; any of the middle names may
/// be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: i64,
    pub first_name_th: String,
    pub middle_name_th: String,
    pub last_name_th: String,
    pub first_name_en: String,
    pub middle_name_en: String,
    pub last_name_en: String,
    pub date_of_birth: Date,
    /// Hospital number (medical-record number).
    pub patient_hn: String,
    pub national_id: String,
    pub passport_id: String,
    pub phone_number: String,
    pub email: String,
    pub gender: Gender,
    pub hospital_id: i64,
}

/// Patient data returned to clients. Internal identifiers and the owning
/// hospital are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientPublic {
    pub first_name_th: String,
    #[serde(default)]
    pub middle_name_th: String,
    pub last_name_th: String,
    pub first_name_en: String,
    #[serde(default)]
    pub middle_name_en: String,
    pub last_name_en: String,
    #[serde(with = "iso_date")]
    pub date_of_birth: Date,
    pub patient_hn: String,
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub passport_id: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub email: String,
    pub gender: Gender,
}

impl From<Patient> for PatientPublic {
    fn from(patient: Patient) -> Self {
        Self {
            first_name_th: patient.first_name_th,
            middle_name_th: patient.middle_name_th,
            last_name_th: patient.last_name_th,
            first_name_en: patient.first_name_en,
            middle_name_en: patient.middle_name_en,
            last_name_en: patient.last_name_en,
            date_of_birth: patient.date_of_birth,
            patient_hn: patient.patient_hn,
            national_id: patient.national_id,
            passport_id: patient.passport_id,
            phone_number: patient.phone_number,
            email: patient.email,
            gender: patient.gender,
        }
    }
}

/// An issued session token.
///
/// `hospital_id` is copied from the staff record when the token is issued and
/// is not re-read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: i64,
    /// The opaque secret presented by clients.
    pub token: String,
    pub staff_id: i64,
    pub hospital_id: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// Whether the token is still usable at `now`. Expiry is exclusive.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// A token about to be persisted.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub token: String,
    pub staff_id: i64,
    pub hospital_id: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Identity attached to a request once its bearer token has been validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub staff_id: i64,
    pub hospital_id: i64,
}

/// Successful login payload.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub staff: StaffPublic,
}
