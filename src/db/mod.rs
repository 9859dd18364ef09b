//! Database module for patientdesk.
//!
//! This module defines the [`CredentialStore`] interface the services depend
//! on and its SQLite implementation, [`SqliteStore`]. Hospitals, staff
//! accounts, patient records and session tokens all live here; nothing else in
//! the crate holds durable state. The store is handed to its users explicitly
//! (usually as an `Arc<dyn CredentialStore>`), so tests can give every case its
//! own in-memory database.

pub mod filter;

use crate::models::{Gender, Hospital, NewStaff, NewToken, Patient, PatientPublic, Staff, Token};
use crate::search::Filter;
use anyhow::{anyhow, Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Outcome of a staff registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaffCreation {
    Created(Staff),
    HospitalNotFound,
    UsernameTaken,
}

/// Durable storage consumed by the token service, registration/login and
/// patient search.
///
/// Implementations must be safe to share between request handlers. Each
/// method is one unit of work; callers never hold a transaction across two
/// calls.
pub trait CredentialStore: Send + Sync {
    /// Inserts a staff account if its hospital exists and its username is
    /// unused.
    ///
    /// The hospital check, the username check and the insert are observed as
    /// one unit, so concurrent registrations of one username produce exactly
    /// one `Created`.
    ///
    /// # Arguments
    ///
    /// * `staff` - The account to create. The password must already be hashed.
    ///
    /// # Errors
    ///
    /// A missing hospital or a taken username is an `Ok` outcome. Errors are
    /// storage failures only.
    fn create_staff(&self, staff: &NewStaff) -> Result<StaffCreation>;

    /// Finds a staff account by exact, case-sensitive username within one
    /// hospital.
    ///
    /// # Arguments
    ///
    /// * `username` - The login name.
    /// * `hospital_id` - The hospital the account must belong to.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails. An unknown user is `Ok(None)`.
    fn find_staff_for_login(&self, username: &str, hospital_id: i64) -> Result<Option<Staff>>;

    /// Persists a token.
    ///
    /// # Returns
    ///
    /// `Ok(Some(token))` with its assigned ID, or `Ok(None)` without writing
    /// anything when the secret is already in use.
    ///
    /// # Errors
    ///
    /// Any other constraint violation or storage failure.
    fn insert_token(&self, token: &NewToken) -> Result<Option<Token>>;

    /// Looks a token up by its exact secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored timestamp is out of
    /// range.
    fn find_token(&self, secret: &str) -> Result<Option<Token>>;

    /// Deletes the token only if it has expired at `now`.
    ///
    /// # Returns
    ///
    /// Whether a row was removed. A token still valid at `now` stays in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete_token_if_expired(&self, secret: &str, now: OffsetDateTime) -> Result<bool>;

    /// Finds the first patient, by patient ID, whose national ID or passport
    /// ID equals `identifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row cannot be decoded.
    fn find_patient_by_identifier(&self, identifier: &str) -> Result<Option<Patient>>;

    /// Returns every patient matching `filter`, ordered by patient ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row cannot be decoded.
    /// An empty result is `Ok`.
    fn search_patients(&self, filter: &Filter) -> Result<Vec<Patient>>;
}

/// The schema applied on every open. Statements are idempotent.
const SCHEMA: &str = include_str!("schema.sql");

const PATIENT_COLUMNS: &str = "id, first_name_th, middle_name_th, last_name_th, \
     first_name_en, middle_name_en, last_name_en, date_of_birth, patient_hn, \
     national_id, passport_id, phone_number, email, gender, hospital_id";

const STAFF_COLUMNS: &str = "id, username, password_hash, name, email, hospital_id";

const TOKEN_COLUMNS: &str = "id, token, staff_id, hospital_id, created_at, expires_at";

pub(crate) fn date_to_sql(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

fn date_from_sql(row: &Row<'_>, idx: usize) -> rusqlite::Result<Date> {
    let text: String = row.get(idx)?;
    Date::parse(&text, format_description!("[year]-[month]-[day]"))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_from_sql(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let secs: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let gender_code: String = row.get(13)?;
    let gender = Gender::from_code(&gender_code).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(13, String::from("Invalid gender value"), Type::Text)
    })?;
    Ok(Patient {
        id: row.get(0)?,
        first_name_th: row.get(1)?,
        middle_name_th: row.get(2)?,
        last_name_th: row.get(3)?,
        first_name_en: row.get(4)?,
        middle_name_en: row.get(5)?,
        last_name_en: row.get(6)?,
        date_of_birth: date_from_sql(row, 7)?,
        patient_hn: row.get(8)?,
        national_id: row.get(9)?,
        passport_id: row.get(10)?,
        phone_number: row.get(11)?,
        email: row.get(12)?,
        gender,
        hospital_id: row.get(14)?,
    })
}

fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<Staff> {
    Ok(Staff {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        hospital_id: row.get(5)?,
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token: row.get(1)?,
        staff_id: row.get(2)?,
        hospital_id: row.get(3)?,
        created_at: timestamp_from_sql(row, 4)?,
        expires_at: timestamp_from_sql(row, 5)?,
    })
}

/// A [`CredentialStore`] backed by a single SQLite connection.
///
/// The connection sits behind a mutex, so calls from different threads are
/// serialised. Foreign keys are enforced (`PRAGMA foreign_keys = ON` in the
/// schema).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and applies the schema.
    ///
    /// # Arguments
    ///
    /// * `path` - The SQLite file. `:memory:` gives a throwaway database.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema fails to
    /// execute.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// A private, empty database that disappears when the store is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database or the schema
    /// fails to execute.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to execute schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    /// Loads hospitals and patients in one transaction.
    ///
    /// Hospitals keep their given IDs so patients can refer to them; an
    /// existing hospital with the same ID is updated in place.
    ///
    /// # Arguments
    ///
    /// * `hospitals` - Hospitals to create or update.
    /// * `patients` - Pairs of owning hospital ID and patient record.
    ///
    /// # Returns
    ///
    /// The number of hospitals and patients written.
    ///
    /// # Errors
    ///
    /// Fails, writing nothing, if any row violates the schema (for example a
    /// patient pointing at a hospital that does not exist).
    pub fn import(
        &self,
        hospitals: &[Hospital],
        patients: &[(i64, PatientPublic)],
    ) -> Result<(usize, usize)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for hospital in hospitals {
            tx.execute(
                "INSERT INTO hospitals (id, name, location) VALUES (?, ?, ?) \
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, location = excluded.location",
                params![hospital.id, hospital.name, hospital.location],
            )
            .with_context(|| format!("Failed to import hospital {}", hospital.id))?;
        }
        for (hospital_id, patient) in patients {
            tx.execute(
                "INSERT INTO patients (first_name_th, middle_name_th, last_name_th, first_name_en, middle_name_en, last_name_en, date_of_birth, patient_hn, national_id, passport_id, phone_number, email, gender, hospital_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    patient.first_name_th,
                    patient.middle_name_th,
                    patient.last_name_th,
                    patient.first_name_en,
                    patient.middle_name_en,
                    patient.last_name_en,
                    date_to_sql(patient.date_of_birth),
                    patient.patient_hn,
                    patient.national_id,
                    patient.passport_id,
                    patient.phone_number,
                    patient.email,
                    patient.gender.code(),
                    hospital_id,
                ],
            )
            .with_context(|| format!("Failed to import patient {}", patient.patient_hn))?;
        }
        tx.commit()?;
        Ok((hospitals.len(), patients.len()))
    }
}

impl CredentialStore for SqliteStore {
    fn create_staff(&self, staff: &NewStaff) -> Result<StaffCreation> {
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock up front so no other writer can slip
        // between the uniqueness check and the insert.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let hospital_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM hospitals WHERE id = ?)",
            params![staff.hospital_id],
            |row| row.get(0),
        )?;
        if !hospital_exists {
            return Ok(StaffCreation::HospitalNotFound);
        }

        let username_taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM staff WHERE username = ?)",
            params![staff.username],
            |row| row.get(0),
        )?;
        if username_taken {
            return Ok(StaffCreation::UsernameTaken);
        }

        tx.execute(
            "INSERT INTO staff (username, password_hash, name, email, hospital_id) VALUES (?, ?, ?, ?, ?)",
            params![
                staff.username,
                staff.password_hash,
                staff.name,
                staff.email,
                staff.hospital_id,
            ],
        )
        .context("Failed to create staff")?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(StaffCreation::Created(Staff {
            id,
            username: staff.username.clone(),
            password_hash: staff.password_hash.clone(),
            name: staff.name.clone(),
            email: staff.email.clone(),
            hospital_id: staff.hospital_id,
        }))
    }

    fn find_staff_for_login(&self, username: &str, hospital_id: i64) -> Result<Option<Staff>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE username = ? AND hospital_id = ?"
        ))?;
        let staff = stmt
            .query_row(params![username, hospital_id], staff_from_row)
            .optional()?;
        Ok(staff)
    }

    fn insert_token(&self, token: &NewToken) -> Result<Option<Token>> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO tokens (token, staff_id, hospital_id, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
            params![
                token.token,
                token.staff_id,
                token.hospital_id,
                token.created_at.unix_timestamp(),
                token.expires_at.unix_timestamp(),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e).context("Failed to save token"),
        }
        Ok(Some(Token {
            id: conn.last_insert_rowid(),
            token: token.token.clone(),
            staff_id: token.staff_id,
            hospital_id: token.hospital_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
        }))
    }

    fn find_token(&self, secret: &str) -> Result<Option<Token>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token = ?"))?;
        let token = stmt.query_row(params![secret], token_from_row).optional()?;
        Ok(token)
    }

    fn delete_token_if_expired(&self, secret: &str, now: OffsetDateTime) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM tokens WHERE token = ? AND expires_at <= ?",
            params![secret, now.unix_timestamp()],
        )?;
        Ok(deleted > 0)
    }

    fn find_patient_by_identifier(&self, identifier: &str) -> Result<Option<Patient>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE national_id = ?1 OR passport_id = ?1 ORDER BY id LIMIT 1"
        ))?;
        let patient = stmt
            .query_row(params![identifier], patient_from_row)
            .optional()?;
        Ok(patient)
    }

    fn search_patients(&self, filter: &Filter) -> Result<Vec<Patient>> {
        let sql = filter::compile(filter);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE {} ORDER BY id",
            sql.clause
        ))?;
        let patients = stmt
            .query_map(params_from_iter(sql.params.iter()), patient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(patients)
    }
}
