//! Seed data import.
//!
//! Hospitals and patients are created administratively, never through the
//! HTTP API. The `import` subcommand loads them from a JSON file shaped like:
//!
//! ```json
//! {
//!   "hospitals": [{ "id": 1, "name": "Siriraj", "location": "Bangkok" }],
//!   "patients": [{ "hospital_id": 1, "first_name_th": "...", "gender": "F", ... }]
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;

use crate::db::SqliteStore;
use crate::models::{Hospital, PatientPublic};

#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub hospitals: Vec<Hospital>,
    #[serde(default)]
    pub patients: Vec<SeedPatient>,
}

#[derive(Debug, Deserialize)]
pub struct SeedPatient {
    pub hospital_id: i64,
    #[serde(flatten)]
    pub profile: PatientPublic,
}

pub fn parse_seed(json: &str) -> Result<Seed> {
    serde_json::from_str(json).context("Failed to parse seed file")
}

/// Reads a seed file and writes its contents in a single transaction.
pub fn import_file(store: &SqliteStore, path: &Path) -> Result<(usize, usize)> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let seed = parse_seed(&json)?;
    let patients: Vec<(i64, PatientPublic)> = seed
        .patients
        .into_iter()
        .map(|p| (p.hospital_id, p.profile))
        .collect();
    let (hospitals, patients) = store.import(&seed.hospitals, &patients)?;
    info!(
        "Imported {} hospitals and {} patients from {}",
        hospitals,
        patients,
        path.display()
    );
    Ok((hospitals, patients))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CredentialStore;
    use crate::models::Gender;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SEED: &str = r#"{
        "hospitals": [{ "id": 1, "name": "Siriraj", "location": "Bangkok" }],
        "patients": [{
            "hospital_id": 1,
            "first_name_th": "สมศรี",
            "last_name_th": "ใจดี",
            "first_name_en": "Somsri",
            "last_name_en": "Jaidee",
            "date_of_birth": "1990-04-12",
            "patient_hn": "HN0001",
            "national_id": "1100000000001",
            "gender": "F"
        }]
    }"#;

    #[test]
    fn imports_hospitals_and_patients() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(import_file(&store, file.path()).unwrap(), (1, 1));

        let patient = store
            .find_patient_by_identifier("1100000000001")
            .unwrap()
            .unwrap();
        assert_eq!(patient.first_name_en, "Somsri");
        assert_eq!(patient.middle_name_en, "");
        assert_eq!(patient.gender, Gender::Female);
        assert_eq!(patient.hospital_id, 1);
    }

    #[test]
    fn unknown_gender_is_rejected() {
        let bad = SEED.replace(r#""gender": "F""#, r#""gender": "X""#);
        assert!(parse_seed(&bad).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(import_file(&store, Path::new("/nonexistent/seed.json")).is_err());
    }
}
