//! Patient search predicates.
//!
//! [`build`] turns a sparse [`SearchFields`] into a [`Filter`]: a flat list of
//! predicates that must all hold, the first of which is always the hospital
//! scope. The filter is plain data. Rendering it against a concrete store is
//! the store's job (see `db::filter` for SQLite), so building one performs no
//! I/O and never touches query text.

use serde::{Deserialize, Deserializer};
use time::Date;

use crate::utils::parse_date_of_birth;

/// Patient columns a predicate can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    HospitalId,
    NationalId,
    PassportId,
    FirstNameTh,
    FirstNameEn,
    MiddleNameTh,
    MiddleNameEn,
    LastNameTh,
    LastNameEn,
    DateOfBirth,
    PhoneNumber,
    Email,
}

/// A value bound into a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Date(Date),
}

/// A single constraint on a patient record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The field equals the value exactly.
    Equals(Field, Value),
    /// The text field contains the given substring.
    Contains(Field, String),
    /// At least one of the inner predicates holds.
    AnyOf(Vec<Predicate>),
}

/// A conjunction of predicates, always scoped to one hospital.
///
/// The only way to obtain a `Filter` is [`build`], so a filter without the
/// hospital constraint cannot reach a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    /// All predicates, hospital scope first.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
}

/// Optional search criteria as sent by a client.
///
/// Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchFields {
    pub national_id: Option<String>,
    pub passport_id: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "date_of_birth")]
    pub date_of_birth: Option<Date>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

fn date_of_birth<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_date_of_birth(text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn either_script(th: Field, en: Field, needle: &str) -> Predicate {
    Predicate::AnyOf(vec![
        Predicate::Contains(th, needle.to_string()),
        Predicate::Contains(en, needle.to_string()),
    ])
}

/// Compiles search criteria into a hospital-scoped filter.
pub fn build(hospital_id: i64, fields: &SearchFields) -> Filter {
    let mut predicates = vec![Predicate::Equals(
        Field::HospitalId,
        Value::Integer(hospital_id),
    )];

    let substring_fields = [
        (Field::NationalId, &fields.national_id),
        (Field::PassportId, &fields.passport_id),
    ];
    for (field, value) in substring_fields {
        if let Some(v) = supplied(value) {
            predicates.push(Predicate::Contains(field, v.to_string()));
        }
    }

    let name_parts = [
        (Field::FirstNameTh, Field::FirstNameEn, &fields.first_name),
        (Field::MiddleNameTh, Field::MiddleNameEn, &fields.middle_name),
        (Field::LastNameTh, Field::LastNameEn, &fields.last_name),
    ];
    for (th, en, value) in name_parts {
        if let Some(v) = supplied(value) {
            predicates.push(either_script(th, en, v));
        }
    }

    if let Some(dob) = fields.date_of_birth {
        predicates.push(Predicate::Equals(Field::DateOfBirth, Value::Date(dob)));
    }

    let contact_fields = [
        (Field::PhoneNumber, &fields.phone_number),
        (Field::Email, &fields.email),
    ];
    for (field, value) in contact_fields {
        if let Some(v) = supplied(value) {
            predicates.push(Predicate::Contains(field, v.to_string()));
        }
    }

    Filter { predicates }
}
