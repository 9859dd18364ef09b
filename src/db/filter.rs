//! Renders a [`Filter`] as a SQLite `WHERE` clause.
//!
//! Values never enter the SQL text: every one becomes a `?` placeholder with
//! its value pushed onto the parameter list in the same order.

use rusqlite::types::Value as SqlValue;

use crate::search::{Field, Filter, Predicate, Value};

/// A rendered filter: the clause to put after `WHERE` and its bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    pub clause: String,
    pub params: Vec<SqlValue>,
}

pub(crate) fn column(field: Field) -> &'static str {
    match field {
        Field::HospitalId => "hospital_id",
        Field::NationalId => "national_id",
        Field::PassportId => "passport_id",
        Field::FirstNameTh => "first_name_th",
        Field::FirstNameEn => "first_name_en",
        Field::MiddleNameTh => "middle_name_th",
        Field::MiddleNameEn => "middle_name_en",
        Field::LastNameTh => "last_name_th",
        Field::LastNameEn => "last_name_en",
        Field::DateOfBirth => "date_of_birth",
        Field::PhoneNumber => "phone_number",
        Field::Email => "email",
    }
}

/// Escapes `LIKE` wildcards so the needle is matched literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn bind(value: &Value) -> SqlValue {
    match value {
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Date(d) => SqlValue::Text(super::date_to_sql(*d)),
    }
}

fn render(predicate: &Predicate, params: &mut Vec<SqlValue>) -> String {
    match predicate {
        Predicate::Equals(field, value) => {
            params.push(bind(value));
            format!("{} = ?", column(*field))
        }
        Predicate::Contains(field, needle) => {
            params.push(SqlValue::Text(like_pattern(needle)));
            format!("{} LIKE ? ESCAPE '\\'", column(*field))
        }
        Predicate::AnyOf(inner) if inner.is_empty() => "0".to_string(),
        Predicate::AnyOf(inner) => {
            let parts: Vec<String> = inner.iter().map(|p| render(p, params)).collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

/// Compiles every predicate of `filter`, joined with `AND`.
pub fn compile(filter: &Filter) -> SqlFilter {
    let mut params = Vec::new();
    let parts: Vec<String> = filter
        .predicates()
        .iter()
        .map(|p| render(p, &mut params))
        .collect();
    SqlFilter {
        clause: parts.join(" AND "),
        params,
    }
}
