//! patientdesk: patient lookup and search for clinic staff.
//!
//! Staff register and log in to receive an opaque bearer token; the token
//! gates a hospital-scoped patient search. See [`token`] for the session
//! lifecycle and [`search`] for how search criteria become a store filter.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod import;
pub mod logging;
pub mod models;
pub mod password;
pub mod search;
pub mod token;
pub mod utils;

pub use db::{CredentialStore, SqliteStore};
pub use error::{AuthError, ServiceError};
pub use http::{router, AppState};
pub use token::TokenService;
