//! Password hashing, delegated to bcrypt.

use anyhow::{Context, Result};
use bcrypt::{hash, verify};

/// One-way hashing and verification of staff passwords.
pub trait PasswordVerifier: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;

    /// Checks `password` against a stored hash. A mismatch is `Ok(false)`; an
    /// unreadable hash is an error.
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool>;
}

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptVerifier {
    cost: u32,
}

impl BcryptVerifier {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordVerifier for BcryptVerifier {
    fn hash(&self, password: &str) -> Result<String> {
        hash(password, self.cost).context("Failed to hash password")
    }

    fn verify(&self, password: &str, password_hash: &str) -> Result<bool> {
        verify(password, password_hash).context("Failed to verify password")
    }
}
