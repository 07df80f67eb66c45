//! Password policy and one-way hashing.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordVerifier};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use accountd_core::AccountError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("hashing failed: {0}")]
    Hash(String),

    #[error("invalid hash format: {0}")]
    Format(String),
}

impl From<HashError> for AccountError {
    fn from(err: HashError) -> Self {
        AccountError::storage(err.to_string())
    }
}

/// One-way password hashing capability.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, HashError>;

    fn matches(&self, plain: &str, digest: &str) -> Result<bool, HashError>;
}

impl<H> PasswordHasher for std::sync::Arc<H>
where
    H: PasswordHasher + ?Sized,
{
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        (**self).hash(plain)
    }

    fn matches(&self, plain: &str, digest: &str) -> Result<bool, HashError> {
        (**self).matches(plain, digest)
    }
}

/// Argon2id hasher producing PHC-format strings.
///
/// If a pepper is configured it is prepended to the password before hashing
/// and verification.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    pepper: Option<String>,
}

impl core::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Argon2Hasher")
            .field("pepper", &self.pepper.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Argon2Hasher {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }

    fn peppered(&self, plain: &str) -> String {
        match &self.pepper {
            Some(p) => format!("{p}{plain}"),
            None => plain.to_string(),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2::PasswordHasher::hash_password(
            &Argon2::default(),
            self.peppered(plain).as_bytes(),
            &salt,
        )
        .map_err(|e| HashError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn matches(&self, plain: &str, digest: &str) -> Result<bool, HashError> {
        let parsed =
            argon2::PasswordHash::new(digest).map_err(|e| HashError::Format(e.to_string()))?;

        match Argon2::default().verify_password(self.peppered(plain).as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::Hash(e.to_string())),
        }
    }
}

/// Rules a new password must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Minimum count of non-whitespace characters.
    pub min_length: usize,
    /// Passwords known to be compromised.
    pub breached: Vec<String>,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        const MONTHS: [&str; 12] = [
            "January",
            "February",
            "March",
            "April",
            "May",
            "June",
            "July",
            "August",
            "September",
            "October",
            "November",
            "December",
        ];
        Self {
            min_length: 12,
            breached: MONTHS.iter().map(|m| format!("PasswordFor{m}")).collect(),
        }
    }
}

impl PasswordPolicy {
    pub fn check(&self, plain: &str) -> Result<(), AccountError> {
        let significant = plain.chars().filter(|c| !c.is_whitespace()).count();
        if significant < self.min_length {
            return Err(AccountError::PasswordTooShort {
                min_length: self.min_length,
            });
        }
        if self.breached.iter().any(|b| b == plain) {
            return Err(AccountError::BreachedPassword);
        }
        Ok(())
    }
}
