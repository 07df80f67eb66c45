//! Case-insensitive e-mail address used as the account identifier.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AccountError;

/// Normalized (trimmed, lowercased) e-mail address.
///
/// Every lookup keyed by an account goes through this type, so `Bob@Acme.com`
/// and `bob@acme.com` always resolve to the same identity, role memberships
/// and failure counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, AccountError> {
        let normalized = raw.trim().to_lowercase();

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(AccountError::validation("email must contain '@'"));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(AccountError::validation("invalid email format"));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(AccountError::validation("email must not contain whitespace"));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> &str {
        // `parse` guarantees exactly one '@'.
        self.0.split_once('@').map(|(_, d)| d).unwrap_or_default()
    }

    /// Whether the address belongs to `domain` (compared case-insensitively).
    pub fn is_in_domain(&self, domain: &str) -> bool {
        self.domain() == domain.trim().trim_start_matches('@').to_lowercase()
    }
}

impl FromStr for Email {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = AccountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
