//! Service configuration.
//!
//! Defaults match the production policy; every field can be overridden from
//! the environment or from a JSON document.

use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use accountd_auth::{LockoutPolicy, PasswordPolicy};

pub const DEFAULT_EMAIL_DOMAIN: &str = "acme.com";
pub const DEFAULT_LOCK_STRIPES: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub lockout: LockoutPolicy,
    pub password: PasswordPolicy,
    /// Signup e-mails must belong to this domain. `None` accepts any domain.
    pub email_domain: Option<String>,
    /// Secret prepended to every password before hashing.
    pub pepper: Option<String>,
    /// Number of per-identity lock stripes.
    pub lock_stripes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            lockout: LockoutPolicy::default(),
            password: PasswordPolicy::default(),
            email_domain: Some(DEFAULT_EMAIL_DOMAIN.to_string()),
            pepper: None,
            lock_stripes: DEFAULT_LOCK_STRIPES,
        }
    }
}

impl core::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("lockout", &self.lockout)
            .field("password", &self.password)
            .field("email_domain", &self.email_domain)
            .field("pepper", &self.pepper.as_ref().map(|_| "<redacted>"))
            .field("lock_stripes", &self.lock_stripes)
            .finish()
    }
}

impl ServiceConfig {
    /// Load overrides from `ACCOUNTD_*` environment variables.
    ///
    /// Unparsable values keep the default and log a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = parsed(&lookup, "ACCOUNTD_MAX_FAILED_ATTEMPTS") {
            config.lockout.max_failed_attempts = v;
        }
        if let Some(v) = parsed(&lookup, "ACCOUNTD_RESET_COUNTER_ON_UNLOCK") {
            config.lockout.reset_counter_on_unlock = v;
        }
        if let Some(v) = parsed(&lookup, "ACCOUNTD_MIN_PASSWORD_LENGTH") {
            config.password.min_length = v;
        }
        if let Some(v) = parsed(&lookup, "ACCOUNTD_LOCK_STRIPES") {
            config.lock_stripes = v;
        }
        if let Some(domain) = lookup("ACCOUNTD_EMAIL_DOMAIN") {
            // An empty value accepts any domain.
            config.email_domain = Some(domain.trim().to_lowercase()).filter(|d| !d.is_empty());
        }
        if let Some(pepper) = lookup("ACCOUNTD_PASSWORD_PEPPER") {
            config.pepper = Some(pepper).filter(|p| !p.is_empty());
        }

        config
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_stripes == 0 {
            return Err(ConfigError::Invalid("lock_stripes must be at least 1".into()));
        }
        if self.password.min_length == 0 {
            return Err(ConfigError::Invalid("password.min_length must be at least 1".into()));
        }
        Ok(())
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_policy() {
        let config = ServiceConfig::default();
        assert_eq!(config.lockout.max_failed_attempts, 5);
        assert!(!config.lockout.reset_counter_on_unlock);
        assert_eq!(config.password.min_length, 12);
        assert_eq!(config.email_domain.as_deref(), Some("acme.com"));
    }

    #[test]
    fn environment_overrides_apply() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("ACCOUNTD_MAX_FAILED_ATTEMPTS", "3"),
            ("ACCOUNTD_RESET_COUNTER_ON_UNLOCK", "true"),
            ("ACCOUNTD_EMAIL_DOMAIN", "Example.org"),
            ("ACCOUNTD_PASSWORD_PEPPER", "s3cret"),
        ]));
        assert_eq!(config.lockout.max_failed_attempts, 3);
        assert!(config.lockout.reset_counter_on_unlock);
        assert_eq!(config.email_domain.as_deref(), Some("example.org"));
        assert_eq!(config.pepper.as_deref(), Some("s3cret"));
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn unparsable_values_keep_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("ACCOUNTD_MAX_FAILED_ATTEMPTS", "five"),
            ("ACCOUNTD_EMAIL_DOMAIN", ""),
        ]));
        assert_eq!(config.lockout.max_failed_attempts, 5);
        assert_eq!(config.email_domain, None);
    }

    #[test]
    fn json_document_merges_with_defaults() {
        let config = ServiceConfig::from_json_str(
            r#"{ "lockout": { "max_failed_attempts": 10 }, "email_domain": null }"#,
        )
        .unwrap();
        assert_eq!(config.lockout.max_failed_attempts, 10);
        assert!(!config.lockout.reset_counter_on_unlock);
        assert_eq!(config.password.min_length, 12);
        assert_eq!(config.email_domain, None);

        assert!(matches!(
            ServiceConfig::from_json_str(r#"{ "lock_stripes": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServiceConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
