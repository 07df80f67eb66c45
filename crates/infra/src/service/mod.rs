//! Account operations exposed to the transport layer.
//!
//! Every mutating operation follows the same shape:
//!
//! ```text
//! validate input (no locks held)
//!   ↓
//! take the identity's stripe in `IdentityLocks`
//!   ↓
//! load current state from the store
//!   ↓
//! decide (access rules / lockout state machine); reject before any change
//!   ↓
//! commit mutations + audit events as one `UnitOfWork`
//! ```
//!
//! A rejected operation therefore leaves no state change and no audit event
//! behind, and a failed commit fails the whole operation.

mod accounts;
mod payroll;
mod roles;
mod security;

use std::sync::{Mutex, MutexGuard};

use accountd_auth::{Argon2Hasher, Identity, PasswordHasher};
use accountd_core::{AccountError, AccountResult, Email};
use accountd_events::AuditTrail;

use crate::config::ServiceConfig;
use crate::locks::IdentityLocks;
use crate::store::{AccountStore, UnitOfWork};

/// Identity, role, lockout, audit and payroll operations over an [`AccountStore`].
///
/// - `S`: persistence capability
/// - `H`: one-way password hashing capability
pub struct AccountService<S, H> {
    store: S,
    hasher: H,
    config: ServiceConfig,
    locks: IdentityLocks,
    /// Serializes signups: the bootstrap role depends on registry-wide state.
    signups: Mutex<()>,
}

impl<S, H> core::fmt::Debug for AccountService<S, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountService")
            .field("config", &self.config)
            .field("lock_stripes", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl<S: AccountStore> AccountService<S, Argon2Hasher> {
    /// Service hashing with Argon2id and the configured pepper.
    pub fn with_argon2(store: S, config: ServiceConfig) -> AccountResult<Self> {
        let hasher = Argon2Hasher::new(config.pepper.clone());
        Self::new(store, hasher, config)
    }
}

impl<S, H> AccountService<S, H>
where
    S: AccountStore,
    H: PasswordHasher,
{
    /// Build the service and make sure the role registry is initialized.
    pub fn new(store: S, hasher: H, config: ServiceConfig) -> AccountResult<Self> {
        let service = Self {
            locks: IdentityLocks::new(config.lock_stripes),
            store,
            hasher,
            config,
            signups: Mutex::new(()),
        };
        service.initialize()?;
        Ok(service)
    }

    /// Idempotent; safe to call on every start.
    pub fn initialize(&self) -> AccountResult<()> {
        if self.store.initialize_roles()? {
            tracing::info!("role registry initialized");
        }
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn trail(&self) -> AuditTrail {
        AuditTrail::today()
    }

    fn existing(&self, email: &Email) -> AccountResult<Identity> {
        self.store
            .find_identity(email)?
            .ok_or(AccountError::IdentityNotFound)
    }

    fn signup_guard(&self) -> MutexGuard<'_, ()> {
        self.signups
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn commit(&self, work: UnitOfWork) -> AccountResult<()> {
        let appended = self.store.commit(work)?;
        for record in &appended {
            tracing::debug!(id = record.id, action = %record.action, "audit event stored");
        }
        Ok(())
    }
}

/// Parse a client-supplied e-mail of an existing identity.
///
/// No identity can own a malformed address, so parse failures read as "not found".
fn lookup_email(raw: &str) -> AccountResult<Email> {
    Email::parse(raw).map_err(|_| AccountError::IdentityNotFound)
}
