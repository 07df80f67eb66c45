//! Per-identity serialization.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::{Mutex, MutexGuard};

use accountd_core::Email;

/// Striped mutexes keyed by normalized e-mail.
///
/// Two operations on the same identity always contend for the same stripe;
/// operations on different identities usually don't. Holding a guard across
/// load-decide-commit linearizes the lockout counter and role checks.
#[derive(Debug)]
pub struct IdentityLocks {
    stripes: Vec<Mutex<()>>,
    hasher: RandomState,
}

impl IdentityLocks {
    pub fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
            hasher: RandomState::new(),
        }
    }

    fn stripe(&self, email: &Email) -> usize {
        (self.hasher.hash_one(email) % self.stripes.len() as u64) as usize
    }

    /// Block until `email`'s stripe is free.
    ///
    /// The guard protects no data, so a poisoned stripe is simply reclaimed.
    pub fn lock(&self, email: &Email) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe(email)]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.stripes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stripes.is_empty()
    }
}
