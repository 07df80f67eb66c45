//! Access control rules for role mutations, deletion and locking.
//!
//! Every function here is a pure decision over the roles an identity currently
//! holds. Callers run the check first and mutate only on `Ok`, so a rejected
//! operation never leaves partial state or audit events behind.
//!
//! # Invariants
//! - An identity always holds at least one role.
//! - `ADMINISTRATOR` is never combined with a business role.
//! - An administrator can't be deleted, locked, or lose `ADMINISTRATOR`.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use accountd_core::AccountError;

use crate::roles::{Role, RoleSet};

/// Role mutation requested by an administrator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleOperation {
    Grant,
    Remove,
}

impl FromStr for RoleOperation {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GRANT" => Ok(RoleOperation::Grant),
            "REMOVE" => Ok(RoleOperation::Remove),
            other => Err(AccountError::validation(format!(
                "operation must be GRANT or REMOVE, got '{other}'"
            ))),
        }
    }
}

/// Account access change requested by an administrator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessOperation {
    Lock,
    Unlock,
}

impl FromStr for AccessOperation {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOCK" => Ok(AccessOperation::Lock),
            "UNLOCK" => Ok(AccessOperation::Unlock),
            other => Err(AccountError::validation(format!(
                "operation must be LOCK or UNLOCK, got '{other}'"
            ))),
        }
    }
}

/// Role assigned to a newly created identity.
///
/// Whether an administrator exists is read from the size of the
/// `ADMINISTRATOR` membership: the first identity ever created takes it,
/// everyone after that starts as `USER`.
pub fn bootstrap_role(administrator_members: usize) -> Role {
    if administrator_members == 0 {
        Role::Administrator
    } else {
        Role::User
    }
}

/// Decide a grant, returning the resulting role set.
///
/// Re-granting a held role is accepted and leaves the set unchanged.
pub fn check_grant(held: RoleSet, role: Role) -> Result<RoleSet, AccountError> {
    if held.is_admin() && role.is_business() {
        return Err(AccountError::RoleConflict);
    }
    if !held.is_admin() && role == Role::Administrator {
        return Err(AccountError::RoleConflict);
    }
    Ok(held.with(role))
}

/// Decide a revocation, returning the resulting role set.
pub fn check_revoke(held: RoleSet, role: Role) -> Result<RoleSet, AccountError> {
    if !held.contains(role) {
        return Err(AccountError::RoleNotHeld);
    }
    if role == Role::Administrator {
        return Err(AccountError::CannotRemoveAdministrator);
    }
    if held.len() == 1 {
        return Err(AccountError::MustKeepOneRole);
    }
    Ok(held.without(role))
}

pub fn can_delete(held: RoleSet) -> bool {
    !held.is_admin()
}

pub fn ensure_deletable(held: RoleSet) -> Result<(), AccountError> {
    if can_delete(held) {
        Ok(())
    } else {
        Err(AccountError::CannotDeleteAdministrator)
    }
}

pub fn can_lock(held: RoleSet) -> bool {
    !held.is_admin()
}

pub fn ensure_lockable(held: RoleSet) -> Result<(), AccountError> {
    if can_lock(held) {
        Ok(())
    } else {
        Err(AccountError::CannotLockAdministrator)
    }
}
