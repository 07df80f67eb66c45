//! `accountd-auth`: access control and lockout rules (no IO, no storage).

pub mod access;
pub mod identity;
pub mod lockout;
pub mod password;
pub mod permissions;
pub mod roles;

pub use access::{
    AccessOperation, RoleOperation, bootstrap_role, can_delete, can_lock, check_grant, check_revoke,
    ensure_deletable, ensure_lockable,
};
pub use identity::{Identity, IdentityView, NewIdentity};
pub use lockout::{LockCause, LockState, Lockout, LockoutCommand, LockoutEvent, LockoutPolicy};
pub use password::{Argon2Hasher, HashError, PasswordHasher, PasswordPolicy};
pub use permissions::Permission;
pub use roles::{Role, RoleSet};
