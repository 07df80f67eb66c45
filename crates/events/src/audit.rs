use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of security-relevant action recorded in the audit log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateUser,
    ChangePassword,
    AccessDenied,
    LoginFailed,
    GrantRole,
    RemoveRole,
    LockUser,
    UnlockUser,
    DeleteUser,
    BruteForce,
}

impl AuditAction {
    pub const ALL: [AuditAction; 10] = [
        AuditAction::CreateUser,
        AuditAction::ChangePassword,
        AuditAction::AccessDenied,
        AuditAction::LoginFailed,
        AuditAction::GrantRole,
        AuditAction::RemoveRole,
        AuditAction::LockUser,
        AuditAction::UnlockUser,
        AuditAction::DeleteUser,
        AuditAction::BruteForce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateUser => "CREATE_USER",
            AuditAction::ChangePassword => "CHANGE_PASSWORD",
            AuditAction::AccessDenied => "ACCESS_DENIED",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::GrantRole => "GRANT_ROLE",
            AuditAction::RemoveRole => "REMOVE_ROLE",
            AuditAction::LockUser => "LOCK_USER",
            AuditAction::UnlockUser => "UNLOCK_USER",
            AuditAction::DeleteUser => "DELETE_USER",
            AuditAction::BruteForce => "BRUTE_FORCE",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audit event ready to be appended (not yet assigned an id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub date: NaiveDate,
    pub action: AuditAction,
    /// Acting identity, the attempted login name, or `Anonymous`.
    pub subject: String,
    /// Free-text description or target identity.
    pub object: String,
    /// Request path the action originated from.
    pub path: String,
}

impl AuditEvent {
    /// Assign the store's position. Ids are monotonically increasing across the log.
    pub fn into_record(self, id: u64) -> AuditRecord {
        AuditRecord {
            id,
            date: self.date,
            action: self.action,
            subject: self.subject,
            object: self.object,
            path: self.path,
        }
    }
}

/// An appended, immutable audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: u64,
    pub date: NaiveDate,
    pub action: AuditAction,
    pub subject: String,
    pub object: String,
    pub path: String,
}
