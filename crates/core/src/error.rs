//! Error taxonomy shared by every account operation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type AccountResult<T> = Result<T, AccountError>;

/// Account-level rejection.
///
/// Every kind is detected before any state changes and maps to a stable
/// machine-readable [`code`](AccountError::code), so a client can tell a role
/// conflict from a missing identity from a validation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("User exist!")]
    DuplicateIdentity,

    #[error("Password length must be {min_length} chars minimum!")]
    PasswordTooShort { min_length: usize },

    #[error("The password is in the hacker's database!")]
    BreachedPassword,

    #[error("The passwords must be different!")]
    SamePassword,

    #[error("User not found!")]
    IdentityNotFound,

    #[error("Role not found!")]
    UnknownRole(String),

    #[error("The user cannot combine administrative and business roles!")]
    RoleConflict,

    #[error("The user does not have a role!")]
    RoleNotHeld,

    #[error("The user must have at least one role!")]
    MustKeepOneRole,

    #[error("Can't remove ADMINISTRATOR role!")]
    CannotRemoveAdministrator,

    #[error("Can't remove ADMINISTRATOR role!")]
    CannotDeleteAdministrator,

    #[error("Can't lock the ADMINISTRATOR!")]
    CannotLockAdministrator,

    #[error("Access Denied!")]
    AccessDenied,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User account is locked")]
    AccountLocked,

    #[error("Period month is invalid!")]
    InvalidPayrollPeriod(String),

    #[error("Salary cannot be negative for a payroll period!")]
    NegativePayroll,

    #[error("Payroll exist!")]
    PayrollAlreadyExists,

    #[error("Payroll not found!")]
    PayrollNotFound,

    #[error("Pay roll user does not exist!")]
    UnknownEmployee,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The persistence layer refused or failed the operation as a whole.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl AccountError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Stable machine-readable category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::DuplicateIdentity => "duplicate_identity",
            Self::PasswordTooShort { .. } => "password_too_short",
            Self::BreachedPassword => "breached_password",
            Self::SamePassword => "same_password",
            Self::IdentityNotFound => "identity_not_found",
            Self::UnknownRole(_) => "unknown_role",
            Self::RoleConflict => "role_conflict",
            Self::RoleNotHeld => "role_not_held",
            Self::MustKeepOneRole => "must_keep_one_role",
            Self::CannotRemoveAdministrator => "cannot_remove_administrator",
            Self::CannotDeleteAdministrator => "cannot_delete_administrator",
            Self::CannotLockAdministrator => "cannot_lock_administrator",
            Self::AccessDenied => "access_denied",
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountLocked => "account_locked",
            Self::InvalidPayrollPeriod(_) => "invalid_payroll_period",
            Self::NegativePayroll => "negative_payroll",
            Self::PayrollAlreadyExists => "payroll_already_exists",
            Self::PayrollNotFound => "payroll_not_found",
            Self::UnknownEmployee => "unknown_employee",
            Self::InvalidId(_) => "invalid_id",
            Self::Storage(_) => "storage_error",
        }
    }

    /// HTTP-style status for the transport layer.
    pub fn status(&self) -> u16 {
        match self {
            Self::IdentityNotFound | Self::UnknownRole(_) | Self::PayrollNotFound => 404,
            Self::InvalidCredentials | Self::AccountLocked => 401,
            Self::AccessDenied => 403,
            Self::Storage(_) => 500,
            _ => 400,
        }
    }

    /// Reason phrase matching [`status`](AccountError::status).
    pub fn reason(&self) -> &'static str {
        match self.status() {
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "Bad Request",
        }
    }

    /// Whether the error is a policy rejection (as opposed to an infrastructure fault).
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

/// Serializable rejection returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: &'static str,
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

impl ErrorBody {
    pub fn new(err: &AccountError, path: impl Into<String>) -> Self {
        Self::at(err, path, Utc::now())
    }

    pub fn at(err: &AccountError, path: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            status: err.status(),
            error: err.reason(),
            code: err.code(),
            message: err.to_string(),
            path: path.into(),
        }
    }
}
