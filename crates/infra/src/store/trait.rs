use std::sync::Arc;

use thiserror::Error;

use accountd_auth::{Identity, Role, RoleSet};
use accountd_core::{AccountError, Email, IdentityId};
use accountd_events::AuditRecord;
use accountd_payroll::{PayrollEntry, Period};

use super::unit_of_work::UnitOfWork;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("identity already exists: {0}")]
    DuplicateIdentity(Email),

    #[error("identity does not exist: {0}")]
    MissingIdentity(IdentityId),

    #[error("role is not registered: {0}")]
    UnregisteredRole(Role),

    #[error("payroll already exists for {0} in {1}")]
    DuplicatePayroll(Email, Period),

    #[error("payroll does not exist for {0} in {1}")]
    MissingPayroll(Email, Period),

    #[error("payroll employee does not exist: {0}")]
    UnknownEmployee(Email),

    #[error("lock poisoned")]
    Poisoned,
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateIdentity(_) => AccountError::DuplicateIdentity,
            StoreError::MissingIdentity(_) => AccountError::IdentityNotFound,
            StoreError::DuplicatePayroll(..) => AccountError::PayrollAlreadyExists,
            StoreError::MissingPayroll(..) => AccountError::PayrollNotFound,
            StoreError::UnknownEmployee(_) => AccountError::UnknownEmployee,
            other => AccountError::storage(other.to_string()),
        }
    }
}

/// Persistence capability for every account table.
///
/// Implementations must apply a [`UnitOfWork`] atomically: either every
/// mutation and every audit event of the batch becomes visible, or none does.
/// Audit records are assigned strictly increasing ids in commit order.
pub trait AccountStore: Send + Sync {
    /// Register the fixed role set. Returns `true` if anything was created.
    fn initialize_roles(&self) -> Result<bool, StoreError>;

    /// The registry entry for `role`, or `UnregisteredRole` before initialization.
    fn role_for(&self, role: Role) -> Result<Role, StoreError>;

    /// Lookup by e-mail. `Email` is already lowercased, so the match is case-insensitive.
    fn find_identity(&self, email: &Email) -> Result<Option<Identity>, StoreError>;

    /// All identities in creation order.
    fn list_identities(&self) -> Result<Vec<Identity>, StoreError>;

    fn roles_of(&self, id: IdentityId) -> Result<RoleSet, StoreError>;

    /// Members of `role` in creation order.
    fn members_of(&self, role: Role) -> Result<Vec<Identity>, StoreError>;

    /// Consecutive failures recorded for `email`, `None` if no counter exists yet.
    fn failure_count(&self, email: &Email) -> Result<Option<u32>, StoreError>;

    /// The whole audit log, ascending by id.
    fn audit_log(&self) -> Result<Vec<AuditRecord>, StoreError>;

    fn payroll(&self, employee: &Email, period: Period) -> Result<Option<PayrollEntry>, StoreError>;

    /// Payroll of one employee, most recent period first.
    fn payrolls_for(&self, employee: &Email) -> Result<Vec<PayrollEntry>, StoreError>;

    /// Apply a unit of work, returning the appended audit records.
    fn commit(&self, work: UnitOfWork) -> Result<Vec<AuditRecord>, StoreError>;
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    fn initialize_roles(&self) -> Result<bool, StoreError> {
        (**self).initialize_roles()
    }

    fn role_for(&self, role: Role) -> Result<Role, StoreError> {
        (**self).role_for(role)
    }

    fn find_identity(&self, email: &Email) -> Result<Option<Identity>, StoreError> {
        (**self).find_identity(email)
    }

    fn list_identities(&self) -> Result<Vec<Identity>, StoreError> {
        (**self).list_identities()
    }

    fn roles_of(&self, id: IdentityId) -> Result<RoleSet, StoreError> {
        (**self).roles_of(id)
    }

    fn members_of(&self, role: Role) -> Result<Vec<Identity>, StoreError> {
        (**self).members_of(role)
    }

    fn failure_count(&self, email: &Email) -> Result<Option<u32>, StoreError> {
        (**self).failure_count(email)
    }

    fn audit_log(&self) -> Result<Vec<AuditRecord>, StoreError> {
        (**self).audit_log()
    }

    fn payroll(&self, employee: &Email, period: Period) -> Result<Option<PayrollEntry>, StoreError> {
        (**self).payroll(employee, period)
    }

    fn payrolls_for(&self, employee: &Email) -> Result<Vec<PayrollEntry>, StoreError> {
        (**self).payrolls_for(employee)
    }

    fn commit(&self, work: UnitOfWork) -> Result<Vec<AuditRecord>, StoreError> {
        (**self).commit(work)
    }
}
