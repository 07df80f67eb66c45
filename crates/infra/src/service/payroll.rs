use tracing::instrument;

use accountd_auth::PasswordHasher;
use accountd_core::{AccountError, AccountResult, Email};
use accountd_payroll::{PayrollEntry, Period};

use super::AccountService;
use crate::store::{AccountStore, Mutation, UnitOfWork};

impl<S, H> AccountService<S, H>
where
    S: AccountStore,
    H: PasswordHasher,
{
    /// Store a batch of payroll entries, all or nothing.
    ///
    /// Every employee must exist and no (employee, period) pair may already be
    /// stored or repeat inside the batch.
    #[instrument(skip(self, entries), fields(count = entries.len()), err)]
    pub fn add_payrolls(&self, entries: Vec<PayrollEntry>) -> AccountResult<()> {
        for entry in &entries {
            entry.validate()?;
        }
        if entries.is_empty() {
            return Ok(());
        }

        let work = entries
            .into_iter()
            .fold(UnitOfWork::new(), |work, entry| work.with(Mutation::InsertPayroll(entry)));
        self.commit(work)
    }

    /// Replace the salary of an existing entry.
    #[instrument(skip(self, entry), fields(employee = %entry.employee, period = %entry.period), err)]
    pub fn update_payroll(&self, entry: PayrollEntry) -> AccountResult<()> {
        entry.validate()?;
        if self.store.find_identity(&entry.employee)?.is_none() {
            return Err(AccountError::UnknownEmployee);
        }
        self.commit(UnitOfWork::new().with(Mutation::UpdatePayroll(entry)))
    }

    pub fn payroll_for(&self, employee: &Email, period: Period) -> AccountResult<Option<PayrollEntry>> {
        Ok(self.store.payroll(employee, period)?)
    }

    /// Every entry of `employee`, most recent period first.
    pub fn payrolls_for(&self, employee: &Email) -> AccountResult<Vec<PayrollEntry>> {
        Ok(self.store.payrolls_for(employee)?)
    }
}
