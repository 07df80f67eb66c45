use serde::{Deserialize, Serialize};

use accountd_core::{AccountError, Email};

use crate::period::Period;

/// Salary paid to one employee for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollEntry {
    pub employee: Email,
    pub period: Period,
    /// Amount in cents.
    pub salary: i64,
}

impl PayrollEntry {
    pub fn new(employee: Email, period: Period, salary: i64) -> Result<Self, AccountError> {
        let entry = Self {
            employee,
            period,
            salary,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Build from raw request fields.
    pub fn parse(employee: &str, period: &str, salary: i64) -> Result<Self, AccountError> {
        Self::new(Email::parse(employee)?, Period::parse(period)?, salary)
    }

    pub fn validate(&self) -> Result<(), AccountError> {
        if self.salary < 0 {
            return Err(AccountError::NegativePayroll);
        }
        Ok(())
    }

    /// Storage key: one entry per employee and month.
    pub fn key(&self) -> (Email, Period) {
        (self.employee.clone(), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_salary_is_rejected() {
        assert_eq!(
            PayrollEntry::parse("bob@acme.com", "01-2022", -1),
            Err(AccountError::NegativePayroll)
        );
        assert!(PayrollEntry::parse("bob@acme.com", "01-2022", 0).is_ok());
    }

    #[test]
    fn employee_is_normalized() {
        let entry = PayrollEntry::parse("Bob@Acme.com", "01-2022", 123456).unwrap();
        assert_eq!(entry.employee.as_str(), "bob@acme.com");
    }

    #[test]
    fn deserializes_request_shape() {
        let entry: PayrollEntry = serde_json::from_str(
            r#"{"employee":"bob@acme.com","period":"07-2021","salary":654321}"#,
        )
        .unwrap();
        assert_eq!(entry.period, Period::parse("07-2021").unwrap());
        assert_eq!(entry.salary, 654321);
    }

    #[test]
    fn period_errors_surface_before_salary() {
        assert!(matches!(
            PayrollEntry::parse("bob@acme.com", "13-2021", -5),
            Err(AccountError::InvalidPayrollPeriod(_))
        ));
    }
}
