use serde::{Deserialize, Serialize};

use crate::roles::{Role, RoleSet};

/// Guarded capability of the service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read the security audit log.
    ViewSecurityEvents,
    /// List, delete, lock/unlock users and change their roles.
    ManageUsers,
    /// Upload and correct payroll entries.
    UploadPayroll,
    ChangePassword,
    ViewOwnPayroll,
}

impl Permission {
    /// Roles that carry this permission.
    pub fn roles(&self) -> RoleSet {
        match self {
            Permission::ViewSecurityEvents => RoleSet::only(Role::Auditor),
            Permission::ManageUsers => RoleSet::only(Role::Administrator),
            Permission::UploadPayroll => RoleSet::only(Role::Accountant),
            Permission::ChangePassword => [Role::Administrator, Role::Accountant, Role::User]
                .into_iter()
                .collect(),
            Permission::ViewOwnPayroll => [Role::Accountant, Role::User].into_iter().collect(),
        }
    }

    pub fn is_granted_to(&self, held: RoleSet) -> bool {
        held.iter().any(|r| self.roles().contains(r))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewSecurityEvents => "view_security_events",
            Permission::ManageUsers => "manage_users",
            Permission::UploadPayroll => "upload_payroll",
            Permission::ChangePassword => "change_password",
            Permission::ViewOwnPayroll => "view_own_payroll",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
