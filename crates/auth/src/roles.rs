use core::str::FromStr;

use serde::{Deserialize, Serialize};

use accountd_core::AccountError;

/// Fixed role set of the service.
///
/// `Administrator` is the only administrative role; the other three are
/// business roles. The two kinds are never held together.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Administrator,
    Accountant,
    User,
    Auditor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Administrator, Role::Accountant, Role::User, Role::Auditor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "ADMINISTRATOR",
            Role::Accountant => "ACCOUNTANT",
            Role::User => "USER",
            Role::Auditor => "AUDITOR",
        }
    }

    /// Authority string as exposed to clients (`ROLE_<NAME>`).
    pub fn authority(&self) -> String {
        format!("ROLE_{}", self.as_str())
    }

    pub fn is_business(&self) -> bool {
        !matches!(self, Role::Administrator)
    }

    fn bit(self) -> u8 {
        match self {
            Role::Administrator => 1 << 0,
            Role::Accountant => 1 << 1,
            Role::User => 1 << 2,
            Role::Auditor => 1 << 3,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AccountError;

    /// Exact, upper-case role names only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AccountError::UnknownRole(s.to_string()))
    }
}

/// Set of roles held by one identity.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn only(role: Role) -> Self {
        Self(role.bit())
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn with(self, role: Role) -> Self {
        Self(self.0 | role.bit())
    }

    pub fn without(self, role: Role) -> Self {
        Self(self.0 & !role.bit())
    }

    pub fn insert(&mut self, role: Role) {
        *self = self.with(role);
    }

    pub fn remove(&mut self, role: Role) {
        *self = self.without(role);
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_admin(&self) -> bool {
        self.contains(Role::Administrator)
    }

    pub fn has_business_role(&self) -> bool {
        self.iter().any(|r| r.is_business())
    }

    /// Roles in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + use<> {
        let bits = self.0;
        Role::ALL.into_iter().filter(move |r| bits & r.bit() != 0)
    }

    /// `ROLE_<NAME>` strings sorted ascending.
    pub fn authorities(&self) -> Vec<String> {
        let mut names: Vec<String> = self.iter().map(|r| r.authority()).collect();
        names.sort();
        names
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(RoleSet::empty(), RoleSet::with)
    }
}

impl core::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<&str> = self.iter().map(|r| r.as_str()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
