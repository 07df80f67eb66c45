//! Account holder entity.

use serde::{Deserialize, Serialize};

use accountd_core::{AccountError, Email, IdentityId};

use crate::roles::RoleSet;

/// An account holder.
///
/// Role memberships are not stored here: the registry keeps a single
/// membership relation and is queried from either side.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
    pub lastname: String,
    pub email: Email,
    pub password_hash: String,
    pub locked: bool,
}

impl core::fmt::Debug for Identity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("lastname", &self.lastname)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("locked", &self.locked)
            .finish()
    }
}

/// Signup request.
#[derive(Clone, Deserialize)]
pub struct NewIdentity {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewIdentity")
            .field("name", &self.name)
            .field("lastname", &self.lastname)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl NewIdentity {
    pub fn new(
        name: impl Into<String>,
        lastname: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            lastname: lastname.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Check the display fields and the e-mail, returning the normalized e-mail.
    ///
    /// When `domain` is set the address must belong to it.
    pub fn validate(&self, domain: Option<&str>) -> Result<Email, AccountError> {
        if self.name.trim().is_empty() {
            return Err(AccountError::validation("name cannot be empty"));
        }
        if self.lastname.trim().is_empty() {
            return Err(AccountError::validation("lastname cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(AccountError::validation("password cannot be empty"));
        }

        let email = Email::parse(&self.email)?;
        if let Some(domain) = domain {
            if !email.is_in_domain(domain) {
                return Err(AccountError::validation(format!(
                    "email must belong to the {domain} domain"
                )));
            }
        }
        Ok(email)
    }
}

/// Identity as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityView {
    pub id: IdentityId,
    pub name: String,
    pub lastname: String,
    pub email: String,
    /// `ROLE_<NAME>` strings sorted ascending.
    pub roles: Vec<String>,
}

impl IdentityView {
    pub fn new(identity: &Identity, roles: RoleSet) -> Self {
        Self {
            id: identity.id,
            name: identity.name.clone(),
            lastname: identity.lastname.clone(),
            email: identity.email.to_string(),
            roles: roles.authorities(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;

    fn request(email: &str) -> NewIdentity {
        NewIdentity::new("Alice", "Smith", email, "secret-password-1")
    }

    #[test]
    fn validate_normalizes_email() {
        let email = request("Alice@Acme.com").validate(Some("acme.com")).unwrap();
        assert_eq!(email.as_str(), "alice@acme.com");
    }

    #[test]
    fn validate_enforces_domain() {
        let err = request("alice@example.com").validate(Some("acme.com")).unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
        assert!(request("alice@example.com").validate(None).is_ok());
    }

    #[test]
    fn validate_rejects_blank_names() {
        let mut req = request("alice@acme.com");
        req.lastname = "   ".into();
        let err = req.validate(None).unwrap_err();
        assert!(err.to_string().contains("lastname"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let req = request("alice@acme.com");
        assert!(!format!("{req:?}").contains("secret-password-1"));

        let identity = Identity {
            id: IdentityId::new(),
            name: "Alice".into(),
            lastname: "Smith".into(),
            email: Email::parse("alice@acme.com").unwrap(),
            password_hash: "$argon2id$v=19$abc".into(),
            locked: false,
        };
        assert!(!format!("{identity:?}").contains("argon2id"));
    }

    #[test]
    fn view_lists_sorted_authorities() {
        let identity = Identity {
            id: IdentityId::new(),
            name: "Bob".into(),
            lastname: "Jones".into(),
            email: Email::parse("bob@acme.com").unwrap(),
            password_hash: String::new(),
            locked: false,
        };
        let roles: RoleSet = [Role::User, Role::Accountant].into_iter().collect();
        let view = IdentityView::new(&identity, roles);
        assert_eq!(view.roles, vec!["ROLE_ACCOUNTANT", "ROLE_USER"]);
        assert_eq!(view.email, "bob@acme.com");
    }
}
