use accountd_core::Email;

/// Subject recorded when no identity is authenticated.
pub const ANONYMOUS: &str = "Anonymous";

/// Request metadata that only feeds audit events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    actor: Option<Email>,
    path: String,
}

impl RequestContext {
    pub fn new(actor: Option<Email>, path: impl Into<String>) -> Self {
        Self {
            actor,
            path: path.into(),
        }
    }

    pub fn anonymous(path: impl Into<String>) -> Self {
        Self::new(None, path)
    }

    pub fn authenticated(actor: Email, path: impl Into<String>) -> Self {
        Self::new(Some(actor), path)
    }

    pub fn actor(&self) -> Option<&Email> {
        self.actor.as_ref()
    }

    /// The audit subject: the acting identity, or `Anonymous`.
    pub fn subject(&self) -> &str {
        self.actor.as_ref().map(Email::as_str).unwrap_or(ANONYMOUS)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
