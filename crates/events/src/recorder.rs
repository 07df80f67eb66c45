//! Builds the audit events of one operation, in the order they happen.

use chrono::{NaiveDate, Utc};

use accountd_core::Email;

use crate::audit::{AuditAction, AuditEvent};
use crate::context::RequestContext;

/// Ordered audit events produced by a single operation.
///
/// The trail is handed to the store together with the state mutations, so the
/// events are appended in exactly this order or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTrail {
    date: NaiveDate,
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            events: Vec::new(),
        }
    }

    pub fn today() -> Self {
        Self::new(Utc::now().date_naive())
    }

    fn push(
        &mut self,
        action: AuditAction,
        subject: impl Into<String>,
        object: impl Into<String>,
        path: impl Into<String>,
    ) {
        let event = AuditEvent {
            date: self.date,
            action,
            subject: subject.into(),
            object: object.into(),
            path: path.into(),
        };
        tracing::debug!(action = %event.action, subject = %event.subject, "audit event recorded");
        self.events.push(event);
    }

    pub fn user_created(&mut self, ctx: &RequestContext, email: &Email) {
        self.push(AuditAction::CreateUser, ctx.subject(), email.as_str(), ctx.path());
    }

    pub fn password_changed(&mut self, ctx: &RequestContext, email: &Email) {
        self.push(AuditAction::ChangePassword, email.as_str(), email.as_str(), ctx.path());
    }

    pub fn access_denied(&mut self, ctx: &RequestContext) {
        self.push(AuditAction::AccessDenied, ctx.subject(), ctx.path(), ctx.path());
    }

    /// `attempted` is the login name exactly as presented.
    pub fn login_failed(&mut self, attempted: &str, path: &str) {
        self.push(AuditAction::LoginFailed, attempted, path, path);
    }

    pub fn brute_force(&mut self, attempted: &str, path: &str) {
        self.push(AuditAction::BruteForce, attempted, path, path);
    }

    pub fn role_granted(&mut self, ctx: &RequestContext, role: impl core::fmt::Display, email: &Email) {
        self.push(
            AuditAction::GrantRole,
            ctx.subject(),
            format!("Grant role {role} to {email}"),
            ctx.path(),
        );
    }

    pub fn role_removed(&mut self, ctx: &RequestContext, role: impl core::fmt::Display, email: &Email) {
        self.push(
            AuditAction::RemoveRole,
            ctx.subject(),
            format!("Remove role {role} from {email}"),
            ctx.path(),
        );
    }

    /// Lock by `subject`: the administrator, or the attempted login name for an automatic lock.
    pub fn user_locked(&mut self, subject: &str, email: &Email, path: &str) {
        self.push(AuditAction::LockUser, subject, format!("Lock user {email}"), path);
    }

    pub fn user_unlocked(&mut self, subject: &str, email: &Email, path: &str) {
        self.push(AuditAction::UnlockUser, subject, format!("Unlock user {email}"), path);
    }

    pub fn user_deleted(&mut self, ctx: &RequestContext, email: &Email) {
        self.push(AuditAction::DeleteUser, ctx.subject(), email.as_str(), ctx.path());
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn into_events(self) -> Vec<AuditEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trail() -> AuditTrail {
        AuditTrail::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
    }

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[test]
    fn anonymous_signup_uses_anonymous_subject() {
        let mut t = trail();
        let ctx = RequestContext::anonymous("/api/auth/signup");
        t.user_created(&ctx, &email("Bob@acme.com"));

        let e = &t.events()[0];
        assert_eq!(e.action, AuditAction::CreateUser);
        assert_eq!(e.subject, "Anonymous");
        assert_eq!(e.object, "bob@acme.com");
        assert_eq!(e.path, "/api/auth/signup");
    }

    #[test]
    fn role_events_describe_the_change() {
        let mut t = trail();
        let ctx = RequestContext::authenticated(email("admin@acme.com"), "/api/admin/user/role");
        t.role_granted(&ctx, "ACCOUNTANT", &email("bob@acme.com"));
        t.role_removed(&ctx, "ACCOUNTANT", &email("bob@acme.com"));

        let [grant, remove] = t.events() else {
            panic!("expected two events");
        };
        assert_eq!(grant.subject, "admin@acme.com");
        assert_eq!(grant.object, "Grant role ACCOUNTANT to bob@acme.com");
        assert_eq!(remove.action, AuditAction::RemoveRole);
        assert_eq!(remove.object, "Remove role ACCOUNTANT from bob@acme.com");
    }

    #[test]
    fn brute_force_sequence_keeps_order() {
        let mut t = trail();
        let target = email("bob@acme.com");
        t.login_failed("Bob@acme.com", "/api/empl/payment");
        t.brute_force("Bob@acme.com", "/api/empl/payment");
        t.user_locked("Bob@acme.com", &target, "/api/empl/payment");

        let actions: Vec<_> = t.events().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::LoginFailed, AuditAction::BruteForce, AuditAction::LockUser]
        );
        assert_eq!(t.events()[2].object, "Lock user bob@acme.com");
        assert_eq!(t.events()[0].object, "/api/empl/payment");
    }
}
