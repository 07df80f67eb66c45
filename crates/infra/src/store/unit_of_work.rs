use accountd_auth::{Identity, Role};
use accountd_core::{Email, IdentityId};
use accountd_events::{AuditEvent, AuditTrail};
use accountd_payroll::PayrollEntry;

/// A single state change inside a [`UnitOfWork`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    InsertIdentity(Identity),
    SetPasswordHash { id: IdentityId, hash: String },
    SetLocked { id: IdentityId, locked: bool },
    /// Removes the identity together with its memberships.
    DeleteIdentity { id: IdentityId },
    AddMembership { id: IdentityId, role: Role },
    RemoveMembership { id: IdentityId, role: Role },
    SetFailureCount { email: Email, count: u32 },
    DeleteFailureCounter { email: Email },
    InsertPayroll(PayrollEntry),
    UpdatePayroll(PayrollEntry),
}

/// Ordered mutations and audit events committed as one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitOfWork {
    mutations: Vec<Mutation>,
    audit: Vec<AuditEvent>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, mutation: Mutation) -> Self {
        self.push(mutation);
        self
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    /// Append the trail's events after any already recorded.
    pub fn record(&mut self, trail: AuditTrail) {
        self.audit.extend(trail.into_events());
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn audit(&self) -> &[AuditEvent] {
        &self.audit
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && self.audit.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Mutation>, Vec<AuditEvent>) {
        (self.mutations, self.audit)
    }
}
