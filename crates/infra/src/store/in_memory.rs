use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use accountd_auth::{Identity, Role, RoleSet};
use accountd_core::{Email, IdentityId};
use accountd_events::AuditRecord;
use accountd_payroll::{PayrollEntry, Period};

use super::r#trait::{AccountStore, StoreError};
use super::unit_of_work::{Mutation, UnitOfWork};

#[derive(Debug, Default)]
struct Tables {
    next_row: u64,
    /// Creation order -> identity.
    identities: BTreeMap<u64, Identity>,
    rows: HashMap<IdentityId, u64>,
    by_email: HashMap<Email, IdentityId>,
    roles: BTreeSet<Role>,
    memberships: BTreeSet<(Role, IdentityId)>,
    failures: HashMap<Email, u32>,
    payroll: BTreeMap<(Email, Period), PayrollEntry>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    /// Append-only.
    audit: Vec<AuditRecord>,
}

/// Effects of the mutations already checked in the current batch.
#[derive(Debug, Default)]
struct Pending {
    inserted: HashMap<IdentityId, Email>,
    deleted: HashSet<IdentityId>,
    payroll: HashSet<(Email, Period)>,
}

impl Pending {
    fn identity_exists(&self, tables: &Tables, id: IdentityId) -> bool {
        if self.deleted.contains(&id) {
            return false;
        }
        self.inserted.contains_key(&id) || tables.rows.contains_key(&id)
    }

    fn email_taken(&self, tables: &Tables, email: &Email) -> bool {
        let stored = tables
            .by_email
            .get(email)
            .is_some_and(|id| !self.deleted.contains(id));
        stored || self.inserted.values().any(|e| e == email)
    }

    fn payroll_exists(&self, tables: &Tables, key: &(Email, Period)) -> bool {
        self.payroll.contains(key) || tables.payroll.contains_key(key)
    }

    /// Check one mutation against the live tables plus the batch so far.
    fn check(&mut self, tables: &Tables, mutation: &Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::InsertIdentity(identity) => {
                if self.email_taken(tables, &identity.email)
                    || self.inserted.contains_key(&identity.id)
                    || tables.rows.contains_key(&identity.id)
                {
                    return Err(StoreError::DuplicateIdentity(identity.email.clone()));
                }
                self.inserted.insert(identity.id, identity.email.clone());
            }
            Mutation::SetPasswordHash { id, .. }
            | Mutation::SetLocked { id, .. }
            | Mutation::RemoveMembership { id, .. } => {
                if !self.identity_exists(tables, *id) {
                    return Err(StoreError::MissingIdentity(*id));
                }
            }
            Mutation::DeleteIdentity { id } => {
                if !self.identity_exists(tables, *id) {
                    return Err(StoreError::MissingIdentity(*id));
                }
                self.inserted.remove(id);
                self.deleted.insert(*id);
            }
            Mutation::AddMembership { id, role } => {
                if !self.identity_exists(tables, *id) {
                    return Err(StoreError::MissingIdentity(*id));
                }
                if !tables.roles.contains(role) {
                    return Err(StoreError::UnregisteredRole(*role));
                }
            }
            Mutation::SetFailureCount { .. } | Mutation::DeleteFailureCounter { .. } => {}
            Mutation::InsertPayroll(entry) => {
                if !self.email_taken(tables, &entry.employee) {
                    return Err(StoreError::UnknownEmployee(entry.employee.clone()));
                }
                let key = entry.key();
                if self.payroll_exists(tables, &key) {
                    return Err(StoreError::DuplicatePayroll(key.0, key.1));
                }
                self.payroll.insert(key);
            }
            Mutation::UpdatePayroll(entry) => {
                let key = entry.key();
                if !self.payroll_exists(tables, &key) {
                    return Err(StoreError::MissingPayroll(key.0, key.1));
                }
            }
        }
        Ok(())
    }
}

impl Tables {
    fn identity(&self, id: IdentityId) -> Option<&Identity> {
        self.rows.get(&id).and_then(|row| self.identities.get(row))
    }

    fn identity_mut(&mut self, id: IdentityId) -> Option<&mut Identity> {
        self.rows.get(&id).and_then(|row| self.identities.get_mut(row))
    }

    fn roles_of(&self, id: IdentityId) -> RoleSet {
        self.memberships
            .iter()
            .filter(|(_, member)| *member == id)
            .map(|(role, _)| *role)
            .collect()
    }

    /// Apply a mutation that already passed [`Pending::check`].
    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::InsertIdentity(identity) => {
                self.next_row += 1;
                self.rows.insert(identity.id, self.next_row);
                self.by_email.insert(identity.email.clone(), identity.id);
                self.identities.insert(self.next_row, identity);
            }
            Mutation::SetPasswordHash { id, hash } => {
                if let Some(identity) = self.identity_mut(id) {
                    identity.password_hash = hash;
                }
            }
            Mutation::SetLocked { id, locked } => {
                if let Some(identity) = self.identity_mut(id) {
                    identity.locked = locked;
                }
            }
            Mutation::DeleteIdentity { id } => {
                if let Some(row) = self.rows.remove(&id) {
                    if let Some(identity) = self.identities.remove(&row) {
                        self.by_email.remove(&identity.email);
                    }
                }
                self.memberships.retain(|(_, member)| *member != id);
            }
            Mutation::AddMembership { id, role } => {
                self.memberships.insert((role, id));
            }
            Mutation::RemoveMembership { id, role } => {
                self.memberships.remove(&(role, id));
            }
            Mutation::SetFailureCount { email, count } => {
                self.failures.insert(email, count);
            }
            Mutation::DeleteFailureCounter { email } => {
                self.failures.remove(&email);
            }
            Mutation::InsertPayroll(entry) => {
                self.payroll.insert(entry.key(), entry);
            }
            Mutation::UpdatePayroll(entry) => {
                self.payroll.insert(entry.key(), entry);
            }
        }
    }
}

/// In-memory account store.
///
/// A commit checks the whole batch against the live tables first and applies
/// it only when every mutation is valid; its audit events are appended under
/// the same write lock. Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<Inner>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&inner.tables))
    }
}

impl AccountStore for InMemoryAccountStore {
    fn initialize_roles(&self) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let mut created = false;
        for role in Role::ALL {
            created |= inner.tables.roles.insert(role);
        }
        Ok(created)
    }

    fn role_for(&self, role: Role) -> Result<Role, StoreError> {
        self.read(|t| t.roles.get(&role).copied())?
            .ok_or(StoreError::UnregisteredRole(role))
    }

    fn find_identity(&self, email: &Email) -> Result<Option<Identity>, StoreError> {
        self.read(|t| {
            t.by_email
                .get(email)
                .and_then(|id| t.identity(*id))
                .cloned()
        })
    }

    fn list_identities(&self) -> Result<Vec<Identity>, StoreError> {
        self.read(|t| t.identities.values().cloned().collect())
    }

    fn roles_of(&self, id: IdentityId) -> Result<RoleSet, StoreError> {
        self.read(|t| t.roles_of(id))
    }

    fn members_of(&self, role: Role) -> Result<Vec<Identity>, StoreError> {
        self.read(|t| {
            let mut rows: Vec<u64> = t
                .memberships
                .iter()
                .filter(|(r, _)| *r == role)
                .filter_map(|(_, id)| t.rows.get(id).copied())
                .collect();
            rows.sort_unstable();
            rows.iter()
                .filter_map(|row| t.identities.get(row).cloned())
                .collect()
        })
    }

    fn failure_count(&self, email: &Email) -> Result<Option<u32>, StoreError> {
        self.read(|t| t.failures.get(email).copied())
    }

    fn audit_log(&self) -> Result<Vec<AuditRecord>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.audit.clone())
    }

    fn payroll(&self, employee: &Email, period: Period) -> Result<Option<PayrollEntry>, StoreError> {
        self.read(|t| t.payroll.get(&(employee.clone(), period)).cloned())
    }

    fn payrolls_for(&self, employee: &Email) -> Result<Vec<PayrollEntry>, StoreError> {
        self.read(|t| {
            t.payroll
                .values()
                .filter(|e| &e.employee == employee)
                .rev()
                .cloned()
                .collect()
        })
    }

    fn commit(&self, work: UnitOfWork) -> Result<Vec<AuditRecord>, StoreError> {
        if work.is_empty() {
            return Ok(vec![]);
        }

        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let (mutations, audit) = work.into_parts();

        let mut pending = Pending::default();
        for mutation in &mutations {
            pending.check(&inner.tables, mutation)?;
        }
        for mutation in mutations {
            inner.tables.apply(mutation);
        }

        let mut appended = Vec::with_capacity(audit.len());
        for event in audit {
            let record = event.into_record(inner.audit.len() as u64 + 1);
            inner.audit.push(record.clone());
            appended.push(record);
        }
        Ok(appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accountd_events::{AuditTrail, RequestContext};
    use chrono::NaiveDate;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn identity(s: &str) -> Identity {
        Identity {
            id: IdentityId::new(),
            name: "Test".into(),
            lastname: "User".into(),
            email: email(s),
            password_hash: "hash".into(),
            locked: false,
        }
    }

    fn trail(day: u32) -> AuditTrail {
        AuditTrail::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap())
    }

    fn store() -> InMemoryAccountStore {
        let store = InMemoryAccountStore::new();
        store.initialize_roles().unwrap();
        store
    }

    #[test]
    fn role_initialization_is_idempotent() {
        let store = InMemoryAccountStore::new();
        assert!(matches!(
            store.role_for(Role::Auditor),
            Err(StoreError::UnregisteredRole(Role::Auditor))
        ));
        assert!(store.initialize_roles().unwrap());
        assert!(!store.initialize_roles().unwrap());
        assert_eq!(store.role_for(Role::Auditor).unwrap(), Role::Auditor);
    }

    #[test]
    fn commit_inserts_identity_membership_and_audit() {
        let store = store();
        let alice = identity("alice@acme.com");
        let mut work = UnitOfWork::new()
            .with(Mutation::InsertIdentity(alice.clone()))
            .with(Mutation::AddMembership {
                id: alice.id,
                role: Role::User,
            });
        let mut events = trail(1);
        events.user_created(&RequestContext::anonymous("/signup"), &alice.email);
        work.record(events);

        let records = store.commit(work).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);

        let found = store.find_identity(&email("ALICE@acme.com")).unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert_eq!(store.roles_of(alice.id).unwrap(), RoleSet::only(Role::User));
        assert_eq!(store.members_of(Role::User).unwrap().len(), 1);
    }

    #[test]
    fn failed_commit_changes_nothing() {
        let store = store();
        let alice = identity("alice@acme.com");
        store
            .commit(UnitOfWork::new().with(Mutation::InsertIdentity(alice.clone())))
            .unwrap();

        let mut work = UnitOfWork::new()
            .with(Mutation::SetLocked {
                id: alice.id,
                locked: true,
            })
            .with(Mutation::InsertIdentity(identity("alice@acme.com")));
        let mut events = trail(1);
        events.login_failed("alice@acme.com", "/p");
        work.record(events);

        let err = store.commit(work).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentity(_)));
        assert!(!store.find_identity(&alice.email).unwrap().unwrap().locked);
        assert!(store.audit_log().unwrap().is_empty());
    }

    #[test]
    fn batch_sees_its_own_earlier_mutations() {
        let store = store();
        let carol = identity("carol@acme.com");
        let march = PayrollEntry::parse("carol@acme.com", "03-2024", 300_00).unwrap();
        store
            .commit(
                UnitOfWork::new()
                    .with(Mutation::InsertIdentity(carol.clone()))
                    .with(Mutation::InsertPayroll(march.clone()))
                    .with(Mutation::UpdatePayroll(march.clone())),
            )
            .unwrap();
        assert_eq!(store.payroll(&carol.email, march.period).unwrap(), Some(march.clone()));

        let repeated = store.commit(
            UnitOfWork::new()
                .with(Mutation::SetFailureCount {
                    email: carol.email.clone(),
                    count: 3,
                })
                .with(Mutation::InsertPayroll(
                    PayrollEntry::parse("carol@acme.com", "04-2024", 1).unwrap(),
                ))
                .with(Mutation::InsertPayroll(
                    PayrollEntry::parse("carol@acme.com", "04-2024", 2).unwrap(),
                )),
        );
        assert!(matches!(repeated, Err(StoreError::DuplicatePayroll(..))));
        assert_eq!(store.failure_count(&carol.email).unwrap(), None);
        assert_eq!(store.payrolls_for(&carol.email).unwrap(), vec![march]);

        let after_delete = store.commit(
            UnitOfWork::new()
                .with(Mutation::DeleteIdentity { id: carol.id })
                .with(Mutation::SetLocked {
                    id: carol.id,
                    locked: true,
                }),
        );
        assert_eq!(after_delete, Err(StoreError::MissingIdentity(carol.id)));
        assert!(store.find_identity(&carol.email).unwrap().is_some());
    }

    #[test]
    fn delete_cascades_memberships() {
        let store = store();
        let bob = identity("bob@acme.com");
        store
            .commit(
                UnitOfWork::new()
                    .with(Mutation::InsertIdentity(bob.clone()))
                    .with(Mutation::AddMembership {
                        id: bob.id,
                        role: Role::Auditor,
                    }),
            )
            .unwrap();
        store
            .commit(UnitOfWork::new().with(Mutation::DeleteIdentity { id: bob.id }))
            .unwrap();

        assert!(store.find_identity(&bob.email).unwrap().is_none());
        assert!(store.roles_of(bob.id).unwrap().is_empty());
        assert!(store.members_of(Role::Auditor).unwrap().is_empty());
    }

    #[test]
    fn membership_requires_registered_role() {
        let store = InMemoryAccountStore::new();
        let bob = identity("bob@acme.com");
        let err = store
            .commit(
                UnitOfWork::new()
                    .with(Mutation::InsertIdentity(bob.clone()))
                    .with(Mutation::AddMembership {
                        id: bob.id,
                        role: Role::User,
                    }),
            )
            .unwrap_err();
        assert_eq!(err, StoreError::UnregisteredRole(Role::User));
        assert!(store.list_identities().unwrap().is_empty());
    }

    #[test]
    fn audit_ids_are_monotonic_across_commits() {
        let store = store();
        let mut first = UnitOfWork::new();
        let mut events = trail(1);
        events.brute_force("a@acme.com", "/p");
        events.login_failed("a@acme.com", "/p");
        first.record(events);
        store.commit(first).unwrap();

        let mut second = UnitOfWork::new();
        let mut events = trail(2);
        events.login_failed("b@acme.com", "/p");
        second.record(events);
        let appended = store.commit(second).unwrap();

        assert_eq!(appended[0].id, 3);
        let ids: Vec<u64> = store.audit_log().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn payroll_requires_employee_and_unique_period() {
        let store = store();
        let bob = identity("bob@acme.com");
        store
            .commit(UnitOfWork::new().with(Mutation::InsertIdentity(bob.clone())))
            .unwrap();

        let jan = PayrollEntry::parse("bob@acme.com", "01-2024", 100_00).unwrap();
        let feb = PayrollEntry::parse("bob@acme.com", "02-2024", 200_00).unwrap();
        store
            .commit(
                UnitOfWork::new()
                    .with(Mutation::InsertPayroll(jan.clone()))
                    .with(Mutation::InsertPayroll(feb.clone())),
            )
            .unwrap();

        let dup = store.commit(UnitOfWork::new().with(Mutation::InsertPayroll(jan.clone())));
        assert!(matches!(dup, Err(StoreError::DuplicatePayroll(..))));

        let stranger = PayrollEntry::parse("eve@acme.com", "01-2024", 1).unwrap();
        let unknown = store.commit(UnitOfWork::new().with(Mutation::InsertPayroll(stranger)));
        assert!(matches!(unknown, Err(StoreError::UnknownEmployee(_))));

        let listed = store.payrolls_for(&bob.email).unwrap();
        assert_eq!(listed, vec![feb, jan]);
    }
}
