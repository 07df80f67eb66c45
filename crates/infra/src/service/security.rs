use tracing::instrument;

use accountd_auth::{
    AccessOperation, Identity, LockCause, Lockout, LockoutCommand, LockoutEvent, PasswordHasher,
    Permission, RoleSet, ensure_lockable,
};
use accountd_core::{AccountError, AccountResult, Aggregate, AggregateRoot, Email};
use accountd_events::{AuditRecord, RequestContext};

use super::{AccountService, lookup_email};
use crate::store::{AccountStore, Mutation, UnitOfWork};

impl<S, H> AccountService<S, H>
where
    S: AccountStore,
    H: PasswordHasher,
{
    fn lockout_for(&self, identity: &Identity) -> AccountResult<Lockout> {
        let failures = self.store.failure_count(&identity.email)?.unwrap_or(0);
        Ok(Lockout::restore(
            identity.id,
            self.config.lockout,
            identity.locked,
            failures,
        ))
    }

    /// Run one lockout command and turn its events into mutations and audit events.
    ///
    /// `subject` and `path` label the audit events: the administrator for
    /// explicit lock/unlock, the attempted login name for authentication outcomes.
    /// Returns the lockout as it stands after the command.
    fn lockout_work(
        &self,
        identity: &Identity,
        command: LockoutCommand,
        subject: &str,
        path: &str,
    ) -> AccountResult<(Lockout, Vec<LockoutEvent>, UnitOfWork)> {
        let mut lockout = self.lockout_for(identity)?;
        let had_failures = lockout.failures() > 0;
        let events = lockout.execute(&command)?;

        let mut trail = self.trail();
        let mut work = UnitOfWork::new();
        let email = &identity.email;

        for event in &events {
            match event {
                LockoutEvent::FailureRecorded { failures } => {
                    trail.login_failed(subject, path);
                    work.push(Mutation::SetFailureCount {
                        email: email.clone(),
                        count: *failures,
                    });
                }
                LockoutEvent::FailuresReset => work.push(Mutation::SetFailureCount {
                    email: email.clone(),
                    count: 0,
                }),
                LockoutEvent::BruteForceDetected { .. } => trail.brute_force(subject, path),
                LockoutEvent::Locked { .. } => {
                    work.push(Mutation::SetLocked {
                        id: identity.id,
                        locked: true,
                    });
                    trail.user_locked(subject, email, path);
                }
                LockoutEvent::Unlocked { counter_reset } => {
                    work.push(Mutation::SetLocked {
                        id: identity.id,
                        locked: false,
                    });
                    if *counter_reset && had_failures {
                        work.push(Mutation::SetFailureCount {
                            email: email.clone(),
                            count: 0,
                        });
                    }
                    trail.user_unlocked(subject, email, path);
                }
            }
        }
        work.record(trail);
        Ok((lockout, events, work))
    }

    /// Administrative lock. Locking an already locked identity is still audited.
    #[instrument(skip(self, ctx), fields(email = %email, actor = ctx.subject()), err)]
    pub fn lock(&self, email: &Email, ctx: &RequestContext) -> AccountResult<()> {
        let _guard = self.locks.lock(email);
        let identity = self.existing(email)?;
        ensure_lockable(self.store.roles_of(identity.id)?)?;

        let (lockout, _, work) =
            self.lockout_work(&identity, LockoutCommand::Lock, ctx.subject(), ctx.path())?;
        self.commit(work)?;

        tracing::warn!(
            email = %identity.email,
            actor = ctx.subject(),
            state = %lockout.state(),
            "identity locked"
        );
        Ok(())
    }

    /// Administrative unlock. Keeps the failure counter unless the policy says otherwise.
    #[instrument(skip(self, ctx), fields(email = %email, actor = ctx.subject()), err)]
    pub fn unlock(&self, email: &Email, ctx: &RequestContext) -> AccountResult<()> {
        let _guard = self.locks.lock(email);
        let identity = self.existing(email)?;

        let (lockout, _, work) =
            self.lockout_work(&identity, LockoutCommand::Unlock, ctx.subject(), ctx.path())?;
        self.commit(work)?;

        tracing::info!(
            email = %identity.email,
            actor = ctx.subject(),
            state = %lockout.state(),
            failures = lockout.failures(),
            "identity unlocked"
        );
        Ok(())
    }

    /// Lock or unlock as submitted by a client (`LOCK` / `UNLOCK`).
    pub fn change_access(&self, raw_email: &str, operation: &str, ctx: &RequestContext) -> AccountResult<()> {
        let email = lookup_email(raw_email)?;
        match operation.parse::<AccessOperation>()? {
            AccessOperation::Lock => self.lock(&email, ctx),
            AccessOperation::Unlock => self.unlock(&email, ctx),
        }
    }

    /// Feed one authentication outcome into the lockout state machine.
    ///
    /// Malformed or unknown identifiers are ignored: only recognized identities
    /// have counters. Failures against a locked identity are not counted.
    #[instrument(skip(self), err)]
    pub fn record_authentication_outcome(
        &self,
        identifier: &str,
        succeeded: bool,
        path: &str,
    ) -> AccountResult<()> {
        let Ok(email) = Email::parse(identifier) else {
            tracing::debug!("ignoring outcome for malformed identifier");
            return Ok(());
        };

        let _guard = self.locks.lock(&email);
        let Some(identity) = self.store.find_identity(&email)? else {
            tracing::debug!("ignoring outcome for unknown identity");
            return Ok(());
        };
        self.record_outcome(&identity, succeeded, identifier, path)
    }

    /// Caller holds the identity's stripe.
    fn record_outcome(
        &self,
        identity: &Identity,
        succeeded: bool,
        identifier: &str,
        path: &str,
    ) -> AccountResult<()> {
        let command = if succeeded {
            LockoutCommand::AuthenticationSucceeded
        } else {
            LockoutCommand::AuthenticationFailed
        };
        let (lockout, events, work) = self.lockout_work(identity, command, identifier, path)?;
        if work.is_empty() {
            return Ok(());
        }
        self.commit(work)?;

        for event in &events {
            match event {
                LockoutEvent::BruteForceDetected { failures } => tracing::warn!(
                    email = %identity.email,
                    failures,
                    "brute force detected"
                ),
                LockoutEvent::Locked {
                    cause: LockCause::BruteForce,
                } => tracing::warn!(email = %identity.email, "identity locked automatically"),
                _ => {}
            }
        }
        tracing::debug!(
            email = %identity.email,
            state = %lockout.state(),
            failures = lockout.failures(),
            transitions = lockout.version(),
            "authentication outcome recorded"
        );
        Ok(())
    }

    /// Check a login attempt and record its outcome.
    ///
    /// The identity's stripe is held from the lock check through recording,
    /// so a concurrent lock can't slip in between. A locked identity is
    /// rejected before its password is checked and the attempt is not
    /// recorded. Administrators can't be locked out: their lock flag does not
    /// block authentication.
    #[instrument(skip(self, password), err)]
    pub fn authenticate(&self, identifier: &str, password: &str, path: &str) -> AccountResult<Identity> {
        let email = Email::parse(identifier).map_err(|_| AccountError::InvalidCredentials)?;

        let _guard = self.locks.lock(&email);
        let identity = self
            .store
            .find_identity(&email)?
            .ok_or(AccountError::InvalidCredentials)?;

        if identity.locked && !self.store.roles_of(identity.id)?.is_admin() {
            return Err(AccountError::AccountLocked);
        }

        let matches = self.hasher.matches(password, &identity.password_hash)?;
        self.record_outcome(&identity, matches, identifier, path)?;

        if matches {
            Ok(identity)
        } else {
            Err(AccountError::InvalidCredentials)
        }
    }

    /// Check that the acting identity holds `permission`.
    ///
    /// An anonymous or unknown actor is unauthenticated and leaves no trace. An
    /// authenticated actor without the permission is recorded as `ACCESS_DENIED`.
    #[instrument(skip(self, ctx), fields(actor = ctx.subject(), path = ctx.path(), %permission), err)]
    pub fn authorize(&self, ctx: &RequestContext, permission: Permission) -> AccountResult<RoleSet> {
        let actor = ctx.actor().ok_or(AccountError::InvalidCredentials)?;
        let identity = self
            .store
            .find_identity(actor)?
            .ok_or(AccountError::InvalidCredentials)?;

        let roles = self.store.roles_of(identity.id)?;
        if permission.is_granted_to(roles) {
            return Ok(roles);
        }

        let mut trail = self.trail();
        trail.access_denied(ctx);
        let mut work = UnitOfWork::new();
        work.record(trail);
        self.commit(work)?;

        tracing::warn!(email = %identity.email, %permission, "access denied");
        Err(AccountError::AccessDenied)
    }

    /// The audit log, ascending by creation order.
    pub fn list_audit_events(&self) -> AccountResult<Vec<AuditRecord>> {
        Ok(self.store.audit_log()?)
    }

    /// Consecutive failures currently counted for `email`.
    pub fn failure_count(&self, email: &Email) -> AccountResult<u32> {
        Ok(self.store.failure_count(email)?.unwrap_or(0))
    }
}
