use tracing::instrument;

use accountd_auth::{IdentityView, PasswordHasher, Role, RoleOperation, check_grant, check_revoke};
use accountd_core::{AccountResult, Email};
use accountd_events::RequestContext;

use super::{AccountService, lookup_email};
use crate::store::{AccountStore, Mutation, UnitOfWork};

impl<S, H> AccountService<S, H>
where
    S: AccountStore,
    H: PasswordHasher,
{
    /// Add `role` to the identity. Re-granting a held role is accepted and still audited.
    #[instrument(skip(self, ctx), fields(email = %email, %role, actor = ctx.subject()), err)]
    pub fn grant_role(&self, email: &Email, role: Role, ctx: &RequestContext) -> AccountResult<IdentityView> {
        let _guard = self.locks.lock(email);
        let identity = self.existing(email)?;
        let role = self.store.role_for(role)?;

        let held = self.store.roles_of(identity.id)?;
        let next = check_grant(held, role)?;

        let mut trail = self.trail();
        trail.role_granted(ctx, role, &identity.email);

        let mut work = UnitOfWork::new();
        if !held.contains(role) {
            work.push(Mutation::AddMembership {
                id: identity.id,
                role,
            });
        }
        work.record(trail);
        self.commit(work)?;

        tracing::info!(email = %identity.email, %role, roles = %next, "role granted");
        Ok(IdentityView::new(&identity, next))
    }

    #[instrument(skip(self, ctx), fields(email = %email, %role, actor = ctx.subject()), err)]
    pub fn revoke_role(&self, email: &Email, role: Role, ctx: &RequestContext) -> AccountResult<IdentityView> {
        let _guard = self.locks.lock(email);
        let identity = self.existing(email)?;
        let role = self.store.role_for(role)?;

        let held = self.store.roles_of(identity.id)?;
        let next = check_revoke(held, role)?;

        let mut trail = self.trail();
        trail.role_removed(ctx, role, &identity.email);

        let mut work = UnitOfWork::new().with(Mutation::RemoveMembership {
            id: identity.id,
            role,
        });
        work.record(trail);
        self.commit(work)?;

        tracing::info!(email = %identity.email, %role, roles = %next, "role removed");
        Ok(IdentityView::new(&identity, next))
    }

    /// Role change as submitted by a client: `role` is an exact role name and
    /// `operation` is `GRANT` or `REMOVE`.
    ///
    /// The role name is checked first, then the identity, then the operation.
    pub fn change_role(
        &self,
        raw_email: &str,
        role: &str,
        operation: &str,
        ctx: &RequestContext,
    ) -> AccountResult<IdentityView> {
        let role: Role = role.parse()?;
        let email = lookup_email(raw_email)?;
        self.existing(&email)?;

        match operation.parse::<RoleOperation>()? {
            RoleOperation::Grant => self.grant_role(&email, role, ctx),
            RoleOperation::Remove => self.revoke_role(&email, role, ctx),
        }
    }
}
