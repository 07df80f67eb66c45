use tracing::instrument;

use accountd_auth::{
    Identity, IdentityView, NewIdentity, PasswordHasher, Role, RoleSet, bootstrap_role,
    ensure_deletable,
};
use accountd_core::{AccountError, AccountResult, Email, IdentityId};
use accountd_events::RequestContext;

use super::{AccountService, lookup_email};
use crate::store::{AccountStore, Mutation, UnitOfWork};

impl<S, H> AccountService<S, H>
where
    S: AccountStore,
    H: PasswordHasher,
{
    /// Create an identity.
    ///
    /// The first identity ever created becomes `ADMINISTRATOR`; every later one
    /// starts as `USER`.
    #[instrument(skip(self, request, ctx), fields(email = %request.email), err)]
    pub fn signup(&self, request: NewIdentity, ctx: &RequestContext) -> AccountResult<IdentityView> {
        let email = request.validate(self.config.email_domain.as_deref())?;
        self.config.password.check(&request.password)?;
        let password_hash = self.hasher.hash(&request.password)?;

        let _signup = self.signup_guard();
        let _guard = self.locks.lock(&email);

        if self.store.find_identity(&email)?.is_some() {
            return Err(AccountError::DuplicateIdentity);
        }

        let role = bootstrap_role(self.store.members_of(Role::Administrator)?.len());
        let role = self.store.role_for(role)?;

        let identity = Identity {
            id: IdentityId::new(),
            name: request.name.trim().to_string(),
            lastname: request.lastname.trim().to_string(),
            email,
            password_hash,
            locked: false,
        };

        let mut trail = self.trail();
        trail.user_created(ctx, &identity.email);

        let mut work = UnitOfWork::new()
            .with(Mutation::InsertIdentity(identity.clone()))
            .with(Mutation::AddMembership {
                id: identity.id,
                role,
            });
        work.record(trail);
        self.commit(work)?;

        tracing::info!(email = %identity.email, %role, "identity created");
        Ok(IdentityView::new(&identity, RoleSet::only(role)))
    }

    #[instrument(skip(self, new_password, ctx), fields(email = %email), err)]
    pub fn change_password(
        &self,
        email: &Email,
        new_password: &str,
        ctx: &RequestContext,
    ) -> AccountResult<()> {
        self.config.password.check(new_password)?;

        let _guard = self.locks.lock(email);
        let identity = self.existing(email)?;

        if self.hasher.matches(new_password, &identity.password_hash)? {
            return Err(AccountError::SamePassword);
        }
        let hash = self.hasher.hash(new_password)?;

        let mut trail = self.trail();
        trail.password_changed(ctx, &identity.email);

        let mut work = UnitOfWork::new().with(Mutation::SetPasswordHash {
            id: identity.id,
            hash,
        });
        work.record(trail);
        self.commit(work)?;

        tracing::info!(email = %identity.email, "password changed");
        Ok(())
    }

    /// Remove an identity, its memberships and its failure counter.
    #[instrument(skip(self, ctx), fields(email = %email, actor = ctx.subject()), err)]
    pub fn delete_identity(&self, email: &Email, ctx: &RequestContext) -> AccountResult<()> {
        let _guard = self.locks.lock(email);
        let identity = self.existing(email)?;
        ensure_deletable(self.store.roles_of(identity.id)?)?;

        let mut trail = self.trail();
        trail.user_deleted(ctx, &identity.email);

        let mut work = UnitOfWork::new()
            .with(Mutation::DeleteIdentity { id: identity.id })
            .with(Mutation::DeleteFailureCounter {
                email: identity.email.clone(),
            });
        work.record(trail);
        self.commit(work)?;

        tracing::info!(email = %identity.email, "identity deleted");
        Ok(())
    }

    /// [`delete_identity`](Self::delete_identity) for a client-supplied address.
    pub fn delete_identity_by_name(&self, raw_email: &str, ctx: &RequestContext) -> AccountResult<()> {
        self.delete_identity(&lookup_email(raw_email)?, ctx)
    }

    pub fn find_identity(&self, email: &Email) -> AccountResult<Option<IdentityView>> {
        match self.store.find_identity(email)? {
            Some(identity) => {
                let roles = self.store.roles_of(identity.id)?;
                Ok(Some(IdentityView::new(&identity, roles)))
            }
            None => Ok(None),
        }
    }

    /// Every identity in creation order.
    pub fn list_identities(&self) -> AccountResult<Vec<IdentityView>> {
        self.store
            .list_identities()?
            .iter()
            .map(|identity| -> AccountResult<IdentityView> {
                let roles = self.store.roles_of(identity.id)?;
                Ok(IdentityView::new(identity, roles))
            })
            .collect()
    }

    pub fn roles_of(&self, email: &Email) -> AccountResult<RoleSet> {
        let identity = self.existing(email)?;
        Ok(self.store.roles_of(identity.id)?)
    }

    pub fn members_of(&self, role: Role) -> AccountResult<Vec<IdentityView>> {
        let role = self.store.role_for(role)?;
        self.store
            .members_of(role)?
            .iter()
            .map(|identity| -> AccountResult<IdentityView> {
                let roles = self.store.roles_of(identity.id)?;
                Ok(IdentityView::new(identity, roles))
            })
            .collect()
    }
}
