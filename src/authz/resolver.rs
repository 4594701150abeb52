use std::sync::Arc;
use std::time::Duration;

use crate::authz::{Principal, ScopeRouter};
use crate::errors::AuthzResult;
use crate::models::{HeldRoles, MembershipOrigin, Reference, ReferenceType, RoleKey, RoleScope};
use crate::store::{bounded, GroupStore, MembershipStore, OwnershipStore};

/// Works out which `(scope, role)` pairs a principal holds on a reference.
///
/// Sources, unioned:
/// 1. explicit membership records on the reference;
/// 2. the route's owner role when the principal is (or belongs to the group
///    that is) the reference's primary owner;
/// 3. roles held through groups attached to the reference, in the
///    reference's scope.
#[derive(Clone)]
pub struct MembershipResolver {
    memberships: Arc<dyn MembershipStore>,
    ownership: Arc<dyn OwnershipStore>,
    groups: Arc<dyn GroupStore>,
    router: Arc<ScopeRouter>,
    lookup_timeout: Option<Duration>,
}

impl MembershipResolver {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        ownership: Arc<dyn OwnershipStore>,
        groups: Arc<dyn GroupStore>,
        router: Arc<ScopeRouter>,
    ) -> Self {
        Self {
            memberships,
            ownership,
            groups,
            router,
            lookup_timeout: None,
        }
    }

    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub async fn resolve(&self, principal: &Principal, reference: &Reference) -> AuthzResult<HeldRoles> {
        let route = self.router.route(reference.reference_type)?;
        let scope = route.scope;
        let mut held = HeldRoles::new();

        let direct = bounded(
            self.lookup_timeout,
            self.memberships.find_by_member_and_reference(principal, reference),
        )
        .await
        .inspect_err(|err| tracing::error!(%principal, %reference, error = %err, "membership lookup failed"))?;
        for membership in &direct {
            held.insert(membership.role_key(), MembershipOrigin::Direct);
        }

        let owner = match route.owner_role {
            Some(_) => bounded(self.lookup_timeout, self.ownership.primary_owner_of(reference))
                .await
                .inspect_err(|err| tracing::error!(%reference, error = %err, "ownership lookup failed"))?,
            None => None,
        };

        if let (Some(owner_role), Some(owner)) = (route.owner_role.as_deref(), owner.as_ref()) {
            if self.is_or_belongs_to(principal, owner).await? {
                tracing::debug!(%principal, %reference, role = owner_role, "primary owner membership synthesized");
                held.insert(RoleKey::new(scope, owner_role), MembershipOrigin::Ownership);
            }
        }

        if principal.is_user() && reference.reference_type != ReferenceType::Group {
            let attached = bounded(self.lookup_timeout, self.ownership.groups_of(reference))
                .await
                .inspect_err(|err| tracing::error!(%reference, error = %err, "group lookup failed"))?;

            for group_id in attached {
                let group_ref = Reference::group(group_id.as_str());
                let memberships = bounded(
                    self.lookup_timeout,
                    self.memberships.find_by_member_and_reference(principal, &group_ref),
                )
                .await
                .inspect_err(|err| tracing::error!(%principal, group = %group_ref, error = %err, "group membership lookup failed"))?;

                for membership in memberships.into_iter().filter(|m| m.scope == scope) {
                    let role = if route.owner_role.as_deref() == Some(membership.role.as_str()) {
                        // An owner role reached through a group only counts when
                        // the group itself owns the reference.
                        if owner.as_ref() == Some(&Principal::group(group_id.as_str())) {
                            Some(membership.role)
                        } else {
                            self.group_default_role(&group_id, scope).await?
                        }
                    } else {
                        Some(membership.role)
                    };

                    if let Some(role) = role {
                        held.insert(RoleKey::new(scope, role), MembershipOrigin::Group);
                    }
                }
            }
        }

        tracing::debug!(%principal, %reference, roles = held.len(), "memberships resolved");
        Ok(held)
    }

    async fn is_or_belongs_to(&self, principal: &Principal, owner: &Principal) -> AuthzResult<bool> {
        if principal == owner {
            return Ok(true);
        }
        if !(principal.is_user() && owner.is_group()) {
            return Ok(false);
        }
        let memberships = bounded(
            self.lookup_timeout,
            self.memberships
                .find_by_member_and_reference(principal, &Reference::group(owner.id.as_str())),
        )
        .await
        .inspect_err(|err| tracing::error!(%principal, %owner, error = %err, "owner group membership lookup failed"))?;
        Ok(!memberships.is_empty())
    }

    async fn group_default_role(&self, group_id: &str, scope: RoleScope) -> AuthzResult<Option<String>> {
        let group = bounded(self.lookup_timeout, self.groups.find_group(group_id))
            .await
            .inspect_err(|err| tracing::error!(group = group_id, error = %err, "group default role lookup failed"))?;
        Ok(group.and_then(|group| group.role_for(scope).map(str::to_string)))
    }
}
