use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::authz::{MembershipResolver, PermissionEvaluator, PermissionRequest, Principal, ScopeRouter, UnionEvaluator};
use crate::config::EngineConfig;
use crate::errors::{AuthzError, AuthzResult};
use crate::events::AuditSink;
use crate::models::{
    Decision, HeldRoles, Membership, PermissionAction, PermissionGrant, PermissionResourceType, Reference,
    ReferenceType, Role, RoleKey, RoleScope,
};
use crate::store::{bounded, GroupStore, InMemoryDirectory, MembershipStore, OwnershipStore, RoleStore};

/// Answers "may this principal do these actions on this resource type of this
/// reference".
///
/// Stateless between calls: every check reads memberships and roles afresh
/// through the collaborators handed in at construction, so one engine can be
/// shared across tasks.
pub struct PermissionEngine {
    resolver: MembershipResolver,
    memberships: Arc<dyn MembershipStore>,
    roles: Arc<dyn RoleStore>,
    evaluator: Arc<dyn PermissionEvaluator>,
    router: Arc<ScopeRouter>,
    lookup_timeout: Option<Duration>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl PermissionEngine {
    pub fn builder() -> PermissionEngineBuilder {
        PermissionEngineBuilder::default()
    }

    pub fn router(&self) -> &ScopeRouter {
        &self.router
    }

    pub async fn resolve(&self, principal: &Principal, reference: &Reference) -> AuthzResult<HeldRoles> {
        self.resolver.resolve(principal, reference).await
    }

    pub async fn has_permission(
        &self,
        principal: &Principal,
        reference_type: ReferenceType,
        reference_id: &str,
        resource_type: PermissionResourceType,
        required: impl IntoIterator<Item = PermissionAction>,
    ) -> AuthzResult<bool> {
        let request = PermissionRequest::new(reference_type, reference_id, resource_type).requiring(required);
        self.decide(principal, &request).await.map(|decision| decision.granted)
    }

    pub async fn decide(&self, principal: &Principal, request: &PermissionRequest) -> AuthzResult<Decision> {
        let scope = self.router.scope_for(request.reference.reference_type)?;
        let held = self.resolver.resolve(principal, &request.reference).await?;
        let roles = self.load_roles(&held, scope).await?;

        let granted = self.evaluator.has_permission(
            &roles,
            &held,
            request.resource_type,
            request.required,
            scope,
        );

        let decision = Decision {
            granted,
            principal: principal.clone(),
            reference: request.reference.clone(),
            scope,
            resource_type: request.resource_type,
            required: request.required,
            held_roles: held
                .to_vec()
                .into_iter()
                .filter(|role| role.key.scope == scope)
                .collect(),
            evaluated_at: Utc::now(),
        };

        tracing::debug!(
            %principal,
            reference = %request.reference,
            scope = %scope,
            resource_type = %request.resource_type,
            required = %request.required,
            outcome = decision.outcome(),
            "permission decision"
        );

        if let Some(audit) = &self.audit {
            audit.record(&decision);
        }
        Ok(decision)
    }

    /// Union of grants per resource type the principal holds on the reference.
    pub async fn effective_grants(
        &self,
        principal: &Principal,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> AuthzResult<BTreeMap<PermissionResourceType, PermissionGrant>> {
        let reference = Reference::new(reference_type, reference_id);
        let scope = self.router.scope_for(reference_type)?;
        let held = self.resolver.resolve(principal, &reference).await?;
        let roles = self.load_roles(&held, scope).await?;

        let mut merged: BTreeMap<PermissionResourceType, PermissionGrant> = BTreeMap::new();
        for role in roles.values() {
            for (resource_type, grant) in role.permissions() {
                *merged.entry(*resource_type).or_default() |= *grant;
            }
        }
        Ok(merged)
    }

    /// Memberships on a reference in its natural scope, optionally for one role.
    pub async fn members_with_role(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
        role: Option<&str>,
    ) -> AuthzResult<Vec<Membership>> {
        let reference = Reference::new(reference_type, reference_id);
        let scope = self.router.scope_for(reference_type)?;
        let members = bounded(
            self.lookup_timeout,
            self.memberships.find_by_reference_and_role(&reference, scope, role),
        )
        .await
        .inspect_err(|err| tracing::error!(%reference, error = %err, "member lookup failed"))?;
        Ok(members)
    }

    async fn load_roles(&self, held: &HeldRoles, scope: RoleScope) -> AuthzResult<HashMap<RoleKey, Role>> {
        let mut roles = HashMap::new();
        for key in held.in_scope(scope) {
            let role = bounded(
                self.lookup_timeout,
                self.roles.find_role_by_scope_and_name(key.scope, &key.name),
            )
            .await
            .inspect_err(|err| tracing::error!(role = %key, error = %err, "role lookup failed"))?;

            match role {
                Some(role) => {
                    roles.insert(key.clone(), role);
                }
                None => tracing::warn!(role = %key, "membership references an unknown role"),
            }
        }
        Ok(roles)
    }
}

#[derive(Default)]
pub struct PermissionEngineBuilder {
    memberships: Option<Arc<dyn MembershipStore>>,
    ownership: Option<Arc<dyn OwnershipStore>>,
    groups: Option<Arc<dyn GroupStore>>,
    roles: Option<Arc<dyn RoleStore>>,
    evaluator: Option<Arc<dyn PermissionEvaluator>>,
    router: Option<ScopeRouter>,
    lookup_timeout: Option<Duration>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl PermissionEngineBuilder {
    pub fn memberships(mut self, store: Arc<dyn MembershipStore>) -> Self {
        self.memberships = Some(store);
        self
    }

    pub fn ownership(mut self, store: Arc<dyn OwnershipStore>) -> Self {
        self.ownership = Some(store);
        self
    }

    pub fn groups(mut self, store: Arc<dyn GroupStore>) -> Self {
        self.groups = Some(store);
        self
    }

    pub fn roles(mut self, store: Arc<dyn RoleStore>) -> Self {
        self.roles = Some(store);
        self
    }

    /// Uses one in-memory directory for every collaborator.
    pub fn directory(self, directory: Arc<InMemoryDirectory>) -> Self {
        self.memberships(directory.clone())
            .ownership(directory.clone())
            .groups(directory.clone())
            .roles(directory)
    }

    pub fn evaluator(mut self, evaluator: Arc<dyn PermissionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn router(mut self, router: ScopeRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn config(self, config: &EngineConfig) -> Self {
        self.lookup_timeout(config.lookup_timeout)
    }

    pub fn build(self) -> AuthzResult<PermissionEngine> {
        let memberships = self
            .memberships
            .ok_or_else(|| AuthzError::configuration("membership store not configured"))?;
        let ownership = self
            .ownership
            .ok_or_else(|| AuthzError::configuration("ownership store not configured"))?;
        let groups = self
            .groups
            .ok_or_else(|| AuthzError::configuration("group store not configured"))?;
        let roles = self
            .roles
            .ok_or_else(|| AuthzError::configuration("role store not configured"))?;
        let router = Arc::new(self.router.unwrap_or_default());

        let resolver = MembershipResolver::new(memberships.clone(), ownership, groups, router.clone())
            .with_lookup_timeout(self.lookup_timeout);

        Ok(PermissionEngine {
            resolver,
            memberships,
            roles,
            evaluator: self.evaluator.unwrap_or_else(|| Arc::new(UnionEvaluator::new())),
            router,
            lookup_timeout: self.lookup_timeout,
            audit: self.audit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MembershipOrigin, SystemRole};
    use crate::test_support::capture_errors;

    fn engine_with(directory: &Arc<InMemoryDirectory>) -> PermissionEngine {
        PermissionEngine::builder()
            .directory(directory.clone())
            .build()
            .expect("all collaborators set")
    }

    #[test]
    fn build_requires_collaborators() {
        let err = PermissionEngine::builder().build().err().expect("missing stores");
        assert!(matches!(err, AuthzError::Configuration(_)));
    }

    #[tokio::test]
    async fn decision_lists_only_roles_in_scope() {
        let directory = Arc::new(InMemoryDirectory::new());
        let user = Principal::user("u1");
        let app = Reference::application("app-1");
        directory.upsert_role(
            Role::new(RoleScope::Application, "USER").with_grant(PermissionResourceType::Definition, PermissionAction::Read.into()),
        );
        directory.add_membership(Membership::new(user.clone(), app.clone(), RoleScope::Application, "USER"));
        directory.add_membership(Membership::new(user.clone(), app.clone(), RoleScope::Api, "USER"));

        let request = PermissionRequest::new(ReferenceType::Application, "app-1", PermissionResourceType::Definition)
            .requiring([PermissionAction::Read]);
        let decision = engine_with(&directory).decide(&user, &request).await.expect("decides");

        assert!(decision.granted);
        assert_eq!(decision.scope, RoleScope::Application);
        assert_eq!(decision.held_roles.len(), 1);
        assert_eq!(decision.held_roles[0].origin, MembershipOrigin::Direct);
    }

    #[tokio::test]
    async fn effective_grants_merge_roles() {
        let directory = Arc::new(InMemoryDirectory::new());
        let user = Principal::user("u1");
        let api = Reference::api("api-1");
        directory.upsert_role(
            Role::from_codes(RoleScope::Api, "READER", [("PLAN", "R"), ("DEFINITION", "R")]).expect("valid"),
        );
        directory.upsert_role(Role::from_codes(RoleScope::Api, "PLANNER", [("PLAN", "CU")]).expect("valid"));
        directory.add_membership(Membership::new(user.clone(), api.clone(), RoleScope::Api, "READER"));
        directory.add_membership(Membership::new(user.clone(), api.clone(), RoleScope::Api, "PLANNER"));

        let grants = engine_with(&directory)
            .effective_grants(&user, ReferenceType::Api, "api-1")
            .await
            .expect("resolves");

        assert_eq!(grants[&PermissionResourceType::Plan].to_string(), "CRU");
        assert_eq!(grants[&PermissionResourceType::Definition].to_string(), "R");
        assert!(!grants.contains_key(&PermissionResourceType::Log));
    }

    #[tokio::test]
    async fn members_with_role_uses_natural_scope() {
        let directory = Arc::new(InMemoryDirectory::new());
        let api = Reference::api("api-1");
        let owner = SystemRole::PrimaryOwner.as_str();
        directory.add_membership(Membership::new(Principal::user("u1"), api.clone(), RoleScope::Api, owner));
        directory.add_membership(Membership::new(Principal::user("u2"), api.clone(), RoleScope::Api, "USER"));
        directory.add_membership(Membership::new(Principal::user("u3"), api.clone(), RoleScope::Application, owner));

        let engine = engine_with(&directory);
        let owners = engine
            .members_with_role(ReferenceType::Api, "api-1", Some(owner))
            .await
            .expect("online");
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].member, Principal::user("u1"));

        let everyone = engine
            .members_with_role(ReferenceType::Api, "api-1", None)
            .await
            .expect("online");
        assert_eq!(everyone.len(), 2);
    }

    #[tokio::test]
    async fn member_lookup_failure_is_logged_and_propagated() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.set_offline(true);
        let (logs, _guard) = capture_errors();

        let err = engine_with(&directory)
            .members_with_role(ReferenceType::Api, "api-1", None)
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert!(logs.contents().contains("member lookup failed"), "{}", logs.contents());
    }
}
