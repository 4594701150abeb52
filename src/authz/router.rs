use std::collections::HashMap;

use crate::errors::{AuthzError, AuthzResult};
use crate::models::{ReferenceType, RoleScope, SystemRole};

/// How checks against one kind of reference are evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Scope whose roles decide checks on the reference.
    pub scope: RoleScope,
    /// Role synthesized for the reference's primary owner, if the kind has one.
    pub owner_role: Option<String>,
}

impl Route {
    pub fn new(scope: RoleScope) -> Self {
        Self {
            scope,
            owner_role: None,
        }
    }

    #[must_use]
    pub fn owned_by(mut self, role: impl Into<String>) -> Self {
        self.owner_role = Some(role.into());
        self
    }
}

/// Maps a reference kind to the scope consulted for it.
///
/// Adding a new kind of entity only needs a route here; ownership synthesis
/// and group inheritance pick it up from the route.
#[derive(Debug, Clone)]
pub struct ScopeRouter {
    routes: HashMap<ReferenceType, Route>,
}

impl Default for ScopeRouter {
    fn default() -> Self {
        let owner = SystemRole::PrimaryOwner.as_str();
        Self::empty()
            .with_route(ReferenceType::Organization, Route::new(RoleScope::Organization))
            .with_route(ReferenceType::Environment, Route::new(RoleScope::Environment))
            .with_route(ReferenceType::Portal, Route::new(RoleScope::Portal))
            .with_route(ReferenceType::Api, Route::new(RoleScope::Api).owned_by(owner))
            .with_route(
                ReferenceType::Application,
                Route::new(RoleScope::Application).owned_by(owner),
            )
            .with_route(ReferenceType::Group, Route::new(RoleScope::Group))
            .with_route(
                ReferenceType::Integration,
                Route::new(RoleScope::Integration).owned_by(owner),
            )
    }
}

impl ScopeRouter {
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_route(mut self, reference_type: ReferenceType, route: Route) -> Self {
        self.routes.insert(reference_type, route);
        self
    }

    pub fn route(&self, reference_type: ReferenceType) -> AuthzResult<&Route> {
        self.routes
            .get(&reference_type)
            .ok_or_else(|| AuthzError::UnknownReferenceType(reference_type.to_string()))
    }

    pub fn scope_for(&self, reference_type: ReferenceType) -> AuthzResult<RoleScope> {
        self.route(reference_type).map(|route| route.scope)
    }

    /// Parses a reference kind coming from a collaborator and routes it.
    pub fn scope_for_name(&self, reference_type: &str) -> AuthzResult<RoleScope> {
        self.scope_for(reference_type.parse()?)
    }

    pub fn owner_role_for(&self, reference_type: ReferenceType) -> AuthzResult<Option<&str>> {
        self.route(reference_type)
            .map(|route| route.owner_role.as_deref())
    }
}
