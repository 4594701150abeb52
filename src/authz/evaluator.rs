use std::collections::HashMap;

use crate::models::{HeldRoles, PermissionGrant, PermissionResourceType, Role, RoleKey, RoleScope};

/// Evaluator trait for pluggable combination logic
pub trait PermissionEvaluator: Send + Sync {
    /// Check whether the held roles cover `required` on `resource_type` in `scope`
    fn has_permission(
        &self,
        roles: &HashMap<RoleKey, Role>,
        held: &HeldRoles,
        resource_type: PermissionResourceType,
        required: PermissionGrant,
        scope: RoleScope,
    ) -> bool;
}

/// Default evaluator: union of grants across every role held in the scope
///
/// Evaluation order:
/// 1. nothing required -> allow
/// 2. union grants of held roles in `scope` (missing roles contribute nothing)
/// 3. allow iff the union covers every required action
#[derive(Debug, Clone, Copy, Default)]
pub struct UnionEvaluator;

impl UnionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Union of the grants `held` yields for `resource_type` in `scope`.
    pub fn granted(
        roles: &HashMap<RoleKey, Role>,
        held: &HeldRoles,
        resource_type: PermissionResourceType,
        scope: RoleScope,
    ) -> PermissionGrant {
        held.in_scope(scope)
            .filter_map(|key| roles.get(key))
            .filter(|role| role.scope() == scope)
            .fold(PermissionGrant::empty(), |granted, role| {
                granted | role.grant_for(resource_type)
            })
    }
}

impl PermissionEvaluator for UnionEvaluator {
    fn has_permission(
        &self,
        roles: &HashMap<RoleKey, Role>,
        held: &HeldRoles,
        resource_type: PermissionResourceType,
        required: PermissionGrant,
        scope: RoleScope,
    ) -> bool {
        if required.is_empty() {
            return true;
        }

        let granted = Self::granted(roles, held, resource_type, scope);
        let allowed = granted.covers(required);

        tracing::debug!(
            scope = %scope,
            resource_type = %resource_type,
            required = %required,
            granted = %granted,
            allowed,
            "grants evaluated"
        );
        allowed
    }
}
