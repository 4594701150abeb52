use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{AuthzError, AuthzResult, StoreError};
use crate::models::{system_roles, Role, RoleKey, RoleScope};
use crate::store::RoleStore;

/// Immutable snapshot of roles, cheap to clone and share between evaluations.
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    roles: Arc<HashMap<RoleKey, Role>>,
}

impl RoleCatalog {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> AuthzResult<Self> {
        let mut by_key = HashMap::new();
        for role in roles {
            let key = role.key();
            if by_key.contains_key(&key) {
                return Err(AuthzError::configuration(format!("duplicate role {key}")));
            }
            by_key.insert(key, role);
        }
        Ok(Self {
            roles: Arc::new(by_key),
        })
    }

    /// Built-in roles plus `custom`. Custom roles may not reuse a built-in key.
    pub fn with_system_roles(custom: impl IntoIterator<Item = Role>) -> AuthzResult<Self> {
        Self::new(system_roles().into_iter().chain(custom))
    }

    pub fn get(&self, key: &RoleKey) -> Option<&Role> {
        self.roles.get(key)
    }

    pub fn in_scope(&self, scope: RoleScope) -> impl Iterator<Item = &Role> {
        self.roles.values().filter(move |role| role.scope() == scope)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[async_trait]
impl RoleStore for RoleCatalog {
    async fn find_role_by_scope_and_name(
        &self,
        scope: RoleScope,
        name: &str,
    ) -> Result<Option<Role>, StoreError> {
        Ok(self.get(&RoleKey::new(scope, name)).cloned())
    }
}
