use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use async_trait::async_trait;

use crate::authz::Principal;
use crate::errors::StoreError;
use crate::models::{Group, Membership, Reference, Role, RoleKey, RoleScope};
use crate::store::{GroupStore, MembershipStore, OwnershipStore, RoleStore};

#[derive(Debug, Default)]
struct DirectoryState {
    memberships: Vec<Membership>,
    owners: HashMap<Reference, Principal>,
    reference_groups: HashMap<Reference, BTreeSet<String>>,
    groups: HashMap<String, Group>,
    roles: HashMap<RoleKey, Role>,
}

/// In-process implementation of every collaborator store.
///
/// `set_offline(true)` makes every lookup fail, which is how tests exercise
/// the engine's behaviour on storage outages.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
    offline: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn add_membership(&self, membership: Membership) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.memberships.contains(&membership) {
            state.memberships.push(membership);
        }
    }

    pub fn remove_membership(&self, membership: &Membership) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.memberships.retain(|existing| existing != membership);
    }

    pub fn set_primary_owner(&self, reference: Reference, owner: Principal) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.owners.insert(reference, owner);
    }

    pub fn attach_group(&self, reference: Reference, group_id: impl Into<String>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state
            .reference_groups
            .entry(reference)
            .or_default()
            .insert(group_id.into());
    }

    pub fn upsert_group(&self, group: Group) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.groups.insert(group.id.clone(), group);
    }

    /// Replaces any role with the same scope and name.
    pub fn upsert_role(&self, role: Role) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.roles.insert(role.key(), role);
    }

    pub fn remove_role(&self, key: &RoleKey) -> Option<Role> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.roles.remove(key)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DirectoryState>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("directory offline"));
        }
        self.state
            .read()
            .map_err(|_| StoreError::unavailable("directory lock poisoned"))
    }
}

#[async_trait]
impl MembershipStore for InMemoryDirectory {
    async fn find_by_member_and_reference(
        &self,
        member: &Principal,
        reference: &Reference,
    ) -> Result<Vec<Membership>, StoreError> {
        let state = self.read()?;
        Ok(state
            .memberships
            .iter()
            .filter(|m| &m.member == member && &m.reference == reference)
            .cloned()
            .collect())
    }

    async fn find_by_reference_and_role(
        &self,
        reference: &Reference,
        scope: RoleScope,
        role: Option<&str>,
    ) -> Result<Vec<Membership>, StoreError> {
        let state = self.read()?;
        Ok(state
            .memberships
            .iter()
            .filter(|m| &m.reference == reference && m.scope == scope)
            .filter(|m| role.map_or(true, |role| m.role == role))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OwnershipStore for InMemoryDirectory {
    async fn primary_owner_of(&self, reference: &Reference) -> Result<Option<Principal>, StoreError> {
        Ok(self.read()?.owners.get(reference).cloned())
    }

    async fn groups_of(&self, reference: &Reference) -> Result<Vec<String>, StoreError> {
        Ok(self
            .read()?
            .reference_groups
            .get(reference)
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl GroupStore for InMemoryDirectory {
    async fn find_group(&self, id: &str) -> Result<Option<Group>, StoreError> {
        Ok(self.read()?.groups.get(id).cloned())
    }
}

#[async_trait]
impl RoleStore for InMemoryDirectory {
    async fn find_role_by_scope_and_name(
        &self,
        scope: RoleScope,
        name: &str,
    ) -> Result<Option<Role>, StoreError> {
        Ok(self.read()?.roles.get(&RoleKey::new(scope, name)).cloned())
    }
}
