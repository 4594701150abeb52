//! Collaborator interfaces the permission engine reads from.
//!
//! The engine owns none of this data. Service-layer code hands in
//! implementations at construction; [`InMemoryDirectory`] and [`RoleCatalog`]
//! are the in-process ones.

mod catalog;
mod fixture;
mod memory;

pub use catalog::RoleCatalog;
pub use fixture::{DirectoryFixture, PrimaryOwnerRecord, ReferenceGroupsRecord};
pub use memory::InMemoryDirectory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::authz::Principal;
use crate::errors::StoreError;
use crate::models::{Group, Membership, Reference, Role, RoleScope};

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// All memberships `member` holds on `reference`, in any scope.
    async fn find_by_member_and_reference(
        &self,
        member: &Principal,
        reference: &Reference,
    ) -> Result<Vec<Membership>, StoreError>;

    /// Memberships on `reference` in `scope`, optionally narrowed to one role.
    async fn find_by_reference_and_role(
        &self,
        reference: &Reference,
        scope: RoleScope,
        role: Option<&str>,
    ) -> Result<Vec<Membership>, StoreError>;
}

#[async_trait]
pub trait OwnershipStore: Send + Sync {
    async fn primary_owner_of(&self, reference: &Reference) -> Result<Option<Principal>, StoreError>;

    /// Ids of the groups attached to `reference`.
    async fn groups_of(&self, reference: &Reference) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn find_group(&self, id: &str) -> Result<Option<Group>, StoreError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_role_by_scope_and_name(
        &self,
        scope: RoleScope,
        name: &str,
    ) -> Result<Option<Role>, StoreError>;
}

/// Runs a collaborator lookup, failing with [`StoreError::Timeout`] once
/// `limit` elapses.
pub(crate) async fn bounded<T, F>(limit: Option<Duration>, lookup: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, lookup)
            .await
            .map_err(|_| StoreError::Timeout)?,
        None => lookup.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_lookup_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, StoreError>(1)
        };
        let result = bounded(Some(Duration::from_millis(10)), slow).await;
        assert_eq!(result, Err(StoreError::Timeout));
    }

    #[tokio::test]
    async fn unbounded_lookup_passes_through() {
        let result = bounded(None, async { Err::<(), _>(StoreError::unavailable("down")) }).await;
        assert_eq!(result, Err(StoreError::unavailable("down")));
    }
}
