//! Grant codec.
//!
//! Two encodings exist for the same set of actions:
//! - the code string administrators see, e.g. `"CRUD"` or `"RU"`, always
//!   emitted in CREATE, READ, UPDATE, DELETE order;
//! - the packed integer roles are persisted as, `base(resource type) + bits`
//!   with CREATE=8, READ=4, UPDATE=2, DELETE=1.

use crate::errors::{AuthzError, AuthzResult};
use crate::models::{PermissionAction, PermissionGrant, PermissionResourceType};

/// Canonical code string for a set of actions. Input order and duplicates do
/// not matter.
pub fn encode(actions: impl IntoIterator<Item = PermissionAction>) -> String {
    let grant: PermissionGrant = actions.into_iter().collect();
    grant
        .iter()
        .map(PermissionAction::code)
        .collect()
}

/// Parses a code string. Codes are case-sensitive; a repeated code is
/// accepted and collapses.
pub fn decode(code: &str) -> AuthzResult<PermissionGrant> {
    code.chars().try_fold(PermissionGrant::empty(), |grant, c| {
        PermissionAction::from_code(c)
            .map(|action| grant.with(action))
            .ok_or_else(|| AuthzError::invalid_grant(code, c))
    })
}

impl PermissionGrant {
    pub fn pack(self, resource_type: PermissionResourceType) -> i64 {
        resource_type.mask_base() + i64::from(self.bits())
    }

    pub fn unpack(value: i64) -> AuthzResult<(PermissionResourceType, PermissionGrant)> {
        let bits = value.rem_euclid(100);
        let resource_type = value
            .checked_sub(bits)
            .and_then(PermissionResourceType::from_mask_base)
            .ok_or(AuthzError::InvalidGrantMask(value))?;
        let grant = u8::try_from(bits)
            .ok()
            .and_then(PermissionGrant::from_bits)
            .ok_or(AuthzError::InvalidGrantMask(value))?;
        Ok((resource_type, grant))
    }
}
