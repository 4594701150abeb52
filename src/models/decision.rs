use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::authz::Principal;
use crate::models::{HeldRole, PermissionGrant, PermissionResourceType, Reference, RoleScope};

/// Outcome of one permission check. Never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub granted: bool,
    pub principal: Principal,
    pub reference: Reference,
    pub scope: RoleScope,
    pub resource_type: PermissionResourceType,
    pub required: PermissionGrant,
    /// Roles held in `scope` that were consulted.
    pub held_roles: Vec<HeldRole>,
    pub evaluated_at: DateTime<Utc>,
}

impl Decision {
    pub fn outcome(&self) -> &'static str {
        if self.granted {
            "granted"
        } else {
            "denied"
        }
    }
}
