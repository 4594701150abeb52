pub mod decision;
pub mod membership;
pub mod permission;
pub mod role;
pub mod scope;

pub use decision::Decision;
pub use membership::{Group, HeldRole, HeldRoles, Membership, MembershipOrigin, Reference};
pub use permission::{PermissionAction, PermissionGrant, PermissionResourceType};
pub use role::{system_roles, Role, RoleKey, RoleRecord, SystemRole};
pub use scope::{ReferenceType, RoleScope};
