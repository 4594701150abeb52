//! Authorization module - permission engine and enforcement
//!
//! This module implements role-based permission evaluation with support for:
//! - Compact CRUD grant encoding per resource type
//! - Memberships resolved from explicit records, primary ownership and groups
//! - Union-of-grants evaluation, isolated per scope
//! - Configurable enforcement modes (off/advisory/strict)

pub mod codec;
mod engine;
mod enforcer;
mod evaluator;
mod principal;
mod resolver;
mod router;

pub use engine::{PermissionEngine, PermissionEngineBuilder};
pub use enforcer::Enforcer;
pub use evaluator::{PermissionEvaluator, UnionEvaluator};
pub use principal::{MemberType, Principal, PermissionRequest};
pub use resolver::MembershipResolver;
pub use router::{Route, ScopeRouter};

use std::str::FromStr;

use crate::errors::AuthzError;

/// Authorization enforcement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzMode {
    /// No permission checks (development mode)
    Off,
    /// Log denials but allow requests (testing mode)
    Advisory,
    /// Reject denied requests (production mode)
    Strict,
}

impl FromStr for AuthzMode {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(AuthzMode::Off),
            "advisory" => Ok(AuthzMode::Advisory),
            "strict" => Ok(AuthzMode::Strict),
            other => Err(AuthzError::configuration(format!(
                "AUTHZ_MODE must be off, advisory or strict, got {other:?}"
            ))),
        }
    }
}
