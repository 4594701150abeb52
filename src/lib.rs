pub mod authz;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export commonly used items for tests
pub use authz::{AuthzMode, Enforcer, PermissionEngine, PermissionRequest, Principal};
pub use config::EngineConfig;
pub use errors::{AuthzError, AuthzResult};
