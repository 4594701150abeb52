use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AuthzError;

/// Namespace within which role names are unique and checks are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleScope {
    Organization,
    Environment,
    Portal,
    Api,
    Application,
    Group,
    Integration,
}

impl RoleScope {
    pub const ALL: [RoleScope; 7] = [
        RoleScope::Organization,
        RoleScope::Environment,
        RoleScope::Portal,
        RoleScope::Api,
        RoleScope::Application,
        RoleScope::Group,
        RoleScope::Integration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoleScope::Organization => "ORGANIZATION",
            RoleScope::Environment => "ENVIRONMENT",
            RoleScope::Portal => "PORTAL",
            RoleScope::Api => "API",
            RoleScope::Application => "APPLICATION",
            RoleScope::Group => "GROUP",
            RoleScope::Integration => "INTEGRATION",
        }
    }
}

impl fmt::Display for RoleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleScope {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AuthzError::UnknownRoleScope(s.to_string()))
    }
}

/// Kind of entity a membership points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Organization,
    Environment,
    Portal,
    Api,
    Application,
    Group,
    Integration,
}

impl ReferenceType {
    pub const ALL: [ReferenceType; 7] = [
        ReferenceType::Organization,
        ReferenceType::Environment,
        ReferenceType::Portal,
        ReferenceType::Api,
        ReferenceType::Application,
        ReferenceType::Group,
        ReferenceType::Integration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceType::Organization => "ORGANIZATION",
            ReferenceType::Environment => "ENVIRONMENT",
            ReferenceType::Portal => "PORTAL",
            ReferenceType::Api => "API",
            ReferenceType::Application => "APPLICATION",
            ReferenceType::Group => "GROUP",
            ReferenceType::Integration => "INTEGRATION",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AuthzError::UnknownReferenceType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_type_parsing_is_case_insensitive() {
        assert_eq!("application".parse::<ReferenceType>(), Ok(ReferenceType::Application));
        assert_eq!("API".parse::<ReferenceType>(), Ok(ReferenceType::Api));
    }

    #[test]
    fn unknown_reference_type_fails() {
        assert_eq!(
            "PAGE".parse::<ReferenceType>(),
            Err(AuthzError::UnknownReferenceType("PAGE".into()))
        );
        assert_eq!(
            "".parse::<RoleScope>(),
            Err(AuthzError::UnknownRoleScope(String::new()))
        );
    }
}
