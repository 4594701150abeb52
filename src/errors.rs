use crate::models::{PermissionAction, PermissionResourceType, ReferenceType, RoleScope};

pub type AuthzResult<T> = Result<T, AuthzError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("invalid grant encoding {code:?}: unrecognized action code {found:?}")]
    InvalidGrantEncoding { code: String, found: char },
    #[error("invalid packed grant: {0}")]
    InvalidGrantMask(i64),
    #[error("unknown permission resource type: {0}")]
    UnknownResourceType(String),
    #[error("unknown reference type: {0}")]
    UnknownReferenceType(String),
    #[error("unknown role scope: {0}")]
    UnknownRoleScope(String),
    #[error("permission evaluation unavailable: {0}")]
    EvaluationUnavailable(String),
    #[error("forbidden: {resource_type} {actions} on {reference_type}:{reference_id}")]
    Forbidden {
        reference_type: ReferenceType,
        reference_id: String,
        resource_type: PermissionResourceType,
        actions: String,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("fixture error: {0}")]
    Fixture(String),
}

impl AuthzError {
    pub fn invalid_grant(code: impl Into<String>, found: char) -> Self {
        Self::InvalidGrantEncoding {
            code: code.into(),
            found,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::EvaluationUnavailable(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture(message.into())
    }

    /// True for faults a caller may retry; everything else is malformed data or a bug.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthzError::EvaluationUnavailable(_))
    }
}

/// Failure reported by a collaborator store.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store lookup timed out")]
    Timeout,
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

impl From<StoreError> for AuthzError {
    fn from(value: StoreError) -> Self {
        Self::EvaluationUnavailable(value.to_string())
    }
}

pub(crate) fn describe_actions(actions: impl IntoIterator<Item = PermissionAction>) -> String {
    actions.into_iter().map(PermissionAction::code).collect()
}
