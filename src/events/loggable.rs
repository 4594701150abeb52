use serde::{Deserialize, Serialize};

use crate::models::{Decision, PermissionAction};

/// Severity levels for audit events.
/// Lets the audit collaborator pick retention and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Denied destructive requests
    Critical,
    /// Other denials (default)
    #[default]
    Important,
    /// Routine grants
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

/// Something that can be published on the audit bus.
pub trait Loggable: Serialize + Send + Sync {
    /// Prefix of event names, e.g. "permission" in "permission.denied"
    fn entity_type() -> &'static str;

    /// Identifier of what the event is about
    fn subject_id(&self) -> String;

    /// Identifier of who acted, if anyone
    fn actor_id(&self) -> Option<String> {
        None
    }

    fn severity(&self) -> Severity {
        Severity::Important
    }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "granted" => Severity::Noise,
            _ => self.severity(),
        }
    }
}

impl Loggable for Decision {
    fn entity_type() -> &'static str {
        "permission"
    }

    fn subject_id(&self) -> String {
        self.reference.to_string()
    }

    fn actor_id(&self) -> Option<String> {
        Some(self.principal.to_string())
    }

    fn severity(&self) -> Severity {
        if self.required.contains(PermissionAction::Delete) {
            Severity::Critical
        } else {
            Severity::Important
        }
    }
}
