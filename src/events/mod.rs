//! Decision events handed to the audit collaborator.
//!
//! The engine only publishes; storing, chaining or shipping audit records is
//! up to whoever listens on the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod loggable;
pub use loggable::{Loggable, Severity};

use crate::models::Decision;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<T> {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<String>,
    pub subject_id: Option<String>,
    pub severity: Severity,
    pub payload: T,
}

impl<T: Loggable> DomainEvent<T> {
    /// Wraps `entity` as the event `"<entity_type>.<action>"`.
    pub fn from_entity(action: &str, entity: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: format!("{}.{}", T::entity_type(), action),
            occurred_at: Utc::now(),
            actor_id: entity.actor_id(),
            subject_id: Some(entity.subject_id()),
            severity: entity.severity_for_action(action),
            payload: entity,
        }
    }
}

pub type DecisionEvent = DomainEvent<Decision>;

/// Receives every decision the engine makes. Must not block.
pub trait AuditSink: Send + Sync {
    fn record(&self, decision: &Decision);
}

pub type EventBus = broadcast::Sender<Value>;

pub fn init_event_bus(capacity: usize) -> (EventBus, broadcast::Receiver<Value>) {
    broadcast::channel(capacity.max(1))
}

/// Publishes decisions as JSON on a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastAuditSink {
    bus: EventBus,
}

impl BroadcastAuditSink {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.bus.subscribe()
    }
}

impl AuditSink for BroadcastAuditSink {
    fn record(&self, decision: &Decision) {
        let event = DomainEvent::from_entity(decision.outcome(), decision.clone());
        match serde_json::to_value(&event) {
            // Fire and forget: no subscriber is not an error
            Ok(value) => {
                let _ = self.bus.send(value);
            }
            Err(err) => tracing::warn!(error = %err, "failed to serialize decision event"),
        }
    }
}

/// Drains the bus into the tracing log until every sender is gone.
pub async fn start_audit_listener(mut rx: broadcast::Receiver<Value>) {
    tracing::info!("audit listener started");
    loop {
        match rx.recv().await {
            Ok(event) => {
                let name = event.get("name").and_then(Value::as_str).unwrap_or("unknown");
                let severity = event.get("severity").and_then(Value::as_str).unwrap_or("important");
                let actor = event.get("actor_id").and_then(Value::as_str).unwrap_or("-");
                let subject = event.get("subject_id").and_then(Value::as_str).unwrap_or("-");
                tracing::info!(target: "audit", event = name, severity, actor, subject, "decision");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "audit listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::info!("audit listener stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Principal;
    use crate::models::{PermissionAction, PermissionGrant, PermissionResourceType, Reference, RoleScope};

    fn decision(granted: bool, required: PermissionGrant) -> Decision {
        Decision {
            granted,
            principal: Principal::user("u1"),
            reference: Reference::application("app-1"),
            scope: RoleScope::Application,
            resource_type: PermissionResourceType::Documentation,
            required,
            held_roles: Vec::new(),
            evaluated_at: Utc::now(),
        }
    }

    #[test]
    fn event_name_and_severity_follow_outcome() {
        let granted = DomainEvent::from_entity("granted", decision(true, PermissionAction::Read.into()));
        assert_eq!(granted.name, "permission.granted");
        assert_eq!(granted.severity, Severity::Noise);
        assert_eq!(granted.subject_id.as_deref(), Some("APPLICATION:app-1"));
        assert_eq!(granted.actor_id.as_deref(), Some("user:u1"));

        let denied = DomainEvent::from_entity("denied", decision(false, PermissionAction::Update.into()));
        assert_eq!(denied.severity, Severity::Important);

        let destructive = DomainEvent::from_entity("denied", decision(false, PermissionAction::Delete.into()));
        assert_eq!(destructive.severity, Severity::Critical);
    }

    #[tokio::test]
    async fn broadcast_sink_publishes_json() {
        let (bus, mut rx) = init_event_bus(8);
        let sink = BroadcastAuditSink::new(bus);

        sink.record(&decision(false, PermissionAction::Update.into()));

        let event = rx.recv().await.expect("event published");
        assert_eq!(event["name"], "permission.denied");
        assert_eq!(event["payload"]["required"], "U");
        assert_eq!(event["severity"], "important");
    }

    #[test]
    fn recording_without_subscribers_is_harmless() {
        let (bus, rx) = init_event_bus(1);
        drop(rx);
        BroadcastAuditSink::new(bus).record(&decision(true, PermissionGrant::empty()));
    }
}
