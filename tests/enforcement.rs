use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use console_authz::events::{init_event_bus, BroadcastAuditSink};
use console_authz::models::{Membership, PermissionAction, PermissionResourceType, Reference, ReferenceType, Role, RoleScope};
use console_authz::store::InMemoryDirectory;
use console_authz::{AuthzError, AuthzMode, EngineConfig, Enforcer, PermissionEngine, PermissionRequest, Principal};

fn directory() -> Result<Arc<InMemoryDirectory>> {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.upsert_role(Role::from_codes(RoleScope::Api, "USER", [("PLAN", "R")])?);
    directory.add_membership(Membership::new(
        Principal::user("u1"),
        Reference::api("api-1"),
        RoleScope::Api,
        "USER",
    ));
    Ok(directory)
}

#[tokio::test]
async fn decisions_are_published_to_the_audit_bus() -> Result<()> {
    let (bus, mut rx) = init_event_bus(16);
    let engine = PermissionEngine::builder()
        .directory(directory()?)
        .audit_sink(Arc::new(BroadcastAuditSink::new(bus)))
        .build()?;
    let enforcer = Enforcer::new(Arc::new(engine), AuthzMode::Strict);
    let user = Principal::user("u1");

    let read = PermissionRequest::new(ReferenceType::Api, "api-1", PermissionResourceType::Plan)
        .requiring([PermissionAction::Read]);
    enforcer.enforce(&user, &read).await?;

    let delete = PermissionRequest::new(ReferenceType::Api, "api-1", PermissionResourceType::Plan)
        .requiring([PermissionAction::Delete]);
    let err = enforcer.enforce(&user, &delete).await.expect_err("delete denied");
    assert!(matches!(err, AuthzError::Forbidden { .. }));

    let granted = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await??;
    assert_eq!(granted["name"], "permission.granted");
    assert_eq!(granted["severity"], "noise");
    assert_eq!(granted["payload"]["reference"]["id"], "api-1");

    let denied = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await??;
    assert_eq!(denied["name"], "permission.denied");
    assert_eq!(denied["severity"], "critical");
    assert_eq!(denied["actor_id"], "user:u1");
    assert_eq!(denied["payload"]["required"], "D");
    Ok(())
}

#[tokio::test]
async fn off_mode_never_reaches_the_engine() -> Result<()> {
    let (bus, mut rx) = init_event_bus(4);
    let engine = PermissionEngine::builder()
        .directory(directory()?)
        .audit_sink(Arc::new(BroadcastAuditSink::new(bus)))
        .build()?;
    let enforcer = Enforcer::new(Arc::new(engine), AuthzMode::Off);

    let request = PermissionRequest::new(ReferenceType::Api, "api-1", PermissionResourceType::Plan)
        .requiring([PermissionAction::Delete]);
    enforcer.enforce(&Principal::user("stranger"), &request).await?;

    assert!(rx.try_recv().is_err(), "no decision should have been made");
    Ok(())
}

#[tokio::test]
async fn mode_and_timeout_come_from_config() -> Result<()> {
    let config = EngineConfig::from_lookup(|key| match key {
        "AUTHZ_MODE" => Some("advisory".to_string()),
        "AUTHZ_LOOKUP_TIMEOUT_MS" => Some("50".to_string()),
        _ => None,
    })?;
    let directory = directory()?;
    let engine = PermissionEngine::builder()
        .directory(directory.clone())
        .config(&config)
        .build()?;
    let enforcer = Enforcer::new(Arc::new(engine), config.mode);
    assert_eq!(enforcer.mode(), AuthzMode::Advisory);

    directory.set_offline(true);
    let request = PermissionRequest::new(ReferenceType::Api, "api-1", PermissionResourceType::Plan)
        .requiring([PermissionAction::Update]);
    enforcer.enforce(&Principal::user("u1"), &request).await?;

    let strict = Enforcer::new(Arc::new(PermissionEngine::builder().directory(directory).build()?), AuthzMode::Strict);
    let err = strict
        .enforce(&Principal::user("u1"), &request)
        .await
        .expect_err("strict never allows on outage");
    assert!(matches!(err, AuthzError::EvaluationUnavailable(_)));
    Ok(())
}
