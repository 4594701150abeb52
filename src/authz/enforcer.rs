use std::sync::Arc;

use crate::authz::{AuthzMode, PermissionEngine, PermissionRequest, Principal};
use crate::errors::{describe_actions, AuthzError, AuthzResult};

/// Applies an [`AuthzMode`] on top of the engine's decisions.
#[derive(Clone)]
pub struct Enforcer {
    engine: Arc<PermissionEngine>,
    mode: AuthzMode,
}

impl Enforcer {
    pub fn new(engine: Arc<PermissionEngine>, mode: AuthzMode) -> Self {
        Self { engine, mode }
    }

    pub fn mode(&self) -> AuthzMode {
        self.mode
    }

    pub fn engine(&self) -> &PermissionEngine {
        &self.engine
    }

    /// `Ok(())` when the request may proceed.
    ///
    /// Off never consults the engine. Advisory evaluates and logs but always
    /// lets the request through. Strict turns a denial into
    /// [`AuthzError::Forbidden`] and propagates evaluation failures.
    pub async fn enforce(&self, principal: &Principal, request: &PermissionRequest) -> AuthzResult<()> {
        match self.mode {
            AuthzMode::Off => Ok(()),
            AuthzMode::Advisory => {
                match self.engine.decide(principal, request).await {
                    Ok(decision) if !decision.granted => tracing::warn!(
                        %principal,
                        reference = %request.reference,
                        resource_type = %request.resource_type,
                        required = %request.required,
                        "permission denied (advisory mode, allowing)"
                    ),
                    Ok(_) => {}
                    Err(err) => tracing::warn!(
                        %principal,
                        reference = %request.reference,
                        error = %err,
                        "permission check failed (advisory mode, allowing)"
                    ),
                }
                Ok(())
            }
            AuthzMode::Strict => {
                let decision = self.engine.decide(principal, request).await?;
                if decision.granted {
                    return Ok(());
                }

                tracing::info!(
                    %principal,
                    reference = %request.reference,
                    resource_type = %request.resource_type,
                    required = %request.required,
                    "permission denied"
                );
                Err(AuthzError::Forbidden {
                    reference_type: request.reference.reference_type,
                    reference_id: request.reference.id.clone(),
                    resource_type: request.resource_type,
                    actions: describe_actions(request.required.iter()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Membership, PermissionAction, PermissionResourceType, Reference, ReferenceType, Role, RoleScope,
    };
    use crate::store::InMemoryDirectory;

    fn setup() -> (Arc<InMemoryDirectory>, Arc<PermissionEngine>) {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.upsert_role(
            Role::new(RoleScope::Api, "USER").with_grant(PermissionResourceType::Plan, PermissionAction::Read.into()),
        );
        directory.add_membership(Membership::new(
            Principal::user("u1"),
            Reference::api("api-1"),
            RoleScope::Api,
            "USER",
        ));
        let engine = PermissionEngine::builder()
            .directory(directory.clone())
            .build()
            .expect("all collaborators set");
        (directory, Arc::new(engine))
    }

    fn plan_request(actions: &[PermissionAction]) -> PermissionRequest {
        PermissionRequest::new(ReferenceType::Api, "api-1", PermissionResourceType::Plan)
            .requiring(actions.iter().copied())
    }

    #[tokio::test]
    async fn strict_rejects_with_forbidden() {
        let (_, engine) = setup();
        let enforcer = Enforcer::new(engine, AuthzMode::Strict);
        let user = Principal::user("u1");

        enforcer
            .enforce(&user, &plan_request(&[PermissionAction::Read]))
            .await
            .expect("read allowed");

        let err = enforcer
            .enforce(&user, &plan_request(&[PermissionAction::Update, PermissionAction::Read]))
            .await
            .expect_err("update denied");
        assert_eq!(
            err,
            AuthzError::Forbidden {
                reference_type: ReferenceType::Api,
                reference_id: "api-1".into(),
                resource_type: PermissionResourceType::Plan,
                actions: "RU".into(),
            }
        );
    }

    #[tokio::test]
    async fn advisory_allows_denials_and_outages() {
        let (directory, engine) = setup();
        let enforcer = Enforcer::new(engine, AuthzMode::Advisory);
        let stranger = Principal::user("u2");

        enforcer
            .enforce(&stranger, &plan_request(&[PermissionAction::Delete]))
            .await
            .expect("advisory allows");

        directory.set_offline(true);
        enforcer
            .enforce(&stranger, &plan_request(&[PermissionAction::Read]))
            .await
            .expect("advisory allows on outage");
    }

    #[tokio::test]
    async fn strict_propagates_outages() {
        let (directory, engine) = setup();
        directory.set_offline(true);
        let err = Enforcer::new(engine, AuthzMode::Strict)
            .enforce(&Principal::user("u1"), &plan_request(&[PermissionAction::Read]))
            .await
            .expect_err("outage is not a grant");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn off_skips_evaluation() {
        let (directory, engine) = setup();
        directory.set_offline(true);
        Enforcer::new(engine, AuthzMode::Off)
            .enforce(&Principal::user("u2"), &plan_request(&[PermissionAction::Delete]))
            .await
            .expect("off allows everything");
    }
}
