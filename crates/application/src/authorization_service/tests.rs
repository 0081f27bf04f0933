use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use clearance_core::{AppError, AppResult};
use clearance_domain::{Action, Claims, Permission, PermissionId, Role, RoleId, UserId};

use super::{AuthorizationService, GuardMode, RoleRepository, Subject};

struct FakeRoleRepository {
    roles: HashMap<UserId, Vec<Role>>,
}

#[async_trait]
impl RoleRepository for FakeRoleRepository {
    async fn list_roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        Ok(self.roles.get(&user_id).cloned().unwrap_or_default())
    }
}

struct FlakyRoleRepository {
    attempts: AtomicUsize,
    roles: Vec<Role>,
}

#[async_trait]
impl RoleRepository for FlakyRoleRepository {
    async fn list_roles_for_user(&self, _user_id: UserId) -> AppResult<Vec<Role>> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(AppError::Storage("connection reset".to_owned()));
        }
        Ok(self.roles.clone())
    }
}

struct BrokenRoleRepository;

#[async_trait]
impl RoleRepository for BrokenRoleRepository {
    async fn list_roles_for_user(&self, _user_id: UserId) -> AppResult<Vec<Role>> {
        Err(AppError::Storage("database unavailable".to_owned()))
    }
}

fn permission(resource: &str, action: Action) -> Permission {
    Permission::new(PermissionId::new(), resource, action, "", "")
        .unwrap_or_else(|_| unreachable!())
}

fn role(name: &str, level: i32, permissions: Vec<Permission>) -> Role {
    Role {
        id: RoleId::new(),
        name: name.to_owned(),
        description: String::new(),
        level,
        is_system_role: false,
        permissions,
    }
}

fn service_for(user_id: UserId, roles: Vec<Role>) -> AuthorizationService {
    AuthorizationService::new(Arc::new(FakeRoleRepository {
        roles: HashMap::from([(user_id, roles)]),
    }))
}

#[tokio::test]
async fn editor_role_grants_its_explicit_permissions() {
    let user_id = UserId::new();
    let editor = role(
        "Editor",
        50,
        vec![
            permission("document", Action::Read),
            permission("document", Action::Update),
        ],
    );
    let service = service_for(user_id, vec![editor]);
    let subject = Subject::without_claims(user_id);

    let decision = service
        .check_permission(&subject, "document", &Action::Update)
        .await;
    assert!(decision.is_ok());
    assert!(decision.unwrap_or_else(|_| unreachable!()).allowed);
}

#[tokio::test]
async fn denial_names_the_missing_permission() {
    let user_id = UserId::new();
    let editor = role(
        "Editor",
        50,
        vec![
            permission("document", Action::Read),
            permission("document", Action::Update),
        ],
    );
    let service = service_for(user_id, vec![editor]);
    let subject = Subject::without_claims(user_id);

    let decision = service
        .check_permission(&subject, "document", &Action::Delete)
        .await;
    assert!(decision.is_ok());
    let decision = decision.unwrap_or_else(|_| unreachable!());
    assert!(!decision.allowed);
    assert_eq!(decision.reason.as_deref(), Some("Permission denied"));
    assert_eq!(
        decision.required_permission.as_deref(),
        Some("document:delete")
    );
}

#[tokio::test]
async fn high_level_role_bypasses_any_check() {
    let user_id = UserId::new();
    let service = service_for(user_id, vec![role("SuperAdmin", 95, Vec::new())]);
    let subject = Subject::without_claims(user_id);

    let decision = service
        .check_permission(&subject, "reports", &Action::Delete)
        .await;
    assert!(decision.is_ok());
    assert!(decision.unwrap_or_else(|_| unreachable!()).allowed);
}

#[tokio::test]
async fn bypass_covers_resources_outside_the_catalog() {
    let user_id = UserId::new();
    let service = service_for(user_id, vec![role("SuperAdmin", 90, Vec::new())]);
    let subject = Subject::without_claims(user_id);

    let decision = service
        .check_permission(
            &subject,
            "nonexistent",
            &Action::Custom("purge".to_owned()),
        )
        .await;
    assert!(decision.is_ok());
    assert!(decision.unwrap_or_else(|_| unreachable!()).allowed);
}

#[tokio::test]
async fn manage_implies_every_action_on_the_resource() {
    let user_id = UserId::new();
    let service = service_for(
        user_id,
        vec![role("Ops", 10, vec![permission("reports", Action::Manage)])],
    );
    let subject = Subject::without_claims(user_id);

    for action in [
        Action::Read,
        Action::Delete,
        Action::Custom("export".to_owned()),
    ] {
        let decision = service.check_permission(&subject, "reports", &action).await;
        assert!(decision.is_ok());
        assert!(decision.unwrap_or_else(|_| unreachable!()).allowed);
    }
}

#[tokio::test]
async fn claim_role_name_bypass_ignores_case() {
    let user_id = UserId::new();
    let service = service_for(user_id, Vec::new());
    let subject = Subject::new(
        user_id,
        Claims {
            role_names: vec!["Administrator".to_owned()],
            ..Claims::empty()
        },
    );

    let decision = service
        .check_permission(&subject, "document", &Action::Delete)
        .await;
    assert!(decision.is_ok());
    assert!(decision.unwrap_or_else(|_| unreachable!()).allowed);
}

#[tokio::test]
async fn stale_claims_still_grant_through_the_union() {
    let user_id = UserId::new();
    let service = service_for(user_id, Vec::new());
    let subject = Subject::new(
        user_id,
        Claims {
            permission_strings: vec!["document:read".to_owned()],
            ..Claims::empty()
        },
    );

    let decision = service
        .check_permission(&subject, "document", &Action::Read)
        .await;
    assert!(decision.is_ok());
    assert!(decision.unwrap_or_else(|_| unreachable!()).allowed);
}

#[tokio::test]
async fn malformed_claim_strings_degrade_to_denial_not_error() {
    let user_id = UserId::new();
    let service = service_for(user_id, Vec::new());
    let subject = Subject::new(
        user_id,
        Claims {
            permission_strings: vec!["not-a-permission".to_owned(), ":".to_owned()],
            ..Claims::empty()
        },
    );

    let decision = service
        .check_permission(&subject, "document", &Action::Read)
        .await;
    assert!(decision.is_ok());
    assert!(!decision.unwrap_or_else(|_| unreachable!()).allowed);
}

#[tokio::test]
async fn transient_storage_failure_is_retried_once() {
    let user_id = UserId::new();
    let repository = Arc::new(FlakyRoleRepository {
        attempts: AtomicUsize::new(0),
        roles: vec![role("Ops", 10, vec![permission("reports", Action::Read)])],
    });
    let service = AuthorizationService::new(repository.clone());
    let subject = Subject::without_claims(user_id);

    let decision = service
        .check_permission(&subject, "reports", &Action::Read)
        .await;
    assert!(decision.is_ok());
    assert!(decision.unwrap_or_else(|_| unreachable!()).allowed);
    assert_eq!(repository.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn persistent_storage_failure_propagates() {
    let service = AuthorizationService::new(Arc::new(BrokenRoleRepository));
    let subject = Subject::without_claims(UserId::new());

    let decision = service
        .check_permission(&subject, "reports", &Action::Read)
        .await;
    assert!(matches!(decision, Err(AppError::Storage(_))));
}

#[tokio::test]
async fn empty_guard_list_always_authorizes() {
    let user_id = UserId::new();
    let service = service_for(user_id, Vec::new());
    let subject = Subject::without_claims(user_id);

    let authorized = service.authorize(&subject, &[], GuardMode::All).await;
    assert!(authorized.is_ok());
    assert!(authorized.unwrap_or(false));
}

#[tokio::test]
async fn guard_all_requires_every_permission() {
    let user_id = UserId::new();
    let service = service_for(
        user_id,
        vec![role("Ops", 10, vec![permission("document", Action::Read)])],
    );
    let subject = Subject::without_claims(user_id);

    let authorized = service
        .authorize(
            &subject,
            &["document:read", "document:delete"],
            GuardMode::All,
        )
        .await;
    assert!(authorized.is_ok());
    assert!(!authorized.unwrap_or(true));
}

#[tokio::test]
async fn guard_any_accepts_one_grant() {
    let user_id = UserId::new();
    let service = service_for(
        user_id,
        vec![role("Ops", 10, vec![permission("document", Action::Read)])],
    );
    let subject = Subject::without_claims(user_id);

    let authorized = service
        .authorize(
            &subject,
            &["reports:manage", "document:read"],
            GuardMode::Any,
        )
        .await;
    assert!(authorized.is_ok());
    assert!(authorized.unwrap_or(false));
}

#[tokio::test]
async fn guard_all_fails_on_a_malformed_entry() {
    let user_id = UserId::new();
    let service = service_for(
        user_id,
        vec![role("Ops", 10, vec![permission("document", Action::Read)])],
    );
    let subject = Subject::without_claims(user_id);

    let authorized = service
        .authorize(&subject, &["document:read", "garbage"], GuardMode::All)
        .await;
    assert!(authorized.is_ok());
    assert!(!authorized.unwrap_or(true));
}
