//! Role assignment semantics against the in-memory directory.

mod common;

use std::sync::Arc;

use serde_json::json;

use admin_api::services::users::{Role, UserService};
use common::{user, FakeDirectory};

fn user_with_claims(uid: &str, claims: serde_json::Value) -> admin_api::services::directory::DirectoryUser {
    let mut record = user(uid, Some("a@x.com"), false);
    record.custom_claims = claims.as_object().cloned();
    record
}

#[tokio::test]
async fn assigning_a_role_preserves_other_claims() {
    let directory = Arc::new(FakeDirectory::new(vec![user_with_claims(
        "u1",
        json!({ "role": "Viewer", "other": "x" }),
    )]));
    let service = UserService::new(directory.clone(), 20);

    service.set_role("u1", Role::Admin).await.unwrap();

    let writes = directory.claim_writes.lock().unwrap();
    let (uid, claims) = &writes[0];
    assert_eq!(uid, "u1");
    assert_eq!(claims.get("role"), Some(&json!("Admin")));
    assert_eq!(claims.get("other"), Some(&json!("x")));
}

#[tokio::test]
async fn default_tier_removes_the_role_key() {
    let directory = Arc::new(FakeDirectory::new(vec![user_with_claims(
        "u1",
        json!({ "role": "Admin", "other": "x" }),
    )]));
    let service = UserService::new(directory.clone(), 20);

    service.set_role("u1", Role::User).await.unwrap();

    let writes = directory.claim_writes.lock().unwrap();
    let (_, claims) = &writes[0];
    assert!(claims.get("role").is_none());
    assert_eq!(claims.get("other"), Some(&json!("x")));
}

#[tokio::test]
async fn assigning_to_a_user_without_claims_creates_the_map() {
    let directory = Arc::new(FakeDirectory::new(vec![user("u1", Some("a@x.com"), false)]));
    let service = UserService::new(directory.clone(), 20);

    service.set_role("u1", Role::Editor).await.unwrap();

    let writes = directory.claim_writes.lock().unwrap();
    let (_, claims) = &writes[0];
    assert_eq!(claims.get("role"), Some(&json!("Editor")));
}

#[tokio::test]
async fn unknown_user_surfaces_upstream_error_without_write() {
    let directory = Arc::new(FakeDirectory::new(vec![]));
    let service = UserService::new(directory.clone(), 20);

    let result = service.set_role("ghost", Role::Admin).await;
    assert!(result.is_err());
    assert_eq!(directory.write_count(), 0);
}
