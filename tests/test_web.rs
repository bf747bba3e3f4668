// HTTP surface: identity headers, per-request authorization, error mapping.

mod helpers;

use accessgate::authz::{AccessType, Collection, Operation, RoleService};
use accessgate::storage;
use accessgate::web::{router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::{seed_acl, RoleBuilder, TestDb};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app(db: &sea_orm::DatabaseConnection) -> Router {
    RoleBuilder::new("role_admin")
        .allow(Collection::Role, Operation::Create, AccessType::Always)
        .allow(Collection::Role, Operation::Read, AccessType::Always)
        .allow(Collection::Role, Operation::Acl, AccessType::Always)
        .create(db)
        .await;
    RoleBuilder::new("locked_out")
        .allow(Collection::Role, Operation::Read, AccessType::Never)
        .create(db)
        .await;

    router(AppState {
        roles: RoleService::new(db.clone()),
    })
}

fn request(method: &str, uri: &str, roles: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-subject", "alice")
        .header("x-roles", roles)
        .header("content-type", "application/json");
    match body {
        Some(v) => builder.body(Body::from(v.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_create_role_then_duplicate_conflicts() {
    let test_db = TestDb::new().await;
    let app = app(test_db.connection()).await;
    let body = json!({ "name": "metric_reader", "collection_permissions": [] });

    let response = app
        .clone()
        .oneshot(request("POST", "/roles", "role_admin", Some(body.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["name"], "metric_reader");

    let response = app
        .oneshot(request("POST", "/roles", "role_admin", Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error = json_body(response).await;
    assert!(error["error"].as_str().unwrap().contains("metric_reader"));
}

#[tokio::test]
async fn test_never_role_is_forbidden() {
    let test_db = TestDb::new().await;
    let app = app(test_db.connection()).await;

    let response = app
        .oneshot(request("GET", "/roles", "role_admin,locked_out", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_subject_is_unauthorized() {
    let test_db = TestDb::new().await;
    let app = app(test_db.connection()).await;

    let response = app
        .oneshot(Request::builder().uri("/roles").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_check_reports_access_type() {
    let test_db = TestDb::new().await;
    let app = app(test_db.connection()).await;

    let response = app
        .oneshot(request(
            "POST",
            "/access/check",
            "role_admin",
            Some(json!({ "collection": "Role", "operation": "READ" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["access_type"], "ALWAYS");
}

#[tokio::test]
async fn test_duplicate_acl_grant_is_conflict() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let app = app(db).await;
    let target = RoleBuilder::new("target").create(db).await;
    let uri = format!("/roles/{}/acl", target.id);

    let response = app
        .clone()
        .oneshot(request("POST", &uri, "role_admin", Some(json!({ "who": "bob" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(request("POST", &uri, "role_admin", Some(json!({ "who": "bob" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_without_permission_is_forbidden() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let app = app(db).await;
    let target = RoleBuilder::new("target").create(db).await;

    let response = app
        .oneshot(request("DELETE", &format!("/roles/{}", target.id), "role_admin", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_modify_entry_of_another_role_is_not_found() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let app = app(db).await;
    let role_a = RoleBuilder::new("role_a").create(db).await;
    let role_b = RoleBuilder::new("role_b").create(db).await;
    let bobs = seed_acl(db, "bob", Collection::Role, &role_b.id).await;

    let response = app
        .oneshot(request(
            "PUT",
            &format!("/roles/{}/acl/{}", role_a.id, bobs.id),
            "role_admin",
            Some(json!({ "who": "mallory" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let stored = storage::get_access_control(db, &bobs.id).await.unwrap().unwrap();
    assert_eq!(stored, bobs);
}

#[tokio::test]
async fn test_revoke_entry() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();
    let app = app(db).await;
    let target = RoleBuilder::new("target").create(db).await;
    let other = RoleBuilder::new("other").create(db).await;
    let acl = seed_acl(db, "bob", Collection::Role, &target.id).await;

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/roles/{}/acl/{}", other.id, acl.id),
            "role_admin",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(request(
            "DELETE",
            &format!("/roles/{}/acl/{}", target.id, acl.id),
            "role_admin",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(storage::get_access_control(db, &acl.id).await.unwrap().is_none());
}
