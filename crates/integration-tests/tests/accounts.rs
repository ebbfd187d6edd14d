//! End-to-end account, token and authentication tests.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use zebrands_core::{Role, RoleSet};
use zebrands_integration_tests::{PASSWORD, TestApp};

fn registration() -> serde_json::Value {
    json!({
        "username": "newbie",
        "email": "newbie@example.com",
        "password": "s3cret-pass",
        "first_name": "Ana"
    })
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_registered_user_can_manage_products() {
    let app = TestApp::new();
    let boss = app
        .user("boss", RoleSet::empty().with(Role::UserAdmin))
        .await;

    let response = app
        .send(Method::POST, "/users/", Some(&boss), Some(registration()))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(
        response.body,
        json!({
            "email": "newbie@example.com",
            "username": "newbie",
            "first_name": "Ana",
            "last_name": ""
        })
    );

    let token = app
        .send(
            Method::POST,
            "/token/",
            None,
            Some(json!({"username": "newbie", "password": "s3cret-pass"})),
        )
        .await;
    assert_eq!(token.status, StatusCode::OK);
    let token = token.body["token"].as_str().unwrap().to_owned();
    assert_eq!(token.len(), 40);

    let created = app
        .send(
            Method::POST,
            "/products/",
            Some(&token),
            Some(json!({"sku": "N-1", "name": "New", "price": "1.00", "brand": "Acme"})),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_anonymous_registration_is_forbidden() {
    let app = TestApp::new();

    let response = app
        .send(Method::POST, "/users/", None, Some(registration()))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.body,
        json!({"detail": "Authentication credentials were not provided."})
    );
}

#[tokio::test]
async fn test_registration_without_user_admin_is_forbidden() {
    let app = TestApp::new();
    let catalog = app
        .user("catalog", RoleSet::empty().with(Role::ProductAdmin))
        .await;

    let response = app
        .send(Method::POST, "/users/", Some(&catalog), Some(registration()))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.body,
        json!({"detail": "Don't have permission to create users"})
    );
}

#[tokio::test]
async fn test_registration_needs_user_admin_group() {
    let app = TestApp::new();
    let boss = app
        .user("boss", RoleSet::empty().with(Role::UserAdmin))
        .await;
    app.store.remove_group(Role::UserAdmin);

    let response = app
        .send(Method::POST, "/users/", Some(&boss), Some(registration()))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registration_validates_payload() {
    let app = TestApp::new();
    let boss = app
        .user("boss", RoleSet::empty().with(Role::UserAdmin))
        .await;

    let response = app
        .send(
            Method::POST,
            "/users/",
            Some(&boss),
            Some(json!({"username": "bad name", "email": "nope"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["username"].is_array());
    assert!(response.body["email"].is_array());
    assert_eq!(response.body["password"], json!(["This field is required."]));
}

// =============================================================================
// Account management
// =============================================================================

#[tokio::test]
async fn test_account_lifecycle() {
    let app = TestApp::new();
    let boss = app.user("boss", RoleSet::empty().with(Role::UserAdmin)).await;
    let plain = app.user("plain", RoleSet::empty()).await;
    app.send(Method::POST, "/users/", Some(&boss), Some(registration())).await;

    let seen = app.send(Method::GET, "/users/newbie/", Some(&plain), None).await;
    assert_eq!(seen.status, StatusCode::OK);
    assert_eq!(seen.body["email"], "newbie@example.com");

    let anonymous = app
        .send(Method::PATCH, "/users/newbie/", None, Some(json!({"last_name": "Lopez"})))
        .await;
    assert_eq!(anonymous.status, StatusCode::FORBIDDEN);

    let renamed = app
        .send(Method::PATCH, "/users/newbie/", Some(&boss), Some(json!({"username": "other"})))
        .await;
    assert_eq!(renamed.status, StatusCode::BAD_REQUEST);

    let updated = app
        .send(Method::PATCH, "/users/newbie/", Some(&boss), Some(json!({"last_name": "Lopez"})))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["last_name"], "Lopez");

    let deleted = app.send(Method::DELETE, "/users/newbie/", Some(&boss), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app.send(Method::GET, "/users/newbie/", Some(&boss), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_any_authenticated_user_may_update_and_delete_accounts() {
    let app = TestApp::new();
    let boss = app.user("boss", RoleSet::empty().with(Role::UserAdmin)).await;
    let plain = app.user("plain", RoleSet::empty()).await;
    app.send(Method::POST, "/users/", Some(&boss), Some(registration())).await;

    let updated = app
        .send(Method::PATCH, "/users/newbie/", Some(&plain), Some(json!({"first_name": "Eva"})))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["first_name"], "Eva");

    let deleted = app.send(Method::DELETE, "/users/newbie/", Some(&plain), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app.send(Method::GET, "/users/newbie/", Some(&plain), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Tokens
// =============================================================================

#[tokio::test]
async fn test_token_is_stable_and_checks_password() {
    let app = TestApp::new();
    let issued = app.user("ana", RoleSet::empty()).await;

    let response = app
        .send(
            Method::POST,
            "/token/",
            None,
            Some(json!({"username": "ana", "password": PASSWORD})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["token"], issued);

    let wrong = app
        .send(
            Method::POST,
            "/token/",
            None,
            Some(json!({"username": "ana", "password": "wrong"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        wrong.body,
        json!({"non_field_errors": ["Unable to log in with provided credentials."]})
    );
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized_even_on_public_reads() {
    let app = TestApp::new();

    let response = app
        .send(Method::GET, "/products/", Some("0000000000000000000000000000000000000000"), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({"detail": "Invalid token."}));
}
