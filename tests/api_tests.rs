use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use serde_json::{Value, json};
use std::sync::Arc;
use taxonomy_backend::{
    AppConfig, AppState, MemoryRepository, TaxonomyService, auth::TokenService, create_router,
    repository::RepositoryState,
};
use tower::ServiceExt;

// --- Test Setup ---

fn app() -> Router {
    let config = AppConfig::default();
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let tokens = TokenService::new(&config.jwt_secret, Duration::minutes(config.token_ttl_minutes));
    let service = Arc::new(TaxonomyService::new(repo, tokens));
    create_router(AppState { service })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("response body is JSON")
}

/// Bootstraps the superadmin, creates admin "curator", logs it in.
/// Returns (superadmin token, admin token).
async fn login_admin(app: &Router) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/create-superadmin",
        None,
        Some(json!({ "username": "root", "password": "rootpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let root_token = json_body(&body)["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        Method::POST,
        "/api/create-admin",
        Some(&root_token),
        Some(json!({ "username": "curator", "password": "curpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/admin-login",
        None,
        Some(json!({ "username": "curator", "password": "curpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let admin_token = json_body(&body)["token"].as_str().unwrap().to_string();

    (root_token, admin_token)
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_create_class_scenario() {
    let app = app();
    let (_, token) = login_admin(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/create-department",
        Some(&token),
        Some(json!({ "name_lt": "Zoologia", "name_ru": "Зоология" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let department = json_body(&body);
    assert_eq!(department["msg"], "Создано!");
    let department_id = department["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/create-class",
        Some(&token),
        Some(json!({
            "name_lt": "Mammalia",
            "name_ru": "Млекопитающие",
            "department_id": department_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let class = json_body(&body);
    assert_eq!(class["name_lt"], "Mammalia");
    assert_eq!(class["name_ru"], "Млекопитающие");
    assert_eq!(class["department_id"], department_id);
    assert_eq!(class["is_deleted"], false);
    assert_eq!(class["msg"], "Создано!");

    // Any tampering with the token is a 401.
    let tampered = format!("{token}x");
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/create-class",
        Some(&tampered),
        Some(json!({
            "name_lt": "Aves",
            "name_ru": "Птицы",
            "department_id": department_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body), json!({ "detail": "Unauthorized" }));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/api/get-admin-departments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_list_is_no_content() {
    let app = app();
    let (_, token) = login_admin(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/get-admin-families", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_nested_list_over_http() {
    let app = app();
    let (_, token) = login_admin(&app).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/create-department",
        Some(&token),
        Some(json!({ "name_lt": "Zoologia", "name_ru": "Зоология" })),
    )
    .await;
    let department_id = json_body(&body)["id"].as_i64().unwrap();

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/create-class",
        Some(&token),
        Some(json!({ "name_lt": "Aves", "name_ru": "Птицы", "department_id": department_id })),
    )
    .await;
    let class_id = json_body(&body)["id"].as_i64().unwrap();

    let (status, body) =
        send(&app, Method::GET, "/api/get-admin-departments", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = json_body(&body);
    assert_eq!(list[0]["id"], department_id);
    assert_eq!(list[0]["classes"][0]["id"], class_id);
    assert_eq!(list[0]["classes"][0]["subclasses"], json!([]));

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/get-admin-class/{class_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["name_lt"], "Aves");
}

#[tokio::test]
async fn test_update_and_soft_delete_over_http() {
    let app = app();
    let (_, token) = login_admin(&app).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/create-department",
        Some(&token),
        Some(json!({ "name_lt": "Zoologia", "name_ru": "Зоология" })),
    )
    .await;
    let department_id = json_body(&body)["id"].as_i64().unwrap();
    let (_, body) = send(
        &app,
        Method::POST,
        "/api/create-class",
        Some(&token),
        Some(json!({ "name_lt": "Aves", "name_ru": "Птицы", "department_id": department_id })),
    )
    .await;
    let class_id = json_body(&body)["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/update-class/{class_id}"),
        Some(&token),
        Some(json!({ "name_lt": "Reptilia", "name_ru": "Пресмыкающиеся", "department_id": department_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({ "updated": true, "msg": "Обновлено!" }));

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/delete-class/{class_id}"),
        Some(&token),
        Some(json!({ "is_deleted": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["is_deleted"], true);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/get-admin-class/{class_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Updating a missing row answers 204 as well.
    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/update-class/999",
        Some(&token),
        Some(json!({ "name_lt": "X", "name_ru": "X", "department_id": department_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_department_delete_route() {
    let app = app();
    let (_, token) = login_admin(&app).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/create-department",
        Some(&token),
        Some(json!({ "name_lt": "Zoologia", "name_ru": "Зоология" })),
    )
    .await;
    let department_id = json_body(&body)["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/delete-department/{department_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({ "msg": "Удалено!" }));
}

#[tokio::test]
async fn test_missing_parent_over_http_is_no_content() {
    let app = app();
    let (_, token) = login_admin(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/create-family",
        Some(&token),
        Some(json!({ "name_lt": "Felidae", "name_ru": "Кошачьи" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_parent_key_of_another_level_is_no_content() {
    let app = app();
    let (_, token) = login_admin(&app).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/create-department",
        Some(&token),
        Some(json!({ "name_lt": "Zoologia", "name_ru": "Зоология" })),
    )
    .await;
    let department_id = json_body(&body)["id"].as_i64().unwrap();

    // A subclass hangs off a class, so `department_id` is the wrong key for it.
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/create-subclass",
        Some(&token),
        Some(json!({ "name_lt": "Theria", "name_ru": "Звери", "department_id": department_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, _) = send(&app, Method::GET, "/api/get-admin-subclasses", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_restore_over_reused_username_is_conflict() {
    let app = app();
    let (root_token, _) = login_admin(&app).await;
    let reader = json!({ "username": "reader", "password": "readpass" });

    let (_, body) = send(&app, Method::POST, "/api/create-user", Some(&root_token), Some(reader.clone())).await;
    let first_id = json_body(&body)["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/delete-user/{first_id}"),
        Some(&root_token),
        Some(json!({ "is_deleted": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, "/api/create-user", Some(&root_token), Some(reader)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/delete-user/{first_id}"),
        Some(&root_token),
        Some(json!({ "is_deleted": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let app = app();
    let (root_token, _) = login_admin(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/create-admin",
        Some(&root_token),
        Some(json!({ "username": "curator", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json_body(&body), json!({ "detail": "Username already taken" }));
}

#[tokio::test]
async fn test_account_management_requires_superadmin() {
    let app = app();
    let (root_token, admin_token) = login_admin(&app).await;

    let (status, _) = send(&app, Method::GET, "/api/get-admin-admins", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        send(&app, Method::GET, "/api/get-admin-admins", Some(&root_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let admins = json_body(&body);
    assert_eq!(admins.as_array().unwrap().len(), 2);
    assert!(admins[0].get("password_hash").is_none());

    let (status, _) = send(&app, Method::GET, "/api/get-admin-users", Some(&root_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_user_login_and_logout() {
    let app = app();
    let (root_token, _) = login_admin(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/create-user",
        Some(&root_token),
        Some(json!({ "username": "reader", "password": "readpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = json_body(&body)["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/user-login",
        None,
        Some(json!({ "username": "reader", "password": "readpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let login = json_body(&body);
    assert_eq!(login["id"], user_id);
    let user_token = login["token"].as_str().unwrap().to_string();

    // A user token never opens admin routes.
    let (status, _) = send(
        &app,
        Method::GET,
        "/api/get-admin-departments",
        Some(&user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/api/logout", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::POST, "/api/logout", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/user-login",
        None,
        Some(json!({ "username": "reader", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_activate_route_toggles_flag() {
    let app = app();
    let (root_token, _) = login_admin(&app).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/create-user",
        Some(&root_token),
        Some(json!({ "username": "reader", "password": "readpass" })),
    )
    .await;
    let user_id = json_body(&body)["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/activate-user/{user_id}"),
        Some(&root_token),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["is_active"], false);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/user-login",
        None,
        Some(json!({ "username": "reader", "password": "readpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let doc = json_body(&body);
    assert!(doc["paths"].get("/api/create-superadmin").is_some());
}
