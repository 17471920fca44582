//! End-to-end tests driving the full router against the in-memory store.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use serde_json::{Value, json};

use api_server::observability::RequestIdMiddleware;
use api_server::{AppState, configure_routes};
use kadha_core::services::BlogSettings;
use kadha_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};

fn test_state() -> web::Data<AppState> {
    let passwords = Arc::new(Argon2PasswordService::with_params(1024, 1, 1).unwrap());
    let tokens = Arc::new(JwtTokenService::new(JwtConfig {
        secret: "integration-secret".to_string(),
        expiration_hours: Some(1),
        issuer: "kadha-test".to_string(),
    }));
    web::Data::new(AppState::in_memory(
        passwords,
        tokens,
        BlogSettings::default(),
    ))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .app_data($state.clone())
                .configure(configure_routes),
        )
        .await
    };
}

/// Sign up `email` and return the bearer header value.
macro_rules! bearer {
    ($app:expr, $email:expr) => {{
        let req = test::TestRequest::post()
            .uri("/user/signup")
            .set_json(json!({"email": $email, "password": "correct horse", "name": "Author"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        format!("Bearer {}", body["token"].as_str().unwrap())
    }};
}

macro_rules! create_tags {
    ($app:expr, $auth:expr, $names:expr) => {{
        let req = test::TestRequest::post()
            .uri("/blog/tags/create")
            .insert_header(("Authorization", $auth.as_str()))
            .set_json(json!({ "tags": $names }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        body["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap().to_string())
            .collect::<Vec<String>>()
    }};
}

macro_rules! create_post {
    ($app:expr, $auth:expr, $title:expr, $tag_ids:expr) => {{
        let req = test::TestRequest::post()
            .uri("/blog/add")
            .insert_header(("Authorization", $auth.as_str()))
            .set_json(json!({
                "title": $title,
                "content": format!("# {}\n\nbody", $title),
                "tagIds": $tag_ids,
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["id"].as_str().unwrap().to_string()
    }};
}

#[actix_web::test]
async fn test_signup_and_signin() {
    let state = test_state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/user/signup")
        .set_json(json!({"email": "Ada@Example.com", "password": "correct horse", "name": "Ada"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 3600);
    assert!(body["token"].as_str().is_some());

    // Emails are compared case-insensitively
    let req = test::TestRequest::post()
        .uri("/user/signup")
        .set_json(json!({"email": "ada@example.com", "password": "another pass", "name": "Ada"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "email_taken");

    let req = test::TestRequest::post()
        .uri("/user/signin")
        .set_json(json!({"email": "ada@example.com", "password": "wrong password"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_credentials");

    let req = test::TestRequest::post()
        .uri("/user/signin")
        .set_json(json!({"email": "ada@example.com", "password": "correct horse"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_signup_validation() {
    let state = test_state();
    let app = app!(state);

    for payload in [
        json!({"email": "not-an-email", "password": "correct horse", "name": "A"}),
        json!({"email": "a@example.com", "password": "short", "name": "A"}),
        json!({"email": "a@example.com", "password": "correct horse", "name": "  "}),
    ] {
        let req = test::TestRequest::post()
            .uri("/user/signup")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "validation_failed");
    }
}

#[actix_web::test]
async fn test_gated_routes_reject_missing_token() {
    let state = test_state();
    let app = app!(state);

    let gated = [
        test::TestRequest::get().uri("/blog/getallForadmin"),
        test::TestRequest::post()
            .uri("/blog/add")
            .set_json(json!({"title": "t", "content": "c"})),
        test::TestRequest::put()
            .uri("/blog/edit/0190a0b0-0000-7000-8000-000000000000")
            .set_json(json!({"title": "t", "content": "c"})),
        test::TestRequest::delete().uri("/blog/delete/0190a0b0-0000-7000-8000-000000000000"),
        test::TestRequest::post()
            .uri("/blog/tags/create")
            .set_json(json!({"tags": ["x"]})),
        test::TestRequest::delete().uri("/blog/tags/0190a0b0-0000-7000-8000-000000000000"),
    ];

    for req in gated {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().contains_key("x-request-id"));
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "unauthenticated");
        assert!(body["request_id"].as_str().is_some());
    }

    // Nothing was written
    let req = test::TestRequest::get().uri("/blog/tags").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["tags"], json!([]));
}

#[actix_web::test]
async fn test_invalid_token_rejected() {
    let state = test_state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/blog/add")
        .insert_header(("Authorization", "Bearer not.a.token"))
        .insert_header(("X-Request-ID", "req-42"))
        .set_json(json!({"title": "t", "content": "c"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "req-42");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["request_id"], "req-42");
}

#[actix_web::test]
async fn test_post_lifecycle() {
    let state = test_state();
    let app = app!(state);
    let auth = bearer!(app, "author@example.com");

    let ids = create_tags!(app, auth, ["rust", "web", "db", "rust"]);
    assert_eq!(ids.len(), 3);
    let (rust, web_tag, db) = (ids[0].clone(), ids[1].clone(), ids[2].clone());

    let post_id = create_post!(app, auth, "Hello Kadha", [rust.clone(), web_tag.clone()]);

    // Read back
    let req = test::TestRequest::get()
        .uri(&format!("/blog/get/{}", post_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["title"], "Hello Kadha");
    assert_eq!(body["markdownContent"], "# Hello Kadha\n\nbody");
    assert_eq!(body["tags"], json!(["rust", "web"]));
    assert_eq!(body["state"], "published");

    // Edit tags {rust, web} -> {web, db}
    let req = test::TestRequest::put()
        .uri(&format!("/blog/edit/{}", post_id))
        .insert_header(("Authorization", auth.as_str()))
        .set_json(json!({
            "title": "Hello again",
            "content": "updated",
            "tagIds": [web_tag.clone(), db.clone()],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["tags"], json!(["db", "web"]));
    assert_eq!(body["markdownContent"], "updated");

    // Tag filter follows the new links
    let req = test::TestRequest::get()
        .uri("/blog/getall?tags=rust")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["pagination"]["totalCount"], 0);

    let req = test::TestRequest::get()
        .uri("/blog/getall?tags=db,missing")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["pagination"]["totalCount"], 1);
    assert_eq!(body["posts"][0]["tags"], json!(["db", "web"]));

    // Linked tags cannot be deleted
    let req = test::TestRequest::delete()
        .uri(&format!("/blog/tags/{}", db))
        .insert_header(("Authorization", auth.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "tag_in_use");

    // Unlinked tags can, once
    let req = test::TestRequest::delete()
        .uri(&format!("/blog/tags/{}", rust))
        .insert_header(("Authorization", auth.as_str()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::delete()
        .uri(&format!("/blog/tags/{}", rust))
        .insert_header(("Authorization", auth.as_str()))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    // Toggle: published -> unpublished
    let req = test::TestRequest::delete()
        .uri(&format!("/blog/delete/{}", post_id))
        .insert_header(("Authorization", auth.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], "unpublished");
    assert_eq!(body["published"], false);

    let req = test::TestRequest::get().uri("/blog/getall").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["pagination"]["totalCount"], 0);

    let req = test::TestRequest::get()
        .uri("/blog/getallForadmin")
        .insert_header(("Authorization", auth.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["pagination"]["totalCount"], 1);
    assert_eq!(body["posts"][0]["state"], "unpublished");

    // Toggle back: unpublished -> published
    let req = test::TestRequest::delete()
        .uri(&format!("/blog/delete/{}", post_id))
        .insert_header(("Authorization", auth.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], "published");

    let req = test::TestRequest::get().uri("/blog/getall").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["pagination"]["totalCount"], 1);
}

#[actix_web::test]
async fn test_only_owner_may_mutate() {
    let state = test_state();
    let app = app!(state);
    let owner = bearer!(app, "owner@example.com");
    let intruder = bearer!(app, "intruder@example.com");

    let post_id = create_post!(app, owner, "Mine", Vec::<String>::new());

    let req = test::TestRequest::put()
        .uri(&format!("/blog/edit/{}", post_id))
        .insert_header(("Authorization", intruder.as_str()))
        .set_json(json!({"title": "Hijacked", "content": "x"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "forbidden");

    let req = test::TestRequest::delete()
        .uri(&format!("/blog/delete/{}", post_id))
        .insert_header(("Authorization", intruder.as_str()))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::get()
        .uri(&format!("/blog/get/{}", post_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["title"], "Mine");
    assert_eq!(body["state"], "published");
}

#[actix_web::test]
async fn test_catalog_pagination() {
    let state = test_state();
    let app = app!(state);
    let auth = bearer!(app, "prolific@example.com");

    for i in 0..12 {
        create_post!(app, auth, format!("Post {:02}", i), Vec::<String>::new());
    }

    let req = test::TestRequest::get()
        .uri("/blog/getall?page=3&limit=5")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["currentPage"], 3);
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["pagination"]["totalCount"], 12);
    // Newest first: the last page holds the oldest posts
    assert_eq!(body["posts"][1]["title"], "Post 00");

    let req = test::TestRequest::get()
        .uri("/blog/getall?page=9&limit=5")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["posts"], json!([]));
    assert_eq!(body["pagination"]["totalPages"], 3);

    let req = test::TestRequest::get()
        .uri("/blog/getall?page=0&limit=0")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 10);
    assert_eq!(body["pagination"]["currentPage"], 1);

    let req = test::TestRequest::get()
        .uri("/blog/getall?query=post%2001")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["pagination"]["totalCount"], 1);
    assert_eq!(body["posts"][0]["title"], "Post 01");
}

#[actix_web::test]
async fn test_malformed_input_is_a_validation_failure() {
    let state = test_state();
    let app = app!(state);
    let auth = bearer!(app, "careful@example.com");

    let req = test::TestRequest::post()
        .uri("/blog/add")
        .insert_header(("Authorization", auth.as_str()))
        .set_json(json!({"content": "no title"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_failed");

    let req = test::TestRequest::post()
        .uri("/blog/add")
        .insert_header(("Authorization", auth.as_str()))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_failed");

    let req = test::TestRequest::get()
        .uri("/blog/get/not-a-uuid")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/blog/add")
        .insert_header(("Authorization", auth.as_str()))
        .set_json(json!({
            "title": "Ghost tags",
            "content": "body",
            "tagIds": ["0190a0b0-0000-7000-8000-000000000000"],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_missing_post_is_not_found() {
    let state = test_state();
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/blog/get/0190a0b0-0000-7000-8000-000000000000")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_found");
}

#[actix_web::test]
async fn test_health() {
    let state = test_state();
    let app = app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
}
