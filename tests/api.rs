//! HTTP-level tests against the full router on an in-memory database.

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use robknow::api::{build_router, AppState};
use robknow::config::Config;
use robknow::db::{create_test_pool, migrations};

async fn server() -> TestServer {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let config = Config::default();
    let state = AppState::new(pool, &config).expect("Failed to build state");
    let app = build_router(state, &config.server.cors_origin, &config.media)
        .expect("Failed to build router");
    TestServer::new(app).expect("Failed to start test server")
}

/// Register a user and return its bearer token
async fn register(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/student/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "hunter2",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["token"]
        .as_str()
        .expect("token in response")
        .to_string()
}

async fn create_topic(server: &TestServer, token: &str, title: &str) -> Value {
    let response = server
        .post("/topics")
        .authorization_bearer(token)
        .json(&json!({ "title": title }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

async fn create_course(server: &TestServer, token: &str, title: &str, topics: &[&str]) -> Value {
    let response = server
        .post("/courses/manage")
        .authorization_bearer(token)
        .json(&json!({ "title": title, "topics": topics, "overview": "About it" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

async fn add_module(server: &TestServer, token: &str, course_id: i64, title: &str) -> i64 {
    let response = server
        .put(&format!("/courses/manage/{}/modules", course_id))
        .authorization_bearer(token)
        .json(&json!({ "modules": [{ "title": title, "description": "" }] }))
        .await;
    response.assert_status_ok();
    let modules: Value = response.json();
    modules[0]["id"].as_i64().expect("module id")
}

#[tokio::test]
async fn test_root_redirects_to_course_list() {
    let server = server().await;
    let response = server.get("/").await;

    response.assert_status(StatusCode::PERMANENT_REDIRECT);
    assert_eq!(response.header("location"), "/courses");
}

#[tokio::test]
async fn test_management_requires_login() {
    let server = server().await;
    let response = server.get("/courses/manage").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["details"]["login_url"], "/accounts/login");

    let bad_token = server
        .get("/accounts/me")
        .authorization_bearer("not-a-session")
        .await;
    bad_token.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_me_logout() {
    let server = server().await;
    register(&server, "alice").await;

    let wrong = server
        .post("/accounts/login")
        .json(&json!({ "username_or_email": "alice", "password": "nope" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);

    let login = server
        .post("/accounts/login")
        .json(&json!({ "username_or_email": "alice@example.com", "password": "hunter2" }))
        .await;
    login.assert_status_ok();
    assert!(login
        .header("set-cookie")
        .to_str()
        .unwrap()
        .starts_with("session="));
    let token = login.json::<Value>()["token"].as_str().unwrap().to_string();

    let me = server.get("/accounts/me").authorization_bearer(&token).await;
    me.assert_status_ok();
    assert_eq!(me.json::<Value>()["username"], "alice");
    assert!(me.json::<Value>().get("password_hash").is_none());

    server
        .post("/accounts/logout")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get("/accounts/me")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_names_field() {
    let server = server().await;
    register(&server, "bob").await;

    let duplicate = server
        .post("/student/register")
        .json(&json!({ "username": "bob", "email": "other@example.com", "password": "pw" }))
        .await;
    duplicate.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = duplicate.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["field"], "username");
}

#[tokio::test]
async fn test_course_lifecycle_and_ownership() {
    let server = server().await;
    let owner = register(&server, "owner").await;
    let other = register(&server, "other").await;
    create_topic(&server, &owner, "Rust").await;

    let course = create_course(&server, &owner, "Ownership 101", &["rust"]).await;
    let id = course["id"].as_i64().unwrap();
    assert_eq!(course["slug"], "ownership-101");
    assert_eq!(course["topics"][0]["slug"], "rust");

    // someone else's course looks missing
    for response in [
        server
            .get(&format!("/courses/manage/{}", id))
            .authorization_bearer(&other)
            .await,
        server
            .put(&format!("/courses/manage/{}", id))
            .authorization_bearer(&other)
            .json(&json!({ "title": "Mine now", "topics": ["rust"] }))
            .await,
        server
            .delete(&format!("/courses/manage/{}", id))
            .authorization_bearer(&other)
            .await,
    ] {
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["error"]["code"], "NOT_FOUND");
    }

    let updated = server
        .put(&format!("/courses/manage/{}", id))
        .authorization_bearer(&owner)
        .json(&json!({ "title": "Ownership 102", "slug": "ownership", "topics": ["rust"] }))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["slug"], "ownership");

    let own = server.get("/courses/manage").authorization_bearer(&owner).await;
    assert_eq!(own.json::<Value>().as_array().unwrap().len(), 1);
    let theirs = server.get("/courses/manage").authorization_bearer(&other).await;
    assert!(theirs.json::<Value>().as_array().unwrap().is_empty());

    server
        .delete(&format!("/courses/manage/{}", id))
        .authorization_bearer(&owner)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get("/courses/ownership")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_course_validation_errors() {
    let server = server().await;
    let token = register(&server, "carol").await;
    create_topic(&server, &token, "Go").await;

    let bad_slug = server
        .post("/courses/manage")
        .authorization_bearer(&token)
        .json(&json!({ "title": "Channels", "slug": "no spaces", "topics": ["go"] }))
        .await;
    bad_slug.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(bad_slug.json::<Value>()["error"]["details"]["field"], "slug");

    let no_topic = server
        .post("/courses/manage")
        .authorization_bearer(&token)
        .json(&json!({ "title": "Channels", "topics": [] }))
        .await;
    no_topic.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(no_topic.json::<Value>()["error"]["details"]["field"], "topics");
}

#[tokio::test]
async fn test_catalog_and_topic_filter() {
    let server = server().await;
    let token = register(&server, "dana").await;
    create_topic(&server, &token, "Rust").await;
    create_topic(&server, &token, "SQL").await;
    create_course(&server, &token, "Lifetimes", &["rust"]).await;
    create_course(&server, &token, "Joins", &["sql"]).await;

    let all: Value = server.get("/courses").await.json();
    assert_eq!(all["courses"].as_array().unwrap().len(), 2);
    assert_eq!(all["topics"].as_array().unwrap().len(), 2);
    assert!(all["subject"].is_null());

    let rust = server.get("/courses/topic/rust").await;
    rust.assert_status_ok();
    let rust: Value = rust.json();
    assert_eq!(rust["subject"]["slug"], "rust");
    let titles: Vec<_> = rust["courses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Lifetimes"]);

    server
        .get("/courses/topic/haskell")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let topics: Value = server.get("/topics").await.json();
    assert_eq!(topics[0]["title"], "Rust");
    assert_eq!(topics[0]["total_courses"], 1);
}

#[tokio::test]
async fn test_content_crud_through_module() {
    let server = server().await;
    let owner = register(&server, "erin").await;
    let other = register(&server, "frank").await;
    create_topic(&server, &owner, "Rust").await;
    let course_id = create_course(&server, &owner, "Traits", &["rust"]).await["id"]
        .as_i64()
        .unwrap();
    let module_id = add_module(&server, &owner, course_id, "Week 1").await;

    let created = server
        .post(&format!("/courses/manage/module/{}/content/text", module_id))
        .authorization_bearer(&owner)
        .json(&json!({ "title": "Reading", "content": "Read **chapter 10**" }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let created: Value = created.json();
    let content_id = created["id"].as_i64().unwrap();
    let item_id = created["item"]["id"].as_i64().unwrap();
    assert!(created["html"].as_str().unwrap().contains("<strong>chapter 10</strong>"));

    let item_url = format!("/courses/manage/module/{}/content/text/{}", module_id, item_id);
    let fetched = server.get(&item_url).authorization_bearer(&owner).await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["kind"], "text");

    server
        .get(&item_url)
        .authorization_bearer(&other)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let updated = server
        .put(&item_url)
        .authorization_bearer(&owner)
        .json(&json!({ "title": "Reading (updated)", "content": "Chapter 11" }))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["content"], "Chapter 11");

    let unknown_kind = server
        .post(&format!("/courses/manage/module/{}/content/podcast", module_id))
        .authorization_bearer(&owner)
        .json(&json!({ "title": "Episode" }))
        .await;
    unknown_kind.assert_status(StatusCode::NOT_FOUND);

    let bad_video = server
        .post(&format!("/courses/manage/module/{}/content/video", module_id))
        .authorization_bearer(&owner)
        .json(&json!({ "title": "Clip", "url": "not a url" }))
        .await;
    bad_video.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(bad_video.json::<Value>()["error"]["details"]["field"], "url");

    server
        .delete(&format!("/courses/manage/content/{}", content_id))
        .authorization_bearer(&other)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let deleted = server
        .delete(&format!("/courses/manage/content/{}", content_id))
        .authorization_bearer(&owner)
        .await;
    deleted.assert_status_ok();
    assert_eq!(deleted.json::<Value>()["module_id"], module_id);

    server
        .get(&item_url)
        .authorization_bearer(&owner)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    let listing: Value = server
        .get(&format!("/courses/manage/module/{}", module_id))
        .authorization_bearer(&owner)
        .await
        .json();
    assert!(listing["contents"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_reorder_contents() {
    let server = server().await;
    let owner = register(&server, "gina").await;
    create_topic(&server, &owner, "Rust").await;
    let course_id = create_course(&server, &owner, "Macros", &["rust"]).await["id"]
        .as_i64()
        .unwrap();
    let module_id = add_module(&server, &owner, course_id, "Week 1").await;

    let mut ids = Vec::new();
    for title in ["first", "second"] {
        let created: Value = server
            .post(&format!("/courses/manage/module/{}/content/text", module_id))
            .authorization_bearer(&owner)
            .json(&json!({ "title": title, "content": "body" }))
            .await
            .json();
        ids.push(created["id"].as_i64().unwrap());
    }
    ids.reverse();

    let saved = server
        .put(&format!("/courses/manage/module/{}/order", module_id))
        .authorization_bearer(&owner)
        .json(&json!({ "ids": ids }))
        .await;
    saved.assert_status_ok();
    assert_eq!(saved.json::<Value>()["saved"], "OK");

    let listing: Value = server
        .get(&format!("/courses/manage/module/{}", module_id))
        .authorization_bearer(&owner)
        .await
        .json();
    assert_eq!(listing["contents"][0]["item"]["title"], "second");
}

#[tokio::test]
async fn test_enrollment_flow() {
    let server = server().await;
    let owner = register(&server, "hank").await;
    let student = register(&server, "ivy").await;
    create_topic(&server, &owner, "Rust").await;
    let course = create_course(&server, &owner, "Async", &["rust"]).await;
    let course_id = course["id"].as_i64().unwrap();
    let module_id = add_module(&server, &owner, course_id, "Futures").await;
    server
        .post(&format!("/courses/manage/module/{}/content/video", module_id))
        .authorization_bearer(&owner)
        .json(&json!({ "title": "Talk", "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ" }))
        .await
        .assert_status(StatusCode::CREATED);

    // not enrolled yet
    server
        .get(&format!("/student/course/{}", course_id))
        .authorization_bearer(&student)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    for _ in 0..2 {
        let enrolled = server
            .post("/student/enroll-course")
            .authorization_bearer(&student)
            .json(&json!({ "course_id": course_id }))
            .await;
        enrolled.assert_status_ok();
        assert_eq!(
            enrolled.json::<Value>()["redirect"],
            format!("/student/course/{}", course_id)
        );
    }

    let detail: Value = server
        .get("/courses/async")
        .authorization_bearer(&student)
        .await
        .json();
    assert_eq!(detail["total_students"], 1);
    assert_eq!(detail["enrolled"], true);
    let anonymous: Value = server.get("/courses/async").await.json();
    assert_eq!(anonymous["enrolled"], false);

    let mine: Value = server
        .get("/student/courses")
        .authorization_bearer(&student)
        .await
        .json();
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let view = server
        .get(&format!("/student/course/{}", course_id))
        .authorization_bearer(&student)
        .await;
    view.assert_status_ok();
    let view: Value = view.json();
    assert_eq!(view["module"]["id"], module_id);
    assert!(view["contents"][0]["html"]
        .as_str()
        .unwrap()
        .contains(r#"<iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ""#));

    server
        .get(&format!("/student/course/{}/{}", course_id, module_id + 100))
        .authorization_bearer(&student)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_module_through_formset() {
    let server = server().await;
    let owner = register(&server, "jack").await;
    create_topic(&server, &owner, "Rust").await;
    let course_id = create_course(&server, &owner, "Unsafe", &["rust"]).await["id"]
        .as_i64()
        .unwrap();
    let module_id = add_module(&server, &owner, course_id, "Raw pointers").await;
    server
        .post(&format!("/courses/manage/module/{}/content/image", module_id))
        .authorization_bearer(&owner)
        .json(&json!({ "title": "Diagram", "file": "images/ptr.png" }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .put(&format!("/courses/manage/{}/modules", course_id))
        .authorization_bearer(&owner)
        .json(&json!({ "modules": [
            { "id": module_id, "title": "Raw pointers", "delete": true },
            { "title": "", "description": "" },
        ]}))
        .await;
    response.assert_status_ok();
    assert!(response.json::<Value>().as_array().unwrap().is_empty());

    server
        .get(&format!("/courses/manage/module/{}", module_id))
        .authorization_bearer(&owner)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
