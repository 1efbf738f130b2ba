// tests/api_tests.rs

use std::sync::Arc;

use axum::{body::Body, http::Request};
use course_engine::{
    config::Config,
    models::user::ROLE_ADMIN,
    notify::LogNotifier,
    routes,
    state::AppState,
    store::MemoryStore,
    utils::hash::hash_password,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const JWT_SECRET: &str = "test_secret_for_integration_tests";

fn test_state() -> AppState {
    AppState::new(
        Config::for_memory(JWT_SECRET),
        MemoryStore::new(),
        Arc::new(LogNotifier),
    )
}

/// Spawns the app on a random port backed by in-memory storage.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and the state.
async fn spawn_app() -> (String, AppState) {
    let state = test_state();
    let app = routes::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, state)
}

fn unique_name() -> String {
    format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8])
}

async fn register_and_login(client: &reqwest::Client, address: &str) -> String {
    let username = unique_name();
    let password = "password123";

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    login(client, address, &username, password).await
}

async fn login(client: &reqwest::Client, address: &str, username: &str, password: &str) -> String {
    let body: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    body["token"].as_str().expect("Token not found").to_string()
}

async fn admin_token(client: &reqwest::Client, address: &str, state: &AppState) -> String {
    let username = unique_name();
    let hashed = hash_password("adminpass").unwrap();
    state
        .engine
        .store()
        .create_user(&username, &hashed, ROLE_ADMIN)
        .await
        .unwrap();
    login(client, address, &username, "adminpass").await
}

#[tokio::test]
async fn unknown_path_returns_404() {
    let app = routes::create_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/random_path_that_does_not_exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "username": "yo", "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();
    let body = json!({ "username": unique_name(), "password": "password123" });

    for expected in [201, 409] {
        let response = client
            .post(format!("{}/api/auth/register", address))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), expected);
    }
}

#[tokio::test]
async fn learner_routes_require_a_token_and_admin_routes_an_admin() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/progress", address))
        .json(&json!({ "course_id": 1, "content_unit_id": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let token = register_and_login(&client, &address).await;
    let response = client
        .post(format!("{}/api/admin/courses", address))
        .bearer_auth(&token)
        .json(&json!({ "name": "Sneaky" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn course_progress_certificate_flow() {
    let (address, state) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address, &state).await;

    // 1. Admin builds a course with two units and a quiz on the second
    let course: Value = client
        .post(format!("{}/api/admin/courses", address))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Ownership",
            "description": "<p>Borrowing</p><script>alert(1)</script>"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let course_id = course["id"].as_i64().unwrap();
    assert_eq!(course["description"], "<p>Borrowing</p>");

    let mut unit_ids = Vec::new();
    for title in ["Moves", "Borrows"] {
        let unit: Value = client
            .post(format!("{}/api/admin/courses/{}/units", address, course_id))
            .bearer_auth(&admin)
            .json(&json!({ "title": title, "video_url": "https://videos.example.com/1" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        unit_ids.push(unit["id"].as_i64().unwrap());
    }

    let quiz_response = client
        .post(format!("{}/api/admin/courses/{}/quizzes", address, course_id))
        .bearer_auth(&admin)
        .json(&json!({
            "title": "Checkpoint",
            "content_unit_id": unit_ids[1],
            "passing_score": 60.0,
            "questions": [
                { "prompt": "Q1", "options": ["a", "b"], "correct_option": 1 },
                { "prompt": "Q2", "options": ["a", "b"], "correct_option": 0 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(quiz_response.status().as_u16(), 201);
    let quiz_id = quiz_response.json::<Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    // Public course detail hides answer keys
    let detail: Value = client
        .get(format!("{}/api/courses/{}", address, course_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["content_units"].as_array().unwrap().len(), 2);
    assert!(detail["quizzes"][0]["questions"][0].get("correct_option").is_none());

    // 2. Learner completes the first unit, twice
    let learner = register_and_login(&client, &address).await;
    for expected_inserted in [true, false] {
        let update: Value = client
            .post(format!("{}/api/progress", address))
            .bearer_auth(&learner)
            .json(&json!({ "course_id": course_id, "content_unit_id": unit_ids[0] }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(update["inserted"], expected_inserted);
        assert_eq!(update["completed_count"], 1);
        assert_eq!(update["required_count"], 2);
    }

    // 3. Too early for a certificate
    let response = client
        .post(format!("{}/api/courses/{}/certificate", address, course_id))
        .bearer_auth(&learner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Complete all modules to get certificate");

    // 4. Passing the quiz completes the second unit and issues the certificate
    let submission: Value = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(&learner)
        .json(&json!({ "answers": [1, 0] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(submission["passed"], true);
    assert_eq!(submission["score_percent"], 100.0);
    assert_eq!(submission["progress"]["is_complete"], true);
    let certificate_id = submission["progress"]["certificate"]["certificate_id"]
        .as_str()
        .unwrap()
        .to_string();

    // 5. Requesting the certificate again returns the same one
    let certificate: Value = client
        .post(format!("{}/api/courses/{}/certificate", address, course_id))
        .bearer_auth(&learner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(certificate["certificate_id"], certificate_id.as_str());

    let verified = client
        .get(format!("{}/api/certificates/{}", address, certificate_id))
        .send()
        .await
        .unwrap();
    assert_eq!(verified.status().as_u16(), 200);

    let mine: Vec<Value> = client
        .get(format!("{}/api/certificates", address))
        .bearer_auth(&learner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);

    // 6. Summary: lesson XP twice plus the quiz pass
    let summary: Value = client
        .get(format!("{}/api/courses/{}/progress", address, course_id))
        .bearer_auth(&learner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["percent"], 100.0);
    assert_eq!(summary["gamification"]["xp"], 30);
}

#[tokio::test]
async fn xp_endpoint_unlocks_badges() {
    let (address, state) = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &address, &state).await;

    let course: Value = client
        .post(format!("{}/api/admin/courses", address))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Traits" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let course_id = course["id"].as_i64().unwrap();

    let learner = register_and_login(&client, &address).await;

    let response = client
        .post(format!("{}/api/gamification/xp", address))
        .bearer_auth(&learner)
        .json(&json!({ "course_id": course_id, "xp": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let award: Value = client
        .post(format!("{}/api/gamification/xp", address))
        .bearer_auth(&learner)
        .json(&json!({ "course_id": course_id, "xp": 120 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(award["xp"], 120);
    assert_eq!(award["new_badges"], json!(["Beginner"]));

    let entry: Value = client
        .get(format!("{}/api/courses/{}/gamification", address, course_id))
        .bearer_auth(&learner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entry["badges"], json!(["Beginner"]));

    let missing = client
        .get(format!("{}/api/courses/{}/gamification", address, 999_999))
        .bearer_auth(&learner)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}
