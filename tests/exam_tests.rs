// tests/exam_tests.rs

use chrono::{TimeZone, Utc};
use drivers_ed::{
    config::Config,
    routes,
    services::{exam::QuestionBank, payment::MockPaymentProcessor},
    state::AppState,
    storage::MemoryStore,
    utils::clock::ManualClock,
};
use serde_json::{Value, json};
use std::{collections::HashMap, sync::Arc, time::Duration};

/// Spawns the app with an in-memory store and returns its base URL.
async fn spawn_app() -> String {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap());

    let state = AppState::initialize(
        &Config::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(clock),
        Arc::new(MockPaymentProcessor::new(Duration::ZERO)),
        QuestionBank::builtin(),
    )
    .await;

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Spawns the app and buys premium so exams can be opened.
async fn spawn_premium_app(client: &reqwest::Client) -> String {
    let address = spawn_app().await;
    let outcome: Value = client
        .post(format!("{}/api/access/purchase", address))
        .json(&json!({ "tier": "premium", "method": "flutterwave" }))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(outcome["success"], true);
    address
}

fn answer_key() -> HashMap<u64, u8> {
    QuestionBank::builtin()
        .questions()
        .iter()
        .map(|q| (u64::from(q.id), q.correct_option))
        .collect()
}

async fn post(client: &reqwest::Client, url: String) -> reqwest::Response {
    client
        .post(url)
        .send()
        .await
        .expect("Failed to execute request")
}

async fn open_and_start(client: &reqwest::Client, address: &str) -> Value {
    let response = post(client, format!("{}/api/exams", address)).await;
    assert_eq!(response.status().as_u16(), 201);
    let opened: Value = response.json().await.unwrap();
    assert_eq!(opened["state"], "not_started");

    let id = opened["id"].as_str().unwrap();
    let response = post(client, format!("{}/api/exams/{}/start", address, id)).await;
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

/// Walks every question, answering the first `correct` of them right and the rest wrong.
async fn answer_all(client: &reqwest::Client, address: &str, started: &Value, correct: usize) {
    let id = started["id"].as_str().unwrap();
    let total = started["total_questions"].as_u64().unwrap() as usize;
    let key = answer_key();
    let mut view = started.clone();

    for index in 0..total {
        let question_id = view["current_question"]["id"].as_u64().unwrap();
        let right = key[&question_id];
        let option = if index < correct { right } else { (right + 1) % 4 };

        let response = client
            .post(format!("{}/api/exams/{}/answers", address, id))
            .json(&json!({ "question_id": question_id, "option_index": option }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);

        view = post(client, format!("{}/api/exams/{}/advance", address, id))
            .await
            .json()
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_exam_requires_premium() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = post(&client, format!("{}/api/exams", address)).await;

    // Assert
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Practice exams require premium access");
}

#[tokio::test]
async fn test_full_exam_pass() {
    // Arrange
    let client = reqwest::Client::new();
    let address = spawn_premium_app(&client).await;
    let started = open_and_start(&client, &address).await;
    let id = started["id"].as_str().unwrap().to_string();

    assert_eq!(started["state"], "active");
    assert_eq!(started["total_questions"], 10);
    assert_eq!(started["remaining_seconds"], 1200);
    // Correct answers are hidden while the exam runs
    assert!(started["current_question"]["correct_option"].is_null());
    assert!(started["review"].is_null());

    // Act: 8 of 10 right
    answer_all(&client, &address, &started, 8).await;
    let response = post(&client, format!("{}/api/exams/{}/submit", address, id)).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let submitted: Value = response.json().await.unwrap();
    assert_eq!(submitted["state"], "completed");
    assert_eq!(submitted["result"]["correct_count"], 8);
    assert_eq!(submitted["result"]["total_count"], 10);
    assert_eq!(submitted["result"]["percentage"], 80);
    assert_eq!(submitted["result"]["passed"], true);
    assert_eq!(submitted["review"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_failing_exam_below_threshold() {
    // Arrange
    let client = reqwest::Client::new();
    let address = spawn_premium_app(&client).await;
    let started = open_and_start(&client, &address).await;
    let id = started["id"].as_str().unwrap().to_string();

    // Act: 6 of 10 right
    answer_all(&client, &address, &started, 6).await;
    let submitted: Value = post(&client, format!("{}/api/exams/{}/submit", address, id))
        .await
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(submitted["result"]["percentage"], 60);
    assert_eq!(submitted["result"]["passed"], false);
}

#[tokio::test]
async fn test_double_submit_records_one_result() {
    // Arrange
    let client = reqwest::Client::new();
    let address = spawn_premium_app(&client).await;
    let started = open_and_start(&client, &address).await;
    let id = started["id"].as_str().unwrap().to_string();
    answer_all(&client, &address, &started, 10).await;

    // Act
    let first: Value = post(&client, format!("{}/api/exams/{}/submit", address, id))
        .await
        .json()
        .await
        .unwrap();
    let second_response = post(&client, format!("{}/api/exams/{}/submit", address, id)).await;

    // Assert
    assert_eq!(second_response.status().as_u16(), 200);
    let second: Value = second_response.json().await.unwrap();
    assert_eq!(first["result"], second["result"]);

    let history: Value = client
        .get(format!("{}/api/exams/history", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["percentage"], 100);

    let summary: Value = client
        .get(format!("{}/api/exams/history/summary", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["total_attempts"], 1);
    assert_eq!(summary["passed_attempts"], 1);
    assert_eq!(summary["best_percentage"], 100);
}

#[tokio::test]
async fn test_wrong_state_operations_conflict() {
    // Arrange
    let client = reqwest::Client::new();
    let address = spawn_premium_app(&client).await;
    let opened: Value = post(&client, format!("{}/api/exams", address))
        .await
        .json()
        .await
        .unwrap();
    let id = opened["id"].as_str().unwrap().to_string();

    // Act: submit before starting
    let response = post(&client, format!("{}/api/exams/{}/submit", address, id)).await;

    // Assert
    assert_eq!(response.status().as_u16(), 409);

    // Retrying a running exam is also a conflict
    post(&client, format!("{}/api/exams/{}/start", address, id)).await;
    let response = post(&client, format!("{}/api/exams/{}/retry", address, id)).await;
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn test_invalid_option_is_bad_request() {
    // Arrange
    let client = reqwest::Client::new();
    let address = spawn_premium_app(&client).await;
    let started = open_and_start(&client, &address).await;
    let id = started["id"].as_str().unwrap();
    let question_id = started["current_question"]["id"].as_u64().unwrap();

    // Act
    let response = client
        .post(format!("{}/api/exams/{}/answers", address, id))
        .json(&json!({ "question_id": question_id, "option_index": 4 }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_opening_new_exam_discards_old_one() {
    // Arrange
    let client = reqwest::Client::new();
    let address = spawn_premium_app(&client).await;
    let first = open_and_start(&client, &address).await;
    let first_id = first["id"].as_str().unwrap();

    // Act
    let second: Value = post(&client, format!("{}/api/exams", address))
        .await
        .json()
        .await
        .unwrap();

    // Assert
    assert_ne!(second["id"], first["id"]);
    let response = client
        .get(format!("{}/api/exams/{}", address, first_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_retry_and_explanation_after_completion() {
    // Arrange
    let client = reqwest::Client::new();
    let address = spawn_premium_app(&client).await;
    let started = open_and_start(&client, &address).await;
    let id = started["id"].as_str().unwrap().to_string();
    let question_id = started["current_question"]["id"].as_u64().unwrap();
    answer_all(&client, &address, &started, 0).await;
    post(&client, format!("{}/api/exams/{}/submit", address, id)).await;

    // Act
    let explanation: Value = client
        .get(format!(
            "{}/api/exams/{}/questions/{}/explanation",
            address, id, question_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let response = post(&client, format!("{}/api/exams/{}/retry", address, id)).await;

    // Assert
    assert_eq!(explanation["is_correct"], false);
    assert_eq!(
        explanation["correct_option"].as_u64().unwrap() as u8,
        answer_key()[&question_id]
    );

    assert_eq!(response.status().as_u16(), 201);
    let fresh: Value = response.json().await.unwrap();
    assert_ne!(fresh["id"].as_str().unwrap(), id);
    assert_eq!(fresh["state"], "not_started");
    assert_eq!(fresh["answers"], json!({}));
}

#[tokio::test]
async fn test_closing_exam_leaves_no_history() {
    // Arrange
    let client = reqwest::Client::new();
    let address = spawn_premium_app(&client).await;
    let started = open_and_start(&client, &address).await;
    let id = started["id"].as_str().unwrap();

    // Act
    let response = client
        .delete(format!("{}/api/exams/{}", address, id))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 204);
    let history: Value = client
        .get(format!("{}/api/exams/history", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(history.as_array().unwrap().is_empty());
}
