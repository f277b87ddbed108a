use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Engine, EngineError, Notifier};
use migration::MigratorTrait;
use server::{ServerState, router};

#[derive(Default)]
struct RecordingNotifier {
    subjects: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, _to: &str, subject: &str, _body: &str) -> Result<(), EngineError> {
        self.subjects.lock().unwrap().push(subject.to_string());
        Ok(())
    }
}

async fn app() -> (Router, Arc<RecordingNotifier>) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Engine::builder()
        .database(db)
        .notifier(notifier.clone())
        .build()
        .await
        .unwrap();
    let state = ServerState {
        engine: Arc::new(engine),
    };
    (router(state), notifier)
}

async fn call(app: &Router, method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        req = req
            .header("x-user-id", user)
            .header("x-user-email", format!("{user}@example.com"));
    }
    let req = match body {
        Some(body) => req
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_account(app: &Router, user: &str, opening: i64) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/accounts",
        Some(user),
        Some(json!({ "name": "Main", "opening_balance_minor": opening })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn requests_without_identity_are_rejected() {
    let (app, _) = app().await;
    let (status, body) = call(&app, "GET", "/accounts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("identity"));
}

#[tokio::test]
async fn post_amend_retract_round() {
    let (app, _) = app().await;
    let account = create_account(&app, "alice", 10_000).await;

    let (status, tx) = call(
        &app,
        "POST",
        "/transactions",
        Some("alice"),
        Some(json!({
            "account_id": account,
            "kind": "EXPENSE",
            "amount_minor": 2_500,
            "category": "Food",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tx_id = tx["id"].as_str().unwrap().to_string();

    let (_, acc) = call(&app, "GET", &format!("/accounts/{account}"), Some("alice"), None).await;
    assert_eq!(acc["balance_minor"], 7_500);

    let (status, amended) = call(
        &app,
        "PUT",
        &format!("/transactions/{tx_id}"),
        Some("alice"),
        Some(json!({
            "account_id": account,
            "kind": "INCOME",
            "amount_minor": 1_000,
            "category": "Salary",
            "occurred_at": tx["occurred_at"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amended["version"], 1);

    let (_, acc) = call(&app, "GET", &format!("/accounts/{account}"), Some("alice"), None).await;
    assert_eq!(acc["balance_minor"], 11_000);

    let (status, _) = call(
        &app,
        "DELETE",
        &format!("/transactions/{tx_id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, acc) = call(&app, "GET", &format!("/accounts/{account}"), Some("alice"), None).await;
    assert_eq!(acc["balance_minor"], 10_000);

    let (status, _) = call(
        &app,
        "GET",
        &format!("/transactions/{tx_id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn engine_errors_map_to_status_codes() {
    let (app, _) = app().await;
    let account = create_account(&app, "alice", 0).await;
    create_account(&app, "bob", 0).await;

    let (status, _) = call(
        &app,
        "POST",
        "/transactions",
        Some("alice"),
        Some(json!({
            "account_id": account,
            "kind": "EXPENSE",
            "amount_minor": 0,
            "category": "Food",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        "POST",
        "/transactions",
        Some("bob"),
        Some(json!({
            "account_id": account,
            "kind": "EXPENSE",
            "amount_minor": 100,
            "category": "Food",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/budget", Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn budget_and_alert_run() {
    let (app, notifier) = app().await;
    let account = create_account(&app, "alice", 0).await;

    let (status, budget) = call(
        &app,
        "PUT",
        "/budget",
        Some("alice"),
        Some(json!({ "amount_minor": 10_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(budget["percent_used"], 0);

    call(
        &app,
        "POST",
        "/transactions",
        Some("alice"),
        Some(json!({
            "account_id": account,
            "kind": "EXPENSE",
            "amount_minor": 5_000,
            "category": "Rent",
        })),
    )
    .await;

    let (_, budget) = call(&app, "GET", "/budget", Some("alice"), None).await;
    assert_eq!(budget["spent_minor"], 5_000);
    assert_eq!(budget["percent_used"], 50);

    let (status, summary) = call(&app, "POST", "/alerts/run", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["sent"], 1);
    assert_eq!(
        notifier.subjects.lock().unwrap().as_slice(),
        ["Budget Alert: 50% spent!".to_string()]
    );

    let (_, summary) = call(&app, "POST", "/alerts/run", Some("alice"), None).await;
    assert_eq!(summary["sent"], 0);
    assert_eq!(summary["skipped"], 1);
}

#[tokio::test]
async fn list_transactions_filters_by_kind() {
    let (app, _) = app().await;
    let account = create_account(&app, "alice", 0).await;
    for (kind, amount) in [("INCOME", 1_000), ("EXPENSE", 200), ("EXPENSE", 300)] {
        call(
            &app,
            "POST",
            "/transactions",
            Some("alice"),
            Some(json!({
                "account_id": account,
                "kind": kind,
                "amount_minor": amount,
                "category": "General",
            })),
        )
        .await;
    }

    let (status, body) = call(&app, "GET", "/transactions?kind=EXPENSE", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);

    let (_, body) = call(&app, "GET", "/accounts", Some("alice"), None).await;
    let accounts = body["accounts"].as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["balance_minor"], 500);
    assert_eq!(accounts[0]["is_default"], true);
}
