use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mongodb::bson::oid::ObjectId;
use portfolio_tracker::{
    config,
    error::StoreError,
    models::{AlertConfig, CurrentUser, DigestFrequency},
    routes::{alerts_routes, home_routes},
    services::{
        alerts_service::AlertsPages,
        notify_service::{Channel, RecordingDispatcher},
        preferences_service::PreferencesStore,
    },
    AppState,
};
use tower::ServiceExt;

fn test_state() -> (AppState, Arc<RecordingDispatcher>) {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let mut state = AppState::in_memory(config::load());
    state.notifier = dispatcher.clone();
    (state, dispatcher)
}

fn test_user(is_premium: bool) -> CurrentUser {
    CurrentUser {
        id: ObjectId::new(),
        email: "test@example.com".to_string(),
        display_name: "Test User".to_string(),
        is_premium,
    }
}

fn app(state: AppState) -> Router {
    alerts_routes::add_routes(Router::new()).with_state(state)
}

fn get(uri: &str, user: &CurrentUser) -> Request<Body> {
    let mut req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("HX-Request", "true")
        .body(Body::empty())
        .unwrap();
    req.extensions_mut().insert(user.clone());
    req
}

fn post(uri: &str, user: &CurrentUser, form: &'static str) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    req.extensions_mut().insert(user.clone());
    req
}

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, String) {
    let res = app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    (status, response_body_string(res).await)
}

#[tokio::test]
async fn alerts_page_renders_defaults_and_history() {
    let (state, _) = test_state();
    let user = test_user(false);

    let (status, body) = send(&state, get("/alerts", &user)).await;
    assert_eq!(status, StatusCode::OK);

    assert!(body.contains("Daily Digest"));
    assert!(body.contains("Save Settings"));
    assert!(body.contains(r#"<option value="daily" selected>"#));
    assert!(body.contains(r#"<option value="immediate" selected>"#));
    // sample feed has two unacknowledged entries
    assert!(body.contains("2 Active Alerts"));
    assert!(body.contains("AAPL Price Alert"));
}

#[tokio::test]
async fn unsigned_request_is_rejected() {
    let (state, _) = test_state();

    let req = Request::builder()
        .method("GET")
        .uri("/alerts")
        .body(Body::empty())
        .unwrap();

    let res = app(state).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn submit_persists_the_whole_config() {
    let (state, _) = test_state();
    let user = test_user(false);

    let (status, body) = send(
        &state,
        post("/alerts/config", &user, "digestFrequency=weekly&bigMoveThreshold=10"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Alert settings updated successfully!"));

    let saved = state.preferences.get(user.id).await.unwrap().unwrap();
    assert_eq!(saved.digest_frequency, DigestFrequency::Weekly);
    assert_eq!(saved.big_move_threshold, 10.0);
    // untouched fields keep their defaults
    assert!(saved.daily_digest);
    assert!(!saved.news_alerts);

    let page = state.pages.snapshot(user.id).unwrap();
    assert!(!page.saving);
    assert!(page.errors.is_empty());
}

#[tokio::test]
async fn out_of_range_threshold_blocks_the_save() {
    let (state, _) = test_state();
    let user = test_user(false);

    let (_, body) = send(&state, post("/alerts/config", &user, "bigMoveThreshold=75")).await;

    assert!(body.contains("Big move threshold must be between 1 and 50."));
    assert!(body.contains("Please fix the highlighted fields."));
    assert!(state.preferences.get(user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn field_change_stays_local_until_submit() {
    let (state, _) = test_state();
    let user = test_user(false);

    let (status, body) = send(
        &state,
        post("/alerts/config/field", &user, "field=newsAlerts&newsAlerts=false&newsAlerts=true"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("text-danger small"));

    assert!(state.pages.snapshot(user.id).unwrap().config.news_alerts);
    assert!(state.preferences.get(user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_field_value_keeps_previous_value() {
    let (state, _) = test_state();
    let user = test_user(false);

    let (_, body) = send(
        &state,
        post("/alerts/config/field", &user, "field=bigMoveThreshold&bigMoveThreshold=0.5"),
    )
    .await;

    assert!(body.contains("Big move threshold must be between 1 and 50."));
    assert_eq!(state.pages.snapshot(user.id).unwrap().config.big_move_threshold, 5.0);
}

#[tokio::test]
async fn unknown_field_is_a_bad_request() {
    let (state, _) = test_state();
    let user = test_user(false);

    let (status, _) = send(&state, post("/alerts/config/field", &user, "field=nope&nope=1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn free_user_cannot_enable_premium_toggles() {
    let (state, _) = test_state();
    let user = test_user(false);

    let (_, body) = send(
        &state,
        post("/alerts/config/field", &user, "field=telegramAlerts&telegramAlerts=true"),
    )
    .await;

    assert!(body.contains("Upgrade to Premium to use Telegram Alerts."));
    assert!(body.contains("Premium Only"));
    assert!(!state.pages.snapshot(user.id).unwrap().config.telegram_alerts);
}

#[tokio::test]
async fn free_user_can_submit_the_form_with_locked_defaults() {
    let (state, _) = test_state();
    let user = test_user(false);

    // the locked checkboxes still post their unchanged values
    let (_, body) = send(
        &state,
        post(
            "/alerts/config",
            &user,
            "telegramAlerts=false&riskAlerts=false&riskAlerts=true&weekendAlerts=false&weekendAlerts=true",
        ),
    )
    .await;

    assert!(body.contains("Alert settings updated successfully!"));
    let saved = state.preferences.get(user.id).await.unwrap().unwrap();
    assert!(saved.weekend_alerts);
    assert!(saved.risk_alerts);
}

#[tokio::test]
async fn premium_user_can_enable_premium_toggles() {
    let (state, _) = test_state();
    let user = test_user(true);

    let (_, body) = send(
        &state,
        post("/alerts/config/field", &user, "field=telegramAlerts&telegramAlerts=true"),
    )
    .await;

    assert!(!body.contains("Premium Only"));
    assert!(state.pages.snapshot(user.id).unwrap().config.telegram_alerts);
}

/// Records the page's `saving` flag while the write is in flight.
struct ObservingStore {
    pages: AlertsPages,
    seen: Mutex<Vec<bool>>,
    fail: bool,
}

#[async_trait]
impl PreferencesStore for ObservingStore {
    async fn get(&self, _user_id: ObjectId) -> Result<Option<AlertConfig>, StoreError> {
        Ok(None)
    }

    async fn upsert(&self, user_id: ObjectId, _config: &AlertConfig) -> Result<(), StoreError> {
        let saving = self.pages.snapshot(user_id).map(|p| p.saving).unwrap_or(false);
        self.seen.lock().unwrap().push(saving);
        if self.fail {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }
}

fn observed_state(fail: bool) -> (AppState, Arc<ObservingStore>) {
    let (mut state, _) = test_state();
    let store = Arc::new(ObservingStore {
        pages: state.pages.clone(),
        seen: Mutex::new(Vec::new()),
        fail,
    });
    state.preferences = store.clone();
    (state, store)
}

#[tokio::test]
async fn saving_is_set_only_while_the_write_runs() {
    let (state, store) = observed_state(false);
    let user = test_user(false);

    let (_, body) = send(&state, post("/alerts/config", &user, "dailyDigest=false")).await;

    assert!(body.contains("Alert settings updated successfully!"));
    assert_eq!(*store.seen.lock().unwrap(), vec![true]);
    assert!(!state.pages.snapshot(user.id).unwrap().saving);
}

#[tokio::test]
async fn failed_save_reports_and_resets_saving() {
    let (state, store) = observed_state(true);
    let user = test_user(false);

    let (_, body) = send(&state, post("/alerts/config", &user, "dailyDigest=false")).await;

    assert!(body.contains("Failed to update alert settings"));
    assert_eq!(store.seen.lock().unwrap().len(), 1);

    let page = state.pages.snapshot(user.id).unwrap();
    assert!(!page.saving);
    // the edited value stays on the page for a retry
    assert!(!page.config.daily_digest);
}

#[tokio::test]
async fn telegram_connect_test_and_disconnect() {
    let (state, dispatcher) = test_state();
    let user = test_user(true);

    let (_, body) = send(
        &state,
        post(
            "/alerts/telegram/connect",
            &user,
            "telegramBotToken=123%3Aabc&telegramChatId=42",
        ),
    )
    .await;
    assert!(body.contains("Telegram bot connected successfully!"));
    assert!(body.contains("Send Test Alert"));

    let connects = dispatcher.connects();
    assert_eq!(connects.len(), 1);
    assert_eq!(connects[0].bot_token, "123:abc");
    assert_eq!(connects[0].chat_id, "42");

    let (_, body) = send(&state, post("/alerts/test/telegram", &user, "")).await;
    assert!(body.contains("Test Telegram alert sent successfully!"));
    assert_eq!(dispatcher.sent(), vec![Channel::Telegram]);

    let (_, body) = send(&state, post("/alerts/telegram/disconnect", &user, "")).await;
    assert!(body.contains("Telegram bot disconnected"));
    assert!(body.contains("Connect Bot"));

    let (_, body) = send(&state, post("/alerts/test/telegram", &user, "")).await;
    assert!(body.contains("Telegram bot is not connected."));
    assert_eq!(dispatcher.sent().len(), 1);
}

#[tokio::test]
async fn telegram_connect_needs_credentials() {
    let (state, dispatcher) = test_state();
    let user = test_user(true);

    let (_, body) = send(&state, post("/alerts/telegram/connect", &user, "telegramChatId=42")).await;

    assert!(body.contains("Enter your bot token and chat ID first."));
    assert!(dispatcher.connects().is_empty());
    assert!(!state.pages.snapshot(user.id).unwrap().connecting);
}

#[tokio::test]
async fn failed_telegram_connect_resets_connecting() {
    let (state, dispatcher) = test_state();
    dispatcher.fail_with("Unauthorized");
    let user = test_user(true);

    let (_, body) = send(
        &state,
        post("/alerts/telegram/connect", &user, "telegramBotToken=bad&telegramChatId=42"),
    )
    .await;

    assert!(body.contains("Failed to connect Telegram bot"));
    let page = state.pages.snapshot(user.id).unwrap();
    assert!(!page.connecting);
    assert!(!page.telegram_connected);
}

#[tokio::test]
async fn free_user_cannot_use_telegram() {
    let (state, dispatcher) = test_state();
    let user = test_user(false);

    let (_, body) = send(
        &state,
        post("/alerts/telegram/connect", &user, "telegramBotToken=1%3Aa&telegramChatId=42"),
    )
    .await;
    assert!(body.contains("Upgrade to Premium to use Telegram Integration."));

    let (_, body) = send(&state, post("/alerts/test/telegram", &user, "")).await;
    assert!(body.contains("Upgrade to Premium to use Telegram Integration."));

    assert!(dispatcher.connects().is_empty());
    assert!(dispatcher.sent().is_empty());
}

#[tokio::test]
async fn test_email_alert_reports_outcome() {
    let (state, dispatcher) = test_state();
    let user = test_user(false);

    let (_, body) = send(&state, post("/alerts/test/email", &user, "")).await;
    assert!(body.contains("Test Email alert sent successfully!"));
    assert_eq!(dispatcher.sent(), vec![Channel::Email]);

    dispatcher.fail_with("webhook down");
    let (_, body) = send(&state, post("/alerts/test/push", &user, "")).await;
    assert!(body.contains("Failed to send test Push alert"));

    // test alerts never touch the stored configuration
    assert!(state.preferences.get(user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_test_channel_is_not_found() {
    let (state, _) = test_state();
    let user = test_user(false);

    let (status, _) = send(&state, post("/alerts/test/carrier-pigeon", &user, "")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn acknowledge_marks_entry_once() {
    let (state, _) = test_state();
    let user = test_user(false);

    send(&state, get("/alerts", &user)).await;

    let (_, body) = send(&state, post("/alerts/history/1/ack", &user, "")).await;
    assert!(body.contains("Alert acknowledged"));
    assert!(body.contains("1 Active Alerts"));
    assert!(body.contains(r#"id="active-alerts" hx-swap-oob="true""#));

    let page = state.pages.snapshot(user.id).unwrap();
    assert!(page.history.iter().find(|e| e.id == "1").unwrap().acknowledged);
    assert!(!page.history.iter().find(|e| e.id == "3").unwrap().acknowledged);

    // already acknowledged: still a success, count unchanged
    let (_, body) = send(&state, post("/alerts/history/1/ack", &user, "")).await;
    assert!(body.contains("Alert acknowledged"));
    assert!(body.contains("1 Active Alerts"));
}

#[tokio::test]
async fn acknowledge_unknown_entry_reports_not_found() {
    let (state, _) = test_state();
    let user = test_user(false);

    let (_, body) = send(&state, post("/alerts/history/does-not-exist/ack", &user, "")).await;

    assert!(body.contains("Alert not found."));
    assert!(body.contains("2 Active Alerts"));
}

async fn connected_premium_user(state: &AppState) -> CurrentUser {
    let user = test_user(true);
    let (_, body) = send(
        state,
        post(
            "/alerts/telegram/connect",
            &user,
            "telegramBotToken=123%3Aabc&telegramChatId=42",
        ),
    )
    .await;
    assert!(body.contains("Telegram bot connected successfully!"));
    user
}

#[tokio::test]
async fn changing_bot_token_drops_the_connection() {
    let (state, dispatcher) = test_state();
    let user = connected_premium_user(&state).await;

    // same value again: still connected
    send(
        &state,
        post("/alerts/config/field", &user, "field=telegramBotToken&telegramBotToken=123%3Aabc"),
    )
    .await;
    assert!(state.pages.snapshot(user.id).unwrap().telegram_connected);

    send(
        &state,
        post("/alerts/config/field", &user, "field=telegramBotToken&telegramBotToken=999%3Azzz"),
    )
    .await;
    assert!(!state.pages.snapshot(user.id).unwrap().telegram_connected);

    let (_, body) = send(&state, post("/alerts/test/telegram", &user, "")).await;
    assert!(body.contains("Telegram bot is not connected."));
    assert!(dispatcher.sent().is_empty());
}

#[tokio::test]
async fn submitting_a_new_chat_id_drops_the_connection() {
    let (state, _) = test_state();
    let user = connected_premium_user(&state).await;

    let (_, body) = send(
        &state,
        post("/alerts/config", &user, "telegramBotToken=123%3Aabc&telegramChatId=77"),
    )
    .await;

    assert!(body.contains("Alert settings updated successfully!"));
    assert!(body.contains("Connect Bot"));
    assert!(!state.pages.snapshot(user.id).unwrap().telegram_connected);
}

#[tokio::test]
async fn dashboard_leaves_alerts_page_state_alone() {
    let (state, _) = test_state();
    let user = connected_premium_user(&state).await;

    send(
        &state,
        post("/alerts/config/field", &user, "field=newsAlerts&newsAlerts=true"),
    )
    .await;

    let home = home_routes::add_routes(Router::new()).with_state(state.clone());
    let res = home.oneshot(get("/", &user)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(response_body_string(res).await.contains("2 Active Alerts"));

    let page = state.pages.snapshot(user.id).unwrap();
    assert!(page.telegram_connected);
    assert!(page.config.news_alerts);
}
