//! Remote Classifier Integration Tests
//!
//! Runs an in-process Axum stand-in for the chat-completions service on an
//! ephemeral port and exercises `RemoteClassifier` and `RiskAssessor`
//! against good, malformed, failing and slow responses.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use machine_guard::classifier::{
    ClassificationPath, ClassifyError, RemoteClassifier, RiskAssessor, RiskClassifier,
    ThresholdClassifier,
};
use machine_guard::config::{ClassifierConfig, MonitorConfig};
use machine_guard::pipeline::Monitor;
use machine_guard::sensors::SyntheticSource;
use machine_guard::types::{MachineId, RiskTier, SensorReading};

// ============================================================================
// Mock service
// ============================================================================

#[derive(Clone)]
enum Reply {
    Content(&'static str),
    Status(StatusCode),
    Delayed(Duration, &'static str),
    NotJson,
    NoChoices,
}

#[derive(Clone)]
struct MockState {
    reply: Reply,
    /// (authorization header, request body) per call
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

fn chat_body(content: &str) -> Json<Value> {
    Json(json!({
        "id": "cmpl-test",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
}

async fn chat_completions(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.seen.lock().unwrap().push((auth, body));

    match state.reply {
        Reply::Content(content) => chat_body(content).into_response(),
        Reply::Status(code) => (code, "upstream unavailable").into_response(),
        Reply::Delayed(delay, content) => {
            tokio::time::sleep(delay).await;
            chat_body(content).into_response()
        }
        Reply::NotJson => "<html>gateway error</html>".into_response(),
        Reply::NoChoices => Json(json!({ "choices": [] })).into_response(),
    }
}

/// Start the mock; returns the endpoint URL and the shared request log.
async fn spawn_mock(reply: Reply) -> (String, MockState) {
    let state = MockState {
        reply,
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1/chat/completions"), state)
}

fn client(endpoint: &str, timeout_secs: u64) -> RemoteClassifier {
    let config = ClassifierConfig {
        endpoint: endpoint.to_string(),
        model: "test-model".to_string(),
        timeout_secs,
        ..ClassifierConfig::default()
    };
    RemoteClassifier::new(&config, "test-key").unwrap()
}

fn assessor(endpoint: &str, timeout_secs: u64) -> RiskAssessor {
    RiskAssessor::with_remote(
        Arc::new(client(endpoint, timeout_secs)),
        ThresholdClassifier::default(),
        Duration::from_secs(timeout_secs),
    )
}

/// Thresholds would call this sample Critical.
fn hot_sample() -> SensorReading {
    SensorReading {
        machine_id: MachineId::new("M1"),
        temperature: 104.25,
        vibration: 4.4,
        gas_level: 18.0,
        timestamp: Utc::now(),
        tick: 1,
    }
}

// ============================================================================
// RemoteClassifier
// ============================================================================

#[tokio::test]
async fn valid_response_is_parsed_and_request_is_well_formed() {
    let (endpoint, state) = spawn_mock(Reply::Content(r#"{"risk_level": "warning"}"#)).await;

    let tier = client(&endpoint, 5).classify(&hot_sample()).await.unwrap();
    assert_eq!(tier, RiskTier::Warning);

    let seen = state.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["messages"][0]["role"], "user");
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("Temperature=104.25"));
    assert!(prompt.contains("risk_level"));
}

#[tokio::test]
async fn server_error_maps_to_status() {
    let (endpoint, _) = spawn_mock(Reply::Status(StatusCode::INTERNAL_SERVER_ERROR)).await;
    let err = client(&endpoint, 5).classify(&hot_sample()).await.unwrap_err();
    assert!(matches!(err, ClassifyError::Status(code) if code.as_u16() == 500));
    assert!(err.is_transport());
}

#[tokio::test]
async fn unparseable_responses_map_to_parse_errors() {
    for reply in [
        Reply::Content("The machine looks critical to me."),
        Reply::Content(r#"{"risk_level": "catastrophic"}"#),
        Reply::NotJson,
        Reply::NoChoices,
    ] {
        let (endpoint, _) = spawn_mock(reply).await;
        let err = client(&endpoint, 5).classify(&hot_sample()).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Parse(_)), "got {err}");
    }
}

// ============================================================================
// RiskAssessor degradation policy
// ============================================================================

#[tokio::test]
async fn remote_answer_overrides_thresholds() {
    let (endpoint, _) = spawn_mock(Reply::Content(r#"{"risk_level": "normal"}"#)).await;
    let mut assessor = assessor(&endpoint, 5);

    let a = assessor.assess(&hot_sample()).await;
    assert_eq!(a.tier, RiskTier::Normal);
    assert_eq!(a.path, ClassificationPath::Remote);
    assert_eq!(assessor.stats().remote, 1);
}

#[tokio::test]
async fn malformed_response_degrades_to_normal() {
    let (endpoint, _) = spawn_mock(Reply::Content("critical")).await;
    let mut assessor = assessor(&endpoint, 5);

    let a = assessor.assess(&hot_sample()).await;
    assert_eq!(a.tier, RiskTier::Normal);
    assert_eq!(a.path, ClassificationPath::Degraded);
    assert_eq!(assessor.stats().parse_failures, 1);
}

#[tokio::test]
async fn server_error_degrades_to_normal() {
    let (endpoint, _) = spawn_mock(Reply::Status(StatusCode::SERVICE_UNAVAILABLE)).await;
    let mut assessor = assessor(&endpoint, 5);

    let a = assessor.assess(&hot_sample()).await;
    assert_eq!(a.tier, RiskTier::Normal);
    assert_eq!(assessor.stats().transport_failures, 1);
}

#[tokio::test]
async fn slow_service_times_out_and_degrades() {
    let (endpoint, _) =
        spawn_mock(Reply::Delayed(Duration::from_secs(5), r#"{"risk_level": "critical"}"#)).await;
    let mut assessor = assessor(&endpoint, 1);

    let started = std::time::Instant::now();
    let a = assessor.assess(&hot_sample()).await;
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(a.tier, RiskTier::Normal);
    assert_eq!(a.path, ClassificationPath::Degraded);
}

#[tokio::test]
async fn unreachable_service_degrades_to_normal() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut assessor = assessor(&format!("http://{addr}/v1/chat/completions"), 2);
    let a = assessor.assess(&hot_sample()).await;
    assert_eq!(a.tier, RiskTier::Normal);
    assert_eq!(assessor.stats().transport_failures, 1);
}

// ============================================================================
// Through the monitor
// ============================================================================

#[tokio::test]
async fn remote_critical_raises_alerts_for_cool_machines() {
    let (endpoint, state) = spawn_mock(Reply::Content(r#"{"risk_level": "CRITICAL"}"#)).await;

    let mut config = MonitorConfig::default();
    config.machines.ids = vec!["M1".to_string(), "M2".to_string()];
    config.generator.temperature = (20.0, 30.0);
    config.generator.vibration = (0.0, 1.0);
    config.generator.gas_level = (0.0, 5.0);

    let source = SyntheticSource::with_seed(config.generator.clone(), 3);
    let mut monitor = Monitor::new(&config, Box::new(source), assessor(&endpoint, 5)).unwrap();
    monitor.tick().await.unwrap();

    let snap = monitor.snapshot();
    assert_eq!(snap.alerts.len(), 2);
    assert!(snap
        .insights
        .summary
        .contains(&"CRITICAL machines: M1, M2".to_string()));
    assert_eq!(state.seen.lock().unwrap().len(), 2);
    assert_eq!(monitor.assessor_stats().remote, 2);
}

#[tokio::test]
async fn degraded_machine_shows_as_normal_and_tick_continues() {
    let (endpoint, _) = spawn_mock(Reply::Status(StatusCode::BAD_GATEWAY)).await;

    let mut config = MonitorConfig::default();
    config.machines.ids = vec!["M1".to_string(), "M2".to_string(), "M3".to_string()];
    config.generator.temperature = (100.0, 110.0);

    let source = SyntheticSource::with_seed(config.generator.clone(), 5);
    let mut monitor = Monitor::new(&config, Box::new(source), assessor(&endpoint, 5)).unwrap();
    monitor.tick().await.unwrap();

    let snap = monitor.snapshot();
    assert_eq!(snap.latest.len(), 3);
    assert!(snap.latest.iter().all(|r| r.risk_level() == RiskTier::Normal));
    assert!(snap.alerts.is_empty());
    assert!(!snap.alarm_active);
    assert_eq!(monitor.last_report().degraded, 3);
}

#[test]
fn credential_in_environment_enables_remote() {
    let mut config = MonitorConfig::default();
    config.classifier.api_key_env = "MACHINE_GUARD_IT_REMOTE_KEY".to_string();

    std::env::set_var("MACHINE_GUARD_IT_REMOTE_KEY", "sk-test");
    let assessor = RiskAssessor::from_config(&config).unwrap();
    assert!(assessor.uses_remote());

    std::env::set_var("MACHINE_GUARD_IT_REMOTE_KEY", "   ");
    let assessor = RiskAssessor::from_config(&config).unwrap();
    assert!(!assessor.uses_remote());
}
