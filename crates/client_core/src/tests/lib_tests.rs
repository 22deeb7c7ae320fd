use super::*;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex as StdMutex},
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct MockAppState {
    base_url: Arc<Mutex<String>>,
    api_prefix: Option<String>,
    stages: Arc<Mutex<VecDeque<&'static str>>>,
    calls: Arc<Mutex<Vec<Value>>>,
    result_stream: Arc<String>,
    wakeups: Arc<Mutex<u32>>,
}

impl MockAppState {
    fn new(api_prefix: Option<&str>, result_stream: impl Into<String>) -> Self {
        Self {
            base_url: Arc::new(Mutex::new(String::new())),
            api_prefix: api_prefix.map(str::to_string),
            stages: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            result_stream: Arc::new(result_stream.into()),
            wakeups: Arc::new(Mutex::new(0)),
        }
    }

    fn with_stages(self, stages: &[&'static str]) -> Self {
        *self.stages.try_lock().expect("fresh state") = stages.iter().copied().collect();
        self
    }
}

async fn handle_config(State(state): State<MockAppState>) -> Json<Value> {
    Json(json!({ "version": "5.9.1", "api_prefix": state.api_prefix }))
}

async fn handle_space_host(State(state): State<MockAppState>) -> Json<Value> {
    let host = state.base_url.lock().await.clone();
    Json(json!({ "subdomain": "owner-space", "host": host }))
}

async fn handle_space_info(State(state): State<MockAppState>) -> Json<Value> {
    let stage = state.stages.lock().await.pop_front().unwrap_or("RUNNING");
    Json(json!({ "id": "owner/space", "runtime": { "stage": stage } }))
}

async fn handle_wakeup(State(state): State<MockAppState>) -> &'static str {
    *state.wakeups.lock().await += 1;
    "awake"
}

async fn handle_call(
    State(state): State<MockAppState>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    state.calls.lock().await.push(payload["data"].clone());
    Json(json!({ "event_id": "evt-1" }))
}

async fn handle_result(State(state): State<MockAppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        state.result_stream.as_str().to_string(),
    )
}

async fn spawn_mock_app(state: MockAppState) -> std::io::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let base_url = format!("http://{addr}");
    *state.base_url.lock().await = base_url.clone();

    let prefix = state.api_prefix.clone().unwrap_or_default();
    let app = Router::new()
        .route("/", get(handle_wakeup))
        .route("/config", get(handle_config))
        .route("/api/spaces/:owner/:name", get(handle_space_info))
        .route("/api/spaces/:owner/:name/host", get(handle_space_host))
        .route(&format!("{prefix}/call/recommend"), post(handle_call))
        .route(&format!("{prefix}/call/recommend/:event_id"), get(handle_result))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(base_url)
}

async fn spawn_router(app: Router) -> std::io::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

async fn handle_plain_config() -> Json<Value> {
    Json(json!({ "version": "5.9.1" }))
}

async fn handle_accepted() -> Json<Value> {
    Json(json!({ "event_id": "evt-1" }))
}

async fn handle_server_error() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

fn fast_options(hub_url: &str, attempts: u32) -> ConnectOptions {
    ConnectOptions {
        hub_url: hub_url.to_string(),
        status_poll_interval: Duration::from_millis(1),
        status_poll_attempts: attempts,
    }
}

fn recorder() -> (Arc<StdMutex<Vec<SpaceStatusEvent>>>, impl Fn(SpaceStatusEvent) + Send + Sync) {
    let events = Arc::new(StdMutex::new(Vec::new()));
    let sink = {
        let events = events.clone();
        move |event: SpaceStatusEvent| events.lock().expect("events").push(event)
    };
    (events, sink)
}

const COMPLETE_STREAM: &str = "event: generating\ndata: null\n\n\
event: complete\ndata: [null, null, \"**profile**\", \"<ul><li>A</li></ul>\", null]\n\n";

#[tokio::test]
async fn url_target_connects_and_predict_returns_complete_payload() {
    let state = MockAppState::new(Some("/gradio_api"), COMPLETE_STREAM);
    let base_url = spawn_mock_app(state.clone()).await.expect("spawn app");

    let target = ServiceTarget::parse(&base_url).expect("target");
    let client = GradioClient::new(fast_options(&base_url, 1));
    let session = client.connect(&target, |_| {}).await.expect("connect");
    assert_eq!(session.base_url(), base_url);

    let output = session
        .predict(
            "/recommend",
            vec![json!("tourist"), json!(["dp", "graphs"]), json!(5)],
        )
        .await
        .expect("predict");

    assert_eq!(output[2], json!("**profile**"));
    assert_eq!(output[3], json!("<ul><li>A</li></ul>"));
    let calls = state.calls.lock().await;
    assert_eq!(
        calls.as_slice(),
        &[json!(["tourist", ["dp", "graphs"], 5])]
    );
}

#[tokio::test]
async fn remote_error_event_becomes_remote_error() {
    let state = MockAppState::new(None, "event: error\ndata: \"user not found\"\n\n");
    let base_url = spawn_mock_app(state).await.expect("spawn app");

    let target = ServiceTarget::parse(&base_url).expect("target");
    let session = GradioClient::new(fast_options(&base_url, 1))
        .connect(&target, |_| {})
        .await
        .expect("connect");
    let err = session
        .predict("/recommend", vec![json!("x"), json!([]), json!(1)])
        .await
        .expect_err("must fail");

    assert!(matches!(&err, ClientError::Remote(message) if message == "user not found"));
}

#[tokio::test]
async fn null_error_event_uses_generic_message() {
    let state = MockAppState::new(None, "event: error\ndata: null\n\n");
    let base_url = spawn_mock_app(state).await.expect("spawn app");

    let target = ServiceTarget::parse(&base_url).expect("target");
    let session = GradioClient::new(fast_options(&base_url, 1))
        .connect(&target, |_| {})
        .await
        .expect("connect");
    let err = session
        .predict("recommend", Vec::new())
        .await
        .expect_err("must fail");

    assert_eq!(err.to_string(), REMOTE_ERROR_FALLBACK);
}

#[tokio::test]
async fn stream_without_result_is_reported() {
    let state = MockAppState::new(None, "event: heartbeat\ndata: null\n\n");
    let base_url = spawn_mock_app(state).await.expect("spawn app");

    let target = ServiceTarget::parse(&base_url).expect("target");
    let session = GradioClient::new(fast_options(&base_url, 1))
        .connect(&target, |_| {})
        .await
        .expect("connect");
    let err = session
        .predict("/recommend", Vec::new())
        .await
        .expect_err("must fail");

    assert!(matches!(err, ClientError::StreamEnded));
    assert!(matches!(AdapterError::from(err), AdapterError::Transport(_)));
}

#[tokio::test]
async fn space_target_reports_stages_until_running() {
    let state = MockAppState::new(None, COMPLETE_STREAM).with_stages(&["SLEEPING", "BUILDING", "RUNNING"]);
    let hub_url = spawn_mock_app(state.clone()).await.expect("spawn app");

    let (events, sink) = recorder();
    let session = GradioClient::new(fast_options(&hub_url, 10))
        .connect(&ServiceTarget::Space("owner/space".into()), sink)
        .await
        .expect("connect");
    assert_eq!(session.base_url(), hub_url);

    let lines: Vec<String> = events
        .lock()
        .expect("events")
        .iter()
        .map(SpaceStatusEvent::status_line)
        .collect();
    assert_eq!(
        lines,
        vec![
            "SLEEPING: Space is asleep, waking it up ⏳".to_string(),
            "BUILDING: Space is building ⏳".to_string(),
            "RUNNING: Space is running".to_string(),
        ]
    );
    assert_eq!(*state.wakeups.lock().await, 1);
}

#[tokio::test]
async fn broken_space_fails_with_connection_error() {
    let state = MockAppState::new(None, COMPLETE_STREAM).with_stages(&["BUILD_ERROR"]);
    let hub_url = spawn_mock_app(state).await.expect("spawn app");

    let (events, sink) = recorder();
    let err = GradioClient::new(fast_options(&hub_url, 10))
        .connect(&ServiceTarget::Space("owner/space".into()), sink)
        .await
        .expect_err("must fail");

    assert!(matches!(&err, ClientError::Connection(message) if message.contains("failed to build")));
    assert_eq!(events.lock().expect("events").len(), 1);
}

#[tokio::test]
async fn space_that_never_starts_exhausts_status_checks() {
    let state =
        MockAppState::new(None, COMPLETE_STREAM).with_stages(&["BUILDING", "BUILDING", "BUILDING"]);
    let hub_url = spawn_mock_app(state).await.expect("spawn app");

    let err = GradioClient::new(fast_options(&hub_url, 2))
        .connect(&ServiceTarget::Space("owner/space".into()), |_| {})
        .await
        .expect_err("must fail");

    assert!(err.to_string().contains("after 2 status checks"), "{err}");
}

#[tokio::test]
async fn unreachable_app_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let base_url = format!("http://{addr}");
    let target = ServiceTarget::parse(&base_url).expect("target");
    let err = GradioClient::new(fast_options(&base_url, 1))
        .connect(&target, |_| {})
        .await
        .expect_err("must fail");

    assert!(matches!(err, ClientError::Connection(_)));
}

#[tokio::test]
async fn config_failure_status_is_a_connection_error() {
    let base_url = spawn_router(Router::new().route("/config", get(handle_server_error)))
        .await
        .expect("spawn app");

    let target = ServiceTarget::parse(&base_url).expect("target");
    let err = GradioClient::new(fast_options(&base_url, 1))
        .connect(&target, |_| {})
        .await
        .expect_err("must fail");

    assert!(matches!(&err, ClientError::Connection(message) if message.contains("status 500")), "{err}");
}

#[tokio::test]
async fn rejected_call_is_a_transport_error() {
    let app = Router::new()
        .route("/config", get(handle_plain_config))
        .route("/call/recommend", post(handle_server_error));
    let base_url = spawn_router(app).await.expect("spawn app");

    let target = ServiceTarget::parse(&base_url).expect("target");
    let session = GradioClient::new(fast_options(&base_url, 1))
        .connect(&target, |_| {})
        .await
        .expect("connect");
    let err = session
        .predict("/recommend", vec![json!("x"), json!([]), json!(1)])
        .await
        .expect_err("must fail");

    assert!(matches!(err, ClientError::Status { status: 500, .. }), "{err}");
    assert!(matches!(AdapterError::from(err), AdapterError::Transport(_)));
}

#[tokio::test]
async fn failing_result_stream_is_a_transport_error() {
    let app = Router::new()
        .route("/config", get(handle_plain_config))
        .route("/call/recommend", post(handle_accepted))
        .route("/call/recommend/:event_id", get(handle_server_error));
    let base_url = spawn_router(app).await.expect("spawn app");

    let target = ServiceTarget::parse(&base_url).expect("target");
    let session = GradioClient::new(fast_options(&base_url, 1))
        .connect(&target, |_| {})
        .await
        .expect("connect");
    let err = session
        .predict("/recommend", Vec::new())
        .await
        .expect_err("must fail");

    match &err {
        ClientError::Status { url, status } => {
            assert_eq!(*status, 500);
            assert!(url.ends_with("/call/recommend/evt-1"), "{url}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(AdapterError::from(err), AdapterError::Transport(_)));
}

#[tokio::test]
async fn running_while_building_counts_as_running() {
    let state = MockAppState::new(None, COMPLETE_STREAM).with_stages(&["RUNNING_BUILDING"]);
    let hub_url = spawn_mock_app(state).await.expect("spawn app");

    let (events, sink) = recorder();
    GradioClient::new(fast_options(&hub_url, 3))
        .connect(&ServiceTarget::Space("owner/space".into()), sink)
        .await
        .expect("connect");

    let events = events.lock().expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, "running");
    assert_eq!(events[0].status_line(), "RUNNING_BUILDING: Space is running");
}

#[tokio::test]
async fn paused_space_fails_without_waiting() {
    let state = MockAppState::new(None, COMPLETE_STREAM).with_stages(&["PAUSED", "RUNNING"]);
    let hub_url = spawn_mock_app(state.clone()).await.expect("spawn app");

    let err = GradioClient::new(fast_options(&hub_url, 5))
        .connect(&ServiceTarget::Space("owner/space".into()), |_| {})
        .await
        .expect_err("must fail");

    assert!(matches!(&err, ClientError::Connection(message) if message.contains("paused")), "{err}");
    assert_eq!(*state.wakeups.lock().await, 0);
    assert_eq!(state.stages.lock().await.len(), 1);
}

#[tokio::test]
async fn unknown_stage_fails_without_retrying() {
    let state = MockAppState::new(None, COMPLETE_STREAM).with_stages(&["MIGRATING", "RUNNING"]);
    let hub_url = spawn_mock_app(state.clone()).await.expect("spawn app");

    let (events, sink) = recorder();
    let err = GradioClient::new(fast_options(&hub_url, 5))
        .connect(&ServiceTarget::Space("owner/space".into()), sink)
        .await
        .expect_err("must fail");

    assert!(
        matches!(&err, ClientError::Connection(message) if message == "unexpected Space stage MIGRATING"),
        "{err}"
    );
    let events = events.lock().expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, "space_error");
    assert_eq!(state.stages.lock().await.len(), 1);
}

struct FixedService(Value);

#[async_trait]
impl PredictionService for FixedService {
    async fn predict(&self, _endpoint: &str, _args: Vec<Value>) -> Result<Value> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn session_slot_is_write_once() {
    let slot = SessionSlot::new();
    assert!(!slot.is_established());
    let err = slot
        .predict("/recommend", Vec::new())
        .await
        .expect_err("absent session");
    assert!(matches!(err, ClientError::NotConnected));

    slot.establish(Arc::new(FixedService(json!(["first"]))))
        .expect("first establish");
    let again = slot.establish(Arc::new(FixedService(json!(["second"]))));
    assert!(matches!(again, Err(ClientError::AlreadyEstablished)));

    let output = slot.predict("/recommend", Vec::new()).await.expect("predict");
    assert_eq!(output, json!(["first"]));
}

#[test]
fn service_targets_parse_space_ids_and_urls() {
    assert_eq!(
        ServiceTarget::parse("Sai-ganesh-09/CF_Problem_Recommender").expect("space"),
        ServiceTarget::Space("Sai-ganesh-09/CF_Problem_Recommender".into())
    );
    assert!(matches!(
        ServiceTarget::parse("http://127.0.0.1:7860/").expect("url"),
        ServiceTarget::Url(_)
    ));
    for bad in ["", "justname", "a/b/c", "/name", "owner/"] {
        assert!(ServiceTarget::parse(bad).is_err(), "{bad}");
    }
}
