use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde_json::Value;
use shared::{
    error::AdapterError,
    protocol::{AppConfig, CallAccepted, CallRequest, SpaceHost, SpaceInfo, SpaceStatusEvent},
};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

pub mod transport;

use transport::SseDecoder;

pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";
const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_millis(1500);
const DEFAULT_STATUS_POLL_ATTEMPTS: u32 = 120;
const REMOTE_ERROR_FALLBACK: &str = "the remote app raised an error";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid service target '{0}': expected owner/name or an http(s) URL")]
    InvalidTarget(String),
    #[error("could not connect to the recommendation service: {0}")]
    Connection(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("{0}")]
    Remote(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("result stream ended before the prediction completed")]
    StreamEnded,
    #[error("not connected to the recommendation service")]
    NotConnected,
    #[error("session is already established")]
    AlreadyEstablished,
}

impl From<ClientError> for AdapterError {
    fn from(value: ClientError) -> Self {
        let message = value.to_string();
        match value {
            ClientError::InvalidTarget(_)
            | ClientError::Connection(_)
            | ClientError::NotConnected
            | ClientError::AlreadyEstablished => AdapterError::Connection(message),
            ClientError::MalformedResponse(detail) => AdapterError::MalformedResponse(detail),
            ClientError::Http(_)
            | ClientError::Status { .. }
            | ClientError::Remote(_)
            | ClientError::StreamEnded => AdapterError::Transport(message),
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// A connected remote app able to run named prediction endpoints.
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Runs `endpoint` with positional `args` and returns the raw output payload.
    async fn predict(&self, endpoint: &str, args: Vec<Value>) -> Result<Value>;
}

pub type StatusCallback = Arc<dyn Fn(SpaceStatusEvent) + Send + Sync>;

/// Establishes sessions; the seam between the connection manager and a concrete remote client.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect_session(
        &self,
        target: &ServiceTarget,
        on_status: StatusCallback,
    ) -> Result<Arc<dyn PredictionService>>;
}

/// Write-once holder for the session handle shared between the connection task and actions.
#[derive(Clone, Default)]
pub struct SessionSlot {
    inner: Arc<OnceCell<Arc<dyn PredictionService>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn establish(&self, session: Arc<dyn PredictionService>) -> Result<()> {
        self.inner
            .set(session)
            .map_err(|_| ClientError::AlreadyEstablished)
    }

    pub fn is_established(&self) -> bool {
        self.inner.initialized()
    }

    pub fn get(&self) -> Option<Arc<dyn PredictionService>> {
        self.inner.get().cloned()
    }

    /// Fails with [`ClientError::NotConnected`] while the slot is still absent.
    pub async fn predict(&self, endpoint: &str, args: Vec<Value>) -> Result<Value> {
        let Some(session) = self.get() else {
            return Err(ClientError::NotConnected);
        };
        session.predict(endpoint, args).await
    }
}

/// Where the remote app lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceTarget {
    /// A hosted Space, `owner/name`.
    Space(String),
    /// A Gradio app reachable directly.
    Url(Url),
}

impl ServiceTarget {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Url::parse(raw)
                .map(Self::Url)
                .map_err(|_| ClientError::InvalidTarget(raw.to_string()));
        }
        match raw.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::Space(raw.to_string()))
            }
            _ => Err(ClientError::InvalidTarget(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub hub_url: String,
    pub status_poll_interval: Duration,
    pub status_poll_attempts: u32,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            status_poll_interval: DEFAULT_STATUS_POLL_INTERVAL,
            status_poll_attempts: DEFAULT_STATUS_POLL_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageOutcome {
    Running,
    Wait,
    Fail,
}

fn interpret_stage(stage: &str) -> (SpaceStatusEvent, StageOutcome) {
    let event = |status: &str, message: &str| {
        SpaceStatusEvent::new(status)
            .with_detail(stage)
            .with_message(message)
    };
    match stage {
        "RUNNING" | "RUNNING_BUILDING" => (event("running", "Space is running"), StageOutcome::Running),
        "BUILDING" | "APP_STARTING" | "RUNNING_APP_STARTING" => (
            event("building", "Space is building ⏳"),
            StageOutcome::Wait,
        ),
        "SLEEPING" | "STOPPED" => (
            event("sleeping", "Space is asleep, waking it up ⏳"),
            StageOutcome::Wait,
        ),
        "PAUSED" => (
            event("paused", "Space has been paused by its owner"),
            StageOutcome::Fail,
        ),
        "NO_APP_FILE" => (event("error", "Space has no app file"), StageOutcome::Fail),
        "CONFIG_ERROR" => (
            event("error", "Space configuration is invalid"),
            StageOutcome::Fail,
        ),
        "BUILD_ERROR" => (event("error", "Space failed to build"), StageOutcome::Fail),
        "RUNTIME_ERROR" => (
            event("error", "Space crashed at runtime"),
            StageOutcome::Fail,
        ),
        other => (
            event("space_error", &format!("unexpected Space stage {other}")),
            StageOutcome::Fail,
        ),
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ClientError::Status {
            url: response.url().to_string(),
            status: status.as_u16(),
        })
    }
}

fn connection_error(err: ClientError) -> ClientError {
    match err {
        ClientError::Connection(_) => err,
        other => ClientError::Connection(other.to_string()),
    }
}

#[derive(Clone)]
pub struct GradioClient {
    http: Client,
    options: ConnectOptions,
}

impl GradioClient {
    pub fn new(options: ConnectOptions) -> Self {
        Self {
            http: Client::new(),
            options,
        }
    }

    /// Resolves `target`, waits for a Space to come up, and fetches the app config.
    ///
    /// Every phase change is reported through `on_status` before the call returns. Any failure is
    /// reported as [`ClientError::Connection`].
    pub async fn connect<F>(&self, target: &ServiceTarget, on_status: F) -> Result<GradioSession>
    where
        F: Fn(SpaceStatusEvent) + Send + Sync,
    {
        let base_url = match target {
            ServiceTarget::Url(url) => url.as_str().trim_end_matches('/').to_string(),
            ServiceTarget::Space(space) => self
                .resolve_space(space, &on_status)
                .await
                .map_err(connection_error)?,
        };

        let config_url = format!("{base_url}/config");
        let config: AppConfig = async {
            let response = self.http.get(&config_url).send().await?;
            Ok::<_, ClientError>(check_status(response)?.json().await?)
        }
        .await
        .map_err(connection_error)?;

        let api_prefix = config
            .api_prefix
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();
        info!(
            %base_url,
            api_prefix = %api_prefix,
            version = config.version.as_deref().unwrap_or("unknown"),
            "connected to remote app"
        );
        Ok(GradioSession {
            http: self.http.clone(),
            base_url,
            api_prefix,
        })
    }

    async fn resolve_space<F>(&self, space: &str, on_status: &F) -> Result<String>
    where
        F: Fn(SpaceStatusEvent) + Send + Sync,
    {
        let hub = self.options.hub_url.trim_end_matches('/');
        let host_url = format!("{hub}/api/spaces/{space}/host");
        let host: SpaceHost = check_status(self.http.get(&host_url).send().await?)?
            .json()
            .await?;
        let base_url = host.host.trim_end_matches('/').to_string();

        let info_url = format!("{hub}/api/spaces/{space}");
        let attempts = self.options.status_poll_attempts.max(1);
        for attempt in 1..=attempts {
            let info: SpaceInfo = check_status(self.http.get(&info_url).send().await?)?
                .json()
                .await?;
            let Some(runtime) = info.runtime else {
                debug!(%space, "space reports no runtime; assuming it is running");
                return Ok(base_url);
            };

            let (event, outcome) = interpret_stage(&runtime.stage);
            debug!(%space, stage = %runtime.stage, attempt, "space status");
            let failure = event.message.clone().unwrap_or_default();
            on_status(event);
            match outcome {
                StageOutcome::Running => return Ok(base_url),
                StageOutcome::Fail => {
                    warn!(%space, stage = %runtime.stage, "space is not usable");
                    return Err(ClientError::Connection(failure));
                }
                StageOutcome::Wait => {
                    if runtime.stage == "SLEEPING" || runtime.stage == "STOPPED" {
                        // Any request to the host wakes a sleeping Space.
                        if let Err(error) = self.http.get(&base_url).send().await {
                            debug!(%space, %error, "wake-up request failed");
                        }
                    }
                    if attempt < attempts {
                        tokio::time::sleep(self.options.status_poll_interval).await;
                    }
                }
            }
        }

        Err(ClientError::Connection(format!(
            "Space {space} did not become ready after {attempts} status checks"
        )))
    }
}

#[async_trait]
impl SessionConnector for GradioClient {
    async fn connect_session(
        &self,
        target: &ServiceTarget,
        on_status: StatusCallback,
    ) -> Result<Arc<dyn PredictionService>> {
        let session = self.connect(target, move |event| on_status(event)).await?;
        Ok(Arc::new(session))
    }
}

/// Established session against one remote app.
#[derive(Debug, Clone)]
pub struct GradioSession {
    http: Client,
    base_url: String,
    api_prefix: String,
}

impl GradioSession {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn call_url(&self, endpoint: &str) -> String {
        format!(
            "{}{}/call/{}",
            self.base_url,
            self.api_prefix,
            endpoint.trim_start_matches('/')
        )
    }

    async fn await_result(&self, url: &str) -> Result<Value> {
        let response = check_status(self.http.get(url).send().await?)?;
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = stream.next().await {
            for event in decoder.push(&chunk?) {
                if let Some(result) = interpret_event(&event.event, &event.data) {
                    return result;
                }
            }
        }
        if let Some(event) = decoder.finish() {
            if let Some(result) = interpret_event(&event.event, &event.data) {
                return result;
            }
        }
        Err(ClientError::StreamEnded)
    }
}

fn interpret_event(event: &str, data: &str) -> Option<Result<Value>> {
    match event {
        "complete" => Some(
            serde_json::from_str(data)
                .map_err(|err| ClientError::MalformedResponse(format!("complete event: {err}"))),
        ),
        "error" => {
            let message = match serde_json::from_str::<Value>(data) {
                Ok(Value::String(message)) if !message.trim().is_empty() => message,
                Ok(Value::String(_)) | Ok(Value::Null) => REMOTE_ERROR_FALLBACK.to_string(),
                Ok(other) => other.to_string(),
                Err(_) if data.trim().is_empty() => REMOTE_ERROR_FALLBACK.to_string(),
                Err(_) => data.to_string(),
            };
            Some(Err(ClientError::Remote(message)))
        }
        _ => None,
    }
}

#[async_trait]
impl PredictionService for GradioSession {
    async fn predict(&self, endpoint: &str, args: Vec<Value>) -> Result<Value> {
        let call_url = self.call_url(endpoint);
        let accepted: CallAccepted = check_status(
            self.http
                .post(&call_url)
                .json(&CallRequest { data: args })
                .send()
                .await?,
        )?
        .json()
        .await
        .map_err(|err| ClientError::MalformedResponse(format!("call was not accepted: {err}")))?;

        debug!(endpoint, event_id = %accepted.event_id, "prediction queued");
        self.await_result(&format!("{call_url}/{}", accepted.event_id))
            .await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
