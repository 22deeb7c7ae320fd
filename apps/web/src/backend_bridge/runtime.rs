//! Connection manager: establishes the single session at startup and reports its progress.

use std::sync::Arc;

use client_core::{ServiceTarget, SessionConnector, StatusCallback};
use shared::{error::AdapterError, protocol::SpaceStatusEvent};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::controller::{
    events::{ConnectionPhase, UiError, UiErrorContext, UiEvent, STATUS_CONNECTING, STATUS_READY},
    orchestration::RecommendController,
};

/// Starts connecting in the background. The trigger is left untouched; actions issued before
/// the session exists fail at request time.
pub fn launch_connection(
    controller: RecommendController,
    connector: Arc<dyn SessionConnector>,
    target: String,
) -> JoinHandle<()> {
    controller.dispatch(UiEvent::Status(STATUS_CONNECTING.to_string()));
    tokio::spawn(async move { connect(&controller, connector.as_ref(), &target).await })
}

pub async fn connect(
    controller: &RecommendController,
    connector: &dyn SessionConnector,
    target: &str,
) {
    let result = match ServiceTarget::parse(target) {
        Ok(target) => {
            let status_controller = controller.clone();
            let on_status: StatusCallback = Arc::new(move |event: SpaceStatusEvent| {
                status_controller.dispatch(UiEvent::Status(event.status_line()));
            });
            connector.connect_session(&target, on_status).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(session) => {
            if let Err(err) = controller.session().establish(session) {
                warn!(%err, "ignoring second session");
                return;
            }
            info!(%target, "session established");
            controller.dispatch(UiEvent::Connection(ConnectionPhase::Established));
            controller.dispatch(UiEvent::Status(STATUS_READY.to_string()));
        }
        Err(err) => {
            error!(%target, %err, "connection failed; no reconnect will be attempted");
            controller.dispatch(UiEvent::Connection(ConnectionPhase::Failed));
            controller.dispatch(UiEvent::Error(UiError::from_adapter(
                UiErrorContext::Connect,
                AdapterError::from(err),
            )));
        }
    }
}
