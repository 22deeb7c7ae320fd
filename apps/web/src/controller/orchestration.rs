//! Per-action orchestration: from a submitted form to the rendered presentation state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use client_core::SessionSlot;
use shared::{
    domain::RequestParams,
    error::{AdapterError, ErrorCode},
    protocol::{FieldText, ResponseTuple},
};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend_bridge::commands::FormValues;
use crate::controller::{
    events::{CardSlot, UiError, UiErrorContext, UiEvent, STATUS_ANALYSING, STATUS_DONE},
    reducer::{reduce, PresentationState},
};
use crate::ui::{
    markdown::{render_markdown, render_recommendations, MarkdownRenderer},
    page::{card_markup, PROFILE_HEADER, RECOMMENDATIONS_HEADER},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed,
    /// The trigger was disabled; nothing was sent.
    Ignored,
}

#[derive(Clone)]
pub struct RecommendController {
    state: Arc<Mutex<PresentationState>>,
    session: SessionSlot,
    endpoint: Arc<str>,
    renderer: Option<Arc<dyn MarkdownRenderer>>,
}

/// Re-enables the trigger when dropped, on every exit path of an action.
struct RunGuard {
    state: Arc<Mutex<PresentationState>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        reduce(&mut lock(&self.state), UiEvent::RunEnabled(true));
    }
}

fn lock(state: &Mutex<PresentationState>) -> MutexGuard<'_, PresentationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecommendController {
    pub fn new(
        session: SessionSlot,
        endpoint: impl Into<Arc<str>>,
        renderer: Option<Arc<dyn MarkdownRenderer>>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(PresentationState::default())),
            session,
            endpoint: endpoint.into(),
            renderer,
        }
    }

    pub fn session(&self) -> &SessionSlot {
        &self.session
    }

    pub fn snapshot(&self) -> PresentationState {
        lock(&self.state).clone()
    }

    pub fn dispatch(&self, event: UiEvent) {
        reduce(&mut lock(&self.state), event);
    }

    /// Checks and clears the trigger in one critical section so overlapping submits cannot both
    /// start an action.
    fn try_begin(&self, form: FormValues) -> Option<RunGuard> {
        let mut state = lock(&self.state);
        if !state.run_enabled {
            return None;
        }
        reduce(&mut state, UiEvent::FormSubmitted(form));
        reduce(&mut state, UiEvent::ClearError);
        reduce(&mut state, UiEvent::Status(STATUS_ANALYSING.to_string()));
        reduce(&mut state, UiEvent::RunEnabled(false));
        Some(RunGuard {
            state: self.state.clone(),
        })
    }

    /// Runs one action to completion. The action itself runs on its own task so a dropped
    /// caller cannot cancel an in-flight prediction.
    pub async fn trigger(&self, form: FormValues) -> TriggerOutcome {
        let Some(guard) = self.try_begin(form.clone()) else {
            debug!("trigger ignored while an action is in flight");
            return TriggerOutcome::Ignored;
        };

        let request_id = Uuid::new_v4();
        let controller = self.clone();
        let task = tokio::spawn(
            async move {
                let _guard = guard;
                controller.run_action(&form).await;
            }
            .instrument(info_span!("recommend", %request_id)),
        );

        if let Err(join_error) = task.await {
            warn!(%request_id, error = %join_error, "recommendation task aborted");
            self.dispatch(UiEvent::Error(UiError::new(
                ErrorCode::Transport,
                UiErrorContext::Recommend,
                format!("recommendation failed unexpectedly: {join_error}"),
            )));
        }
        TriggerOutcome::Completed
    }

    async fn run_action(&self, form: &FormValues) {
        let params = match form.to_params() {
            Ok(params) => params,
            Err(error) => {
                debug!(%error, "rejected form input");
                self.dispatch(UiEvent::Error(UiError::from_adapter(
                    UiErrorContext::Recommend,
                    error,
                )));
                return;
            }
        };

        info!(
            handle = params.handle(),
            topics = params.topics().len(),
            count = params.count(),
            "requesting recommendations"
        );
        match self.request(&params).await {
            Ok(tuple) => self.render(tuple),
            Err(error) => {
                warn!(%error, code = error.code().as_str(), "recommendation request failed");
                self.dispatch(UiEvent::Error(UiError::from_adapter(
                    UiErrorContext::Recommend,
                    error,
                )));
            }
        }
    }

    async fn request(&self, params: &RequestParams) -> Result<ResponseTuple, AdapterError> {
        let raw = self
            .session
            .predict(&self.endpoint, params.to_call_args())
            .await?;
        ResponseTuple::from_value(&raw)
    }

    fn render(&self, tuple: ResponseTuple) {
        if let Some(message) = tuple.signaled_error() {
            info!(error_text = message, "remote app reported an error");
            let error = UiError::new(ErrorCode::Application, UiErrorContext::Recommend, message);
            let mut state = lock(&self.state);
            reduce(&mut state, UiEvent::Error(error));
            reduce(&mut state, UiEvent::HideCard(CardSlot::Profile));
            reduce(&mut state, UiEvent::HideCard(CardSlot::Recommendations));
            return;
        }

        let profile = visible_text(tuple.profile).map(|text| {
            let body = render_markdown(self.renderer.as_deref(), &text);
            card_markup(PROFILE_HEADER, &body)
        });
        let recommendations = visible_text(tuple.recommendations)
            .map(|text| card_markup(RECOMMENDATIONS_HEADER, &render_recommendations(&text)));

        let mut state = lock(&self.state);
        for (slot, markup) in [
            (CardSlot::Profile, profile),
            (CardSlot::Recommendations, recommendations),
        ] {
            let event = match markup {
                Some(markup) => UiEvent::ShowCard { slot, markup },
                None => UiEvent::HideCard(slot),
            };
            reduce(&mut state, event);
        }
        reduce(&mut state, UiEvent::Status(STATUS_DONE.to_string()));
    }
}

/// Content slots are shown unless they say otherwise.
fn visible_text(field: Option<FieldText>) -> Option<String> {
    field
        .filter(|field| field.is_visible_or(true))
        .map(|field| field.text)
}

#[cfg(test)]
#[path = "../tests/orchestration_tests.rs"]
mod tests;
