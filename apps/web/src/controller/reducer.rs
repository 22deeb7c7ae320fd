//! Presentation state and the transitions applied to it.

use serde::Serialize;
use tracing::debug;

use crate::backend_bridge::commands::FormValues;
use crate::controller::events::{
    classify_status, CardSlot, ConnectionPhase, StatusClass, UiError, UiEvent,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub text: String,
    pub class: StatusClass,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorPanel {
    pub shown: bool,
    pub error: Option<UiError>,
}

impl ErrorPanel {
    pub fn text(&self) -> &str {
        self.error.as_ref().map(UiError::message).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Card {
    pub shown: bool,
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationState {
    pub status: StatusLine,
    pub error: ErrorPanel,
    pub profile: Card,
    pub recommendations: Card,
    pub run_enabled: bool,
    pub connection: ConnectionPhase,
    pub form: FormValues,
}

impl Default for PresentationState {
    fn default() -> Self {
        Self {
            status: StatusLine::default(),
            error: ErrorPanel::default(),
            profile: Card::default(),
            recommendations: Card::default(),
            run_enabled: true,
            connection: ConnectionPhase::default(),
            form: FormValues::default(),
        }
    }
}

impl PresentationState {
    pub fn card(&self, slot: CardSlot) -> &Card {
        match slot {
            CardSlot::Profile => &self.profile,
            CardSlot::Recommendations => &self.recommendations,
        }
    }

    fn card_mut(&mut self, slot: CardSlot) -> &mut Card {
        match slot {
            CardSlot::Profile => &mut self.profile,
            CardSlot::Recommendations => &mut self.recommendations,
        }
    }

    /// True while an action is in flight and the whole page should poll for its result.
    pub fn is_busy(&self) -> bool {
        !self.run_enabled
    }

    /// True while the status line is still expected to change on its own, e.g. during connect.
    pub fn status_is_live(&self) -> bool {
        self.connection == ConnectionPhase::Connecting || self.status.class == StatusClass::Loading
    }
}

pub fn reduce(state: &mut PresentationState, event: UiEvent) {
    match event {
        UiEvent::Status(message) => set_status(state, message),
        UiEvent::Error(error) => {
            debug!(
                context = ?error.context(),
                category = error.category().as_str(),
                "showing error"
            );
            state.error = ErrorPanel {
                shown: true,
                error: Some(error),
            };
            set_status(state, String::new());
        }
        UiEvent::ClearError => state.error = ErrorPanel::default(),
        UiEvent::ShowCard { slot, markup } => {
            *state.card_mut(slot) = Card {
                shown: true,
                markup,
            };
        }
        UiEvent::HideCard(slot) => state.card_mut(slot).shown = false,
        UiEvent::RunEnabled(enabled) => state.run_enabled = enabled,
        UiEvent::Connection(phase) => state.connection = phase,
        UiEvent::FormSubmitted(form) => state.form = form,
    }
}

fn set_status(state: &mut PresentationState, message: String) {
    let class = if message.is_empty() {
        StatusClass::Neutral
    } else {
        classify_status(&message)
    };
    state.status = StatusLine {
        text: message,
        class,
    };
}
