use std::fmt::Write as _;

use shared::domain::{topic_element_id, MAX_PROBLEM_COUNT, MIN_PROBLEM_COUNT, TOPIC_VOCABULARY};

use crate::controller::{
    events::{CardSlot, ConnectionPhase},
    reducer::{Card, PresentationState},
};
use crate::ui::{markdown::escape_html, theme::STYLESHEET};

pub const PROFILE_HEADER: &str = "👤 Profile Analysis";
pub const RECOMMENDATIONS_HEADER: &str = "🎯 Recommended Problems";
const REFRESH_SECONDS: u32 = 2;
pub const STATUS_FRAGMENT_PATH: &str = "/status";

/// Wraps already-rendered card content with its decorative header.
pub fn card_markup(header: &str, body: &str) -> String {
    format!(
        r#"<div class="card-header">{header}</div><div style="margin-top:0;">{body}</div>"#
    )
}

fn render_card(out: &mut String, id: &str, card: &Card) {
    let display = if card.shown { "block" } else { "none" };
    let markup = if card.shown { card.markup.as_str() } else { "" };
    let _ = write!(
        out,
        r#"<section id="{id}" class="card" style="display:{display}">{markup}</section>"#
    );
}

fn render_status(out: &mut String, state: &PresentationState) {
    let _ = write!(
        out,
        r#"<div id="status" class="{class}">{text}</div>"#,
        class = state.status.class.css_class(),
        text = escape_html(&state.status.text),
    );
}

fn render_error(out: &mut String, state: &PresentationState) {
    match state.error.error.as_ref().filter(|_| state.error.shown) {
        Some(error) => {
            let _ = write!(
                out,
                r#"<div id="error" class="error-panel show" data-category="{category}">{text}</div>"#,
                category = error.category().as_str(),
                text = escape_html(error.message()),
            );
        }
        None => out.push_str(r#"<div id="error" class="error-panel"></div>"#),
    }
}

fn render_head(out: &mut String, refresh_url: Option<&str>) {
    out.push_str("<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    out.push_str(r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#);
    if let Some(url) = refresh_url {
        let _ = write!(
            out,
            r#"<meta http-equiv="refresh" content="{REFRESH_SECONDS};url={url}">"#
        );
    }
    out.push_str("<title>Codeforces Problem Recommender</title><style>");
    out.push_str(STYLESHEET);
    out.push_str("</style></head>");
}

/// Status line and error panel only, reloading itself while the status is live.
pub fn render_status_fragment(state: &PresentationState) -> String {
    let mut out = String::with_capacity(4 * 1024);
    render_head(
        &mut out,
        state.status_is_live().then_some(STATUS_FRAGMENT_PATH),
    );
    out.push_str(r#"<body class="fragment">"#);
    render_status(&mut out, state);
    render_error(&mut out, state);
    out.push_str("</body></html>");
    out
}

fn render_topics(out: &mut String, state: &PresentationState) {
    out.push_str(r#"<div id="topics" class="topics">"#);
    for topic in TOPIC_VOCABULARY {
        let checked = if state.form.topics.contains(*topic) {
            " checked"
        } else {
            ""
        };
        let value = escape_html(topic);
        let _ = write!(
            out,
            r#"<label class="checkbox-item"><input type="checkbox" name="topics" value="{value}" id="{id}"{checked}><span>{value}</span></label>"#,
            id = topic_element_id(topic),
        );
    }
    out.push_str("</div>");
}

pub fn render_page(state: &PresentationState) -> String {
    let mut out = String::with_capacity(8 * 1024);
    render_head(&mut out, state.is_busy().then_some("/"));
    out.push_str("<body><main><h1>Codeforces Problem Recommender</h1>");

    let _ = write!(
        out,
        r#"<form method="post" action="/run" data-connection="{connection}">"#,
        connection = match state.connection {
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Established => "established",
            ConnectionPhase::Failed => "failed",
        }
    );
    let _ = write!(
        out,
        r#"<label class="field" for="username">Codeforces handle</label><input type="text" id="username" name="handle" value="{handle}" autocomplete="off" autofocus>"#,
        handle = escape_html(&state.form.handle),
    );
    let _ = write!(
        out,
        r#"<label class="field" for="count">Number of problems</label><input type="number" id="count" name="count" min="{MIN_PROBLEM_COUNT}" max="{MAX_PROBLEM_COUNT}" value="{count}">"#,
        count = escape_html(&state.form.count),
    );
    out.push_str(r#"<label class="field">Topics</label>"#);
    render_topics(&mut out, state);
    let disabled = if state.run_enabled { "" } else { " disabled" };
    let _ = write!(
        out,
        r#"<button type="submit" id="run"{disabled}>Get recommendations</button></form>"#
    );

    if state.status_is_live() && !state.is_busy() {
        // The form stays untouched; only the embedded fragment polls.
        let _ = write!(
            out,
            r#"<iframe id="status-live" class="status-frame" src="{STATUS_FRAGMENT_PATH}" title="Status"></iframe>"#
        );
    } else {
        render_status(&mut out, state);
        render_error(&mut out, state);
    }

    render_card(&mut out, "profile", state.card(CardSlot::Profile));
    render_card(&mut out, "recs", state.card(CardSlot::Recommendations));
    out.push_str("</main></body></html>");
    out
}
