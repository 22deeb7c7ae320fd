//! Markdown-to-markup conversion for card content.

use std::sync::{Arc, LazyLock};

use regex::Regex;

static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern compiles"));
static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[A-Za-z][A-Za-z0-9-]*(\s[^<>]*)?/?>").expect("tag pattern compiles")
});

pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

#[cfg(feature = "commonmark")]
pub struct CommonMarkRenderer;

#[cfg(feature = "commonmark")]
impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> String {
        use pulldown_cmark::{html, Options, Parser};

        let parser = Parser::new_ext(
            markdown,
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH,
        );
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Minimal renderer used when no formatting collaborator is configured.
pub struct FallbackRenderer;

impl MarkdownRenderer for FallbackRenderer {
    fn render(&self, markdown: &str) -> String {
        let escaped = escape_html(markdown);
        BOLD_SPAN
            .replace_all(&escaped, "<strong>${1}</strong>")
            .replace('\n', "<br>")
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub fn looks_like_markup(text: &str) -> bool {
    MARKUP_TAG.is_match(text)
}

pub fn render_markdown(renderer: Option<&dyn MarkdownRenderer>, markdown: &str) -> String {
    match renderer {
        Some(renderer) => renderer.render(markdown),
        None => FallbackRenderer.render(markdown),
    }
}

/// Recommendation content arrives as markup; anything else is shown as escaped text.
pub fn render_recommendations(text: &str) -> String {
    if looks_like_markup(text) {
        text.to_string()
    } else {
        escape_html(text)
    }
}

/// The collaborator for a configured mode, or `None` when the fallback should be used.
pub fn renderer_for(commonmark: bool) -> Option<Arc<dyn MarkdownRenderer>> {
    if !commonmark {
        return None;
    }
    #[cfg(feature = "commonmark")]
    {
        let renderer: Arc<dyn MarkdownRenderer> = Arc::new(CommonMarkRenderer);
        Some(renderer)
    }
    #[cfg(not(feature = "commonmark"))]
    {
        tracing::warn!("built without the commonmark feature; using the plain markdown fallback");
        None
    }
}
