use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{bail, Context};
use client_core::{ConnectOptions, DEFAULT_HUB_URL};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "recommender.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkdownMode {
    CommonMark,
    Plain,
}

impl FromStr for MarkdownMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "commonmark" => Ok(Self::CommonMark),
            "plain" => Ok(Self::Plain),
            other => bail!("unknown markdown mode '{other}' (expected commonmark or plain)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub space: String,
    pub endpoint: String,
    pub hub_url: String,
    pub markdown: MarkdownMode,
    pub status_poll_interval_ms: u64,
    pub status_poll_attempts: u32,
    pub max_form_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            space: "Sai-ganesh-09/CF_Problem_Recommender".into(),
            endpoint: "/recommend".into(),
            hub_url: DEFAULT_HUB_URL.into(),
            markdown: MarkdownMode::CommonMark,
            status_poll_interval_ms: 1500,
            status_poll_attempts: 120,
            max_form_bytes: 16 * 1024,
        }
    }
}

impl Settings {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            hub_url: self.hub_url.clone(),
            status_poll_interval: Duration::from_millis(self.status_poll_interval_ms),
            status_poll_attempts: self.status_poll_attempts,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    space: Option<String>,
    endpoint: Option<String>,
    hub_url: Option<String>,
    markdown: Option<MarkdownMode>,
    status_poll_interval_ms: Option<u64>,
    status_poll_attempts: Option<u32>,
    max_form_bytes: Option<usize>,
}

/// Defaults, then the TOML file, then `APP__*` environment variables.
///
/// A missing file is only an error when its path was given explicitly.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, explicit) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        Err(err) if explicit => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.bind_addr {
        settings.bind_addr = v;
    }
    if let Some(v) = file.space {
        settings.space = v;
    }
    if let Some(v) = file.endpoint {
        settings.endpoint = v;
    }
    if let Some(v) = file.hub_url {
        settings.hub_url = v;
    }
    if let Some(v) = file.markdown {
        settings.markdown = v;
    }
    if let Some(v) = file.status_poll_interval_ms {
        settings.status_poll_interval_ms = v;
    }
    if let Some(v) = file.status_poll_attempts {
        settings.status_poll_attempts = v;
    }
    if let Some(v) = file.max_form_bytes {
        settings.max_form_bytes = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = lookup("APP__SPACE") {
        settings.space = v;
    }
    if let Some(v) = lookup("APP__ENDPOINT") {
        settings.endpoint = v;
    }
    if let Some(v) = lookup("APP__HUB_URL") {
        settings.hub_url = v;
    }
    if let Some(v) = lookup("APP__MARKDOWN") {
        settings.markdown = v.parse()?;
    }
    if let Some(v) = lookup("APP__STATUS_POLL_INTERVAL_MS") {
        settings.status_poll_interval_ms = v
            .parse()
            .with_context(|| format!("APP__STATUS_POLL_INTERVAL_MS must be an integer, got '{v}'"))?;
    }
    if let Some(v) = lookup("APP__STATUS_POLL_ATTEMPTS") {
        settings.status_poll_attempts = v
            .parse()
            .with_context(|| format!("APP__STATUS_POLL_ATTEMPTS must be an integer, got '{v}'"))?;
    }
    if let Some(v) = lookup("APP__MAX_FORM_BYTES") {
        settings.max_form_bytes = v
            .parse()
            .with_context(|| format!("APP__MAX_FORM_BYTES must be an integer, got '{v}'"))?;
    }
    Ok(())
}
