//! Opt-in JSONL telemetry. Enabled by `KEEGAN_TELEMETRY`; rows are appended
//! to `cache/telemetry.jsonl` unless `KEEGAN_TELEMETRY_FILE` overrides it.
//! A disabled handle is a silent no-op so the engine stays constructible
//! without any environment.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::control::now_ms;

const DEFAULT_PATH: &str = "cache/telemetry.jsonl";

/// Truthy forms accepted from the environment.
pub fn is_enabled_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Clone, Default)]
pub struct Telemetry {
    inner: Option<Arc<Inner>>,
}

struct Inner {
    source: String,
    path: PathBuf,
    file: Mutex<Option<std::fs::File>>,
}

impl Telemetry {
    /// No-op sink.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Build from `KEEGAN_TELEMETRY` / `KEEGAN_TELEMETRY_FILE`.
    pub fn from_env(source: &str) -> Self {
        let enabled = std::env::var("KEEGAN_TELEMETRY")
            .map(|v| is_enabled_flag(&v))
            .unwrap_or(false);
        if !enabled {
            return Self::disabled();
        }
        let path = std::env::var("KEEGAN_TELEMETRY_FILE")
            .unwrap_or_else(|_| DEFAULT_PATH.to_string());
        Self::to_file(source, path)
    }

    pub fn to_file(source: &str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(err) = std::fs::create_dir_all(parent)
        {
            warn!("telemetry dir {parent:?} not created: {err}");
        }
        Self {
            inner: Some(Arc::new(Inner {
                source: source.to_string(),
                path,
                file: Mutex::new(None),
            })),
        }
    }

    pub fn enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Append one event row. Write failures are logged once per call and
    /// never propagate.
    pub fn record(&self, event: &str, fields: &[(&str, &str)]) {
        let Some(inner) = &self.inner else {
            return;
        };

        let mut row = Map::new();
        row.insert("event".into(), json!(event));
        row.insert("ts".into(), json!(now_ms()));
        if !inner.source.is_empty() {
            row.insert("source".into(), json!(inner.source));
        }
        for (key, value) in fields {
            row.insert((*key).to_string(), json!(value));
        }
        let line = Value::Object(row).to_string();

        let mut guard = inner.file.lock().unwrap();
        if guard.is_none() {
            match OpenOptions::new().create(true).append(true).open(&inner.path) {
                Ok(f) => *guard = Some(f),
                Err(err) => {
                    warn!("telemetry open {:?} failed: {err}", inner.path);
                    return;
                }
            }
        }
        if let Some(file) = guard.as_mut()
            && let Err(err) = writeln!(file, "{line}")
        {
            warn!("telemetry write failed: {err}");
            *guard = None;
        }
    }
}
