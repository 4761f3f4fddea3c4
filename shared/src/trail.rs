//! Append-only debug trail collected while serving a single request.
//!
//! Lines are rendered on the page's debug panel and mirrored to `tracing`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
}

impl Severity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "Debug",
            Severity::Info => "Info",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub scope: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ts) = self.timestamp {
            write!(f, "{} ", ts.to_rfc3339_opts(SecondsFormat::Millis, true))?;
        }
        write!(f, "[{}][{}] {}", self.scope, self.severity.as_str(), self.message)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TrailOptions {
    /// Prefix every line with the UTC time it was recorded.
    pub timestamps: bool,
    /// Keep `Debug` lines. They are still sent to `tracing` when dropped.
    pub verbose: bool,
}

#[derive(Debug, Default)]
pub struct LogTrail {
    options: TrailOptions,
    lines: Vec<LogLine>,
}

impl LogTrail {
    pub fn new(options: TrailOptions) -> Self {
        LogTrail {
            options,
            lines: Vec::new(),
        }
    }

    pub fn info(&mut self, scope: &'static str, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(scope, "{message}");
        self.push(scope, Severity::Info, message);
    }

    pub fn debug(&mut self, scope: &'static str, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(scope, "{message}");
        if self.options.verbose {
            self.push(scope, Severity::Debug, message);
        }
    }

    fn push(&mut self, scope: &'static str, severity: Severity, message: String) {
        let timestamp = self.options.timestamps.then(Utc::now);
        self.lines.push(LogLine {
            timestamp,
            scope,
            severity,
            message,
        });
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<LogLine> {
        self.lines
    }
}
