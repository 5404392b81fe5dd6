//! Request-scoped structured logs.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use offline_core::{Generation, LogFormat, RequestId};
use serde::Serialize;

/// Extra key/value pairs attached to an entry, sorted by key.
pub type Fields = BTreeMap<String, serde_json::Value>;

/// Severity of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Upper-case label used in human output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One rendered log line before it reaches `tracing`.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub fields: Fields,
    pub elapsed_us: u64,
}

impl LogEntry {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }

    /// `LEVEL request-id generation/rule message url key=value ...`
    pub fn to_human(&self) -> String {
        let scope = match (&self.generation, &self.rule) {
            (Some(g), Some(r)) => format!(" {}/{}", g, r),
            (Some(g), None) => format!(" {}", g),
            (None, Some(r)) => format!(" -/{}", r),
            (None, None) => String::new(),
        };

        let mut line = format!(
            "{:<5} {}{} {}",
            self.level.label(),
            self.request_id,
            scope,
            self.message
        );

        if let Some(url) = &self.url {
            line.push(' ');
            line.push_str(url);
        }

        for (key, value) in &self.fields {
            match value {
                serde_json::Value::String(s) => line.push_str(&format!(" {}={}", key, s)),
                other => line.push_str(&format!(" {}={}", key, other)),
            }
        }

        line.push_str(&format!(" +{}us", self.elapsed_us));
        line
    }
}

/// Logger scoped to one intercepted request or one lifecycle phase.
///
/// Entries are emitted as `tracing` events under the `offline` target; the
/// host decides where they go by installing a subscriber.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    request_id: RequestId,
    generation: Option<String>,
    rule: Option<String>,
    url: Option<String>,
    started: Instant,
    min_level: LogLevel,
    format: LogFormat,
}

impl StructuredLogger {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            generation: None,
            rule: None,
            url: None,
            started: Instant::now(),
            min_level: LogLevel::Debug,
            format: LogFormat::Json,
        }
    }

    pub fn with_generation(mut self, generation: &Generation) -> Self {
        self.generation = Some(generation.to_string());
        self
    }

    /// Name of the route rule that matched the request.
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message, Fields::new());
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message, Fields::new());
    }

    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, message, Fields::new());
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message, Fields::new());
    }

    /// Start an entry with fields at `level`.
    pub fn at(&self, level: LogLevel, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder {
            logger: self,
            level,
            message: message.into(),
            fields: Fields::new(),
        }
    }

    pub fn debug_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        self.at(LogLevel::Debug, message)
    }

    pub fn info_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        self.at(LogLevel::Info, message)
    }

    pub fn warn_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        self.at(LogLevel::Warn, message)
    }

    pub fn error_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        self.at(LogLevel::Error, message)
    }

    /// The entry this logger would emit, or `None` below the minimum level.
    pub fn entry(&self, level: LogLevel, message: &str, fields: Fields) -> Option<LogEntry> {
        (level >= self.min_level).then(|| LogEntry {
            level,
            message: message.to_string(),
            request_id: self.request_id.to_string(),
            generation: self.generation.clone(),
            rule: self.rule.clone(),
            url: self.url.clone(),
            fields,
            elapsed_us: self.elapsed_us(),
        })
    }

    fn emit(&self, level: LogLevel, message: &str, fields: Fields) {
        let Some(entry) = self.entry(level, message, fields) else {
            return;
        };

        let line = match self.format {
            LogFormat::Json => entry.to_json(),
            LogFormat::Human => entry.to_human(),
        };

        match level {
            LogLevel::Trace => tracing::trace!(target: "offline", "{}", line),
            LogLevel::Debug => tracing::debug!(target: "offline", "{}", line),
            LogLevel::Info => tracing::info!(target: "offline", "{}", line),
            LogLevel::Warn => tracing::warn!(target: "offline", "{}", line),
            LogLevel::Error => tracing::error!(target: "offline", "{}", line),
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Microseconds since the logger was created.
    pub fn elapsed_us(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// An entry being assembled; nothing is logged until [`LogBuilder::emit`].
#[must_use]
pub struct LogBuilder<'a> {
    logger: &'a StructuredLogger,
    level: LogLevel,
    message: String,
    fields: Fields,
}

impl LogBuilder<'_> {
    /// Attach a value by its `Display` form.
    pub fn field(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.fields
            .insert(key.to_string(), serde_json::Value::String(value.to_string()));
        self
    }

    pub fn field_u64(mut self, key: &str, value: u64) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field_bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn emit(self) {
        self.logger.emit(self.level, &self.message, self.fields);
    }
}
