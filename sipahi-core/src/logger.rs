//! The shared structured logger handed to every hook and handler.
//!
//! A [`Logger`] is a `tracing` span carrying the service name and a set of
//! static properties, plus a maximum level. Every event it emits is parented
//! to that span, so subscribers see the properties on each line. Formatting
//! and output are left to whatever subscriber the host installs.

use std::{collections::BTreeMap, fmt, sync::Arc};
use tracing::{Level, Span};

/// A cheaply cloneable handle to one server-wide logger.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    level: Level,
    enabled: bool,
    properties: BTreeMap<String, String>,
    span: Span,
}

impl Logger {
    /// Create an enabled logger at `INFO` with no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), Level::INFO, BTreeMap::new(), None)
    }

    /// A logger that drops everything.
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(Inner {
                name: String::new(),
                level: Level::ERROR,
                enabled: false,
                properties: BTreeMap::new(),
                span: Span::none(),
            }),
        }
    }

    /// Set the most verbose level this logger emits.
    pub fn with_level(self, level: Level) -> Self {
        Self::build(
            self.inner.name.clone(),
            level,
            self.inner.properties.clone(),
            None,
        )
        .enabled_as(self.inner.enabled)
    }

    /// Replace the static properties attached to every event.
    pub fn with_properties<K, V>(self, properties: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let properties = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::build(self.inner.name.clone(), self.inner.level, properties, None)
            .enabled_as(self.inner.enabled)
    }

    /// Derive a logger whose span is a child of this one, with extra properties.
    pub fn child<K, V>(&self, properties: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = self.inner.properties.clone();
        merged.extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        Self::build(
            self.inner.name.clone(),
            self.inner.level,
            merged,
            Some(&self.inner.span),
        )
        .enabled_as(self.inner.enabled)
    }

    fn build(
        name: String,
        level: Level,
        properties: BTreeMap<String, String>,
        parent: Option<&Span>,
    ) -> Self {
        let span = match parent {
            Some(parent) => tracing::info_span!(
                parent: parent,
                "sipahi",
                service = %name,
                properties = ?properties
            ),
            None => tracing::info_span!("sipahi", service = %name, properties = ?properties),
        };
        Self {
            inner: Arc::new(Inner {
                name,
                level,
                enabled: true,
                properties,
                span,
            }),
        }
    }

    fn enabled_as(self, enabled: bool) -> Self {
        if enabled {
            self
        } else {
            Self::disabled()
        }
    }

    /// The service name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The most verbose level emitted.
    pub fn level(&self) -> Level {
        self.inner.level
    }

    /// Static properties attached to every event.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.inner.properties
    }

    /// The span every event is parented to.
    ///
    /// Use it to instrument futures or emit events with custom fields.
    pub fn span(&self) -> &Span {
        &self.inner.span
    }

    /// Whether an event at `level` would be emitted.
    pub fn is_enabled(&self, level: Level) -> bool {
        self.inner.enabled && level <= self.inner.level
    }

    /// Emit a `DEBUG` event.
    pub fn debug(&self, message: impl fmt::Display) {
        if self.is_enabled(Level::DEBUG) {
            tracing::debug!(parent: &self.inner.span, "{message}");
        }
    }

    /// Emit an `INFO` event.
    pub fn info(&self, message: impl fmt::Display) {
        if self.is_enabled(Level::INFO) {
            tracing::info!(parent: &self.inner.span, "{message}");
        }
    }

    /// Emit a `WARN` event.
    pub fn warn(&self, message: impl fmt::Display) {
        if self.is_enabled(Level::WARN) {
            tracing::warn!(parent: &self.inner.span, "{message}");
        }
    }

    /// Emit an `ERROR` event.
    pub fn error(&self, message: impl fmt::Display) {
        if self.is_enabled(Level::ERROR) {
            tracing::error!(parent: &self.inner.span, "{message}");
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("sipahi")
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("level", &self.inner.level)
            .field("enabled", &self.inner.enabled)
            .field("properties", &self.inner.properties)
            .finish()
    }
}
