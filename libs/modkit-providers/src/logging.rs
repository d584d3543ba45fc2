//! Deferred logging for host start-up.
//!
//! Registration runs while the host is still being assembled, often before a
//! `tracing` subscriber is installed. [`DeferredLogger`] buffers structured
//! entries per [`LogScope`] and forwards them to `tracing` in order once the
//! logger is marked ready.
//!
//! ```
//! use modkit_providers::logging::DeferredLogger;
//!
//! let logger = DeferredLogger::new();
//! {
//!     let scope = logger.begin_scope("GithubRegistrar");
//!     scope.debug("Registered 1 provider instances");
//! }
//! assert_eq!(logger.pending().len(), 1);
//!
//! logger.mark_ready(); // emits the buffered entry
//! assert!(logger.pending().is_empty());
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One buffered log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    /// Name the scope was opened with (the registrar name during registration).
    pub scope: Arc<str>,
    pub message: String,
}

impl LogEntry {
    fn emit(&self) {
        let span = tracing::debug_span!("provider_registration", registrar = %self.scope);
        let _guard = span.enter();
        match self.level {
            LogLevel::Trace => tracing::trace!("{}", self.message),
            LogLevel::Debug => tracing::debug!("{}", self.message),
            LogLevel::Info => tracing::info!("{}", self.message),
            LogLevel::Warn => tracing::warn!("{}", self.message),
            LogLevel::Error => tracing::error!("{}", self.message),
        }
    }
}

#[derive(Debug, Default)]
struct DeferredState {
    ready: bool,
    pending: Vec<LogEntry>,
}

/// Logging facade that holds entries back until the sink is ready.
///
/// Cloning is cheap; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct DeferredLogger {
    state: Arc<Mutex<DeferredState>>,
}

impl DeferredLogger {
    /// A logger that buffers until [`mark_ready`](Self::mark_ready) is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A logger whose scopes emit as soon as they end.
    #[must_use]
    pub fn ready() -> Self {
        let logger = Self::new();
        logger.state.lock().ready = true;
        logger
    }

    /// Open a scope; its entries are handed to the logger when the scope is dropped.
    #[must_use]
    pub fn begin_scope(&self, name: impl Into<Arc<str>>) -> LogScope {
        LogScope {
            logger: self.clone(),
            name: name.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    /// Mark the sink as ready and emit everything buffered so far.
    pub fn mark_ready(&self) {
        self.state.lock().ready = true;
        self.flush();
    }

    /// Emit and drop buffered entries, regardless of readiness.
    pub fn flush(&self) {
        let drained = std::mem::take(&mut self.state.lock().pending);
        for entry in &drained {
            entry.emit();
        }
    }

    /// Snapshot of entries not yet emitted.
    #[must_use]
    pub fn pending(&self) -> Vec<LogEntry> {
        self.state.lock().pending.clone()
    }

    fn complete_scope(&self, entries: Vec<LogEntry>) {
        let ready = {
            let mut state = self.state.lock();
            state.pending.extend(entries);
            state.ready
        };
        if ready {
            self.flush();
        }
    }
}

/// Buffer of entries tagged with the scope name.
pub struct LogScope {
    logger: DeferredLogger,
    name: Arc<str>,
    entries: Mutex<Vec<LogEntry>>,
}

impl LogScope {
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.entries.lock().push(LogEntry {
            level,
            scope: self.name.clone(),
            message: message.into(),
        });
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }
}

impl Drop for LogScope {
    fn drop(&mut self) {
        let entries = std::mem::take(self.entries.get_mut());
        self.logger.complete_scope(entries);
    }
}
