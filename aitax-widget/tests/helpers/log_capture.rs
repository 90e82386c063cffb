//! Log Capture Utilities for Testing
//!
//! Provides tracing log capture and assertion utilities

use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

/// Captured log record
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
    /// Structured fields other than `message`, as `key=value`
    pub fields: Vec<String>,
}

/// Log capture layer for testing
#[derive(Clone)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Check if any log message matches pattern
    pub fn contains(&self, pattern: &str) -> bool {
        self.records().iter().any(|r| r.message.contains(pattern))
    }

    /// Count log messages matching pattern
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.records()
            .iter()
            .filter(|r| r.message.contains(pattern))
            .count()
    }

    /// Records at `level` whose message matches pattern
    pub fn matching_at(&self, level: Level, pattern: &str) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level && r.message.contains(pattern))
            .collect()
    }

    /// Assert no logs match pattern
    pub fn assert_no_match(&self, pattern: &str) {
        let count = self.count_matching(pattern);
        assert!(
            count == 0,
            "Expected no logs matching '{}', but found {} matches",
            pattern,
            count
        );
    }

    /// Assert at least one log matches pattern
    pub fn assert_contains(&self, pattern: &str) {
        assert!(
            self.contains(pattern),
            "Expected log matching '{}', but none found. All logs:\n{}",
            pattern,
            self.records()
                .iter()
                .map(|r| r.message.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        );
    }
}

impl Default for LogCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> tracing_subscriber::Layer<S> for LogCapture
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        use tracing::field::Visit;

        #[derive(Default)]
        struct FieldVisitor {
            message: String,
            fields: Vec<String>,
        }

        impl Visit for FieldVisitor {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = value.to_string();
                } else {
                    self.fields.push(format!("{}={}", field.name(), value));
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{:?}", value);
                } else {
                    self.fields.push(format!("{}={:?}", field.name(), value));
                }
            }
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.records.lock().unwrap().push(LogRecord {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Capture logs emitted on the current thread until the guard is dropped
///
/// Works with `#[tokio::test]`'s single-threaded runtime, so parallel tests
/// in the same binary do not see each other's records.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::new();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("aitax_widget=debug"))
        .with(capture.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
