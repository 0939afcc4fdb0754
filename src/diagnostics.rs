//! Diagnostics sink for the read-tolerant service operations.
//!
//! `suggest_parameters` and `prediction_curve` swallow internal failures and
//! return `None` (§7); this trait is the seam a caller can wire a real
//! logger into without the crate depending on a specific logging backend,
//! matching the corpus convention of plain, structural diagnostics rather
//! than a tracing/log dependency for a component this size.
pub trait Diagnostics {
    fn log(&self, message: &str);
}

/// Discards every message. The default when a caller doesn't care to wire
/// anything in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn log(&self, _message: &str) {}
}

/// Collects messages in-process, for tests that want to assert a failure
/// was actually observed rather than merely silently swallowed.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    messages: std::sync::Mutex<Vec<String>>,
}

impl Diagnostics for RecordingDiagnostics {
    fn log(&self, message: &str) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push(message.to_string());
        }
    }
}

impl RecordingDiagnostics {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|g| g.clone()).unwrap_or_default()
    }
}
