//! User-facing event reporting.

/// Receives warnings meant for whoever drives the session.
pub trait EventSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn warn(&self, message: &str) {
        log::warn!("{}", message);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::EventSink;

    /// Collects warnings for assertions.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct RecordingSink {
        pub(crate) warnings: Arc<Mutex<Vec<String>>>,
    }

    impl EventSink for RecordingSink {
        fn warn(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }
    }
}
