//! Reload signals from pipelines to the preview server.
//!
//! Pipelines never talk to the server directly. They hold a [`ReloadSink`]
//! and call [`ReloadSink::inject`] after writing a stylesheet or script, or
//! [`ReloadSink::reload`] when the whole page must refresh.

/// Receiver of reload signals.
pub trait ReloadSink: Send + Sync {
    /// Hot-swap the asset served at `url` (e.g. `/assets/css/styles.bundle.css`).
    fn inject(&self, url: &str);

    /// Refresh every connected page.
    fn reload(&self);
}

/// Sink that drops every signal. Used by one-shot builds.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl ReloadSink for NoopSink {
    fn inject(&self, _url: &str) {}

    fn reload(&self) {}
}

#[cfg(any(test, feature = "mock"))]
pub use recording::{RecordingSink, Signal};

#[cfg(any(test, feature = "mock"))]
mod recording {
    use std::sync::Mutex;

    use super::ReloadSink;

    /// Signal captured by [`RecordingSink`].
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Signal {
        Inject(String),
        Reload,
    }

    /// Sink that records signals in order, for tests.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        signals: Mutex<Vec<Signal>>,
    }

    impl RecordingSink {
        /// Create an empty sink.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Signals received so far.
        #[must_use]
        pub fn signals(&self) -> Vec<Signal> {
            self.signals.lock().unwrap().clone()
        }
    }

    impl ReloadSink for RecordingSink {
        fn inject(&self, url: &str) {
            self.signals
                .lock()
                .unwrap()
                .push(Signal::Inject(url.to_owned()));
        }

        fn reload(&self) {
            self.signals.lock().unwrap().push(Signal::Reload);
        }
    }
}
