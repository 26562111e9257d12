//! File watching for Assetline.
//!
//! A [`Watcher`] owns a single `notify` watcher on the project root and fans
//! debounced changes out to any number of glob-filtered bindings:
//!
//! ```ignore
//! let watcher = Watcher::new(root, Duration::from_millis(200));
//! let _styles = watcher.subscribe(&["src/styles/**/*.css".to_owned()], |event| {
//!     rebuild_styles(event)?;
//!     Ok(())
//! })?;
//! let _handle = watcher.start()?;
//! ```
//!
//! Handlers run on the blocking pool, one batch at a time per binding.
//! Dropping a [`Subscription`] unregisters its binding.

mod debouncer;
mod event;
mod patterns;
mod watcher;

pub use event::{ChangeEvent, ChangeKind};
pub use patterns::PatternSet;
pub use watcher::{HandlerResult, Subscription, WatchHandle, Watcher};

/// Error raised while setting up a watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The platform watcher failed.
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// A watch glob did not compile.
    #[error("invalid watch pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}
