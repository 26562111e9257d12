//! Application state.

use std::path::PathBuf;

use crate::live_reload::LiveReloadHub;

/// State shared across all handlers.
pub(crate) struct AppState {
    /// Directory being served.
    pub(crate) root: PathBuf,
    /// Reload hub (if live reload is enabled).
    pub(crate) live_reload: Option<LiveReloadHub>,
}

impl AppState {
    #[must_use]
    pub(crate) fn live_reload_enabled(&self) -> bool {
        self.live_reload.is_some()
    }
}
