//! Broadcast hub between pipelines and connected pages.

use assetline_pipeline::ReloadSink;
use serde::Serialize;
use tokio::sync::broadcast;

/// Buffered events per slow client before it starts lagging.
const CHANNEL_CAPACITY: usize = 100;

/// Event sent to connected pages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadEvent {
    /// Reload the whole page.
    Reload,
    /// Swap the asset at `path` in place.
    Inject { path: String },
}

/// Fan-out of reload events to every connected page.
#[derive(Clone, Debug)]
pub struct LiveReloadHub {
    tx: broadcast::Sender<ReloadEvent>,
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReloadHub {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Receive every event sent from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Number of connected pages.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Broadcast `event`. Sending with no page connected is not an error.
    pub fn send(&self, event: ReloadEvent) {
        match self.tx.send(event) {
            Ok(clients) => tracing::debug!(clients, "Sent reload event"),
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(?event, "No clients connected");
            }
        }
    }
}

impl ReloadSink for LiveReloadHub {
    fn inject(&self, url: &str) {
        self.send(ReloadEvent::Inject {
            path: url.to_owned(),
        });
    }

    fn reload(&self) {
        self.send(ReloadEvent::Reload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_event_serialization() {
        assert_eq!(
            serde_json::to_value(ReloadEvent::Reload).unwrap(),
            serde_json::json!({"type": "reload"})
        );
        assert_eq!(
            serde_json::to_value(ReloadEvent::Inject {
                path: "/assets/css/styles.bundle.css".to_owned()
            })
            .unwrap(),
            serde_json::json!({"type": "inject", "path": "/assets/css/styles.bundle.css"})
        );
    }

    #[test]
    fn test_sink_signals_reach_every_client() {
        let hub = LiveReloadHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        assert_eq!(hub.client_count(), 2);

        hub.inject("/assets/js/app.bundle.js");
        hub.reload();

        for rx in [&mut first, &mut second] {
            let events = tokio_test::block_on(async {
                vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()]
            });
            assert_eq!(
                events,
                vec![
                    ReloadEvent::Inject {
                        path: "/assets/js/app.bundle.js".to_owned()
                    },
                    ReloadEvent::Reload,
                ]
            );
        }
    }

    #[test]
    fn test_send_without_clients_is_silent() {
        let hub = LiveReloadHub::new();

        hub.reload();

        assert_eq!(hub.client_count(), 0);
    }
}
