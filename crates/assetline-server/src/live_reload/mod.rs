//! Live reload.
//!
//! Pipelines signal through a [`LiveReloadHub`]; every connected page gets
//! the event over its WebSocket and either swaps a stylesheet in place or
//! reloads.

mod hub;
mod websocket;

use axum::http::header;
use axum::response::IntoResponse;

pub use hub::{LiveReloadHub, ReloadEvent};
pub(crate) use websocket::ws_handler;

/// Path of the client script.
pub(crate) const CLIENT_PATH: &str = "/__assetline/client.js";
/// Path of the WebSocket endpoint.
pub(crate) const WS_PATH: &str = "/__assetline/ws";

const CLIENT_JS: &str = include_str!("client.js");

/// Serve the reload client script.
pub(crate) async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        CLIENT_JS,
    )
}
