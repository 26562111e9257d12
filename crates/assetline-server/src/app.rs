//! Router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;

use crate::live_reload;
use crate::middleware;
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();

    if state.live_reload_enabled() {
        router = router
            .route(live_reload::CLIENT_PATH, get(live_reload::client_script))
            .route(live_reload::WS_PATH, get(live_reload::ws_handler));
    }

    router
        .fallback(static_files::serve)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::no_cache_layer())
                .layer(middleware::content_type_options_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_reload::LiveReloadHub;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tower::ServiceExt;

    fn router(root: &Path, live_reload: bool) -> Router {
        create_router(Arc::new(AppState {
            root: root.to_path_buf(),
            live_reload: live_reload.then(LiveReloadHub::new),
        }))
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_html_gets_client_injected() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("index.html"), "<html><body><h1>Hi</h1></body></html>").unwrap();

        let (status, body) = get_body(router(temp.path(), true), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            "<html><body><h1>Hi</h1><script src=\"/__assetline/client.js\"></script></body></html>"
        );
    }

    #[tokio::test]
    async fn test_no_injection_without_live_reload() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("index.html"), "<body></body>").unwrap();

        let (_, body) = get_body(router(temp.path(), false), "/index.html").await;

        assert_eq!(body, "<body></body>");
    }

    #[tokio::test]
    async fn test_client_script_route() {
        let temp = tempfile::tempdir().unwrap();

        let response = router(temp.path(), true)
            .oneshot(
                Request::builder()
                    .uri("/__assetline/client.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/javascript; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_client_script_absent_without_live_reload() {
        let temp = tempfile::tempdir().unwrap();

        let (status, _) = get_body(router(temp.path(), false), "/__assetline/client.js").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_css_served_with_mime_and_no_cache() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("assets/css")).unwrap();
        fs::write(temp.path().join("assets/css/styles.bundle.css"), "a{}").unwrap();

        let response = router(temp.path(), true)
            .oneshot(
                Request::builder()
                    .uri("/assets/css/styles.bundle.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let temp = tempfile::tempdir().unwrap();

        let (status, _) = get_body(router(temp.path(), true), "/nope.html").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
