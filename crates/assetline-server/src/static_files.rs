//! Static file serving from the output root.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::error::ServerError;
use crate::live_reload::CLIENT_PATH;
use crate::state::AppState;

/// Serve the file a request path maps to.
pub(crate) async fn serve(State(state): State<Arc<AppState>>, req: Request<Body>) -> Response {
    let url_path = req.uri().path();
    let Some(file) = resolve(&state.root, url_path).await else {
        return ServerError::NotFound(url_path.to_owned()).into_response();
    };

    let contents = match tokio::fs::read(&file).await {
        Ok(contents) => contents,
        Err(e) => return ServerError::Io(e).into_response(),
    };

    let is_html = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
    if is_html {
        let html = String::from_utf8_lossy(&contents);
        let body = if state.live_reload_enabled() {
            inject_client(&html)
        } else {
            html.into_owned()
        };
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            body,
        )
            .into_response();
    }

    let mime = mime_guess::from_path(&file).first_or_octet_stream();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.as_ref())],
        contents,
    )
        .into_response()
}

/// Map a URL path to a file below `root`.
///
/// Directories resolve to their `index.html`; a missing extensionless path
/// falls back to `<path>.html`. Paths escaping the root resolve to nothing.
async fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(url_path).decode_utf8().ok()?;

    let mut path = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => path.push(s),
        }
    }

    let metadata = tokio::fs::metadata(&path).await.ok();
    match metadata {
        Some(m) if m.is_dir() => {
            let index = path.join("index.html");
            is_file(&index).await.then_some(index)
        }
        Some(_) => Some(path),
        None if path.extension().is_none() => {
            let html = path.with_extension("html");
            is_file(&html).await.then_some(html)
        }
        None => None,
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

/// Insert the reload client before the last `</body>`, or append it.
fn inject_client(html: &str) -> String {
    let tag = format!("<script src=\"{CLIENT_PATH}\"></script>");
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(index) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..index]);
            out.push_str(&tag);
            out.push_str(&html[index..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn site() -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("blog")).unwrap();
        fs::write(temp.path().join("index.html"), "home").unwrap();
        fs::write(temp.path().join("blog/index.html"), "blog").unwrap();
        fs::write(temp.path().join("blog/post.html"), "post").unwrap();
        fs::write(temp.path().join("about me.html"), "about").unwrap();
        temp
    }

    #[tokio::test]
    async fn test_resolve_directories_to_index() {
        let temp = site();

        assert_eq!(resolve(temp.path(), "/").await, Some(temp.path().join("index.html")));
        assert_eq!(
            resolve(temp.path(), "/blog/").await,
            Some(temp.path().join("blog/index.html"))
        );
    }

    #[tokio::test]
    async fn test_resolve_html_fallback() {
        let temp = site();

        assert_eq!(
            resolve(temp.path(), "/blog/post").await,
            Some(temp.path().join("blog/post.html"))
        );
        assert_eq!(resolve(temp.path(), "/blog/missing").await, None);
    }

    #[tokio::test]
    async fn test_resolve_percent_decoded() {
        let temp = site();

        assert_eq!(
            resolve(temp.path(), "/about%20me.html").await,
            Some(temp.path().join("about me.html"))
        );
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let temp = site();

        assert_eq!(resolve(&temp.path().join("blog"), "/../index.html").await, None);
        assert_eq!(resolve(temp.path(), "/blog/%2e%2e/index.html").await, None);
    }

    #[test]
    fn test_inject_before_last_body_close() {
        assert_eq!(
            inject_client("<BODY>x</BODY>"),
            "<BODY>x<script src=\"/__assetline/client.js\"></script></BODY>"
        );
    }

    #[test]
    fn test_inject_appends_without_body() {
        assert_eq!(
            inject_client("<p>fragment</p>"),
            "<p>fragment</p><script src=\"/__assetline/client.js\"></script>"
        );
    }
}
