//! Local attachment server for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::get,
    Router,
};
use tokio::net::TcpListener;

pub(crate) const API_KEY: &str = "key-test";

/// `Basic base64("api:key-test")`
const EXPECTED_AUTH: &str = "Basic YXBpOmtleS10ZXN0";

pub(crate) const BINARY_BODY: &[u8] = &[0x89, b'P', b'N', b'G', 0x00, 0xff, 0xfe];

/// Serves `/files/:name` behind Basic auth and counts every request.
///
/// `missing` answers 404, `binary` answers [`BINARY_BODY`], anything else
/// answers `contents of <name>`.
pub(crate) struct AttachmentServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl AttachmentServer {
    pub(crate) async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/files/:name", get(serve_file))
            .with_state(hits.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
        }
    }

    pub(crate) fn url(&self, name: &str) -> String {
        format!("{}/files/{}", self.base_url, name)
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// URL of a port nothing listens on.
    pub(crate) async fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/files/a.txt", addr)
    }
}

async fn serve_file(
    State(hits): State<Arc<AtomicUsize>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Vec<u8>) {
    hits.fetch_add(1, Ordering::SeqCst);

    let authorized = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(EXPECTED_AUTH);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Vec::new());
    }

    match name.as_str() {
        "missing" => (StatusCode::NOT_FOUND, Vec::new()),
        "binary" => (StatusCode::OK, BINARY_BODY.to_vec()),
        _ => (StatusCode::OK, format!("contents of {}", name).into_bytes()),
    }
}
