use std::net::SocketAddr;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower::make::Shared;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::Operator;
use crate::config::Config;
use crate::controllers::paste;
use crate::error::ApiError;
use crate::render::{Rendered, Renderer, Variant};
use crate::storage::FileStorage;
use crate::types::api::UploadPaste;
use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::from((app.config.bind_address, app.config.port));
    info!("storing pastes in {}", app.storage.dir().display());
    let router = router(app);

    let server =
        axum::Server::try_bind(&addr).with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}");
    server.serve(Shared::new(router)).await?;

    Ok(())
}

/// Build the service. Trailing slashes are trimmed before routing, so `/{id}/raw/` works too.
pub fn router(app: App) -> NormalizePath<Router> {
    let assets = ServeDir::new(&app.config.assets.dir);

    let router = Router::new()
        .route("/", get(index).fallback(method_not_allowed))
        .route("/paste", post(upload_paste).fallback(method_not_allowed))
        .route("/:id", get(get_paste).fallback(method_not_allowed))
        .route(
            "/:id/:variant",
            get(get_paste_variant).fallback(method_not_allowed),
        )
        .nest_service("/static", assets)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(app.config.limits.max_upload_size))
        .layer(TraceLayer::new_for_http())
        .with_state(app);

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[derive(Deserialize)]
struct RenderParams {
    /// Syntax to highlight with instead of guessing.
    lang: Option<String>,
}

async fn index(
    _: Operator,
    State(config): State<Config>,
    State(storage): State<FileStorage>,
) -> crate::ApiResult<Html<String>> {
    let html = paste::index(&storage, &config.base_url).await?;
    Ok(Html(html))
}

async fn upload_paste(
    _: Operator,
    State(config): State<Config>,
    State(storage): State<FileStorage>,
    data: Result<Bytes, BytesRejection>,
) -> crate::ApiResult<Json<UploadPaste>> {
    // the body is only read once the credentials have been accepted
    let key = paste::create(&storage, data?).await?;
    Ok(Json(UploadPaste {
        uri: format!("{base_url}{key}", base_url = config.base_url),
    }))
}

async fn get_paste(
    State(storage): State<FileStorage>,
    State(renderer): State<Renderer>,
    Path(key): Path<String>,
    Query(params): Query<RenderParams>,
) -> crate::ApiResult<Rendered> {
    paste::render(&storage, &renderer, &key, Variant::Default, params.lang).await
}

async fn get_paste_variant(
    State(storage): State<FileStorage>,
    State(renderer): State<Renderer>,
    Path((key, variant)): Path<(String, String)>,
    Query(params): Query<RenderParams>,
) -> crate::ApiResult<Rendered> {
    // "{key}/{unknown}" is not the name of any paste
    let variant = Variant::from_suffix(&variant).ok_or(ApiError::NotFound)?;
    paste::render(&storage, &renderer, &key, variant, params.lang).await
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::headers::{Authorization, HeaderMapExt};
    use axum::http::{header, HeaderValue, Request, StatusCode};
    use axum::response::Response;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{Assets, Credentials, Highlight, Limits, Storage as StorageConfig};
    use crate::types::api::ErrorResponse;

    const BASE_URL: &str = "http://paste.example/";

    async fn test_router() -> (NormalizePath<Router>, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = Config {
            base_url: BASE_URL.into(),
            bind_address: [127, 0, 0, 1].into(),
            port: 0,
            credentials: Credentials {
                username: "admin".into(),
                password: "hunter2".into(),
            },
            storage: StorageConfig {
                dir: dir.path().join("files"),
            },
            assets: Assets {
                dir: dir.path().join("static"),
            },
            limits: Limits {
                max_upload_size: 1024,
            },
            highlight: Highlight::default(),
        };
        let app = App::new(config).await.unwrap();
        (router(app), dir)
    }

    fn stored_files(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("files")).unwrap().count()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post(data: impl Into<Body>) -> Request<Body> {
        Request::post("/paste").body(data.into()).unwrap()
    }

    fn authed(mut request: Request<Body>) -> Request<Body> {
        request
            .headers_mut()
            .typed_insert(Authorization::basic("admin", "hunter2"));
        request
    }

    async fn send(router: &NormalizePath<Router>, request: Request<Body>) -> Response {
        router.clone().oneshot(request).await.unwrap()
    }

    async fn body(response: Response) -> Bytes {
        hyper::body::to_bytes(response.into_body()).await.unwrap()
    }

    async fn upload(router: &NormalizePath<Router>, data: &'static [u8]) -> String {
        let response = send(router, authed(post(data))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let uploaded: UploadPaste = serde_json::from_slice(&body(response).await).unwrap();
        uploaded.uri.strip_prefix(BASE_URL).unwrap().to_owned()
    }

    async fn assert_error(response: Response, status: StatusCode) {
        assert_eq!(response.status(), status);
        let error: ErrorResponse = serde_json::from_slice(&body(response).await).unwrap();
        assert!(!error.error.is_empty());
    }

    #[tokio::test]
    async fn upload_requires_credentials() {
        let (router, dir) = test_router().await;

        let response = send(&router, post("secret")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=\"http://paste.example/\""
        );
        assert_eq!(stored_files(&dir), 0);
    }

    #[tokio::test]
    async fn upload_rejects_wrong_password() {
        let (router, dir) = test_router().await;

        let mut request = post("secret");
        request
            .headers_mut()
            .typed_insert(Authorization::basic("admin", "wrong"));

        let response = send(&router, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(stored_files(&dir), 0);
    }

    #[tokio::test]
    async fn binary_round_trip() {
        let (router, _dir) = test_router().await;
        let data: &[u8] = &[0x00, 0xff, 0xfe, b'\n', 0x80, b'x'];

        let key = upload(&router, data).await;
        assert_eq!(key.len(), 8);
        assert!(key.bytes().all(|b| b.is_ascii_alphanumeric()));

        let response = send(&router, get(&format!("/{key}/raw"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(&body(response).await[..], data);
    }

    #[tokio::test]
    async fn empty_round_trip() {
        let (router, _dir) = test_router().await;

        let key = upload(&router, b"").await;
        let response = send(&router, get(&format!("/{key}/raw"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(response).await.is_empty());
    }

    #[tokio::test]
    async fn oversized_upload_is_refused() {
        let (router, dir) = test_router().await;

        let mut request = authed(post(vec![b'a'; 2048]));
        request
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(2048usize));

        let response = send(&router, request).await;
        assert_error(response, StatusCode::PAYLOAD_TOO_LARGE).await;
        assert_eq!(stored_files(&dir), 0);
    }

    #[tokio::test]
    async fn oversized_upload_without_credentials_is_unauthorized() {
        let (router, dir) = test_router().await;

        let mut request = post(vec![b'a'; 4096]);
        request
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(4096usize));

        let response = send(&router, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(stored_files(&dir), 0);
    }

    #[tokio::test]
    async fn routing_errors_are_json() {
        let (router, _dir) = test_router().await;

        let response = send(&router, get("/a/b/c")).await;
        assert_error(response, StatusCode::NOT_FOUND).await;

        let response = send(&router, get("/paste")).await;
        assert_error(response, StatusCode::METHOD_NOT_ALLOWED).await;

        let request = authed(Request::delete("/").body(Body::empty()).unwrap());
        let response = send(&router, request).await;
        assert_error(response, StatusCode::METHOD_NOT_ALLOWED).await;
    }

    #[tokio::test]
    async fn trailing_slashes_are_ignored() {
        let (router, _dir) = test_router().await;
        let key = upload(&router, b"slashed").await;

        let response = send(&router, get(&format!("/{key}/"))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&router, get(&format!("/{key}/raw/"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&body(response).await[..], b"slashed");
    }

    #[tokio::test]
    async fn pastes_are_public() {
        let (router, _dir) = test_router().await;
        let key = upload(&router, b"fn main() {}\n").await;

        let response = send(&router, get(&format!("/{key}?lang=rs"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let page = body(response).await;
        let page = std::str::from_utf8(&page).unwrap();
        assert!(page.contains("<pre><code>"));
        assert!(page.contains("main"));
    }

    #[tokio::test]
    async fn variants() {
        let (router, _dir) = test_router().await;
        let key = upload(&router, b"\x1b[32mgreen\x1b[0m <i>").await;

        let response = send(&router, get(&format!("/{key}/html"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&body(response).await[..], b"\x1b[32mgreen\x1b[0m <i>");

        let response = send(&router, get(&format!("/{key}/ansi"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body(response).await;
        let page = std::str::from_utf8(&page).unwrap();
        assert!(page.contains("green"));
        assert!(page.contains("&lt;i&gt;"));
        assert!(!page.contains('\x1b'));

        let response = send(&router, get(&format!("/{key}/pdf"))).await;
        assert_error(response, StatusCode::NOT_FOUND).await;
    }

    #[tokio::test]
    async fn unknown_pastes_are_errors() {
        let (router, _dir) = test_router().await;

        for uri in ["/doesnotexist", "/doesnotexist/raw", "/doesnotexist/ansi"] {
            let response = send(&router, get(uri)).await;
            assert_error(response, StatusCode::NOT_FOUND).await;
        }
    }

    #[tokio::test]
    async fn traversal_stays_inside_storage() {
        let (router, dir) = test_router().await;
        std::fs::write(dir.path().join("secret"), b"do not leak").unwrap();

        for uri in ["/..%2Fsecret/raw", "/%2E%2E%2Fsecret", "/..%2F..%2Fsecret/ansi"] {
            let response = send(&router, get(uri)).await;
            assert_ne!(response.status(), StatusCode::OK);
            let page = body(response).await;
            assert!(!String::from_utf8_lossy(&page).contains("do not leak"));
        }
    }

    #[tokio::test]
    async fn index_requires_credentials() {
        let (router, _dir) = test_router().await;

        let response = send(&router, get("/")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn index_lists_every_upload() {
        let (router, _dir) = test_router().await;

        let mut keys = Vec::new();
        for data in [b"one".as_slice(), b"two".as_slice(), b"three".as_slice()] {
            keys.push(upload(&router, data).await);
        }

        let response = send(&router, authed(get("/"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body(response).await;
        let page = std::str::from_utf8(&page).unwrap();

        for key in &keys {
            assert!(page.contains(&format!("<a href=\"{BASE_URL}{key}\">{key}</a>")));
        }
        // header row plus one per paste
        assert_eq!(page.matches("<tr>").count(), keys.len() + 1);
    }
}
