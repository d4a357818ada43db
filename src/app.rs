use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::projects;
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(projects::router())
        .route("/api/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(middleware::from_fn(cors))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// Wildcard CORS on every response; preflight `OPTIONS` never reaches a handler.
async fn cors(req: Request, next: Next) -> Response {
    let mut res = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    let headers = res.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    res
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::github::stub::{StubFetcher, StubOutcome};
    use crate::projects::handlers::MAX_BODY_BYTES;
    use crate::projects::repo::memory::MemoryProjectStore;
    use crate::projects::repo_types::Project;

    fn app_with(store: Arc<MemoryProjectStore>, fetcher: StubFetcher) -> Router {
        build_app(AppState::fake_with(store, Arc::new(fetcher)))
    }

    fn app() -> Router {
        app_with(
            Arc::new(MemoryProjectStore::default()),
            StubFetcher::found("axum", "tokio-rs", 18_000),
        )
    }

    fn post(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/projects")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn body_string(res: Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(res: Response) -> T {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn lookup_path_returns_created() {
        let res = app()
            .oneshot(post(json!({"github_url": "https://github.com/tokio-rs/axum"}).to_string()))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let project: Project = body_json(res).await;
        assert_eq!(project.name, "axum");
        assert_eq!(project.stars, 18_000);
        assert!(project.id > 0);
    }

    #[tokio::test]
    async fn metadata_resubmission_returns_existing_with_200() {
        let store = Arc::new(MemoryProjectStore::default());
        let app = app_with(store.clone(), StubFetcher::new(StubOutcome::Unreachable));
        let body = json!({
            "github_url": "https://github.com/sharkdp/fd",
            "name": "fd",
            "owner_name": "sharkdp",
            "owner_avatar": "http://insecure.example/a.png",
            "stars": -5,
            "created_at": "2017-05-09T19:00:00Z"
        })
        .to_string();

        let first = app.clone().oneshot(post(body.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let first: Value = body_json(first).await;
        assert_eq!(first["stars"], 0);
        assert_eq!(first["owner_avatar"], "");
        assert_eq!(first["created_at"], "2017-05-09T19:00:00Z");

        let second = app.oneshot(post(body)).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        let second: Value = body_json(second).await;
        assert_eq!(second["id"], first["id"]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn empty_github_url_is_bad_request() {
        let res = app().oneshot(post(r#"{"github_url": ""}"#)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(res).await.contains("github_url is required"));
    }

    #[tokio::test]
    async fn invalid_url_is_bad_request() {
        let res = app()
            .oneshot(post(r#"{"github_url": "https://gitlab.com/a/b"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(res).await.contains("github.com/owner/repo"));
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let res = app().oneshot(post("{\"github_url\": ")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(res).await.starts_with("invalid request body"));
    }

    #[tokio::test]
    async fn oversized_body_is_bad_request() {
        let store = Arc::new(MemoryProjectStore::default());
        let fetcher = Arc::new(StubFetcher::found("axum", "tokio-rs", 1));
        let app = build_app(AppState::fake_with(store.clone(), fetcher.clone()));

        let padding = "x".repeat(MAX_BODY_BYTES + 1);
        let res = app.oneshot(post(padding)).await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(res).await, "request body too large");
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn upstream_forbidden_becomes_429() {
        let app = app_with(
            Arc::new(MemoryProjectStore::default()),
            StubFetcher::new(StubOutcome::Status(
                403,
                r#"{"message":"API rate limit exceeded"}"#.into(),
            )),
        );
        let res = app
            .oneshot(post(r#"{"github_url": "github.com/a/b"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(body_string(res).await.contains("rate limit"));
    }

    #[tokio::test]
    async fn upstream_not_found_becomes_500() {
        let app = app_with(
            Arc::new(MemoryProjectStore::default()),
            StubFetcher::new(StubOutcome::Status(404, "Not Found".into())),
        );
        let res = app
            .oneshot(post(r#"{"github_url": "github.com/a/b"}"#))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(res).await.starts_with("failed to add project"));
    }

    #[tokio::test]
    async fn list_returns_projects_by_stars() {
        let app = app_with(
            Arc::new(MemoryProjectStore::default()),
            StubFetcher::new(StubOutcome::Unreachable),
        );
        for (i, stars) in [5, 100, 1].into_iter().enumerate() {
            let body = json!({
                "github_url": format!("https://github.com/o/r{i}"),
                "name": format!("r{i}"),
                "owner_name": "o",
                "stars": stars
            });
            let res = app.clone().oneshot(post(body.to_string())).await.unwrap();
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let req = Request::builder()
            .uri("/api/projects")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let projects: Vec<Project> = body_json(res).await;
        let stars: Vec<i64> = projects.iter().map(|p| p.stars).collect();
        assert_eq!(stars, vec![100, 5, 1]);
    }

    #[tokio::test]
    async fn options_is_answered_with_cors_headers() {
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/projects")
            .header("origin", "https://example.com")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let h = res.headers();
        assert_eq!(h.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(
            h.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(
            h.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            "Content-Type, Authorization"
        );
        assert!(body_string(res).await.is_empty());
    }

    #[tokio::test]
    async fn error_responses_carry_cors_headers() {
        let res = app().oneshot(post("nope")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn non_utc_timestamp_is_returned_in_utc() {
        let body = json!({
            "github_url": "https://github.com/o/r",
            "name": "r",
            "owner_name": "o",
            "description": null,
            "language": null,
            "stars": null,
            "created_at": "2016-03-05T22:10:00+02:00"
        });
        let res = app().oneshot(post(body.to_string())).await.unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        let project: Value = body_json(res).await;
        assert_eq!(project["created_at"], "2016-03-05T20:10:00Z");
        assert_eq!(project["description"], "");
        assert_eq!(project["language"], "");
        assert_eq!(project["stars"], 0);
    }

    #[tokio::test]
    async fn out_of_range_timestamp_is_replaced() {
        let body = json!({
            "github_url": "https://github.com/o/r",
            "name": "r",
            "owner_name": "o",
            "created_at": "9999-12-31T23:59:59-01:00"
        });
        let res = app().oneshot(post(body.to_string())).await.unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        let project: Value = body_json(res).await;
        let created_at = project["created_at"].as_str().unwrap();
        assert!(!created_at.starts_with("9999"), "{created_at}");
        assert!(created_at.ends_with('Z'), "{created_at}");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn request_span_records_response_status() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let out = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("status=200 OK}"), "{out}");
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected() {
        let req = Request::builder()
            .method("DELETE")
            .uri("/api/projects")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "ok");
    }
}
