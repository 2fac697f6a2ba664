use super::*;
use crate::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tower::ServiceExt;


/// Relay backed by the real HTTP fetcher
fn test_relay(config: Config) -> Arc<PageRelay> {
    Arc::new(PageRelay::new(config).unwrap())
}

fn test_router() -> (Router, Arc<PageRelay>) {
    let relay = test_relay(Config::default());
    (create_router(relay.clone()), relay)
}

async fn send(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Parse an SSE body into the JSON of each `data` message, skipping comments
fn sse_messages(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter_map(|frame| {
            let data: Vec<&str> = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if data.is_empty() {
                None
            } else {
                Some(serde_json::from_str(&data.join("\n")).unwrap())
            }
        })
        .collect()
}

#[tokio::test]
async fn api_server_serves_until_shutdown() {
    let relay = test_relay(Config::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let server = tokio::spawn(serve(listener, relay.clone()));

    let health: Value = reqwest::get(format!("http://{}/api/health", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    relay.shutdown().await;
    tokio::time::timeout(std::time::Duration::from_secs(5), server)
        .await
        .expect("server should stop after shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn start_api_server_reports_bind_failure() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = Config::default();
    config.server.api.bind_address = occupied.local_addr().unwrap();

    let result = start_api_server(test_relay(config)).await;
    assert!(matches!(result, Err(crate::Error::Io(_))));
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let (app, _relay) = test_router();

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn cors_restricts_to_configured_origins() {
    let mut config = Config::default();
    config.server.api.cors_origins = vec!["http://allowed.test".to_string()];
    let app = create_router(test_relay(config));

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://other.test")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn cors_disabled_sends_no_headers() {
    let mut config = Config::default();
    config.server.api.cors_enabled = false;
    let app = create_router(test_relay(config));

    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (app, _relay) = test_router();
    let response = send(app, "/api/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
