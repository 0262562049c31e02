//! Admin HTTP server for health checks, metrics and engine status

use crate::audit;
use crate::engine::{Lifecycle, MonitoringEngine};
use crate::metrics;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Bind the admin server without running it.
///
/// Returns the bound address (useful with port 0) and the server future,
/// which completes once `shutdown` is cancelled.
pub fn bind_admin(
    addr: SocketAddr,
    engine: Arc<MonitoringEngine>,
    shutdown: CancellationToken,
) -> Result<(SocketAddr, impl Future<Output = Result<(), hyper::Error>>), hyper::Error> {
    let make_svc = make_service_fn(move |_| {
        let engine = engine.clone();
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req: Request<Body>| {
                let engine = engine.clone();
                async move { Ok::<_, hyper::Error>(handle(&req, &engine)) }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    let local_addr = server.local_addr();
    let server = server.with_graceful_shutdown(async move { shutdown.cancelled().await });
    Ok((local_addr, server))
}

/// Serve /healthz, /readyz, /metrics and /status until `shutdown` is cancelled.
pub async fn serve_admin(
    addr: SocketAddr,
    engine: Arc<MonitoringEngine>,
    shutdown: CancellationToken,
) -> Result<(), hyper::Error> {
    let (local_addr, server) = bind_admin(addr, engine, shutdown)?;
    tracing::info!("Admin HTTP server listening on {}", local_addr);
    server.await
}

fn handle(req: &Request<Body>, engine: &MonitoringEngine) -> Response<Body> {
    let path = req.uri().path();
    let response = match path {
        "/healthz" => text(StatusCode::OK, "ok\n"),

        "/readyz" => match engine.lifecycle() {
            Lifecycle::Running => text(StatusCode::OK, "ready\n"),
            other => text(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("not ready ({})\n", other.as_str()),
            ),
        },

        "/metrics" => with_content_type(
            Response::new(Body::from(metrics::encode_metrics())),
            "text/plain; version=0.0.4",
        ),

        "/status" => match serde_json::to_vec(&engine.snapshot()) {
            Ok(body) => with_content_type(Response::new(Body::from(body)), "application/json"),
            Err(e) => text(StatusCode::INTERNAL_SERVER_ERROR, format!("{}\n", e)),
        },

        _ => text(StatusCode::NOT_FOUND, "not found\n"),
    };

    if matches!(path, "/healthz" | "/readyz" | "/metrics" | "/status") {
        audit::admin_http_request(path, response.status().as_u16());
    }
    response
}

fn text(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
}

fn with_content_type(mut response: Response<Body>, content_type: &'static str) -> Response<Body> {
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ChannelFeed;
    use crate::notify::ChannelNotifier;
    use crate::store::MemoryStore;
    use thermowatch_shared::Reading;

    fn engine() -> MonitoringEngine {
        let (_publisher, feed) = ChannelFeed::create("test");
        MonitoringEngine::new(
            Arc::new(feed),
            Arc::new(MemoryStore::new()),
            Arc::new(ChannelNotifier::create().0),
        )
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_healthz_and_unknown() {
        let engine = engine();
        assert_eq!(handle(&get("/healthz"), &engine).status(), StatusCode::OK);
        assert_eq!(handle(&get("/nope"), &engine).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_readyz_follows_lifecycle() {
        let engine = engine();
        assert_eq!(
            handle(&get("/readyz"), &engine).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        engine.start().await.unwrap();
        assert_eq!(handle(&get("/readyz"), &engine).status(), StatusCode::OK);
        engine.stop().await;
        let response = handle(&get("/readyz"), &engine);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_string(response).await, "not ready (stopped)\n");
    }

    #[tokio::test]
    async fn test_status_is_json_snapshot() {
        let engine = engine();
        engine.start().await.unwrap();
        engine.ingest(Reading::now(24.5).unwrap());

        let response = handle(&get("/status"), &engine);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["lifecycle"], "running");
        assert_eq!(json["current_reading"]["temperature"], 24.5);
        assert_eq!(json["within_thresholds"], true);
        assert_eq!(json["thresholds"]["min"], "20");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let engine = engine();
        metrics::READINGS_TOTAL.inc();
        let response = handle(&get("/metrics"), &engine);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("thermowatch_readings_total"));
    }

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let shutdown = CancellationToken::new();
        let (addr, server) = bind_admin(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(engine()),
            shutdown.clone(),
        )
        .unwrap();
        let server = tokio::spawn(server);

        let body = reqwest::get(format!("http://{}/healthz", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok\n");

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }
}
