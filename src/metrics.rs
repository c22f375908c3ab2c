//! Prometheus metrics for the screenshot search service.
//!
//! Exposes an HTTP endpoint for Prometheus scraping.

use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Initialize the metrics system and return the Prometheus handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    describe_histogram!(
        "screenshot_search_latency_ms",
        "Time taken for search requests in milliseconds"
    );
    describe_counter!(
        "screenshot_search_total",
        "Total number of search requests processed"
    );
    describe_counter!(
        "screenshot_search_errors_total",
        "Total number of failed or degraded searches"
    );
    describe_counter!(
        "screenshot_ingest_total",
        "Total number of screenshots stored"
    );
    describe_counter!(
        "screenshot_ingest_errors_total",
        "Total number of screenshots that failed to store"
    );
    describe_gauge!(
        "screenshot_store_degraded",
        "1 when running on the in-memory fallback store"
    );

    PrometheusBuilder::new().install_recorder()
}

/// Record a search latency measurement.
pub fn record_search_latency(latency_ms: f64) {
    histogram!("screenshot_search_latency_ms").record(latency_ms);
}

/// Increment the search count.
pub fn increment_search_count() {
    counter!("screenshot_search_total").increment(1);
}

/// Increment the search error count.
pub fn increment_search_errors() {
    counter!("screenshot_search_errors_total").increment(1);
}

/// Increment the stored screenshot count.
pub fn increment_ingest_count() {
    counter!("screenshot_ingest_total").increment(1);
}

/// Increment the failed ingest count.
pub fn increment_ingest_errors() {
    counter!("screenshot_ingest_errors_total").increment(1);
}

/// Publish whether the store is in fallback mode.
pub fn set_store_degraded(degraded: bool) {
    gauge!("screenshot_store_degraded").set(if degraded { 1.0 } else { 0.0 });
}

/// Create an Axum router for the metrics HTTP endpoint.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
}

/// Start the metrics HTTP server on the given port with auto-detect binding.
pub async fn start_metrics_server(port: u16, handle: PrometheusHandle) -> std::io::Result<()> {
    let app = metrics_router(handle);

    // Auto-detect: Try dual-stack first, fall back to IPv4-only
    if let Ok(listener) = tokio::net::TcpListener::bind(("::", port)).await {
        info!(port = port, bind = "::", "Starting metrics server (dual-stack)");
        return axum::serve(listener, app).await;
    }

    info!(port = port, bind = "0.0.0.0", "Starting metrics server (IPv4-only fallback)");
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_recorders_without_install() {
        // metrics falls back to a no-op recorder when none is installed
        record_search_latency(5.0);
        increment_search_count();
        increment_search_errors();
        increment_ingest_count();
        increment_ingest_errors();
        set_store_degraded(true);
    }

    #[tokio::test]
    async fn test_metrics_router_returns_metrics() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let app = metrics_router(handle);

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_start_metrics_server_binds_and_serves() {
        use http_body_util::Empty;
        use hyper::body::Bytes;
        use std::net::TcpListener as StdTcpListener;

        // Find an available port
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let server_handle = tokio::spawn(async move {
            let _ = start_metrics_server(port, handle).await;
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let client: hyper_util::client::legacy::Client<_, Empty<Bytes>> =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build_http();

        let uri: hyper::Uri = format!("http://127.0.0.1:{}/metrics", port)
            .parse()
            .unwrap();
        let response = client.get(uri).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        server_handle.abort();
    }
}
