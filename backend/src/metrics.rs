//! HTTP request metrics.
//!
//! [`HttpMetrics`] owns its own Prometheus [`Registry`]; one instance is built
//! at startup and handed to the router through [`AppState`](crate::state::AppState).
//! Every request gets a [`RequestObserver`] that is consumed once the response
//! is ready, recording a request count and a latency sample labelled by
//! method, route template and status code.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::warn;

const TASKS_PREFIX: &str = "/api/tasks/";
const TASK_ROUTE: &str = "/api/tasks/:id";
/// Label for requests that matched no route and found no static file.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Latency buckets in seconds, dense between 1ms and 2s.
const DURATION_BUCKETS: [f64; 10] = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0];

const LABELS: [&str; 3] = ["method", "route", "status_code"];

#[derive(Clone)]
pub struct HttpMetrics {
    registry: Arc<Registry>,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
}

impl HttpMetrics {
    /// Create the collectors and register them with a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &LABELS,
        )?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &LABELS,
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_duration,
        })
    }

    /// Start observing a request that matched the route template `route`.
    pub fn observe(&self, method: &Method, route: &str) -> RequestObserver {
        self.start(method, route, true)
    }

    /// Start observing a request no route matched; `path` is the raw path.
    pub fn observe_unmatched(&self, method: &Method, path: &str) -> RequestObserver {
        self.start(method, path, false)
    }

    fn start(&self, method: &Method, route: &str, matched: bool) -> RequestObserver {
        RequestObserver {
            metrics: self.clone(),
            method: method.as_str().to_string(),
            route: normalize_route(route),
            matched,
            started: Instant::now(),
        }
    }

    /// Render every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    fn record(&self, method: &str, route: &str, status: StatusCode, seconds: f64) {
        let status = status.as_u16().to_string();
        let labels = [method, route, status.as_str()];

        match self.requests_total.get_metric_with_label_values(&labels) {
            Ok(counter) => counter.inc(),
            Err(e) => warn!(error = %e, "failed to record request count"),
        }
        match self.request_duration.get_metric_with_label_values(&labels) {
            Ok(histogram) => histogram.observe(seconds),
            Err(e) => warn!(error = %e, "failed to record request duration"),
        }
    }
}

/// Timing for a single in-flight request.
///
/// `finish` takes `self`, so each request is recorded at most once.
pub struct RequestObserver {
    metrics: HttpMetrics,
    method: String,
    route: String,
    matched: bool,
    started: Instant,
}

impl RequestObserver {
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn finish(self, status: StatusCode) {
        let seconds = self.started.elapsed().as_secs_f64();
        // Misses on arbitrary paths share one series; served files keep their path.
        let route = if !self.matched && status == StatusCode::NOT_FOUND {
            UNMATCHED_ROUTE
        } else {
            self.route.as_str()
        };
        self.metrics.record(&self.method, route, status, seconds);
    }
}

/// Collapse any path below the task collection into one label.
pub fn normalize_route(path: &str) -> String {
    match path.strip_prefix(TASKS_PREFIX) {
        Some(rest) if !rest.is_empty() => TASK_ROUTE.to_string(),
        _ => path.to_string(),
    }
}

/// Middleware recording every request passing through the router.
pub async fn track_metrics(
    State(metrics): State<HttpMetrics>,
    req: Request,
    next: Next,
) -> Response {
    let observer = match req.extensions().get::<MatchedPath>() {
        Some(matched) => metrics.observe(req.method(), matched.as_str()),
        None => metrics.observe_unmatched(req.method(), req.uri().path()),
    };

    let response = next.run(req).await;
    observer.finish(response.status());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_paths_collapse_to_template() {
        assert_eq!(normalize_route("/api/tasks/65f1c0ffee"), "/api/tasks/:id");
        assert_eq!(normalize_route("/api/tasks/:id"), "/api/tasks/:id");
        assert_eq!(normalize_route("/api/tasks/a/b"), "/api/tasks/:id");
    }

    #[test]
    fn other_paths_are_kept() {
        assert_eq!(normalize_route("/api/tasks"), "/api/tasks");
        assert_eq!(normalize_route("/api/tasks/"), "/api/tasks/");
        assert_eq!(normalize_route("/health"), "/health");
        assert_eq!(normalize_route("/index.html"), "/index.html");
    }

    #[test]
    fn finished_observer_is_exported() {
        let metrics = HttpMetrics::new().unwrap();

        let observer = metrics.observe(&Method::PUT, "/api/tasks/1234");
        assert_eq!(observer.route(), "/api/tasks/:id");
        observer.finish(StatusCode::NOT_FOUND);

        let text = metrics.encode().unwrap();
        assert!(text.contains(
            r#"http_requests_total{method="PUT",route="/api/tasks/:id",status_code="404"} 1"#
        ));
        assert!(text.contains("http_request_duration_seconds_bucket"));
        assert!(text.contains(r#"le="0.001""#));
        assert!(!text.contains("1234"));
    }

    #[test]
    fn unmatched_misses_share_one_series() {
        let metrics = HttpMetrics::new().unwrap();

        for i in 0..50 {
            metrics
                .observe_unmatched(&Method::GET, &format!("/scan-{i}"))
                .finish(StatusCode::NOT_FOUND);
        }
        metrics
            .observe_unmatched(&Method::GET, "/index.html")
            .finish(StatusCode::OK);

        let text = metrics.encode().unwrap();
        assert!(text.contains(
            r#"http_requests_total{method="GET",route="unmatched",status_code="404"} 50"#
        ));
        assert!(text.contains(
            r#"http_requests_total{method="GET",route="/index.html",status_code="200"} 1"#
        ));
        assert!(!text.contains("/scan-"));
    }

    #[test]
    fn matched_routes_keep_their_label_on_404() {
        let metrics = HttpMetrics::new().unwrap();

        metrics
            .observe(&Method::DELETE, "/api/tasks/:id")
            .finish(StatusCode::NOT_FOUND);

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"route="/api/tasks/:id",status_code="404""#));
    }

    #[test]
    fn registries_are_independent() {
        let first = HttpMetrics::new().unwrap();
        let second = HttpMetrics::new().unwrap();

        first.observe(&Method::GET, "/health").finish(StatusCode::OK);

        assert!(first.encode().unwrap().contains("/health"));
        assert!(!second.encode().unwrap().contains("/health"));
    }
}
