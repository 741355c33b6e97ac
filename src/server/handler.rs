// src/server/handler.rs
use crate::health::{CheckStatus, HealthCheckService};
use crate::metrics::MetricsRegistry;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// Answers the health endpoint with `{"status": "..."}`: 200 when healthy,
/// 503 otherwise. Every other path is a 404.
#[derive(Clone)]
pub struct HealthHandler {
    service: Arc<HealthCheckService>,
    path: Arc<str>,
    timeout: Duration,
}

impl HealthHandler {
    pub fn new(service: Arc<HealthCheckService>, path: &str, timeout: Duration) -> Self {
        Self {
            service,
            path: Arc::from(path),
            timeout,
        }
    }
}

impl Service<Request<Body>> for HealthHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let service = self.service.clone();
        let path = self.path.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            if req.uri().path() != &*path {
                return Ok(not_found());
            }

            let result = service.check_health_with_timeout(timeout).await;
            Ok(status_response(result.status()))
        })
    }
}

/// Serves the prometheus text exposition on its own port.
#[derive(Clone)]
pub struct MetricsHandler {
    registry: Arc<MetricsRegistry>,
    path: Arc<str>,
}

impl MetricsHandler {
    pub fn new(registry: Arc<MetricsRegistry>, path: &str) -> Self {
        Self {
            registry,
            path: Arc::from(path),
        }
    }
}

impl Service<Request<Body>> for MetricsHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if req.uri().path() != &*self.path {
            return futures::future::ready(Ok(not_found()));
        }

        let response = match self.registry.gather() {
            Ok(metrics) => {
                let mut response = Response::new(Body::from(metrics));
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            }
            Err(e) => {
                tracing::error!("Failed to gather metrics: {:#}", e);
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        };
        futures::future::ready(Ok(response))
    }
}

pub fn status_code(status: CheckStatus) -> StatusCode {
    if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

fn status_response(status: CheckStatus) -> Response<Body> {
    let body = json!({ "status": status }).to_string();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status_code(status);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn not_found() -> Response<Body> {
    let mut response = Response::new(Body::from("Not Found"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
