// tests/health_service_tests.rs
use async_trait::async_trait;
use healthgate::health::{
    CheckStatus, CompositeHealthCheckResult, HealthCheck, HealthCheckBuilder, HealthCheckResult,
    HealthCheckService, ProbeResult, ResolveError, ServiceResolver, TIMED_OUT_DESCRIPTION,
};
use healthgate::server::{HealthHandler, ServerBuilder};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

struct DatabaseCheck;

#[async_trait]
impl HealthCheck for DatabaseCheck {
    async fn check(&self, _cancel: &CancellationToken) -> ProbeResult {
        Ok(HealthCheckResult::healthy("select 1 ok")
            .with_entry("latency_ms", 3)
            .into())
    }
}

struct QueueCheck;

#[async_trait]
impl HealthCheck for QueueCheck {
    async fn check(&self, _cancel: &CancellationToken) -> ProbeResult {
        Ok(HealthCheckResult::warning("backlog growing").into())
    }
}

fn completed_status() -> impl Strategy<Value = CheckStatus> {
    prop_oneof![
        Just(CheckStatus::Healthy),
        Just(CheckStatus::Warning),
        Just(CheckStatus::Unhealthy),
    ]
}

fn merge(children: &[CheckStatus], partial: CheckStatus) -> CompositeHealthCheckResult {
    let mut composite = CompositeHealthCheckResult::new(partial);
    for (i, status) in children.iter().enumerate() {
        composite
            .add_status(format!("check-{}", i), *status, "d", Default::default())
            .unwrap();
    }
    composite
}

proptest! {
    #[test]
    fn test_merge_ignores_insertion_order(
        children in proptest::collection::vec(completed_status(), 0..8),
        partial in completed_status(),
    ) {
        let mut reversed = children.clone();
        reversed.reverse();

        let forward = merge(&children, partial);
        let backward = merge(&reversed, partial);
        prop_assert_eq!(forward.status(), backward.status());

        let distinct = children.iter().copied().collect::<HashSet<_>>();
        let expected = match distinct.len() {
            0 => CheckStatus::Unknown,
            1 => children[0],
            _ if distinct.contains(&CheckStatus::Healthy) => partial,
            _ => CheckStatus::Unhealthy,
        };
        prop_assert_eq!(forward.status(), expected);
    }
}

#[tokio::test]
async fn test_groups_and_checks_end_to_end() {
    let mut builder = HealthCheckBuilder::new();
    builder
        .with_partial_success_status(CheckStatus::Warning)
        .unwrap()
        .add_check("database", DatabaseCheck)
        .unwrap()
        .add_group("messaging", CheckStatus::Warning, |group| {
            group.add_check("queue", QueueCheck)?;
            group.add_min_value_check("consumers", 1, || 2)?;
            Ok(())
        })
        .unwrap();
    let service = HealthCheckService::new(builder);

    let result = service.check_health(&CancellationToken::new()).await;

    assert_eq!(result.status(), CheckStatus::Warning);
    assert_eq!(
        result.description(),
        "database: select 1 ok\n\
         Group(messaging): queue: backlog growing\n\
         consumers: min=1, current=2"
    );

    let data = result.data();
    assert_eq!(data["database"]["latency_ms"], 3);
    assert_eq!(data["Group(messaging)"]["consumers"]["current"], 2);
}

#[tokio::test]
async fn test_checks_resolved_by_type() {
    let resolver = Arc::new(ServiceResolver::new());
    resolver.register(|| DatabaseCheck);

    let mut builder = HealthCheckBuilder::new();
    builder
        .add_check_by_type::<DatabaseCheck>("db")
        .unwrap()
        .add_check_by_type::<QueueCheck>("queue")
        .unwrap();
    let service = HealthCheckService::with_resolver(builder, resolver);

    let result = service.check_health(&CancellationToken::new()).await;

    assert_eq!(result.get("db").unwrap().status(), CheckStatus::Healthy);
    let queue = result.get("queue").unwrap();
    assert_eq!(queue.status(), CheckStatus::Unhealthy);
    assert_eq!(
        queue.description(),
        format!(
            "Exception during check: {}",
            std::any::type_name::<ResolveError>()
        )
    );
    assert_eq!(result.status(), CheckStatus::Unhealthy);
}

#[tokio::test]
async fn test_results_are_served_from_cache_between_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut builder = HealthCheckBuilder::new();
    builder
        .with_default_cache_duration(Duration::from_secs(60))
        .add_check_fn("counted", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            HealthCheckResult::healthy("counted")
        })
        .unwrap();
    let service = HealthCheckService::new(builder);
    let cancel = CancellationToken::new();

    let first = service.check_health(&cancel).await;
    let second = service.check_health(&cancel).await;

    assert!(Arc::ptr_eq(
        first.get("counted").unwrap(),
        second.get("counted").unwrap()
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_blank_description_is_reported_unhealthy() {
    let mut builder = HealthCheckBuilder::new();
    builder
        .add_check_fn("silent", || HealthCheckResult::healthy(""))
        .unwrap()
        .add_check_fn("chatty", || HealthCheckResult::healthy("all good"))
        .unwrap();
    let service = HealthCheckService::new(builder);

    let result = service.check_health(&CancellationToken::new()).await;

    let silent = result.get("silent").unwrap();
    assert_eq!(silent.status(), CheckStatus::Unhealthy);
    assert!(!silent.description().trim().is_empty());
    assert_eq!(result.status(), CheckStatus::Unhealthy);
}

#[tokio::test]
async fn test_cancelled_run_reports_timeouts() {
    let mut builder = HealthCheckBuilder::new();
    builder.add_check("database", DatabaseCheck).unwrap();
    let service = HealthCheckService::new(builder);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = service.check_health(&cancel).await;

    assert_eq!(result.status(), CheckStatus::Unhealthy);
    assert_eq!(
        result.get("database").unwrap().description(),
        TIMED_OUT_DESCRIPTION
    );
}

#[tokio::test]
async fn test_url_checks_against_live_server() {
    let mut upstream = mockito::Server::new_async().await;
    let _ok = upstream
        .mock("GET", "/ok")
        .with_status(200)
        .create_async()
        .await;
    let _down = upstream
        .mock("GET", "/down")
        .with_status(503)
        .create_async()
        .await;

    let ok = format!("{}/ok", upstream.url());
    let down = format!("{}/down", upstream.url());

    let mut builder = HealthCheckBuilder::new();
    builder
        .add_url_check(&ok)
        .unwrap()
        .add_url_checks([ok.as_str(), down.as_str()], "upstream", CheckStatus::Warning)
        .unwrap();
    let service = HealthCheckService::new(builder);

    let result = service.check_health(&CancellationToken::new()).await;

    let single = result.get(&format!("UrlCheck({})", ok)).unwrap();
    assert_eq!(single.status(), CheckStatus::Healthy);
    let multi = result.get("UrlChecks(upstream)").unwrap();
    assert_eq!(multi.status(), CheckStatus::Warning);
    assert_eq!(result.status(), CheckStatus::Unhealthy);
}

#[tokio::test]
async fn test_health_endpoint_over_tcp() {
    let mut builder = HealthCheckBuilder::new();
    builder.add_check("database", DatabaseCheck).unwrap();
    let service = Arc::new(HealthCheckService::new(builder));
    let handler = HealthHandler::new(service, "/health", Duration::from_secs(5));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let stop = shutdown.clone();

    let server = tokio::spawn(
        ServerBuilder::new(addr)
            .with_handler(handler)
            .with_shutdown(async move { stop.cancelled().await })
            .serve_listener(listener),
    );

    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/json"
    );
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "status": "Healthy" }));

    let response = reqwest::get(format!("http://{}/missing", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    shutdown.cancel();
    server.await.unwrap().unwrap();
}
