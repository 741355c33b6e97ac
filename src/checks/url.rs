// src/checks/url.rs
use crate::health::{
    CheckResult, CheckStatus, CompositeHealthCheckResult, HealthCheck, HealthCheckBuilder,
    HealthCheckError, HealthCheckResult, ProbeError, ProbeResult,
};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// What a URL check saw: the requested URL, the response status and body.
#[derive(Debug, Clone)]
pub struct UrlResponse {
    pub url: Url,
    pub status: StatusCode,
    pub body: String,
}

impl UrlResponse {
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }
}

type Evaluator = dyn Fn(&UrlResponse) -> CheckResult + Send + Sync;

/// Healthy on `200 OK`, unhealthy on anything else.
pub fn default_url_check(response: &UrlResponse) -> HealthCheckResult {
    let description = format!(
        "UrlCheck({}): status code {} ({})",
        response.url,
        response.reason(),
        response.status.as_u16()
    );
    let result = if response.status == StatusCode::OK {
        HealthCheckResult::healthy(description)
    } else {
        HealthCheckResult::unhealthy(description)
    };
    result
        .with_entry("url", response.url.as_str())
        .with_entry("status", response.status.as_u16())
        .with_entry("reason", response.reason())
        .with_entry("body", response.body.clone())
}

/// GETs one or more URLs and evaluates each response.
///
/// A single URL yields the evaluator's result directly. Several URLs yield a
/// composite with one `UrlCheck({url})` child each; a request that fails
/// becomes an unhealthy child rather than failing the whole check.
pub struct UrlCheck {
    urls: Vec<Url>,
    client: Client,
    evaluator: Arc<Evaluator>,
    partially_healthy_status: CheckStatus,
}

impl UrlCheck {
    pub fn new(urls: Vec<Url>) -> Result<Self, HealthCheckError> {
        if urls.is_empty() {
            return Err(HealthCheckError::invalid(
                "urls",
                "At least one URL is required.",
            ));
        }

        let mut seen = HashSet::new();
        for url in &urls {
            if !seen.insert(url.as_str().to_lowercase()) {
                return Err(HealthCheckError::duplicate_result(&child_name(url)));
            }
        }

        Ok(Self {
            urls,
            client: Client::new(),
            evaluator: Arc::new(|response: &UrlResponse| -> CheckResult {
                default_url_check(response).into()
            }),
            partially_healthy_status: CheckStatus::Warning,
        })
    }

    pub fn parse<I, S>(urls: I) -> Result<Self, HealthCheckError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls = urls
            .into_iter()
            .map(|url| parse_url(url.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(urls)
    }

    pub fn with_evaluator<F, R>(mut self, evaluator: F) -> Self
    where
        F: Fn(&UrlResponse) -> R + Send + Sync + 'static,
        R: Into<CheckResult>,
    {
        self.evaluator = Arc::new(move |response: &UrlResponse| -> CheckResult {
            evaluator(response).into()
        });
        self
    }

    pub fn with_partial_success_status(mut self, status: CheckStatus) -> Result<Self, HealthCheckError> {
        if status == CheckStatus::Unknown {
            return Err(HealthCheckError::invalid(
                "partial_success_status",
                "Check status 'Unknown' is not valid for partial success.",
            ));
        }
        self.partially_healthy_status = status;
        Ok(self)
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    async fn check_url(&self, url: &Url, cancel: &CancellationToken) -> ProbeResult {
        let request = self
            .client
            .get(url.clone())
            .header(CACHE_CONTROL, "no-cache")
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProbeError::cancelled()),
            response = request => response?,
        };

        let status = response.status();
        let body = response.text().await?;
        debug!("UrlCheck({}) answered {}", url, status);

        Ok((self.evaluator)(&UrlResponse {
            url: url.clone(),
            status,
            body,
        }))
    }
}

impl fmt::Debug for UrlCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlCheck")
            .field("urls", &self.urls)
            .field("partially_healthy_status", &self.partially_healthy_status)
            .finish()
    }
}

#[async_trait]
impl HealthCheck for UrlCheck {
    async fn check(&self, cancel: &CancellationToken) -> ProbeResult {
        if let [url] = self.urls.as_slice() {
            return self.check_url(url, cancel).await;
        }

        let outcomes = join_all(self.urls.iter().map(|url| self.check_url(url, cancel))).await;

        let mut composite = CompositeHealthCheckResult::new(self.partially_healthy_status);
        for (url, outcome) in self.urls.iter().zip(outcomes) {
            let result = match outcome {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => HealthCheckResult::exception(e.kind()).into(),
            };
            composite.add_result(child_name(url), result)?;
        }

        Ok(composite.into())
    }
}

fn child_name(url: &Url) -> String {
    format!("UrlCheck({})", url)
}

fn parse_url(url: &str) -> Result<Url, HealthCheckError> {
    Url::parse(url).map_err(|e| {
        HealthCheckError::invalid("url", format!("Invalid URL '{}': {}", url, e))
    })
}

impl HealthCheckBuilder {
    /// Registers `UrlCheck({url})`, healthy when the URL answers `200 OK`.
    pub fn add_url_check(&mut self, url: &str) -> Result<&mut Self, HealthCheckError> {
        let check = UrlCheck::new(vec![parse_url(url)?])?;
        self.add_check(&format!("UrlCheck({})", url), check)
    }

    pub fn add_url_check_with<F, R>(
        &mut self,
        url: &str,
        evaluator: F,
    ) -> Result<&mut Self, HealthCheckError>
    where
        F: Fn(&UrlResponse) -> R + Send + Sync + 'static,
        R: Into<CheckResult>,
    {
        let check = UrlCheck::new(vec![parse_url(url)?])?.with_evaluator(evaluator);
        self.add_check(&format!("UrlCheck({})", url), check)
    }

    /// Registers `UrlChecks({group_name})` over all `urls`, merged with
    /// `partially_healthy_status`.
    pub fn add_url_checks<I, S>(
        &mut self,
        urls: I,
        group_name: &str,
        partially_healthy_status: CheckStatus,
    ) -> Result<&mut Self, HealthCheckError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if group_name.trim().is_empty() {
            return Err(HealthCheckError::invalid(
                "group_name",
                "Value cannot be empty or whitespace.",
            ));
        }
        let check = UrlCheck::parse(urls)?.with_partial_success_status(partially_healthy_status)?;
        self.add_check(&format!("UrlChecks({})", group_name), check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::run_guarded;
    use mockito::Server;

    fn endpoint(server: &Server, path: &str) -> Url {
        Url::parse(&format!("{}{}", server.url(), path)).unwrap()
    }

    #[test]
    fn test_constructor_guards() {
        assert!(UrlCheck::new(Vec::new()).unwrap_err().is_invalid_argument());
        assert!(UrlCheck::parse(["not a url"]).unwrap_err().is_invalid_argument());

        let err = UrlCheck::parse(["http://a/", "http://A/"]).unwrap_err();
        assert!(err.is_duplicate_name());

        let err = UrlCheck::parse(["http://a/"])
            .unwrap()
            .with_partial_success_status(CheckStatus::Unknown)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_default_check_ok() {
        let response = UrlResponse {
            url: Url::parse("http://uri/").unwrap(),
            status: StatusCode::OK,
            body: "This is the body content".to_string(),
        };

        let result = default_url_check(&response);

        assert_eq!(result.status(), CheckStatus::Healthy);
        assert_eq!(result.description(), "UrlCheck(http://uri/): status code OK (200)");
        assert_eq!(result.data()["url"], "http://uri/");
        assert_eq!(result.data()["status"], 200);
        assert_eq!(result.data()["reason"], "OK");
        assert_eq!(result.data()["body"], "This is the body content");
    }

    #[test]
    fn test_default_check_non_200_is_unhealthy() {
        for status in [
            StatusCode::CONTINUE,
            StatusCode::NO_CONTENT,
            StatusCode::MOVED_PERMANENTLY,
            StatusCode::NOT_FOUND,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let response = UrlResponse {
                url: Url::parse("http://uri/").unwrap(),
                status,
                body: String::new(),
            };

            let result = default_url_check(&response);

            assert_eq!(result.status(), CheckStatus::Unhealthy);
            assert_eq!(
                result.description(),
                format!(
                    "UrlCheck(http://uri/): status code {} ({})",
                    status.canonical_reason().unwrap(),
                    status.as_u16()
                )
            );
        }
    }

    #[tokio::test]
    async fn test_single_url_sends_no_cache_get() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .match_header("cache-control", "no-cache")
            .with_status(200)
            .with_body("fine")
            .create_async()
            .await;

        let check = UrlCheck::new(vec![endpoint(&server, "/health")]).unwrap();
        let result = check.check(&CancellationToken::new()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.status(), CheckStatus::Healthy);
        assert_eq!(result.data()["body"], "fine");
    }

    #[tokio::test]
    async fn test_custom_evaluator_result_is_returned() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body("degraded")
            .create_async()
            .await;

        let check = UrlCheck::new(vec![endpoint(&server, "/health")])
            .unwrap()
            .with_evaluator(|response: &UrlResponse| {
                if response.body == "degraded" {
                    HealthCheckResult::warning("running degraded")
                } else {
                    HealthCheckResult::healthy("fine")
                }
            });
        let result = check.check(&CancellationToken::new()).await.unwrap();

        assert_eq!(result.status(), CheckStatus::Warning);
        assert_eq!(result.description(), "running degraded");
    }

    #[tokio::test]
    async fn test_multiple_urls_return_composite() {
        let cases = [
            (200, 200, CheckStatus::Healthy),
            (200, 500, CheckStatus::Warning),
            (400, 500, CheckStatus::Unhealthy),
        ];

        for (code1, code2, expected) in cases {
            let mut server = Server::new_async().await;
            let _m1 = server
                .mock("GET", "/one")
                .with_status(code1)
                .create_async()
                .await;
            let _m2 = server
                .mock("GET", "/two")
                .with_status(code2)
                .create_async()
                .await;

            let url1 = endpoint(&server, "/one");
            let url2 = endpoint(&server, "/two");
            let check = UrlCheck::new(vec![url1.clone(), url2.clone()])
                .unwrap()
                .with_evaluator(|response: &UrlResponse| {
                    let description = format!("{}: {}", response.url, response.status.as_u16());
                    if response.status == StatusCode::OK {
                        HealthCheckResult::healthy(description)
                    } else {
                        HealthCheckResult::unhealthy(description)
                    }
                });

            let result = check.check(&CancellationToken::new()).await.unwrap();

            assert_eq!(result.status(), expected);
            assert_eq!(
                result.description(),
                format!(
                    "UrlCheck({url1}): {url1}: {code1}\nUrlCheck({url2}): {url2}: {code2}"
                )
            );
        }
    }

    #[tokio::test]
    async fn test_unreachable_url_in_multi_check_becomes_exception_child() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/up")
            .with_status(200)
            .create_async()
            .await;

        let unreachable = Url::parse("http://127.0.0.1:1/down").unwrap();
        let check = UrlCheck::new(vec![endpoint(&server, "/up"), unreachable.clone()]).unwrap();

        let result = check.check(&CancellationToken::new()).await.unwrap();
        let composite = result.as_composite().unwrap();

        assert_eq!(result.status(), CheckStatus::Warning);
        let failed = composite.get(&child_name(&unreachable)).unwrap();
        assert_eq!(failed.status(), CheckStatus::Unhealthy);
        assert_eq!(
            failed.description(),
            format!(
                "Exception during check: {}",
                std::any::type_name::<reqwest::Error>()
            )
        );
    }

    #[tokio::test]
    async fn test_unreachable_single_url_is_reported_by_guard() {
        let check = UrlCheck::parse(["http://127.0.0.1:1/"]).unwrap();
        let cancel = CancellationToken::new();

        let result = run_guarded(check.check(&cancel), &cancel).await;

        assert_eq!(result.status(), CheckStatus::Unhealthy);
        assert!(result.description().starts_with("Exception during check: reqwest"));
    }

    #[tokio::test]
    async fn test_cancelled_request_is_reported_as_cancelled() {
        let check = UrlCheck::parse(["http://127.0.0.1:1/"]).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = check.check(&cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_builder_helpers_register_named_checks() {
        let mut builder = HealthCheckBuilder::new();
        builder
            .add_url_check("http://localhost:9000/health")
            .unwrap()
            .add_url_checks(
                ["http://a/health", "http://b/health"],
                "backends",
                CheckStatus::Warning,
            )
            .unwrap();

        assert!(builder.check("UrlCheck(http://localhost:9000/health)").is_some());
        assert!(builder.check("UrlChecks(backends)").is_some());

        assert!(builder
            .add_url_checks(Vec::<String>::new(), "empty", CheckStatus::Warning)
            .unwrap_err()
            .is_invalid_argument());
        assert!(builder
            .add_url_checks(["http://c/"], " ", CheckStatus::Warning)
            .unwrap_err()
            .is_invalid_argument());
        assert!(builder.add_url_check("::bad::").unwrap_err().is_invalid_argument());
    }
}
