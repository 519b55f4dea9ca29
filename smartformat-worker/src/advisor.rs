//! Optional external layout advisor.
//!
//! An advisor proposes a re-layout for a target format. Its answer is only
//! a suggestion: [`advise`] always computes the deterministic transform
//! first and keeps it whenever the advisor fails or returns something that
//! does not fit the target canvas.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use smartformat_core::{Element, FormatEngine, LayoutContext, TransformOptions};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::protocol::{
    JsonRpcRequest, JsonRpcResponse, SuggestParams, SuggestResult, JSONRPC_VERSION,
    SUGGEST_METHOD,
};

/// Errors that can occur when consulting a layout advisor.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// The advisor endpoint is not a valid URL.
    #[error("invalid advisor URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed (connection, timeout, status).
    #[error("advisor HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The payload could not be decoded.
    #[error("failed to parse advisor payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The advisor returned an RPC error.
    #[error("advisor RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i32,
        /// Human readable error message.
        message: String,
        /// Optional additional data payload.
        data: Option<Value>,
    },
    /// The response did not match the expected structure.
    #[error("unexpected advisor response: {0}")]
    UnexpectedResponse(String),
    /// The suggestion was well-formed but unusable.
    #[error("advisor suggestion rejected: {0}")]
    Rejected(String),
}

impl AdvisorError {
    /// Returns true if this error is retryable (transient HTTP failures).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

/// Configuration for retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
            multiplier,
        }
    }

    /// Delay before retrying after the given attempt (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis(base.min(self.max_delay_ms as f64).max(0.0) as u64)
    }
}

/// Connection settings for [`HttpLayoutAdvisor`].
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// JSON-RPC endpoint.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl AdvisorConfig {
    /// Config for `endpoint` with default timeout and retry.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Something that can propose a layout for a target format.
#[async_trait]
pub trait LayoutAdvisor: Send + Sync {
    /// Suggest elements for `to`, given elements laid out for `from`.
    ///
    /// # Errors
    ///
    /// Returns an [`AdvisorError`] when no usable suggestion was produced.
    async fn suggest(
        &self,
        elements: &[Element],
        from: &LayoutContext,
        to: &LayoutContext,
    ) -> Result<Vec<Element>, AdvisorError>;
}

/// Layout advisor reached over HTTP JSON-RPC 2.0.
#[derive(Clone)]
pub struct HttpLayoutAdvisor {
    inner: Arc<InnerClient>,
}

struct InnerClient {
    http: Client,
    endpoint: Url,
    request_id: AtomicU64,
    retry: RetryConfig,
}

impl std::fmt::Debug for HttpLayoutAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLayoutAdvisor")
            .field("endpoint", &self.inner.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpLayoutAdvisor {
    /// Build a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::InvalidUrl`] if the endpoint is malformed.
    /// Returns [`AdvisorError::Http`] if the HTTP client fails to build.
    pub fn new(config: AdvisorConfig) -> Result<Self, AdvisorError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|e| AdvisorError::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .user_agent(concat!("smart-format/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(InnerClient {
                http,
                endpoint,
                request_id: AtomicU64::new(1),
                retry: config.retry,
            }),
        })
    }

    /// The endpoint this client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    async fn send_rpc<P>(&self, method: &str, params: P) -> Result<Value, AdvisorError>
    where
        P: serde::Serialize + Send + Sync,
    {
        let id = self.inner.request_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        };

        let config = &self.inner.retry;
        let attempts = config.max_attempts.max(1);

        for attempt in 0..attempts {
            match self.post_once(&request).await {
                Ok(rpc) => {
                    // RPC errors are not retryable
                    if let Some(error) = rpc.error {
                        return Err(AdvisorError::Rpc {
                            code: error.code,
                            message: error.message,
                            data: error.data,
                        });
                    }
                    return rpc
                        .result
                        .ok_or_else(|| AdvisorError::UnexpectedResponse("missing result".into()));
                }
                Err(error) if error.is_retryable() && attempt + 1 < attempts => {
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        "Advisor RPC {} failed (attempt {}/{}), retrying in {}ms: {}",
                        method,
                        attempt + 1,
                        attempts,
                        delay.as_millis(),
                        error
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }

        Err(AdvisorError::UnexpectedResponse(
            "retry loop exited without result".into(),
        ))
    }

    async fn post_once<P>(
        &self,
        request: &JsonRpcRequest<'_, P>,
    ) -> Result<JsonRpcResponse, AdvisorError>
    where
        P: serde::Serialize + Send + Sync,
    {
        let response = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl LayoutAdvisor for HttpLayoutAdvisor {
    async fn suggest(
        &self,
        elements: &[Element],
        from: &LayoutContext,
        to: &LayoutContext,
    ) -> Result<Vec<Element>, AdvisorError> {
        let result = self
            .send_rpc(SUGGEST_METHOD, SuggestParams { elements, from, to })
            .await?;
        let suggestion: SuggestResult = serde_json::from_value(result)?;
        Ok(suggestion.elements)
    }
}

/// Where an [`Advice`] layout came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceSource {
    /// The deterministic engine.
    Engine,
    /// The external advisor.
    Advisor,
}

/// Result of [`advise`].
#[derive(Debug, Clone)]
pub struct Advice {
    /// Elements for the target format.
    pub elements: Vec<Element>,
    /// Which path produced them.
    pub source: AdviceSource,
}

/// Transform with the engine, then let the advisor improve on it.
///
/// The advisor's suggestion replaces the deterministic layout only when it
/// carries exactly the same element ids and every visible element fits
/// the target canvas. Accepted suggestions are returned in input order with
/// pristine geometry taken from the deterministic result.
pub async fn advise(
    engine: &FormatEngine,
    advisor: &dyn LayoutAdvisor,
    elements: &[Element],
    from: &LayoutContext,
    to: &LayoutContext,
    options: &TransformOptions,
) -> Advice {
    let deterministic = engine.transform(elements, from, to, options);

    let suggestion = match advisor.suggest(elements, from, to).await {
        Ok(suggested) => accept(&deterministic, suggested, to),
        Err(e) => Err(e),
    };

    match suggestion {
        Ok(elements) => Advice {
            elements,
            source: AdviceSource::Advisor,
        },
        Err(e) => {
            warn!(format_key = %to.format_key(), "Using deterministic layout: {e}");
            Advice {
                elements: deterministic,
                source: AdviceSource::Engine,
            }
        }
    }
}

fn accept(
    deterministic: &[Element],
    mut suggested: Vec<Element>,
    to: &LayoutContext,
) -> Result<Vec<Element>, AdvisorError> {
    let expected: HashSet<_> = deterministic.iter().map(|e| &e.id).collect();
    let returned: HashSet<_> = suggested.iter().map(|e| &e.id).collect();
    if suggested.len() != deterministic.len() || expected != returned {
        return Err(AdvisorError::Rejected(format!(
            "expected {} elements with matching ids, got {}",
            deterministic.len(),
            suggested.len()
        )));
    }

    if let Some(outside) = suggested
        .iter()
        .find(|e| e.visible && !e.bounds.is_within(to.container_width, to.container_height))
    {
        return Err(AdvisorError::Rejected(format!(
            "element {} leaves the {}x{} canvas",
            outside.id, to.container_width, to.container_height
        )));
    }

    let mut ordered = Vec::with_capacity(deterministic.len());
    for reference in deterministic {
        let Some(index) = suggested.iter().position(|e| e.id == reference.id) else {
            return Err(AdvisorError::Rejected(format!("missing element {}", reference.id)));
        };
        let mut element = suggested.swap_remove(index);
        element.pristine = reference.pristine.clone();
        ordered.push(element);
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartformat_core::{Bounds, ElementKind};

    struct Fixed(Result<Vec<Element>, i32>);

    #[async_trait]
    impl LayoutAdvisor for Fixed {
        async fn suggest(
            &self,
            _elements: &[Element],
            _from: &LayoutContext,
            _to: &LayoutContext,
        ) -> Result<Vec<Element>, AdvisorError> {
            self.0.clone().map_err(|code| AdvisorError::Rpc {
                code,
                message: "boom".into(),
                data: None,
            })
        }
    }

    fn square() -> LayoutContext {
        LayoutContext::new(1080.0, 1080.0, "instagram", "post").expect("square")
    }

    fn story() -> LayoutContext {
        LayoutContext::new(1080.0, 1920.0, "instagram", "story").expect("story")
    }

    fn elements() -> Vec<Element> {
        vec![
            Element::new(ElementKind::Shape, Bounds::new(10.0, 10.0, 100.0, 100.0)).with_id("a"),
            Element::new(ElementKind::Shape, Bounds::new(500.0, 500.0, 100.0, 100.0)).with_id("b"),
        ]
    }

    #[test]
    fn test_advisor_error_is_retryable() {
        let rpc = AdvisorError::Rpc {
            code: -1,
            message: "x".into(),
            data: None,
        };
        assert!(!rpc.is_retryable());
        assert!(!AdvisorError::Rejected("x".into()).is_retryable());
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let retry = RetryConfig::new(5, 100, 300, 2.0);
        assert_eq!(retry.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for_attempt(4), Duration::from_millis(300));
    }

    #[test]
    fn test_invalid_url_error() {
        let result = HttpLayoutAdvisor::new(AdvisorConfig::new("not a url"));
        assert!(matches!(result, Err(AdvisorError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_advise_accepts_matching_suggestion_in_input_order() {
        let engine = FormatEngine::builtin();
        let mut suggested = elements();
        suggested.reverse();
        suggested[0].bounds.y = 1500.0;

        let advice = advise(
            &engine,
            &Fixed(Ok(suggested)),
            &elements(),
            &square(),
            &story(),
            &TransformOptions::default(),
        )
        .await;

        assert_eq!(advice.source, AdviceSource::Advisor);
        assert_eq!(advice.elements[0].id.as_str(), "a");
        assert_eq!(advice.elements[1].id.as_str(), "b");
        assert!((advice.elements[1].bounds.y - 1500.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_advise_rejects_out_of_bounds() {
        let engine = FormatEngine::builtin();
        let mut suggested = elements();
        suggested[1].bounds.x = 2000.0;

        let advice = advise(
            &engine,
            &Fixed(Ok(suggested)),
            &elements(),
            &square(),
            &story(),
            &TransformOptions::default(),
        )
        .await;

        assert_eq!(advice.source, AdviceSource::Engine);
        let expected =
            engine.transform(&elements(), &square(), &story(), &TransformOptions::default());
        assert_eq!(advice.elements, expected);
    }

    #[tokio::test]
    async fn test_advise_rejects_missing_ids() {
        let engine = FormatEngine::builtin();
        let advice = advise(
            &engine,
            &Fixed(Ok(elements()[..1].to_vec())),
            &elements(),
            &square(),
            &story(),
            &TransformOptions::default(),
        )
        .await;
        assert_eq!(advice.source, AdviceSource::Engine);
    }

    #[tokio::test]
    async fn test_advise_falls_back_on_error() {
        let engine = FormatEngine::builtin();
        let advice = advise(
            &engine,
            &Fixed(Err(-32000)),
            &elements(),
            &square(),
            &story(),
            &TransformOptions::default(),
        )
        .await;
        assert_eq!(advice.source, AdviceSource::Engine);
        assert_eq!(advice.elements.len(), 2);
    }
}
