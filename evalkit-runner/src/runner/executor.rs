//! Bounded-parallel prompt execution with retry, backoff and timeout

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::providers::{CompletionRequest, CompletionResponse, LLMProvider, ProviderError};

/// Configuration for the executor
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Maximum in-flight requests
    pub parallel_requests: usize,
    /// Number of retries on failure
    pub retry_count: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds
    pub max_retry_delay_ms: u64,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            parallel_requests: 2,
            retry_count: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 60_000,
            timeout_ms: 120_000,
        }
    }
}

/// Outcome of one prompt in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    /// Position of the prompt in the submitted batch
    pub index: usize,
    pub response: Option<CompletionResponse>,
    pub error: Option<String>,
    pub attempts: u32,
}

impl ItemResult {
    fn success(index: usize, response: CompletionResponse, attempts: u32) -> Self {
        Self {
            index,
            response: Some(response),
            error: None,
            attempts,
        }
    }

    fn failure(index: usize, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            index,
            response: None,
            error: Some(error.into()),
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.response.is_some()
    }

    /// Response text, `None` for a failed item
    pub fn output(&self) -> Option<&str> {
        self.response.as_ref().map(|r| r.content.as_str())
    }
}

/// Executor running prompts against one provider
#[derive(Clone)]
pub struct Executor {
    config: ExecutorConfig,
    provider: Arc<dyn LLMProvider>,
    semaphore: Arc<Semaphore>,
}

impl Executor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: ExecutorConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.parallel_requests.max(1)));
        Self {
            config,
            provider,
            semaphore,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run one request, retrying transient failures with exponential backoff
    pub async fn execute(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        self.execute_counted(request).await.0
    }

    async fn execute_counted(
        &self,
        request: &CompletionRequest,
    ) -> (Result<CompletionResponse, ProviderError>, u32) {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return (
                    Err(ProviderError::Config("executor is shut down".to_string())),
                    0,
                )
            }
        };

        let mut delay = self.config.retry_delay_ms;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let error = match self.try_execute(request).await {
                Ok(response) => {
                    tracing::debug!(
                        "{} answered with {} ({} tokens)",
                        self.provider.name(),
                        response.model,
                        response.total_tokens()
                    );
                    return (Ok(response), attempts);
                }
                Err(e) => e,
            };

            if !error.is_retryable() || attempts > self.config.retry_count {
                tracing::error!(
                    "Request on {} failed after {} attempt(s): {}",
                    self.provider.name(),
                    attempts,
                    error
                );
                return (Err(error), attempts);
            }

            match &error {
                ProviderError::RateLimited { retry_after_ms } => {
                    tracing::warn!(
                        "Rate limited on {}, waiting {}ms",
                        self.provider.name(),
                        retry_after_ms
                    );
                    sleep(Duration::from_millis(*retry_after_ms)).await;
                }
                other => {
                    tracing::info!(
                        "Retry {} on {} in {}ms: {}",
                        attempts,
                        self.provider.name(),
                        delay,
                        other
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(self.config.max_retry_delay_ms);
                }
            }
        }
    }

    /// Single attempt bounded by the configured timeout
    async fn try_execute(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let timeout = Duration::from_millis(self.config.timeout_ms);

        match tokio::time::timeout(timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }

    /// Run a batch concurrently; results come back in submission order.
    ///
    /// A failing item is recorded on its own result and never aborts the
    /// batch.
    pub async fn execute_all(&self, requests: Vec<CompletionRequest>) -> Vec<ItemResult> {
        let total = requests.len();
        let mut handles = Vec::with_capacity(total);

        for (index, request) in requests.into_iter().enumerate() {
            let executor = self.clone();
            handles.push(tokio::spawn(async move {
                match executor.execute_counted(&request).await {
                    (Ok(response), attempts) => ItemResult::success(index, response, attempts),
                    (Err(e), attempts) => ItemResult::failure(index, e.to_string(), attempts),
                }
            }));
        }

        let mut results = Vec::with_capacity(total);
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Item {} panicked: {}", index, e);
                    results.push(ItemResult::failure(index, format!("task failed: {}", e), 0));
                }
            }
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::debug!("Batch of {} finished, {} failed", total, failed);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the prompt back, failing the first `fail_first` calls
    struct EchoProvider {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_first: usize,
        error: fn() -> ProviderError,
        delay: Duration,
    }

    impl EchoProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_first: 0,
                error: || ProviderError::Api { status: 500, message: "boom".to_string() },
                delay: Duration::from_millis(0),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn default_model(&self) -> &str {
            "echo-1"
        }

        async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if call < self.fail_first {
                return Err((self.error)());
            }
            Ok(CompletionResponse {
                content: request.last_user_content().to_string(),
                model: "echo-1".to_string(),
                input_tokens: 1,
                output_tokens: 1,
            })
        }
    }

    fn fast_config() -> ExecutorConfig {
        ExecutorConfig {
            parallel_requests: 2,
            retry_count: 2,
            retry_delay_ms: 1,
            max_retry_delay_ms: 5,
            timeout_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn test_results_keep_submission_order() {
        let provider = Arc::new(EchoProvider {
            delay: Duration::from_millis(5),
            ..EchoProvider::new()
        });
        let executor = Executor::new(provider.clone(), fast_config());

        let requests = (0..6)
            .map(|i| CompletionRequest::prompt(format!("item {}", i), 16))
            .collect();
        let results = executor.execute_all(requests).await;

        assert_eq!(results.len(), 6);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.index, i);
            assert_eq!(result.output(), Some(format!("item {}", i).as_str()));
        }
        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let provider = Arc::new(EchoProvider {
            fail_first: 2,
            ..EchoProvider::new()
        });
        let executor = Executor::new(provider.clone(), fast_config());

        let results = executor.execute_all(vec![CompletionRequest::prompt("hi", 8)]).await;
        assert!(results[0].is_success());
        assert_eq!(results[0].attempts, 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_budget() {
        let provider = Arc::new(EchoProvider {
            fail_first: 10,
            ..EchoProvider::new()
        });
        let executor = Executor::new(provider.clone(), fast_config());

        let results = executor.execute_all(vec![CompletionRequest::prompt("hi", 8)]).await;
        assert!(!results[0].is_success());
        assert_eq!(results[0].attempts, 3);
        assert!(results[0].error.as_deref().unwrap_or("").contains("boom"));
    }

    #[tokio::test]
    async fn test_config_errors_are_not_retried() {
        let provider = Arc::new(EchoProvider {
            fail_first: 10,
            error: || ProviderError::Config("bad key".to_string()),
            ..EchoProvider::new()
        });
        let executor = Executor::new(provider.clone(), fast_config());

        let err = executor.execute(&CompletionRequest::prompt("hi", 8)).await;
        assert!(matches!(err, Err(ProviderError::Config(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout() {
        let provider = Arc::new(EchoProvider {
            delay: Duration::from_millis(200),
            ..EchoProvider::new()
        });
        let executor = Executor::new(
            provider,
            ExecutorConfig {
                retry_count: 0,
                timeout_ms: 10,
                ..fast_config()
            },
        );

        let err = executor.execute(&CompletionRequest::prompt("hi", 8)).await;
        assert!(matches!(err, Err(ProviderError::Timeout { timeout_ms: 10 })));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let executor = Executor::new(Arc::new(EchoProvider::new()), fast_config());
        assert!(executor.execute_all(Vec::new()).await.is_empty());
    }
}
