use std::{sync::Arc, time::Duration};

use crate::{
    error::{GenerationError, UpstreamError},
    services::generation::{GenerationRequest, GenerationResponse, GenerationService},
};

/// Longest single backoff, whatever the policy
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Bounded exponential backoff for transient upstream failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles each retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failure of zero-based attempt `attempt`, capped at `MAX_BACKOFF`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }
}

/// Generation service wrapper that retries transient failures
#[derive(Clone)]
pub struct GenerationClient {
    service: Arc<dyn GenerationService>,
    policy: RetryPolicy,
}

impl GenerationClient {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self::with_policy(service, RetryPolicy::default())
    }

    pub fn with_policy(service: Arc<dyn GenerationService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    /// Runs the request, retrying transient failures with backoff
    ///
    /// Permanent failures return immediately. A transient failure on the last
    /// attempt yields `MaxRetriesExceeded`.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error: Option<UpstreamError> = None;

        for attempt in 0..max_attempts {
            match self.service.generate(request).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            attempt = attempt + 1,
                            provider = self.service.name(),
                            "Generation succeeded after retry"
                        );
                    }
                    return Ok(response);
                }
                Err(e) if !e.is_transient() => {
                    tracing::error!(
                        error = %e,
                        attempt = attempt + 1,
                        provider = self.service.name(),
                        "Permanent generation failure, not retrying"
                    );
                    return Err(GenerationError::Upstream(e));
                }
                Err(e) => {
                    if attempt + 1 < max_attempts {
                        let delay = self.policy.delay_for(attempt);
                        tracing::warn!(
                            error = %e,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            provider = self.service.name(),
                            "Transient generation failure, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| {
            UpstreamError::classify(None, "generation loop ended without an attempt")
        });
        tracing::error!(
            attempts = max_attempts,
            error = %last,
            provider = self.service.name(),
            "Generation retries exhausted"
        );

        Err(GenerationError::MaxRetriesExceeded {
            attempts: max_attempts,
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generation::MockGenerationService;
    use mockall::Sequence;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "test-model".to_string(),
            prompt: "prompt".to_string(),
            search_grounding: true,
        }
    }

    fn transient() -> UpstreamError {
        UpstreamError::classify(Some(503), "overloaded")
    }

    fn permanent() -> UpstreamError {
        UpstreamError::classify(Some(400), "invalid argument")
    }

    /// Paused tokio time may land a millisecond past a deadline
    fn assert_roughly(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(50),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
    }

    #[test]
    fn test_delay_is_capped_instead_of_overflowing() {
        let policy = RetryPolicy {
            max_attempts: 64,
            base_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(6), MAX_BACKOFF);
        assert_eq!(policy.delay_for(31), MAX_BACKOFF);
        assert_eq!(policy.delay_for(40), MAX_BACKOFF);

        let huge = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::MAX,
        };
        assert_eq!(huge.delay_for(0), MAX_BACKOFF);
        assert_eq!(huge.delay_for(1), MAX_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_two_transient_failures() {
        let calls: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let mut mock = MockGenerationService::new();
        let mut seq = Sequence::new();
        mock.expect_name().return_const("mock");

        for outcome in [Err(transient()), Err(transient()), Ok(())] {
            let calls = calls.clone();
            mock.expect_generate()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| {
                    calls.lock().unwrap().push(Instant::now());
                    outcome
                        .clone()
                        .map(|_| GenerationResponse::text("[]"))
                });
        }

        let client = GenerationClient::new(Arc::new(mock));
        let result = client.generate(&request()).await;

        assert_eq!(result, Ok(GenerationResponse::text("[]")));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_roughly(calls[1] - calls[0], Duration::from_secs(1));
        assert_roughly(calls[2] - calls[1], Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let mut mock = MockGenerationService::new();
        mock.expect_name().return_const("mock");
        mock.expect_generate()
            .times(1)
            .returning(|_| Err(permanent()));

        let client = GenerationClient::new(Arc::new(mock));
        let start = Instant::now();
        let result = client.generate(&request()).await;

        assert_eq!(result, Err(GenerationError::Upstream(permanent())));
        assert_roughly(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_exhaust_retries() {
        let mut mock = MockGenerationService::new();
        mock.expect_name().return_const("mock");
        mock.expect_generate()
            .times(3)
            .returning(|_| Err(transient()));

        let client = GenerationClient::new(Arc::new(mock));
        let start = Instant::now();
        let result = client.generate(&request()).await;

        assert_eq!(
            result,
            Err(GenerationError::MaxRetriesExceeded {
                attempts: 3,
                last: transient(),
            })
        );
        // No sleep after the final attempt
        assert_roughly(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_after_transient_stops_retrying() {
        let mut mock = MockGenerationService::new();
        let mut seq = Sequence::new();
        mock.expect_name().return_const("mock");
        mock.expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(transient()));
        mock.expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(permanent()));

        let client = GenerationClient::new(Arc::new(mock));
        let result = client.generate(&request()).await;

        assert_eq!(result, Err(GenerationError::Upstream(permanent())));
    }
}
