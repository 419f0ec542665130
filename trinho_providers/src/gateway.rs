use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use trinho_core::{ChatCompletion, CompletionError, CompletionRequest};

use crate::pool::{Credential, CredentialPool};

/// One completion attempt with a specific credential.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn send(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError>;
}

#[async_trait]
impl<T: CompletionTransport + ?Sized> CompletionTransport for Arc<T> {
    async fn send(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError> {
        (**self).send(credential, request).await
    }
}

/// Completion with failover across the credential pool.
///
/// Makes at most `pool.len()` attempts, sampling a fresh credential for each.
/// Rate-limit errors move on to the next attempt; anything else is returned
/// at once. Because sampling is independent, the same exhausted credential
/// can be drawn more than once.
pub struct CompletionGateway<T> {
    pool: Arc<CredentialPool>,
    transport: T,
}

impl<T: CompletionTransport> CompletionGateway<T> {
    pub const fn new(pool: Arc<CredentialPool>, transport: T) -> Self {
        Self { pool, transport }
    }

    #[must_use]
    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }
}

#[async_trait]
impl<T: CompletionTransport> ChatCompletion for CompletionGateway<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let attempts = self.pool.len();
        let mut last_error = None;

        for attempt in 1..=attempts {
            let credential = self.pool.select();
            match self.transport.send(credential, request).await {
                Ok(content) => {
                    if attempt > 1 {
                        info!("Completion succeeded on attempt {attempt}/{attempts}");
                    }
                    return Ok(content);
                }
                Err(e) if e.is_rate_limit() => {
                    warn!(
                        "Credential {credential} rate limited (attempt {attempt}/{attempts}): {e}"
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!("Completion failed with non-retryable error: {e}");
                    return Err(e);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| {
            CompletionError::InvalidResponse("no completion attempt was made".to_string())
        });
        Err(CompletionError::Exhausted {
            attempts,
            last: Box::new(last),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SelectionStrategy;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedTransport {
        attempts: AtomicUsize,
        outcome: fn(usize) -> Result<String, CompletionError>,
    }

    impl ScriptedTransport {
        fn new(outcome: fn(usize) -> Result<String, CompletionError>) -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                outcome,
            }
        }
    }

    #[async_trait]
    impl CompletionTransport for ScriptedTransport {
        async fn send(
            &self,
            _credential: &Credential,
            _request: &CompletionRequest,
        ) -> Result<String, CompletionError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            (self.outcome)(n)
        }
    }

    fn pool(size: usize) -> Arc<CredentialPool> {
        let keys: Vec<String> = (0..size).map(|i| format!("key-{i}")).collect();
        Arc::new(
            CredentialPool::new(keys, SelectionStrategy::Random).unwrap_or_else(|e| panic!("{e}")),
        )
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("test-model", vec![trinho_core::ChatMessage::user("hi")])
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let transport = Arc::new(ScriptedTransport::new(|_| Ok("hello".to_string())));
        let gateway = CompletionGateway::new(pool(3), transport.clone());

        let result = gateway.complete(&request()).await;
        assert_eq!(result.ok().as_deref(), Some("hello"));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rotates_past_rate_limits() {
        let transport = Arc::new(ScriptedTransport::new(|n| {
            if n < 3 {
                Err(CompletionError::RateLimited("429".to_string()))
            } else {
                Ok("finally".to_string())
            }
        }));
        let gateway = CompletionGateway::new(pool(4), transport.clone());

        let result = gateway.complete(&request()).await;
        assert_eq!(result.ok().as_deref(), Some("finally"));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_pool_size_attempts() {
        let transport = Arc::new(ScriptedTransport::new(|n| {
            Err(CompletionError::Api {
                status: 429,
                body: format!("rate limit #{n}"),
            })
        }));
        let gateway = CompletionGateway::new(pool(5), transport.clone());

        let result = gateway.complete(&request()).await;
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 5);
        match result {
            Err(CompletionError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 5);
                assert!(last.to_string().contains("rate limit #5"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_errors_abort_immediately() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Err(CompletionError::Api {
                status: 401,
                body: "invalid api key".to_string(),
            })
        }));
        let gateway = CompletionGateway::new(pool(5), transport.clone());

        let result = gateway.complete(&request()).await;
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(CompletionError::Api { status: 401, .. })
        ));
    }
}
