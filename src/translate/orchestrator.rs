use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ScriptlocError;
use crate::script::{PlaceholderMap, protect};
use super::{Batch, RateLimitTracker, RetryPolicy, TranslationBackend};

/// Why a translation run did not finish cleanly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationFailure {
    /// The backend failed for a reason other than rate limiting
    Transport(String),
    /// The retry budget ran out with blocks still pending
    Exhausted { pending: usize },
    /// The run was cancelled between attempts
    Cancelled,
}

impl TranslationFailure {
    pub fn into_error(self, total: usize) -> ScriptlocError {
        match self {
            Self::Transport(message) => ScriptlocError::Transport(message),
            Self::Exhausted { pending } => ScriptlocError::PartialTranslation { pending, total },
            Self::Cancelled => ScriptlocError::Cancelled,
        }
    }
}

/// Translated blocks in input order, plus the failure if any.
///
/// On failure, blocks that never came back hold their original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub blocks: Vec<String>,
    pub failure: Option<TranslationFailure>,
}

impl TranslationOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Sends protected blocks to a backend as keyed batches and restores the results
pub struct TranslationOrchestrator {
    backend: Arc<dyn TranslationBackend>,
    system_prompt: String,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl TranslationOrchestrator {
    pub fn new(backend: Arc<dyn TranslationBackend>, system_prompt: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            system_prompt: system_prompt.into(),
            policy,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Translate `blocks`, retrying unresolved keys within the retry budget
    pub async fn translate<S: AsRef<str>>(&self, blocks: &[S]) -> TranslationOutcome {
        let mut maps: Vec<PlaceholderMap> = Vec::with_capacity(blocks.len());
        let mut pending = Batch::new();
        for (index, block) in blocks.iter().enumerate() {
            let (safe, map) = protect(block.as_ref());
            pending.insert(index.to_string(), safe);
            maps.push(map);
        }
        let protected = pending.clone();

        let mut completed = Batch::new();
        let mut tracker = RateLimitTracker::default();
        let mut failure = None;
        let mut attempt = 0;

        while !pending.is_empty() && attempt < self.policy.max_attempts {
            attempt += 1;

            if self.cancel.is_cancelled() {
                failure = Some(TranslationFailure::Cancelled);
                break;
            }
            if let Some(delay) = tracker.throttle_delay(&self.policy, Instant::now()) {
                debug!("Rate-limit budget low, waiting {:?} before attempt {}", delay, attempt);
                if !self.pause(delay).await {
                    failure = Some(TranslationFailure::Cancelled);
                    break;
                }
            }

            debug!(
                "Attempt {}/{}: sending {} blocks",
                attempt,
                self.policy.max_attempts,
                pending.len()
            );

            match self.backend.translate_batch(&self.system_prompt, &pending).await {
                Ok(response) => {
                    if let Some(status) = &response.rate_limit {
                        tracker.record(status, Instant::now());
                    }
                    for (key, value) in response.translations {
                        if pending.remove(&key).is_some() {
                            completed.insert(key, value);
                        }
                    }
                    debug!("{} translated, {} still pending", completed.len(), pending.len());
                }
                Err(error) => match self.policy.backoff_for(&error) {
                    Some(delay) => {
                        warn!(
                            "Attempt {}/{} failed: {}",
                            attempt, self.policy.max_attempts, error
                        );
                        if attempt < self.policy.max_attempts && !self.pause(delay).await {
                            failure = Some(TranslationFailure::Cancelled);
                            break;
                        }
                    }
                    None => {
                        warn!("Translation backend failed: {}", error);
                        failure = Some(TranslationFailure::Transport(error.to_string()));
                        break;
                    }
                },
            }
        }

        if !pending.is_empty() {
            warn!("{} of {} blocks left untranslated", pending.len(), blocks.len());
            failure.get_or_insert(TranslationFailure::Exhausted {
                pending: pending.len(),
            });
            completed.append(&mut pending);
        } else if failure.is_none() {
            info!("Translated {} blocks in {} attempt(s)", blocks.len(), attempt);
        }

        let blocks = maps
            .iter()
            .enumerate()
            .map(|(index, map)| {
                let key = index.to_string();
                let safe = completed
                    .get(&key)
                    .or_else(|| protected.get(&key))
                    .map(String::as_str)
                    .unwrap_or_default();
                map.restore(safe)
            })
            .collect();

        TranslationOutcome { blocks, failure }
    }

    /// Sleep for `delay` unless cancelled first; false means cancelled
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{BackendError, BatchResponse, MockTranslationBackend};

    fn upper(batch: &Batch) -> Batch {
        batch
            .iter()
            .map(|(key, value)| (key.clone(), value.to_uppercase()))
            .collect()
    }

    fn orchestrator(mock: MockTranslationBackend) -> TranslationOrchestrator {
        TranslationOrchestrator::new(Arc::new(mock), "translate", RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_translates_and_restores_markup() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_translate_batch()
            .times(1)
            .returning(|prompt, batch| {
                assert_eq!(prompt, "translate");
                assert_eq!(batch.get("0").map(String::as_str), Some("hi <TAG0>there<TAG1>"));
                Ok(BatchResponse::new(upper(batch)))
            });

        let outcome = orchestrator(mock).translate(&["hi <b>there</b>", "bye"]).await;

        assert!(outcome.all_succeeded());
        assert_eq!(outcome.blocks, vec!["HI <b>THERE</b>", "BYE"]);
    }

    #[tokio::test]
    async fn test_retries_only_pending_keys() {
        let mut mock = MockTranslationBackend::new();
        let mut calls = 0;
        mock.expect_translate_batch()
            .times(2)
            .returning(move |_, batch| {
                calls += 1;
                if calls == 1 {
                    assert_eq!(batch.len(), 2);
                    let mut partial = Batch::new();
                    partial.insert("0".to_string(), "one".to_string());
                    partial.insert("99".to_string(), "stray".to_string());
                    Ok(BatchResponse::new(partial))
                } else {
                    assert_eq!(batch.keys().collect::<Vec<_>>(), vec!["1"]);
                    Ok(BatchResponse::new(upper(batch)))
                }
            });

        let outcome = orchestrator(mock).translate(&["eins", "zwei"]).await;

        assert!(outcome.all_succeeded());
        assert_eq!(outcome.blocks, vec!["one", "ZWEI"]);
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let mut mock = MockTranslationBackend::new();
        let mut calls = 0;
        mock.expect_translate_batch()
            .times(2)
            .returning(move |_, batch| {
                calls += 1;
                if calls == 1 {
                    Err(BackendError::RateLimited { reset: Duration::from_millis(5) })
                } else {
                    Ok(BatchResponse::new(upper(batch)))
                }
            });

        let outcome = orchestrator(mock).translate(&["a"]).await;

        assert!(outcome.all_succeeded());
        assert_eq!(outcome.blocks, vec!["A"]);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_retried() {
        let mut mock = MockTranslationBackend::new();
        let mut calls = 0;
        mock.expect_translate_batch()
            .times(2)
            .returning(move |_, batch| {
                calls += 1;
                if calls == 1 {
                    Err(BackendError::MalformedResponse("not json".to_string()))
                } else {
                    Ok(BatchResponse::new(upper(batch)))
                }
            });

        assert!(orchestrator(mock).translate(&["a"]).await.all_succeeded());
    }

    #[tokio::test]
    async fn test_exhausted_budget_falls_back_to_source() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_translate_batch()
            .times(3)
            .returning(|_, _| Ok(BatchResponse::default()));

        let outcome = orchestrator(mock).translate(&["<i>keep</i>", "me"]).await;

        assert_eq!(outcome.failure, Some(TranslationFailure::Exhausted { pending: 2 }));
        assert_eq!(outcome.blocks, vec!["<i>keep</i>", "me"]);
    }

    #[tokio::test]
    async fn test_transport_failure_aborts_immediately() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_translate_batch()
            .times(1)
            .returning(|_, _| Err(BackendError::Transport("connection refused".to_string())));

        let outcome = orchestrator(mock).translate(&["a", "b"]).await;

        assert!(matches!(outcome.failure, Some(TranslationFailure::Transport(_))));
        assert_eq!(outcome.blocks, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_translate_batch().times(0);

        let token = CancellationToken::new();
        token.cancel();
        let outcome = orchestrator(mock).with_cancellation(token).translate(&["a"]).await;

        assert_eq!(outcome.failure, Some(TranslationFailure::Cancelled));
        assert_eq!(outcome.blocks, vec!["a"]);
    }

    #[tokio::test]
    async fn test_no_blocks_needs_no_request() {
        let mut mock = MockTranslationBackend::new();
        mock.expect_translate_batch().times(0);

        let blocks: [&str; 0] = [];
        let outcome = orchestrator(mock).translate(&blocks).await;
        assert!(outcome.all_succeeded());
        assert!(outcome.blocks.is_empty());
    }

    #[test]
    fn test_failure_maps_to_error() {
        assert!(matches!(
            TranslationFailure::Exhausted { pending: 2 }.into_error(5),
            ScriptlocError::PartialTranslation { pending: 2, total: 5 }
        ));
        assert!(matches!(
            TranslationFailure::Transport("x".into()).into_error(1),
            ScriptlocError::Transport(_)
        ));
    }
}
