use std::time::{Duration, Instant};

use crate::config::TranslateConfig;
use super::BackendError;

/// Rate-limit budget reported alongside a successful response
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateLimitStatus {
    pub remaining_requests: Option<u64>,
    pub remaining_tokens: Option<u64>,
    pub reset_requests: Duration,
    pub reset_tokens: Duration,
}

/// Parse a reset interval such as `"327ms"`, `"2.866s"`, `"1m30s"` or `"5"`.
///
/// Bare numbers are seconds. Anything unparseable yields zero.
pub fn parse_reset(value: &str) -> Duration {
    let value = value.trim().to_lowercase();
    if value.is_empty() {
        return Duration::ZERO;
    }
    if let Ok(seconds) = value.parse::<f64>() {
        return seconds_to_duration(seconds);
    }

    let mut total = 0.0;
    let mut rest = value.as_str();
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let Ok(number) = rest[..number_len].parse::<f64>() else {
            return Duration::ZERO;
        };
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        total += match &rest[..unit_len] {
            "ms" => number / 1000.0,
            "s" => number,
            "m" => number * 60.0,
            "h" => number * 3600.0,
            _ => return Duration::ZERO,
        };
        rest = &rest[unit_len..];
    }

    seconds_to_duration(total)
}

fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
}

/// How many attempts a batch gets and when to slow down before one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_remaining_requests: u64,
    pub min_remaining_tokens: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_remaining_requests: 5,
            min_remaining_tokens: 5000,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TranslateConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            min_remaining_requests: config.min_remaining_requests,
            min_remaining_tokens: config.min_remaining_tokens,
        }
    }

    /// Delay before retrying after `error`, or `None` when the error is final
    pub fn backoff_for(&self, error: &BackendError) -> Option<Duration> {
        match error {
            BackendError::RateLimited { reset } => Some(*reset),
            BackendError::MalformedResponse(_) => Some(Duration::ZERO),
            BackendError::Transport(_) => None,
        }
    }
}

/// Last budget seen during one orchestration call
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitTracker {
    remaining_requests: Option<u64>,
    remaining_tokens: Option<u64>,
    requests_reset_at: Option<Instant>,
    tokens_reset_at: Option<Instant>,
}

impl RateLimitTracker {
    pub fn record(&mut self, status: &RateLimitStatus, now: Instant) {
        if status.remaining_requests.is_some() {
            self.remaining_requests = status.remaining_requests;
            self.requests_reset_at = Some(now + status.reset_requests);
        }
        if status.remaining_tokens.is_some() {
            self.remaining_tokens = status.remaining_tokens;
            self.tokens_reset_at = Some(now + status.reset_tokens);
        }
    }

    /// How long to wait before the next request so the budget can refill
    pub fn throttle_delay(&self, policy: &RetryPolicy, now: Instant) -> Option<Duration> {
        let requests = wait_for(
            self.remaining_requests,
            policy.min_remaining_requests,
            self.requests_reset_at,
            now,
        );
        let tokens = wait_for(
            self.remaining_tokens,
            policy.min_remaining_tokens,
            self.tokens_reset_at,
            now,
        );
        requests.into_iter().chain(tokens).max()
    }
}

fn wait_for(remaining: Option<u64>, minimum: u64, reset_at: Option<Instant>, now: Instant) -> Option<Duration> {
    let remaining = remaining?;
    let reset_at = reset_at?;
    (remaining <= minimum && reset_at > now).then(|| reset_at - now)
}
