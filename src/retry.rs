//! Retry eligibility and backoff scheduling.
//!
//! Everything here is pure: the clients feed in what happened on an attempt
//! and get back whether to try again and how long to wait first.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Retry budget used when neither the call nor the client sets one.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

const INITIAL_RETRY_DELAY_SECS: f64 = 0.5;
const MAX_RETRY_DELAY_SECS: f64 = 8.0;
const MAX_RETRY_AFTER_SECS: f64 = 60.0;

/// Returns whether a non-success status is worth another attempt.
///
/// Request timeouts (408), lock timeouts (409), rate limits (429) and every
/// 5xx are retried. Other 4xx responses are final.
pub fn should_retry(status: u16) -> bool {
    matches!(status, 408 | 409 | 429) || status >= 500
}

/// Reads a usable `Retry-After` hint, either seconds or an HTTP date.
///
/// Hints outside `(0, 60]` seconds are ignored.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    retry_after_at(headers, Utc::now())
}

fn retry_after_at(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    let seconds = match raw.parse::<f64>() {
        Ok(seconds) => seconds,
        Err(_) => {
            let date = DateTime::parse_from_rfc2822(raw).ok()?;
            (date.with_timezone(&Utc) - now).num_seconds() as f64
        }
    };

    (seconds > 0.0 && seconds <= MAX_RETRY_AFTER_SECS).then(|| Duration::from_secs_f64(seconds))
}

/// Delay before the next attempt.
///
/// `remaining_retries` is the budget left after the retry being scheduled.
pub fn compute_delay(
    remaining_retries: u32,
    max_retries: u32,
    headers: Option<&HeaderMap>,
) -> Duration {
    compute_delay_with_jitter(remaining_retries, max_retries, headers, rand::random::<f64>())
}

/// [`compute_delay`] with the uniform `[0, 1)` jitter sample supplied by the caller.
pub fn compute_delay_with_jitter(
    remaining_retries: u32,
    max_retries: u32,
    headers: Option<&HeaderMap>,
    jitter_sample: f64,
) -> Duration {
    if let Some(delay) = headers.and_then(retry_after) {
        return delay;
    }

    let attempts_made = max_retries.saturating_sub(remaining_retries).min(31);
    let backoff = (INITIAL_RETRY_DELAY_SECS * 2f64.powi(attempts_made as i32))
        .min(MAX_RETRY_DELAY_SECS);
    let jitter = 1.0 - 0.25 * jitter_sample.clamp(0.0, 1.0);

    Duration::from_secs_f64((backoff * jitter).max(0.0))
}

/// Retries left for one logical call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryBudget {
    max_retries: u32,
    remaining: u32,
}

impl RetryBudget {
    /// A fresh budget with every retry still available.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            remaining: max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Retries not yet spent.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Retries already spent.
    pub fn attempts_made(&self) -> u32 {
        self.max_retries - self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Spends one retry. Returns `false` when nothing was left.
    pub fn consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// What went wrong on one attempt.
#[derive(Clone, Copy, Debug)]
pub enum Failure<'a> {
    /// The server could not be reached.
    Network,
    /// The attempt exceeded its timeout.
    Timeout,
    /// The server answered with a non-success status.
    Status { status: u16, headers: &'a HeaderMap },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NextAction {
    Retry(Duration),
    Fail,
}

/// Decides between another attempt and surfacing the failure.
pub fn decide_next_action(failure: &Failure<'_>, budget: &RetryBudget) -> NextAction {
    if budget.is_exhausted() {
        return NextAction::Fail;
    }

    let headers = match failure {
        Failure::Status { status, .. } if !should_retry(*status) => return NextAction::Fail,
        Failure::Status { headers, .. } => Some(*headers),
        Failure::Network | Failure::Timeout => None,
    };

    NextAction::Retry(compute_delay(
        budget.remaining() - 1,
        budget.max_retries(),
        headers,
    ))
}
