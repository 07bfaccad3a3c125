//! Bounded calls that resolve to a fallback instead of failing.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use floodwatch_core::PredictionResult;
use tracing::warn;

/// Why a fallback value was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    Timeout(Duration),
    Failed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(d) => write!(f, "timed out after {}ms", d.as_millis()),
            Self::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// Result of a bounded call: the real value, or the fallback and the reason.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Fresh(T),
    Fallback { value: T, reason: FallbackReason },
}

impl<T> FetchOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Fresh(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Fresh(v) | Self::Fallback { value: v, .. } => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Fresh(v) | Self::Fallback { value: v, .. } => v,
        }
    }
}

/// Await `call` for at most `timeout`. Errors and timeouts yield `fallback`.
pub async fn fetch_or_fallback<T, E, Fut>(call: Fut, fallback: T, timeout: Duration) -> FetchOutcome<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => FetchOutcome::Fresh(value),
        Ok(Err(e)) => {
            let reason = FallbackReason::Failed(e.to_string());
            warn!(%reason, "call failed, using fallback");
            FetchOutcome::Fallback {
                value: fallback,
                reason,
            }
        }
        Err(_) => {
            let reason = FallbackReason::Timeout(timeout);
            warn!(%reason, "call timed out, using fallback");
            FetchOutcome::Fallback {
                value: fallback,
                reason,
            }
        }
    }
}

/// Run one inference call, returning `fallback` on timeout, network failure
/// or a malformed response. Never returns an error.
pub async fn with_fallback<F, Fut, E>(call: F, fallback: PredictionResult, timeout: Duration) -> PredictionResult
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<PredictionResult, E>>,
    E: fmt::Display,
{
    fetch_or_fallback(call(), fallback, timeout).await.into_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodwatch_core::{CoreError, PredictionSource, Trend, normalize};
    use serde_json::json;
    use tokio::time::Instant;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn fallback() -> PredictionResult {
        PredictionResult::fallback("ITO", 59.5)
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_resolves_to_fallback() {
        for _ in 0..5 {
            let start = Instant::now();
            let result = with_fallback(
                || async { Err::<PredictionResult, _>("connection refused") },
                fallback(),
                TIMEOUT,
            )
            .await;
            assert_eq!(result, fallback());
            assert!(start.elapsed() <= TIMEOUT);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_resolves_at_timeout() {
        let start = Instant::now();
        let result = with_fallback(
            || std::future::pending::<Result<PredictionResult, CoreError>>(),
            fallback(),
            TIMEOUT,
        )
        .await;
        assert_eq!(result.source, PredictionSource::Fallback);
        let elapsed = start.elapsed();
        assert!(elapsed >= TIMEOUT && elapsed < TIMEOUT + Duration::from_millis(5));
    }

    #[tokio::test]
    async fn malformed_response_resolves_to_fallback() {
        let raw = json!({"ward": "ITO", "probability": 50, "confidence": 50, "trend": "sideways"});
        let result = with_fallback(|| async move { normalize(&raw) }, fallback(), TIMEOUT).await;
        assert!(result.is_fallback());
        assert_eq!(result.ward_name, "ITO");
    }

    #[tokio::test]
    async fn good_response_passes_through() {
        let raw = json!({"ward": "ITO", "probability": 82, "confidence": 90, "trend": "rising"});
        let result = with_fallback(|| async move { normalize(&raw) }, fallback(), TIMEOUT).await;
        assert_eq!(result.source, PredictionSource::Model);
        assert_eq!(result.probability, 82.0);
        assert_eq!(result.trend, Trend::Rising);
    }

    #[tokio::test(start_paused = true)]
    async fn outcome_reports_reason() {
        let failed = fetch_or_fallback(async { Err::<u32, _>("boom") }, 0, TIMEOUT).await;
        assert_eq!(
            failed,
            FetchOutcome::Fallback {
                value: 0,
                reason: FallbackReason::Failed("boom".into())
            }
        );

        let timed_out = fetch_or_fallback(std::future::pending::<Result<u32, String>>(), 7, TIMEOUT).await;
        assert!(timed_out.is_fallback());
        assert_eq!(*timed_out.value(), 7);
        assert_eq!(
            timed_out.reason().map(|r| r.to_string()).as_deref(),
            Some("timed out after 10000ms")
        );

        let fresh = fetch_or_fallback(async { Ok::<u32, String>(3) }, 0, TIMEOUT).await;
        assert_eq!(fresh, FetchOutcome::Fresh(3));
    }
}
