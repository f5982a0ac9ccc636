//! Bounded operations: race a future against a timer.
//!
//! One helper shared by every stage that can hang on the engine (document
//! parse, page render, whole-document extraction). Expiry is an ordinary
//! value, [`TimedOut`], which each stage turns into [`IngestError::Timeout`]
//! with its own wording.

use crate::error::IngestError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// A bounded stage ran past its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedOut {
    pub stage: &'static str,
    pub limit: Duration,
}

impl From<TimedOut> for IngestError {
    fn from(t: TimedOut) -> Self {
        IngestError::Timeout {
            stage: t.stage.to_string(),
            elapsed_ms: t.limit.as_millis() as u64,
        }
    }
}

/// Await `fut` for at most `limit`.
///
/// On expiry the future is dropped. Work it already handed to a blocking
/// thread runs to completion in the background and its result is discarded.
pub async fn bounded<T, F>(stage: &'static str, limit: Duration, fut: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(value) => Ok(value),
        Err(_) => {
            warn!("{} exceeded {}ms", stage, limit.as_millis());
            Err(TimedOut { stage, limit })
        }
    }
}

/// [`bounded`] for fallible futures, flattening both failures into
/// [`IngestError`].
pub async fn bounded_try<T, E, F>(
    stage: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, IngestError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<IngestError>,
{
    bounded(stage, limit, fut).await?.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_limit() {
        let v = bounded("Quick", Duration::from_millis(200), async { 7 }).await;
        assert_eq!(v, Ok(7));
    }

    #[tokio::test]
    async fn pending_future_times_out() {
        let started = std::time::Instant::now();
        let r = bounded("Never", Duration::from_millis(30), std::future::pending::<()>()).await;
        let err = r.unwrap_err();
        assert_eq!(err.stage, "Never");
        assert!(started.elapsed() < Duration::from_secs(2));

        let e: IngestError = err.into();
        assert!(e.is_timeout());
        assert!(e.to_string().contains("30ms"), "got: {e}");
    }

    #[tokio::test]
    async fn inner_error_is_converted() {
        let r: Result<(), IngestError> = bounded_try("Parse", Duration::from_secs(1), async {
            Err::<(), _>(crate::engine::EngineError::Corrupt("bad".into()))
        })
        .await;
        assert!(matches!(r, Err(IngestError::CorruptDocument { .. })));
    }
}
