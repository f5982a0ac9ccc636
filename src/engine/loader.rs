//! Lazy, single-flight engine loading.
//!
//! The engine is expensive to initialise and stateless once loaded, so one
//! handle is shared for the lifetime of the process. The loader is a small
//! state machine guarded by a mutex that is never held across an await:
//!
//! ```text
//! Uninitialized ──acquire──▶ Loading(shared future) ──ok──▶ Ready(handle)
//!       ▲                          │
//!       └──────────── err ─────────┘
//! ```
//!
//! All callers that arrive while a load is in flight clone the same
//! [`Shared`] future, so they observe the same success or the same failure.
//! A failure clears the slot; the next `acquire` starts a fresh attempt.
//! There is no timeout here: a hung load is surfaced to the caller as a hung
//! call, never as a silently degraded pipeline.

use super::{EngineError, EngineFactory, EngineHandle};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

type LoadFuture = Shared<BoxFuture<'static, Result<EngineHandle, EngineError>>>;

enum LoadState {
    Uninitialized,
    Loading { generation: u64, future: LoadFuture },
    Ready(EngineHandle),
}

/// Caches one engine handle and deduplicates concurrent loads.
pub struct EngineLoader {
    factory: Arc<dyn EngineFactory>,
    state: Mutex<Slot>,
    attempts: AtomicUsize,
}

struct Slot {
    state: LoadState,
    next_generation: u64,
}

impl EngineLoader {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            state: Mutex::new(Slot {
                state: LoadState::Uninitialized,
                next_generation: 0,
            }),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Return the engine, loading it on first use.
    ///
    /// A ready handle is returned without waiting on anything.
    pub async fn acquire(&self) -> Result<EngineHandle, EngineError> {
        let (generation, future) = {
            let mut guard = self.lock();
            let slot = &mut *guard;
            match &slot.state {
                LoadState::Ready(handle) => return Ok(Arc::clone(handle)),
                LoadState::Loading { generation, future } => {
                    debug!(generation, "Joining in-flight engine load");
                    (*generation, future.clone())
                }
                LoadState::Uninitialized => {
                    let generation = slot.next_generation;
                    slot.next_generation += 1;
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(attempt, "Loading PDF engine");

                    let factory = Arc::clone(&self.factory);
                    let future = async move { factory.load().await }.boxed().shared();
                    slot.state = LoadState::Loading {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        let result = future.await;

        // Only the cycle that is still current may settle the slot; a later
        // cycle started after a failure must not be overwritten.
        let mut slot = self.lock();
        let current = matches!(
            &slot.state,
            LoadState::Loading { generation: g, .. } if *g == generation
        );
        if current {
            slot.state = match &result {
                Ok(handle) => {
                    info!("PDF engine ready");
                    LoadState::Ready(Arc::clone(handle))
                }
                Err(e) => {
                    warn!("PDF engine load failed, next call will retry: {}", e);
                    LoadState::Uninitialized
                }
            };
        }

        result
    }

    /// Number of load sequences started so far.
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.lock().state, LoadState::Ready(_))
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EngineLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLoader")
            .field("ready", &self.is_ready())
            .field("load_attempts", &self.load_attempts())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineDocument, PdfEngine};
    use async_trait::async_trait;
    use std::time::Duration;

    struct NullEngine;

    #[async_trait]
    impl PdfEngine for NullEngine {
        async fn open(&self, _bytes: Arc<[u8]>) -> Result<Arc<dyn EngineDocument>, EngineError> {
            Err(EngineError::Corrupt("null engine".into()))
        }
    }

    /// Fails the first `failures` loads, then succeeds after `delay`.
    struct FlakyFactory {
        failures: usize,
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl EngineFactory for FlakyFactory {
        async fn load(&self) -> Result<EngineHandle, EngineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if n < self.failures {
                Err(EngineError::Unavailable(format!("attempt {n}")))
            } else {
                Ok(Arc::new(NullEngine))
            }
        }
    }

    fn loader(failures: usize, delay_ms: u64) -> EngineLoader {
        EngineLoader::new(Arc::new(FlakyFactory {
            failures,
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(delay_ms),
        }))
    }

    #[tokio::test]
    async fn ready_handle_is_reused() {
        let l = loader(0, 0);
        let a = l.acquire().await.unwrap();
        let b = l.acquire().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(l.load_attempts(), 1);
        assert!(l.is_ready());
    }

    #[tokio::test]
    async fn concurrent_waiters_share_one_load() {
        let l = Arc::new(loader(0, 30));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let l = Arc::clone(&l);
                tokio::spawn(async move { l.acquire().await })
            })
            .collect();
        for h in handles {
            assert!(h.await.unwrap().is_ok());
        }
        assert_eq!(l.load_attempts(), 1);
    }

    #[tokio::test]
    async fn failure_is_shared_then_retried() {
        let l = Arc::new(loader(1, 30));
        let (a, b) = tokio::join!(l.acquire(), l.acquire());
        let expected = Some(EngineError::Unavailable("attempt 0".into()));
        assert_eq!(a.err(), expected);
        assert_eq!(b.err(), expected);
        assert!(!l.is_ready());
        assert_eq!(l.load_attempts(), 1);

        assert!(l.acquire().await.is_ok());
        assert_eq!(l.load_attempts(), 2);
        assert!(l.is_ready());
    }
}
