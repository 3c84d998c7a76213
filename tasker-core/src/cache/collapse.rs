//! Single-flight collapsing of concurrent loads
//!
//! Concurrent callers asking for the same key while a load is outstanding
//! join that load instead of starting their own. The load runs on its own
//! tokio task, so dropping one caller never cancels it for the rest.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinError;
use tracing::debug;

type SharedLoad<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct Flight<T, E> {
    generation: u64,
    load: SharedLoad<T, E>,
}

struct Flights<T, E> {
    in_flight: Mutex<HashMap<String, Flight<T, E>>>,
    next_generation: AtomicU64,
}

impl<T, E> Flights<T, E> {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Flight<T, E>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a finished flight from the map, including when the load panics
struct Landing<T, E> {
    flights: Arc<Flights<T, E>>,
    key: String,
    generation: u64,
}

impl<T, E> Drop for Landing<T, E> {
    fn drop(&mut self) {
        let mut in_flight = self.flights.lock();
        if in_flight
            .get(&self.key)
            .is_some_and(|flight| flight.generation == self.generation)
        {
            in_flight.remove(&self.key);
        }
    }
}

/// Collapses concurrent loads of the same key into one execution
///
/// Every caller of an overlapping burst receives a clone of the same
/// outcome. Once the load finishes the key is free again and the next call
/// starts a fresh execution.
pub struct RequestCollapser<T, E> {
    flights: Arc<Flights<T, E>>,
}

impl<T, E> Default for RequestCollapser<T, E> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Flights {
                in_flight: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }
}

impl<T, E> Clone for RequestCollapser<T, E> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<T, E> RequestCollapser<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or join the execution already in flight
    ///
    /// `work` is only invoked by the caller that starts a burst. A panic in
    /// the load reaches every waiter as `E::from(JoinError)`.
    pub async fn collapse<F, Fut>(&self, key: &str, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let load = {
            let mut in_flight = self.flights.lock();
            match in_flight.get(key) {
                Some(flight) => {
                    debug!("Joining in-flight load: {}", key);
                    flight.load.clone()
                }
                None => {
                    let generation = self.flights.next_generation.fetch_add(1, Ordering::Relaxed);
                    let load = self.launch(key, generation, work());
                    in_flight.insert(
                        key.to_string(),
                        Flight {
                            generation,
                            load: load.clone(),
                        },
                    );
                    load
                }
            }
        };

        load.await
    }

    /// Number of keys with a load outstanding
    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    fn launch<Fut>(&self, key: &str, generation: u64, work: Fut) -> SharedLoad<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        debug!("Starting load: {}", key);
        let landing = Landing {
            flights: Arc::clone(&self.flights),
            key: key.to_string(),
            generation,
        };

        let handle = tokio::spawn(async move {
            let _landing = landing;
            work.await
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(E::from(e)),
            }
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Failed(String),
        Join(String),
    }

    impl From<JoinError> for TestError {
        fn from(e: JoinError) -> Self {
            TestError::Join(e.to_string())
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_execution() {
        let collapser: RequestCollapser<Vec<u32>, TestError> = RequestCollapser::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let collapser = collapser.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                collapser
                    .collapse("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(vec![1, 2, 3])
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(vec![1, 2, 3]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(collapser.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_error_is_shared_and_key_is_released() {
        let collapser: RequestCollapser<u32, TestError> = RequestCollapser::new();

        let (a, b) = tokio::join!(
            collapser.collapse("k", || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(TestError::Failed("origin down".to_string()))
            }),
            collapser.collapse("k", || async { Ok(7) }),
        );
        assert_eq!(a, Err(TestError::Failed("origin down".to_string())));
        assert_eq!(b, Err(TestError::Failed("origin down".to_string())));

        let next = collapser.collapse("k", || async { Ok(7) }).await;
        assert_eq!(next, Ok(7));
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_collapse() {
        let collapser: RequestCollapser<&'static str, TestError> = RequestCollapser::new();

        let (a, b) = tokio::join!(
            collapser.collapse("a", || async { Ok("a") }),
            collapser.collapse("b", || async { Ok("b") }),
        );
        assert_eq!(a, Ok("a"));
        assert_eq!(b, Ok("b"));
    }

    #[tokio::test]
    async fn test_panicking_load_reaches_waiters_as_error() {
        let collapser: RequestCollapser<u32, TestError> = RequestCollapser::new();

        let result = collapser
            .collapse("k", || async {
                if true {
                    panic!("load exploded");
                }
                Ok(1)
            })
            .await;

        assert!(matches!(result, Err(TestError::Join(_))));
        assert_eq!(collapser.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_cancel_load() {
        let collapser: RequestCollapser<u32, TestError> = RequestCollapser::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let calls = Arc::clone(&calls);
            tokio::time::timeout(
                Duration::from_millis(10),
                collapser.collapse("k", move || async move {
                    tokio::time::sleep(Duration::from_millis(80)).await;
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(5)
                }),
            )
            .await
        };
        assert!(first.is_err());

        let joined = collapser.collapse("k", || async { Ok(99) }).await;
        assert_eq!(joined, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
