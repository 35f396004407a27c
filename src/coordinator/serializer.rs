use crate::error::Result;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

/// Serializes bursts of change notifications through a single drain loop.
///
/// Items are buffered; the first submitter becomes the drain loop and
/// processes items one at a time, most recently pushed first, until the
/// buffer is empty. Submissions that arrive while a drain is active are only
/// buffered and picked up by that drain.
#[derive(Debug)]
pub struct ChangeEventSerializer<T> {
    state: Mutex<QueueState<T>>,
}

#[derive(Debug)]
struct QueueState<T> {
    buffer: Vec<T>,
    draining: bool,
}

/// Releases the drain flag if the drain loop is dropped mid-way
struct DrainRelease<'a, T> {
    serializer: &'a ChangeEventSerializer<T>,
    armed: bool,
}

impl<T> ChangeEventSerializer<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                buffer: Vec::new(),
                draining: false,
            }),
        }
    }

    /// Submit `item`. Returns `true` when this call ran the drain loop.
    pub async fn submit<F, Fut>(&self, item: T, mut process: F) -> bool
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if !self.push(item) {
            debug!("Drain loop already active, buffered change");
            return false;
        }

        let mut release = DrainRelease {
            serializer: self,
            armed: true,
        };

        loop {
            let Some(next) = self.pop_or_release() else {
                release.armed = false;
                break;
            };
            if let Err(e) = process(next).await {
                error!("Failed to process change notification: {}", e);
            }
        }

        true
    }

    pub fn is_draining(&self) -> bool {
        self.state().draining
    }

    pub fn buffered(&self) -> usize {
        self.state().buffer.len()
    }

    fn push(&self, item: T) -> bool {
        let mut state = self.state();
        state.buffer.push(item);
        if state.draining {
            return false;
        }
        state.draining = true;
        true
    }

    /// Pop the newest item, or end the drain when the buffer is empty.
    /// Both happen under one lock so no pushed item is ever stranded.
    fn pop_or_release(&self) -> Option<T> {
        let mut state = self.state();
        let next = state.buffer.pop();
        if next.is_none() {
            state.draining = false;
        }
        next
    }

    fn state(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Default for ChangeEventSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for DrainRelease<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.serializer.state().draining = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoordinatorError;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_single_item_is_processed() {
        let serializer = ChangeEventSerializer::new();
        let seen = StdMutex::new(Vec::new());

        let drained = serializer
            .submit("a", |item| {
                seen.lock().unwrap().push(item);
                async { Ok(()) }
            })
            .await;

        assert!(drained);
        assert_eq!(*seen.lock().unwrap(), vec!["a"]);
        assert!(!serializer.is_draining());
    }

    #[tokio::test]
    async fn test_items_pushed_during_drain_are_drained_lifo() {
        let serializer = Arc::new(ChangeEventSerializer::new());
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let in_flight = Arc::new(StdMutex::new(0usize));
        let gate = Arc::new(Notify::new());
        let entered = Arc::new(Notify::new());

        let drain = {
            let serializer = Arc::clone(&serializer);
            let seen = Arc::clone(&seen);
            let in_flight = Arc::clone(&in_flight);
            let gate = Arc::clone(&gate);
            let entered = Arc::clone(&entered);
            tokio::spawn(async move {
                serializer
                    .submit("first", move |item| {
                        let seen = Arc::clone(&seen);
                        let in_flight = Arc::clone(&in_flight);
                        let gate = Arc::clone(&gate);
                        let entered = Arc::clone(&entered);
                        async move {
                            {
                                let mut count = in_flight.lock().unwrap();
                                *count += 1;
                                assert_eq!(*count, 1, "items processed concurrently");
                            }
                            if item == "first" {
                                entered.notify_one();
                                gate.notified().await;
                            }
                            seen.lock().unwrap().push(item);
                            *in_flight.lock().unwrap() -= 1;
                            Ok(())
                        }
                    })
                    .await
            })
        };

        entered.notified().await;
        for item in ["a", "b", "c"] {
            let drained = serializer
                .submit(item, |_| async {
                    Err(CoordinatorError::Session("second drain loop".to_string()))
                })
                .await;
            assert!(!drained);
        }
        assert_eq!(serializer.buffered(), 3);

        gate.notify_one();
        assert!(drain.await.unwrap());

        assert_eq!(*seen.lock().unwrap(), vec!["first", "c", "b", "a"]);
        assert!(!serializer.is_draining());
        assert_eq!(serializer.buffered(), 0);
    }

    #[tokio::test]
    async fn test_error_does_not_abort_drain() {
        let serializer = Arc::new(ChangeEventSerializer::new());
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let gate = Arc::new(Notify::new());
        let entered = Arc::new(Notify::new());

        let drain = {
            let serializer = Arc::clone(&serializer);
            let seen = Arc::clone(&seen);
            let gate = Arc::clone(&gate);
            let entered = Arc::clone(&entered);
            tokio::spawn(async move {
                serializer
                    .submit(0, move |item: i32| {
                        let seen = Arc::clone(&seen);
                        let gate = Arc::clone(&gate);
                        let entered = Arc::clone(&entered);
                        async move {
                            if item == 0 {
                                entered.notify_one();
                                gate.notified().await;
                            }
                            seen.lock().unwrap().push(item);
                            if item == 2 {
                                return Err(CoordinatorError::Session("boom".to_string()));
                            }
                            Ok(())
                        }
                    })
                    .await
            })
        };

        entered.notified().await;
        serializer.submit(1, |_| async { Ok(()) }).await;
        serializer.submit(2, |_| async { Ok(()) }).await;
        gate.notify_one();
        drain.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 2, 1]);
        assert!(!serializer.is_draining());
    }

    #[tokio::test]
    async fn test_dropped_drain_releases_guard() {
        let serializer = ChangeEventSerializer::new();
        {
            let pending = serializer.submit(1, |_| std::future::pending::<Result<()>>());
            let _ = tokio::time::timeout(std::time::Duration::from_millis(20), pending).await;
        }
        assert!(!serializer.is_draining());

        let drained = serializer.submit(2, |_| async { Ok(()) }).await;
        assert!(drained);
    }
}
