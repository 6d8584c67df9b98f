//! Concurrency-bounded FIFO admission queue for variant fetches.
//!
//! Every sub-asset fetch requests a slot first; at most `max_concurrent`
//! permits exist at any time, independent of how many displayed objects
//! request a level change in the same frame. No priorities, pure FIFO.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

struct Waiter {
    key: String,
    tx: oneshot::Sender<Option<SlotPermit>>,
}

struct QueueInner {
    max_concurrent: usize,
    in_flight: usize,
    waiters: VecDeque<Waiter>,
    closed: bool,
}

/// Bounds simultaneous in-flight fetch work.
#[derive(Clone)]
pub struct LoadQueue {
    shared: Arc<Mutex<QueueInner>>,
}

/// An occupied concurrency slot. The slot frees when the permit drops,
/// which also admits the oldest waiter.
pub struct SlotPermit {
    shared: Option<Arc<Mutex<QueueInner>>>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.lock().in_flight -= 1;
            pump(&shared);
        }
    }
}

/// Grants admissions oldest-first up to the concurrency bound.
fn pump(shared: &Arc<Mutex<QueueInner>>) {
    let mut grants = Vec::new();
    {
        let mut queue = shared.lock();
        while queue.in_flight < queue.max_concurrent {
            let Some(waiter) = queue.waiters.pop_front() else {
                break;
            };
            queue.in_flight += 1;
            log::trace!("load queue: admitting '{}'", waiter.key);
            grants.push(waiter.tx);
        }
    }
    for tx in grants {
        let permit = SlotPermit {
            shared: Some(Arc::clone(shared)),
        };
        // A dropped receiver releases the slot again through the permit.
        let _ = tx.send(Some(permit));
    }
}

impl LoadQueue {
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            shared: Arc::new(Mutex::new(QueueInner {
                max_concurrent: max_concurrent.max(1),
                in_flight: 0,
                waiters: VecDeque::new(),
                closed: false,
            })),
        }
    }

    /// Requests admission for one unit of fetch work.
    ///
    /// Resolves with a permit once a slot is free, or `None` if the queue
    /// is closed. Callers treat `None` as a permanent decline for the
    /// attempt and do not retry.
    pub async fn request_slot(&self, key: impl Into<String>) -> Option<SlotPermit> {
        let rx = {
            let mut queue = self.shared.lock();
            if queue.closed {
                return None;
            }
            if queue.in_flight < queue.max_concurrent && queue.waiters.is_empty() {
                queue.in_flight += 1;
                return Some(SlotPermit {
                    shared: Some(Arc::clone(&self.shared)),
                });
            }
            let (tx, rx) = oneshot::channel();
            queue.waiters.push_back(Waiter {
                key: key.into(),
                tx,
            });
            rx
        };
        rx.await.unwrap_or(None)
    }

    /// Re-checks the waiter list against the concurrency bound. The frame
    /// driver calls this once per frame.
    pub fn tick(&self) {
        pump(&self.shared);
    }

    /// Declines all current and future admission requests.
    pub fn close(&self) {
        let waiters = {
            let mut queue = self.shared.lock();
            queue.closed = true;
            std::mem::take(&mut queue.waiters)
        };
        if !waiters.is_empty() {
            log::debug!("load queue: closing, declining {} waiter(s)", waiters.len());
        }
        for waiter in waiters {
            let _ = waiter.tx.send(None);
        }
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    #[must_use]
    pub fn waiting(&self) -> usize {
        self.shared.lock().waiters.len()
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.shared.lock().max_concurrent
    }
}
