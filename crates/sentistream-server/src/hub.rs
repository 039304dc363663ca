//! The broadcast hub: owns the live subscriber set and fans messages out.
//!
//! Each subscriber gets a bounded outbound queue. Broadcasting snapshots the
//! current subscribers, releases the lock, then try-sends to each queue —
//! a full or closed queue marks that subscriber dead and removes it, so one
//! slow or vanished connection never stalls delivery to the rest. Delivery
//! is best-effort, at-most-once, no retry.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;

pub struct Hub {
    inner: Mutex<HubInner>,
    queue_capacity: usize,
}

struct HubInner {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::Sender<String>>,
}

impl Hub {
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HubInner {
                next_id: 0,
                subscribers: HashMap::new(),
            }),
            queue_capacity,
        }
    }

    /// Register a new subscriber; returns its id and the receiving end of
    /// its outbound queue.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber lock is poisoned.
    pub fn subscribe(&self) -> (u64, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let mut inner = self.inner.lock().expect("hub lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.insert(id, tx);
        tracing::debug!(subscriber_id = id, total = inner.subscribers.len(), "subscriber added");
        (id, rx)
    }

    /// Remove a subscriber. Safe to call after broadcast already removed it.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber lock is poisoned.
    pub fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.lock().expect("hub lock poisoned");
        if inner.subscribers.remove(&id).is_some() {
            tracing::debug!(subscriber_id = id, total = inner.subscribers.len(), "subscriber removed");
        }
    }

    /// Number of currently registered subscribers.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber lock is poisoned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("hub lock poisoned").subscribers.len()
    }

    /// Fan a message out to every current subscriber.
    ///
    /// Returns the number of queues the message was delivered to. Failed
    /// subscribers (queue full or receiver gone) are dropped from the set.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber lock is poisoned.
    pub fn broadcast(&self, message: &str) -> usize {
        // Snapshot so concurrent subscribe/unsubscribe never blocks sends.
        let snapshot: Vec<(u64, mpsc::Sender<String>)> = {
            let inner = self.inner.lock().expect("hub lock poisoned");
            inner
                .subscribers
                .iter()
                .map(|(&id, tx)| (id, tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in snapshot {
            match tx.try_send(message.to_string()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(subscriber_id = id, error = %e, "dropping dead subscriber");
                    dead.push(id);
                }
            }
        }

        if !dead.is_empty() {
            let mut inner = self.inner.lock().expect("hub lock poisoned");
            for id in dead {
                inner.subscribers.remove(&id);
            }
        }

        delivered
    }
}
