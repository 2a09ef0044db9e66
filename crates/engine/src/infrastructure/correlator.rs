//! Event correlation over the uncorrelated inbound stream.
//!
//! The game delivers notifications with no request identifiers, so flows
//! register a content predicate plus a deadline and suspend until the
//! first matching event arrives. Waiters are kept in registration order
//! per event category; within a category the first matching waiter
//! consumes the event, because all dialog traffic for one identity shares
//! a single response channel and double-delivery is exactly the
//! cross-talk this layer exists to prevent. Waiters on different
//! categories are independent.
//!
//! Passive consumers that must see every event regardless of waiter
//! activity (war tracking, chat relays) use [`Correlator::subscribe`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use zonewarden_domain::{DialogEvent, EventKind, GameEvent};

/// No matching event arrived before the deadline.
#[derive(Debug, thiserror::Error)]
#[error("no matching event within {waited:?}")]
pub struct CorrelationTimeout {
    pub waited: Duration,
}

type Predicate = Box<dyn Fn(&GameEvent) -> bool + Send>;

struct Waiter {
    id: u64,
    predicate: Predicate,
    tx: oneshot::Sender<GameEvent>,
}

/// Waiter registry for one in-game identity's event stream.
pub struct Correlator {
    waiters: Mutex<HashMap<EventKind, Vec<Waiter>>>,
    next_id: AtomicU64,
    tap: broadcast::Sender<GameEvent>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        let (tap, _) = broadcast::channel(256);
        Self {
            waiters: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            tap,
        }
    }

    /// Receive every published event, independent of waiter consumption.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tap.subscribe()
    }

    /// Offer an inbound event to the pending waiters of its category, then
    /// fan it out to subscribers.
    pub fn publish(&self, event: GameEvent) {
        {
            let mut waiters = self.waiters.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(queue) = waiters.get_mut(&event.kind()) {
                if let Some(pos) = queue.iter().position(|w| (w.predicate)(&event)) {
                    let waiter = queue.remove(pos);
                    // Receiver dropped means the wait already timed out.
                    let _ = waiter.tx.send(event.clone());
                }
            }
        }
        let _ = self.tap.send(event);
    }

    /// Suspend until an event of `kind` matches `predicate`, or until the
    /// deadline elapses. Each waiter resolves exactly once.
    pub async fn wait<P>(
        &self,
        kind: EventKind,
        deadline: Duration,
        predicate: P,
    ) -> Result<GameEvent, CorrelationTimeout>
    where
        P: Fn(&GameEvent) -> bool + Send + 'static,
    {
        let (tx, mut rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut waiters = self.waiters.lock().unwrap_or_else(|e| e.into_inner());
            waiters.entry(kind).or_default().push(Waiter {
                id,
                predicate: Box::new(predicate),
                tx,
            });
        }

        tokio::select! {
            resolved = &mut rx => resolved.map_err(|_| CorrelationTimeout { waited: deadline }),
            _ = tokio::time::sleep(deadline) => {
                if self.unregister(kind, id) {
                    Err(CorrelationTimeout { waited: deadline })
                } else {
                    // The publisher won the race: it already removed this
                    // waiter and sent the event.
                    rx.try_recv().map_err(|_| CorrelationTimeout { waited: deadline })
                }
            }
        }
    }

    /// Wait for a dialog matching `predicate`.
    pub async fn wait_dialog<P>(
        &self,
        deadline: Duration,
        predicate: P,
    ) -> Result<DialogEvent, CorrelationTimeout>
    where
        P: Fn(&DialogEvent) -> bool + Send + 'static,
    {
        let event = self
            .wait(EventKind::Dialog, deadline, move |ev| {
                ev.as_dialog().map(|d| predicate(d)).unwrap_or(false)
            })
            .await?;
        match event {
            GameEvent::Dialog(dialog) => Ok(dialog),
            _ => unreachable!("dialog waiter resolved with a non-dialog event"),
        }
    }

    /// Number of pending waiters for a category. Mostly for tests and
    /// diagnostics.
    pub fn pending(&self, kind: EventKind) -> usize {
        let waiters = self.waiters.lock().unwrap_or_else(|e| e.into_inner());
        waiters.get(&kind).map(Vec::len).unwrap_or(0)
    }

    fn unregister(&self, kind: EventKind, id: u64) -> bool {
        let mut waiters = self.waiters.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(queue) = waiters.get_mut(&kind) {
            if let Some(pos) = queue.iter().position(|w| w.id == id) {
                queue.remove(pos);
                return true;
            }
        }
        false
    }
}
