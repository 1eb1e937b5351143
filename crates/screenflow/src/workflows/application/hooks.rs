//! Token-addressed mailbox used to resume suspended runs.
//!
//! Delivery and waiting may happen in either order: an event delivered
//! before anyone waits is retained until the wait arrives, and a wait with
//! no event parks on a oneshot without holding a thread. Exactly one event
//! is consumed per wait.

use super::domain::{ReviewDecision, ReviewToken};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

/// Payload carried to a run paused for human review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEvent {
    pub decision: ReviewDecision,
    pub reason: Option<String>,
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("wait for token '{token}' was cancelled before an event arrived")]
    Cancelled { token: String },
    #[error("a listener is already waiting on token '{token}'")]
    AlreadyWaiting { token: String },
    #[error("an undelivered event is already retained for token '{token}'")]
    AlreadyQueued { token: String },
}

enum Slot<E> {
    Waiting(oneshot::Sender<E>),
    Queued(E),
}

/// Mailbox keyed by review token, generic over the event payload.
pub struct HookChannel<E> {
    slots: Mutex<HashMap<String, Slot<E>>>,
}

impl<E> Default for HookChannel<E> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<E> HookChannel<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks until an event for `token` arrives, consuming a retained event
    /// immediately if one is already queued. At most one waiter per token.
    pub async fn wait(&self, token: &ReviewToken) -> Result<E, HookError> {
        let receiver = {
            let mut slots = self.slots.lock().expect("hook channel mutex poisoned");
            match slots.remove(token.as_str()) {
                Some(Slot::Queued(event)) => return Ok(event),
                Some(slot @ Slot::Waiting(_)) => {
                    slots.insert(token.as_str().to_owned(), slot);
                    return Err(HookError::AlreadyWaiting {
                        token: token.to_string(),
                    });
                }
                None => {
                    let (sender, receiver) = oneshot::channel();
                    slots.insert(token.as_str().to_owned(), Slot::Waiting(sender));
                    receiver
                }
            }
        };

        receiver.await.map_err(|_| HookError::Cancelled {
            token: token.to_string(),
        })
    }

    /// Hands the event to a parked waiter, or retains it for a future wait.
    /// A second event for a token whose first is still retained is refused.
    pub fn deliver(&self, token: &ReviewToken, event: E) -> Result<(), HookError> {
        let mut slots = self.slots.lock().expect("hook channel mutex poisoned");
        match slots.remove(token.as_str()) {
            Some(Slot::Waiting(sender)) => {
                // Receiver dropped between parking and delivery: retain the
                // event for the next wait instead of losing it.
                if let Err(event) = sender.send(event) {
                    slots.insert(token.as_str().to_owned(), Slot::Queued(event));
                }
                Ok(())
            }
            Some(slot @ Slot::Queued(_)) => {
                slots.insert(token.as_str().to_owned(), slot);
                Err(HookError::AlreadyQueued {
                    token: token.to_string(),
                })
            }
            None => {
                slots.insert(token.as_str().to_owned(), Slot::Queued(event));
                Ok(())
            }
        }
    }

    /// Wakes a parked wait with a cancellation error and discards any
    /// retained event. Returns whether a slot existed for the token.
    pub fn cancel(&self, token: &ReviewToken) -> bool {
        let mut slots = self.slots.lock().expect("hook channel mutex poisoned");
        slots.remove(token.as_str()).is_some()
    }

    pub fn is_waiting(&self, token: &ReviewToken) -> bool {
        let slots = self.slots.lock().expect("hook channel mutex poisoned");
        matches!(slots.get(token.as_str()), Some(Slot::Waiting(_)))
    }
}
