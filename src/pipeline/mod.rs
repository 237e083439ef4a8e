//! Asynchronous orchestration: re-fetch on dependency key changes, never apply stale results.
//!
//! Every fetch belongs to a [`Slot`] and is tagged with the [`Ticket`] its [`Guard`] issued.
//! Changing the key aborts the in-flight task and advances the generation, so a result
//! that still arrives for an older key is discarded instead of overwriting newer state.

mod discovery;
mod known;
#[cfg(test)]
mod tests;

#[doc(inline)]
pub use discovery::NewVariantPipeline;
#[doc(inline)]
pub use known::{BaselineKey, KnownVariantPipeline, PreviewKey, SampleSetKey};

use color_eyre::eyre::{eyre, Report};
use covcurate_variant::{Variant, VariantSelector};
use log::{debug, error};
use std::fmt::Debug;
use std::future::Future;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;

// ----------------------------------------------------------------------------
// Selection
// ----------------------------------------------------------------------------

/// What the user picked, handed to the presentation layer's selection callback.
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    /// A known-variant preview card.
    Known(VariantSelector),
    /// A new variant, with all of its mutations.
    New(Variant),
}

// ----------------------------------------------------------------------------
// Guard
// ----------------------------------------------------------------------------

/// Proof of which request a result belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ticket {
    generation: u64,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Tracks the dependency key of a slot and the request that currently owns it.
///
/// ```rust
/// use covcurate::pipeline::Guard;
///
/// let mut guard = Guard::new();
/// let switzerland = guard.issue("Switzerland").unwrap();
/// assert!(guard.issue("Switzerland").is_none());
///
/// let germany = guard.issue("Germany").unwrap();
/// assert!(!guard.is_current(&switzerland));
/// assert!(guard.is_current(&germany));
/// ```
#[derive(Debug)]
pub struct Guard<K> {
    key: Option<K>,
    generation: u64,
    in_flight: Option<AbortHandle>,
}

impl<K> Default for Guard<K> {
    fn default() -> Self {
        Guard { key: None, generation: 0, in_flight: None }
    }
}

impl<K: Debug + PartialEq> Guard<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns a [`Ticket`] for `key`, or [`None`] if `key` is already the current key.
    ///
    /// A new ticket aborts the request of the previous key.
    pub fn issue(&mut self, key: K) -> Option<Ticket> {
        if self.key.as_ref() == Some(&key) {
            return None;
        }
        self.abort();
        self.generation += 1;
        debug!("Dependency key changed to {key:?}, generation {}.", self.generation);
        self.key = Some(key);
        Some(Ticket { generation: self.generation })
    }

    /// Remember the task that serves the current ticket.
    pub fn track(&mut self, handle: AbortHandle) {
        self.in_flight = Some(handle);
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
    }

    /// True while the current ticket has no result yet.
    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Mark the current ticket as resolved.
    pub fn finish(&mut self, ticket: &Ticket) {
        if self.is_current(ticket) {
            self.in_flight = None;
        }
    }

    /// Abandon the current request and forget the key, so the next request fetches again.
    pub fn cancel(&mut self) {
        self.abort();
        self.generation += 1;
        self.key = None;
    }

    fn abort(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            debug!("Aborting request of generation {}.", self.generation);
            handle.abort();
        }
    }
}

impl<K> Drop for Guard<K> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

// ----------------------------------------------------------------------------
// Slot
// ----------------------------------------------------------------------------

/// What happened to a fetch result.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The result became the slot's value.
    Applied,
    /// The result belonged to an older key and was discarded.
    Stale,
    /// The fetch failed, the slot kept its last value.
    Failed,
}

type Settled<T> = (Ticket, Result<T, Report>);

/// Reports the result of one fetch task back to its slot.
///
/// If the task ends without a result, ex. because the fetch panicked, an error is
/// reported on drop so that [`Slot::settle`] does not wait forever.
struct Delivery<T> {
    ticket: Ticket,
    sender: Option<UnboundedSender<Settled<T>>>,
}

impl<T> Delivery<T> {
    fn new(ticket: Ticket, sender: UnboundedSender<Settled<T>>) -> Self {
        Delivery { ticket, sender: Some(sender) }
    }

    fn send(mut self, result: Result<T, Report>) {
        if let Some(sender) = self.sender.take() {
            // the receiver is gone when the slot was dropped
            let _ = sender.send((self.ticket, result));
        }
    }
}

impl<T> Drop for Delivery<T> {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let generation = self.ticket.generation;
            let report = eyre!("Request of generation {generation} ended without a result.");
            let _ = sender.send((self.ticket, Err(report)));
        }
    }
}

/// A state cell fed by fetches keyed on a dependency key.
///
/// Fetches run as tokio tasks, so [`Slot::request`] must be called from within a runtime.
///
/// ```rust
/// use color_eyre::eyre::{eyre, Report};
/// use covcurate::pipeline::{Outcome, Slot};
///
/// tokio_test::block_on(async {
///     let mut slot = Slot::new("countries");
///     slot.request("Switzerland", async { Ok::<_, Report>(1) });
///     slot.request("Germany", async { Ok(2) });
///     assert_eq!(slot.settle().await, Some(Outcome::Applied));
///     assert_eq!(slot.value(), Some(&2));
/// });
/// ```
pub struct Slot<K, T> {
    name: &'static str,
    guard: Guard<K>,
    value: Option<T>,
    sender: UnboundedSender<Settled<T>>,
    receiver: UnboundedReceiver<Settled<T>>,
}

impl<K, T> Slot<K, T>
where
    K: Debug + PartialEq,
    T: Send + 'static,
{
    pub fn new(name: &'static str) -> Self {
        let (sender, receiver) = unbounded_channel();
        Slot { name, guard: Guard::new(), value: None, sender, receiver }
    }

    pub fn key(&self) -> Option<&K> {
        self.guard.key()
    }

    /// The last applied value.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.guard.is_pending()
    }

    /// Forget the current value, ex. when it no longer matches the new key.
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Abandon the in-flight request, the next [`Slot::request`] fetches even for the same key.
    pub fn cancel(&mut self) {
        self.guard.cancel();
    }

    /// Start `fetch` for `key` if the key changed, returns true if a fetch was started.
    ///
    /// The previous in-flight fetch is aborted. Its result is discarded if it still arrives.
    pub fn request<F>(&mut self, key: K, fetch: F) -> bool
    where
        F: Future<Output = Result<T, Report>> + Send + 'static,
    {
        let Some(ticket) = self.guard.issue(key) else {
            debug!("{}: dependency key unchanged, keeping current request.", self.name);
            return false;
        };
        let delivery = Delivery::new(ticket, self.sender.clone());
        let handle = tokio::spawn(async move {
            let result = fetch.await;
            delivery.send(result);
        });
        self.guard.track(handle.abort_handle());
        true
    }

    /// Apply a settled fetch, unless it belongs to an older key.
    pub fn apply(&mut self, ticket: Ticket, result: Result<T, Report>) -> Outcome {
        if !self.guard.is_current(&ticket) {
            debug!(
                "{}: discarding stale result of generation {} (current {}).",
                self.name,
                ticket.generation,
                self.guard.generation()
            );
            return Outcome::Stale;
        }
        self.guard.finish(&ticket);
        match result {
            Ok(value) => {
                debug!("{}: applied result of generation {}.", self.name, ticket.generation);
                self.value = Some(value);
                Outcome::Applied
            }
            Err(report) => {
                error!("{}: request for {:?} failed: {report:?}", self.name, self.guard.key());
                Outcome::Failed
            }
        }
    }

    /// Wait until the request of the current key settles, discarding stale results.
    ///
    /// Returns [`None`] if nothing is in flight.
    pub async fn settle(&mut self) -> Option<Outcome> {
        while self.guard.is_pending() {
            let (ticket, result) = self.receiver.recv().await?;
            match self.apply(ticket, result) {
                Outcome::Stale => continue,
                outcome => return Some(outcome),
            }
        }
        None
    }

    /// Apply every result that has already arrived, without waiting.
    pub fn poll(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Ok((ticket, result)) = self.receiver.try_recv() {
            outcomes.push(self.apply(ticket, result));
        }
        outcomes
    }
}
