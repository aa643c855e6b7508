//! The in-flight correlation index: one [`Slot`] per outstanding request,
//! keyed by correlation id. Grounded on the teacher's `State::metadata`
//! (`client/client.rs`), which pairs a `oneshot::channel()` sender held in
//! shared state with a receiver handed back to the caller — generalized
//! from a single pending-metadata slot to one slot per correlation id, and
//! ported from `futures::unsync::oneshot` to `tokio::sync::oneshot` (the
//! design note's "per-slot one-shot completion primitive").

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::Error;
use crate::protocol::{ApiKey, ApiVersion, CorrelationId};

/// What the reader hands back for a matched correlation id: the full frame
/// bytes (including the leading correlation id, per spec.md §4.E step 4)
/// plus enough of the original request to decode it.
pub struct Slot {
    pub api_key: ApiKey,
    pub api_version: Option<ApiVersion>,
    sender: oneshot::Sender<Result<Bytes, Error>>,
}

/// Concurrent map of in-flight slots. A single mutex-protected `HashMap`
/// meets spec.md §9's correctness bar ("critical sections are
/// microseconds").
#[derive(Default)]
pub struct SlotTable {
    slots: Mutex<HashMap<CorrelationId, Slot>>,
}

impl SlotTable {
    pub fn new() -> Self {
        SlotTable { slots: Mutex::new(HashMap::new()) }
    }

    /// Registers a new slot. Panics on a duplicate correlation id — per
    /// spec.md §3, a collision here is a fatal programming error, not a
    /// recoverable condition.
    pub fn insert(
        &self,
        correlation_id: CorrelationId,
        api_key: ApiKey,
        api_version: Option<ApiVersion>,
    ) -> oneshot::Receiver<Result<Bytes, Error>> {
        let (sender, receiver) = oneshot::channel();
        let slot = Slot { api_key, api_version, sender };

        let mut slots = self.slots.lock().unwrap();
        if slots.insert(correlation_id, slot).is_some() {
            panic!("duplicate correlation id {correlation_id} still in flight");
        }

        receiver
    }

    /// Removes and returns the slot for `correlation_id`, if any, without
    /// resolving it.
    pub fn remove(&self, correlation_id: CorrelationId) -> Option<Slot> {
        self.slots.lock().unwrap().remove(&correlation_id)
    }

    /// Resolves and removes the slot matching `correlation_id` with
    /// `frame`. Returns `false` if no such slot is registered (discarded,
    /// per spec.md §4.E step 4 "If absent, log and discard").
    pub fn complete(&self, correlation_id: CorrelationId, frame: Bytes) -> bool {
        match self.remove(correlation_id) {
            Some(slot) => {
                let _ = slot.sender.send(Ok(frame));
                true
            }
            None => false,
        }
    }

    /// Fails every registered slot with `error` and empties the table.
    /// Used by dispose and by permanent reconnect failure.
    pub fn fail_all(&self, make_error: impl Fn() -> Error) {
        let mut slots = self.slots.lock().unwrap();
        for (_, slot) in slots.drain() {
            let _ = slot.sender.send(Err(make_error()));
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_resolves_registered_slot() {
        let table = SlotTable::new();
        let mut receiver = table.insert(1, ApiKey::ApiVersions, Some(0));

        assert!(table.complete(1, Bytes::from_static(b"frame")));
        assert!(table.is_empty());

        let result = receiver.try_recv().unwrap();
        assert_eq!(result.unwrap(), Bytes::from_static(b"frame"));
    }

    #[test]
    fn complete_on_unknown_correlation_id_is_discarded() {
        let table = SlotTable::new();
        assert!(!table.complete(99, Bytes::from_static(b"frame")));
    }

    #[test]
    fn fail_all_drains_and_resolves_every_slot() {
        let table = SlotTable::new();
        let mut a = table.insert(1, ApiKey::ApiVersions, Some(0));
        let mut b = table.insert(2, ApiKey::Metadata, Some(0));

        table.fail_all(|| Error::Disposed);

        assert!(table.is_empty());
        assert!(matches!(a.try_recv().unwrap(), Err(Error::Disposed)));
        assert!(matches!(b.try_recv().unwrap(), Err(Error::Disposed)));
    }

    #[test]
    #[should_panic(expected = "duplicate correlation id")]
    fn duplicate_insert_panics() {
        let table = SlotTable::new();
        let _a = table.insert(1, ApiKey::ApiVersions, Some(0));
        let _b = table.insert(1, ApiKey::ApiVersions, Some(0));
    }
}
