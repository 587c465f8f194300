use crate::field::FieldId;
use serde::Serialize;
use std::{collections::BTreeMap, fmt};

///
/// RequestId
///
/// Correlation identifier tying an externally-launched workflow back to
/// the field instance that requested it. Allocation is monotonic per
/// manager, so an id is never reused within one form instance and a
/// late-arriving result cannot be misrouted to a field created later.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

///
/// RequestState
///
/// Per-id lifecycle: `Idle -> Pending -> {Applied | Cancelled}`.
/// Terminal states are kept in the table so a late result for a
/// finished id is recognizably stale rather than unknown.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestState {
    Idle,
    Pending,
    Applied,
    Cancelled,
}

impl RequestState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Applied | Self::Cancelled)
    }
}

///
/// RequestSlot
///

#[derive(Clone, Copy, Debug)]
struct RequestSlot {
    owner: FieldId,
    state: RequestState,
}

///
/// CorrelationTable
///
/// Owns the id space and the id-to-field lookup. Mutated only by the
/// form-owning thread; no other component may allocate or reassign ids.
///

#[derive(Debug, Default)]
pub(crate) struct CorrelationTable {
    next: u64,
    slots: BTreeMap<RequestId, RequestSlot>,
}

impl CorrelationTable {
    /// Hand out a fresh, never-before-used id owned by `owner`.
    pub fn allocate(&mut self, owner: FieldId) -> RequestId {
        let id = RequestId::new(self.next);
        self.next += 1;
        self.slots.insert(
            id,
            RequestSlot {
                owner,
                state: RequestState::Idle,
            },
        );

        id
    }

    pub fn state(&self, id: RequestId) -> Option<RequestState> {
        self.slots.get(&id).map(|slot| slot.state)
    }

    /// Transition `Idle -> Pending`. Returns false for any other state.
    pub fn begin(&mut self, id: RequestId) -> bool {
        match self.slots.get_mut(&id) {
            Some(slot) if slot.state == RequestState::Idle => {
                slot.state = RequestState::Pending;
                true
            }
            _ => false,
        }
    }

    /// Resolve a pending id, returning its owner. Unknown ids and ids
    /// not currently pending yield `None`; the caller drops the result.
    pub fn resolve(&mut self, id: RequestId, applied: bool) -> Option<FieldId> {
        let slot = self.slots.get_mut(&id)?;
        if slot.state != RequestState::Pending {
            return None;
        }

        slot.state = if applied {
            RequestState::Applied
        } else {
            RequestState::Cancelled
        };

        Some(slot.owner)
    }

    /// Forget every id owned by a detached field. Later results for
    /// those ids look up nothing and drop silently; monotonic allocation
    /// means the ids themselves are never handed out again.
    pub fn orphan_owner(&mut self, owner: FieldId) {
        self.slots.retain(|_, slot| slot.owner != owner);
    }

    /// Teardown: every pending id is treated as cancelled.
    pub fn cancel_all_pending(&mut self) -> usize {
        let mut cancelled = 0;
        for slot in self.slots.values_mut() {
            if slot.state == RequestState::Pending {
                slot.state = RequestState::Cancelled;
                cancelled += 1;
            }
        }

        cancelled
    }
}
