//! Engine event boundary.
//!
//! Form logic never logs directly; every observable transition flows
//! through `EngineEvent` and the sink owned by the `FieldManager`.
//! Silently-handled conditions (stale results, duplicate inserts) are
//! visible here and nowhere else.

use crate::{field::FieldId, manager::RequestId};

///
/// EngineEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineEvent {
    ValueChanged {
        field: FieldId,
    },
    /// A provider change finished clearing its transitive dependents.
    PropagationPass {
        provider: FieldId,
        cleared: usize,
    },
    RequestLaunched {
        field: FieldId,
        request: RequestId,
    },
    RequestResolved {
        request: RequestId,
        applied: bool,
    },
    /// A result arrived for an id with no live owner and was dropped.
    StaleResultDropped {
        request: RequestId,
    },
    ResourceReleased {
        field: FieldId,
    },
    TornDown {
        cancelled: usize,
    },
}

///
/// EventSink
///

pub trait EventSink {
    fn emit(&mut self, event: EngineEvent);
}

///
/// NullSink
///
/// Default sink; drops every event.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: EngineEvent) {}
}
