use crate::{context::ContextBundle, manager::RequestId, predicate::Predicate, value::EntityRef};
use serde::{Deserialize, Serialize};

///
/// WorkflowKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum WorkflowKind {
    /// Pick an existing entity matching the filter.
    Pick,
    /// Create a new entity pre-populated from the context bundle.
    Create,
}

///
/// WorkflowRequest
///
/// Everything the host needs to run a selection or creation workflow:
/// the target entity kind, the composed filter, the creation context and
/// the correlation id under which the outcome must come back.
///

#[derive(Clone, Debug, Serialize)]
pub struct WorkflowRequest {
    pub kind: WorkflowKind,
    pub entity: String,
    pub filter: Option<Predicate>,
    pub context: ContextBundle,
    pub request: RequestId,
}

///
/// WorkflowOutcome
///
/// The workflow boundary is a process boundary; the host ships the
/// outcome back across it in wire form.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum WorkflowOutcome {
    Selected(EntityRef),
    Created(EntityRef),
    Cancelled,
}

impl WorkflowOutcome {
    #[must_use]
    pub const fn reference(&self) -> Option<&EntityRef> {
        match self {
            Self::Selected(reference) | Self::Created(reference) => Some(reference),
            Self::Cancelled => None,
        }
    }
}

///
/// WorkflowLauncher
///
/// Non-blocking hand-off to the host. The launcher must not call back
/// into the manager synchronously; the outcome arrives later through
/// `FieldManager::on_result`, possibly after arbitrary delay or never.
///

pub trait WorkflowLauncher {
    fn launch(&mut self, request: WorkflowRequest);
}

impl<F: FnMut(WorkflowRequest)> WorkflowLauncher for F {
    fn launch(&mut self, request: WorkflowRequest) {
        self(request);
    }
}
