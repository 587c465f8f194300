//! Field-dependency and constraint-composition engine for
//! entity-relationship forms: dependency propagation between fields,
//! AND-composition of filter clauses from independent constraint
//! sources, and correlation of asynchronous selection/creation
//! workflows back to the field that launched them.
#![warn(unreachable_pub)]

pub mod constraint;
pub mod context;
pub mod field;
pub mod manager;
pub mod obs;
pub mod predicate;
pub mod value;
pub mod workflow;

///
/// Prelude
///
/// Prelude contains only domain vocabulary; sinks and error types are
/// imported from their modules.
///

pub mod prelude {
    pub use crate::{
        context::ContextBundle,
        field::{Cardinality, FieldId, FormField, RelationField, RelationValue, ScalarField},
        manager::{FieldManager, RequestId},
        predicate::{Predicate, compose},
        value::{EntityRef, Value},
        workflow::{WorkflowKind, WorkflowOutcome, WorkflowRequest},
    };
}
