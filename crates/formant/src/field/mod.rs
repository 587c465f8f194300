pub(crate) mod relation;


pub use relation::{RelationField, RelationValue, ReverseRelation};

use crate::{predicate::Predicate, value::Value};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// FieldId
///
/// Identity of a field within one form instance. Allocated by the
/// `FieldManager` at attach time; never reused within the form.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct FieldId(u32);

impl FieldId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}", self.0)
    }
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Cardinality {
    One,
    Many,
}

///
/// FormField
///
/// Capability surface the engine needs from any field. Context
/// propagation reads `current_value`, constraint composition calls
/// `create_constraint`; neither ever inspects the concrete field type.
///

pub trait FormField {
    fn name(&self) -> &str;

    /// Whether the field currently holds no value.
    fn is_empty(&self) -> bool;

    /// Clear the field's value. Invoked when a constraint-providing
    /// ancestor changes, because the filter that produced the current
    /// value may no longer hold.
    fn reset(&mut self);

    /// The field's current value in the shape it declares, if any.
    fn current_value(&self) -> Option<Value>;

    /// Contribute a filter clause over `attribute` derived from this
    /// field's current value. Fields with nothing to contribute return
    /// `None` and are skipped during composition.
    fn create_constraint(&self, attribute: &str) -> Option<Predicate> {
        let _ = attribute;
        None
    }

    fn is_required(&self) -> bool {
        false
    }
}

///
/// ScalarField
///
/// Plain single-value field: enough of a field to act as a constraint
/// provider and a common-value source without any relation semantics.
///

#[derive(Debug)]
pub struct ScalarField {
    name: String,
    required: bool,
    value: Option<Value>,
}

impl ScalarField {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            value: None,
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn set(&mut self, value: impl Into<Value>) {
        self.value = Some(value.into());
    }

    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

impl FormField for ScalarField {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    fn reset(&mut self) {
        self.value = None;
    }

    fn current_value(&self) -> Option<Value> {
        self.value.clone()
    }

    fn create_constraint(&self, attribute: &str) -> Option<Predicate> {
        self.value
            .clone()
            .map(|value| Predicate::eq(attribute, value))
    }

    fn is_required(&self) -> bool {
        self.required
    }
}

///
/// ErrorEntry
///
/// Field-scoped validation failure collected by `FieldManager::validate`.
/// Validation never raises; the form renders these next to the fields.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ErrorEntry {
    pub field: FieldId,
    pub title: String,
    pub messages: Vec<String>,
}

impl ErrorEntry {
    pub(crate) fn required(field: FieldId, title: impl Into<String>) -> Self {
        Self {
            field,
            title: title.into(),
            messages: vec!["a value is required".to_string()],
        }
    }
}
