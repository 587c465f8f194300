
use crate::value::Value;
use derive_more::{Deref, DerefMut, IntoIterator};
use serde::Serialize;
use std::collections::BTreeMap;

///
/// ContextBundle
///
/// Attribute-name to value mapping handed to the external creation
/// workflow so a newly created entity starts pre-populated. Built fresh
/// for every launch and never retained; the engine passes it through
/// verbatim without inspecting its contents.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Eq, IntoIterator, PartialEq, Serialize)]
pub struct ContextBundle(BTreeMap<String, Value>);

impl ContextBundle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an entry, replacing any earlier one for the same attribute.
    /// Later contributions win.
    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(attribute.into(), value.into());
    }

    /// Drop an entry. A source field with no current value clears the
    /// attribute rather than leaving an earlier contribution behind.
    pub fn unset(&mut self, attribute: &str) {
        self.0.remove(attribute);
    }
}

///
/// ExtraBuilder
///
/// Auxiliary hook invoked after reverse-relation seeding and
/// common-field copies, free to add or overwrite arbitrary entries.
/// Builders run in registration order.
///

pub trait ExtraBuilder {
    fn on_create_context(&self, bundle: &mut ContextBundle);
}

impl<F: Fn(&mut ContextBundle)> ExtraBuilder for F {
    fn on_create_context(&self, bundle: &mut ContextBundle) {
        self(bundle);
    }
}
