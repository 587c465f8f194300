use crate::{
    context::ExtraBuilder,
    field::{Cardinality, FieldId, FormField},
    manager::RequestId,
    predicate::Predicate,
    value::{EntityRef, Value},
};

///
/// ReverseRelation
///
/// Metadata for the opposite side of a bidirectional relation. When the
/// opposite cardinality is exactly one, creation workflows are seeded
/// with the form's parent reference under `opposite_attribute`.
///

#[derive(Clone, Debug)]
pub struct ReverseRelation {
    pub opposite_attribute: String,
    pub opposite_cardinality: Cardinality,
}

///
/// ConstraintEntry
///
/// A provider field paired with the attribute of the target entity its
/// clause filters on.
///

#[derive(Clone, Debug)]
pub(crate) struct ConstraintEntry {
    pub(crate) provider: FieldId,
    pub(crate) attribute: String,
}

///
/// CommonFieldEntry
///
/// A sibling field whose current value is copied into the creation
/// context under `attribute`.
///

#[derive(Clone, Debug)]
pub(crate) struct CommonFieldEntry {
    pub(crate) source: FieldId,
    pub(crate) attribute: String,
}

///
/// RelationValue
///
/// A relation field's state: one optional reference, or an ordered
/// collection unique by entity identity.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelationValue {
    One(Option<EntityRef>),
    Many(Vec<EntityRef>),
}

impl RelationValue {
    #[must_use]
    pub const fn empty(cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::One => Self::One(None),
            Cardinality::Many => Self::Many(Vec::new()),
        }
    }

    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        match self {
            Self::One(_) => Cardinality::One,
            Self::Many(_) => Cardinality::Many,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(value) => value.is_none(),
            Self::Many(values) => values.is_empty(),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Self::One(value) => *value = None,
            Self::Many(values) => values.clear(),
        }
    }

    /// Apply an inbound reference. Returns whether the value changed:
    /// re-adding a reference already present in a collection is a no-op.
    pub fn apply(&mut self, reference: EntityRef) -> bool {
        match self {
            Self::One(value) => {
                let changed = value.as_ref() != Some(&reference);
                *value = Some(reference);
                changed
            }
            Self::Many(values) => {
                if values.contains(&reference) {
                    false
                } else {
                    values.push(reference);
                    true
                }
            }
        }
    }

    /// Remove a reference by identity. Absent references are a no-op.
    pub fn remove(&mut self, reference: &EntityRef) -> bool {
        match self {
            Self::One(value) => {
                if value.as_ref() == Some(reference) {
                    *value = None;
                    true
                } else {
                    false
                }
            }
            Self::Many(values) => {
                let before = values.len();
                values.retain(|v| v != reference);
                values.len() != before
            }
        }
    }

    #[must_use]
    pub fn references(&self) -> Vec<EntityRef> {
        match self {
            Self::One(value) => value.clone().into_iter().collect(),
            Self::Many(values) => values.clone(),
        }
    }
}

///
/// RelationField
///
/// A field holding a reference (or collection of references) to another
/// entity, selected or created through an external workflow. Its
/// outbound filter is composed from its own base filter plus every
/// registered constraint provider; its creation context is gathered
/// from sibling fields and auxiliary builders.
///

pub struct RelationField {
    name: String,
    entity: String,
    required: bool,
    read_only: bool,
    base_filter: Option<Predicate>,
    reverse: Option<ReverseRelation>,
    value: RelationValue,

    pub(crate) constraints: Vec<ConstraintEntry>,
    pub(crate) common_fields: Vec<CommonFieldEntry>,
    pub(crate) extra_builders: Vec<Box<dyn ExtraBuilder>>,

    /// Correlation id owned by this field, allocated at attach time and
    /// replaced once it reaches a terminal state.
    pub(crate) request: Option<RequestId>,
}

impl RelationField {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        entity: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            required: false,
            read_only: false,
            base_filter: None,
            reverse: None,
            value: RelationValue::empty(cardinality),
            constraints: Vec::new(),
            common_fields: Vec::new(),
            extra_builders: Vec::new(),
            request: None,
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Static filter applied to every selection, ahead of any
    /// constraint-source contributions.
    #[must_use]
    pub fn with_base_filter(mut self, filter: Predicate) -> Self {
        self.base_filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_reverse(
        mut self,
        opposite_attribute: impl Into<String>,
        opposite_cardinality: Cardinality,
    ) -> Self {
        self.reverse = Some(ReverseRelation {
            opposite_attribute: opposite_attribute.into(),
            opposite_cardinality,
        });
        self
    }

    pub const fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.value.cardinality()
    }

    #[must_use]
    pub const fn value(&self) -> &RelationValue {
        &self.value
    }

    #[must_use]
    pub const fn base_filter(&self) -> Option<&Predicate> {
        self.base_filter.as_ref()
    }

    #[must_use]
    pub const fn reverse(&self) -> Option<&ReverseRelation> {
        self.reverse.as_ref()
    }

    pub(crate) fn apply(&mut self, reference: EntityRef) -> bool {
        self.value.apply(reference)
    }

    pub(crate) fn remove(&mut self, reference: &EntityRef) -> bool {
        self.value.remove(reference)
    }
}

impl FormField for RelationField {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    fn reset(&mut self) {
        self.value.clear();
    }

    fn current_value(&self) -> Option<Value> {
        match &self.value {
            RelationValue::One(value) => value.clone().map(Value::Ref),
            RelationValue::Many(values) if values.is_empty() => None,
            RelationValue::Many(values) => {
                Some(Value::List(values.iter().cloned().map(Value::Ref).collect()))
            }
        }
    }

    fn create_constraint(&self, attribute: &str) -> Option<Predicate> {
        match &self.value {
            RelationValue::One(value) => value
                .clone()
                .map(|reference| Predicate::eq(attribute, reference)),
            RelationValue::Many(values) if values.is_empty() => None,
            RelationValue::Many(values) => Some(Predicate::in_(
                attribute,
                values.iter().cloned().map(Value::Ref).collect(),
            )),
        }
    }

    fn is_required(&self) -> bool {
        self.required
    }
}
