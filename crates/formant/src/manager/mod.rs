pub(crate) mod correlation;

#[cfg(test)]
mod tests;

pub use correlation::{RequestId, RequestState};

use crate::{
    constraint::ConstraintGraph,
    context::{ContextBundle, ExtraBuilder},
    field::{
        Cardinality, ErrorEntry, FieldId, FormField, RelationField, ScalarField,
        relation::{CommonFieldEntry, ConstraintEntry},
    },
    manager::correlation::CorrelationTable,
    obs::{EngineEvent, EventSink, NullSink},
    predicate::{Predicate, compose},
    value::{EntityRef, Value},
    workflow::{WorkflowKind, WorkflowLauncher, WorkflowOutcome, WorkflowRequest},
};
use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

///
/// RequestError
///
/// Launch-side misuse of the manager. These are the only errors the
/// engine surfaces; routing staleness and duplicate inserts are handled
/// silently by contract.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum RequestError {
    #[error("no field {0} is attached to this form")]
    NoSuchField(FieldId),

    #[error("{0} is not a relation field")]
    NotARelation(FieldId),

    #[error("{0} does not hold a scalar value")]
    NotScalar(FieldId),

    #[error("{0} is read-only")]
    ReadOnly(FieldId),

    #[error("{0} is already pending for this field")]
    AlreadyPending(RequestId),
}

///
/// ResourceId
///
/// Handle to an auxiliary UI resource (a help prompt, a confirmation
/// dialog) opened on behalf of a field. The manager owns the mapping and
/// releases whatever is still open at teardown.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct ResourceId(u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

///
/// FieldSlot
///

pub enum FieldSlot {
    Relation(RelationField),
    Scalar(ScalarField),
}

impl FieldSlot {
    #[must_use]
    pub const fn as_relation(&self) -> Option<&RelationField> {
        match self {
            Self::Relation(field) => Some(field),
            Self::Scalar(_) => None,
        }
    }

    pub(crate) const fn as_relation_mut(&mut self) -> Option<&mut RelationField> {
        match self {
            Self::Relation(field) => Some(field),
            Self::Scalar(_) => None,
        }
    }
}

impl FormField for FieldSlot {
    fn name(&self) -> &str {
        match self {
            Self::Relation(field) => field.name(),
            Self::Scalar(field) => field.name(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Relation(field) => field.is_empty(),
            Self::Scalar(field) => field.is_empty(),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Relation(field) => field.reset(),
            Self::Scalar(field) => field.reset(),
        }
    }

    fn current_value(&self) -> Option<Value> {
        match self {
            Self::Relation(field) => field.current_value(),
            Self::Scalar(field) => field.current_value(),
        }
    }

    fn create_constraint(&self, attribute: &str) -> Option<Predicate> {
        match self {
            Self::Relation(field) => field.create_constraint(attribute),
            Self::Scalar(field) => field.create_constraint(attribute),
        }
    }

    fn is_required(&self) -> bool {
        match self {
            Self::Relation(field) => field.is_required(),
            Self::Scalar(field) => field.is_required(),
        }
    }
}

///
/// ValueChangeListener
///

pub type ValueChangeListener = Box<dyn FnMut(FieldId)>;

///
/// FieldManager
///
/// Per-form registry: owns the field arena, the constraint graph, the
/// correlation-id space and the auxiliary resource table. All mutation
/// happens on the thread that owns the form; the only asynchronous edge
/// is the external workflow, whose outcome re-enters through
/// `on_result`.
///

pub struct FieldManager {
    fields: BTreeMap<FieldId, FieldSlot>,
    next_field: u32,
    graph: ConstraintGraph,
    correlation: CorrelationTable,
    parent: Option<EntityRef>,
    resources: BTreeMap<ResourceId, FieldId>,
    next_resource: u32,
    listeners: BTreeMap<FieldId, ValueChangeListener>,
    sink: Box<dyn EventSink>,
    torn_down: bool,
}

impl Default for FieldManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Box::new(NullSink))
    }

    #[must_use]
    pub fn with_sink(sink: Box<dyn EventSink>) -> Self {
        Self {
            fields: BTreeMap::new(),
            next_field: 0,
            graph: ConstraintGraph::new(),
            correlation: CorrelationTable::default(),
            parent: None,
            resources: BTreeMap::new(),
            next_resource: 0,
            listeners: BTreeMap::new(),
            sink,
            torn_down: false,
        }
    }

    /// Parent reference of the form under edit, seeded into creation
    /// contexts of bidirectional relations whose opposite side has
    /// cardinality one.
    pub fn set_parent(&mut self, parent: Option<EntityRef>) {
        self.parent = parent;
    }

    // ---- attachment ----------------------------------------------------

    /// Attach a relation field; its first correlation id is allocated
    /// here, at attachment time.
    pub fn attach_relation(&mut self, mut field: RelationField) -> FieldId {
        let id = self.next_field_id();
        field.request = Some(self.correlation.allocate(id));
        self.fields.insert(id, FieldSlot::Relation(field));

        id
    }

    pub fn attach_scalar(&mut self, field: ScalarField) -> FieldId {
        let id = self.next_field_id();
        self.fields.insert(id, FieldSlot::Scalar(field));

        id
    }

    fn next_field_id(&mut self) -> FieldId {
        let id = FieldId::new(self.next_field);
        self.next_field += 1;

        id
    }

    /// Detach a field mid-flight. Its correlation ids are orphaned so a
    /// workflow still in progress resolves to a silent drop, and any
    /// auxiliary resources it opened are released.
    pub fn detach_field(&mut self, field: FieldId) {
        self.fields.remove(&field);
        self.listeners.remove(&field);
        self.correlation.orphan_owner(field);

        let released: Vec<ResourceId> = self
            .resources
            .iter()
            .filter(|(_, owner)| **owner == field)
            .map(|(id, _)| *id)
            .collect();
        for id in released {
            self.resources.remove(&id);
            self.sink.emit(EngineEvent::ResourceReleased { field });
        }
    }

    // ---- accessors -----------------------------------------------------

    #[must_use]
    pub fn field(&self, id: FieldId) -> Option<&FieldSlot> {
        self.fields.get(&id)
    }

    #[must_use]
    pub fn relation(&self, id: FieldId) -> Option<&RelationField> {
        self.fields.get(&id).and_then(FieldSlot::as_relation)
    }

    #[must_use]
    pub fn current_request(&self, field: FieldId) -> Option<RequestId> {
        self.relation(field).and_then(|relation| relation.request)
    }

    #[must_use]
    pub fn request_state(&self, request: RequestId) -> Option<RequestState> {
        self.correlation.state(request)
    }

    // ---- form assembly -------------------------------------------------

    /// Register `provider` as a constraint source of `dependent`: the
    /// provider's clause over `attribute` joins the dependent's filter,
    /// and any provider change clears the dependent's value.
    pub fn register_constraint(
        &mut self,
        dependent: FieldId,
        provider: FieldId,
        attribute: impl Into<String>,
    ) -> Result<(), RequestError> {
        if !self.fields.contains_key(&provider) {
            return Err(RequestError::NoSuchField(provider));
        }
        let relation = self.relation_mut(dependent)?;
        relation.constraints.push(ConstraintEntry {
            provider,
            attribute: attribute.into(),
        });
        self.graph.register_dependent(provider, dependent);

        Ok(())
    }

    /// Copy `source`'s current value into creation contexts of `field`
    /// under `attribute`. Later registrations for the same attribute win.
    pub fn register_common_field(
        &mut self,
        field: FieldId,
        source: FieldId,
        attribute: impl Into<String>,
    ) -> Result<(), RequestError> {
        if !self.fields.contains_key(&source) {
            return Err(RequestError::NoSuchField(source));
        }
        let relation = self.relation_mut(field)?;
        relation.common_fields.push(CommonFieldEntry {
            source,
            attribute: attribute.into(),
        });

        Ok(())
    }

    pub fn register_extra_builder(
        &mut self,
        field: FieldId,
        builder: impl ExtraBuilder + 'static,
    ) -> Result<(), RequestError> {
        let relation = self.relation_mut(field)?;
        relation.extra_builders.push(Box::new(builder));

        Ok(())
    }

    pub fn set_on_value_change(&mut self, field: FieldId, listener: impl FnMut(FieldId) + 'static) {
        self.listeners.insert(field, Box::new(listener));
    }

    fn relation_mut(&mut self, id: FieldId) -> Result<&mut RelationField, RequestError> {
        self.fields
            .get_mut(&id)
            .ok_or(RequestError::NoSuchField(id))?
            .as_relation_mut()
            .ok_or(RequestError::NotARelation(id))
    }

    // ---- value mutation ------------------------------------------------

    /// Set a scalar field's value and propagate to its dependents.
    pub fn set_value(
        &mut self,
        field: FieldId,
        value: impl Into<Value>,
    ) -> Result<(), RequestError> {
        match self.fields.get_mut(&field) {
            None => return Err(RequestError::NoSuchField(field)),
            Some(FieldSlot::Relation(_)) => return Err(RequestError::NotScalar(field)),
            Some(FieldSlot::Scalar(scalar)) => scalar.set(value),
        }
        self.notify_value_changed(field);

        Ok(())
    }

    /// Set or append a reference on a relation field. Appending a
    /// reference already present in a collection is a no-op and
    /// propagates nothing.
    pub fn set_reference(
        &mut self,
        field: FieldId,
        reference: EntityRef,
    ) -> Result<(), RequestError> {
        let changed = self.relation_mut(field)?.apply(reference);
        if changed {
            self.notify_value_changed(field);
        }

        Ok(())
    }

    /// Remove a reference by identity from a cardinality-many field.
    /// Removing an absent reference is a no-op.
    pub fn remove_reference(
        &mut self,
        field: FieldId,
        reference: &EntityRef,
    ) -> Result<(), RequestError> {
        let changed = self.relation_mut(field)?.remove(reference);
        if changed {
            self.notify_value_changed(field);
        }

        Ok(())
    }

    /// Clear a field's value and propagate to its dependents.
    pub fn clear_value(&mut self, field: FieldId) -> Result<(), RequestError> {
        self.fields
            .get_mut(&field)
            .ok_or(RequestError::NoSuchField(field))?
            .reset();
        self.notify_value_changed(field);

        Ok(())
    }

    fn notify_value_changed(&mut self, field: FieldId) {
        self.sink.emit(EngineEvent::ValueChanged { field });
        self.fire_listener(field);
        self.propagate_from(field);
    }

    /// Synchronous invalidation pass: every dependent reachable from
    /// `provider` has its value cleared unconditionally before the
    /// mutating call returns, even if the new filter would still admit
    /// the old value.
    fn propagate_from(&mut self, provider: FieldId) {
        let targets = self.graph.propagation_targets(provider);
        let mut cleared = 0;
        for target in targets {
            if let Some(slot) = self.fields.get_mut(&target) {
                slot.reset();
                cleared += 1;
                self.fire_listener(target);
            }
        }
        self.sink.emit(EngineEvent::PropagationPass { provider, cleared });
    }

    fn fire_listener(&mut self, field: FieldId) {
        if let Some(listener) = self.listeners.get_mut(&field) {
            listener(field);
        }
    }

    // ---- workflow launch & result routing ------------------------------

    /// Launch the external pick-existing workflow for `field`.
    pub fn request_selection(
        &mut self,
        field: FieldId,
        launcher: &mut dyn WorkflowLauncher,
    ) -> Result<RequestId, RequestError> {
        self.request_workflow(field, WorkflowKind::Pick, launcher)
    }

    /// Launch the external create-new workflow for `field`, carrying the
    /// creation context assembled from its siblings.
    pub fn request_creation(
        &mut self,
        field: FieldId,
        launcher: &mut dyn WorkflowLauncher,
    ) -> Result<RequestId, RequestError> {
        self.request_workflow(field, WorkflowKind::Create, launcher)
    }

    fn request_workflow(
        &mut self,
        field: FieldId,
        kind: WorkflowKind,
        launcher: &mut dyn WorkflowLauncher,
    ) -> Result<RequestId, RequestError> {
        let current = {
            let relation = self
                .fields
                .get(&field)
                .ok_or(RequestError::NoSuchField(field))?
                .as_relation()
                .ok_or(RequestError::NotARelation(field))?;
            if relation.is_read_only() {
                return Err(RequestError::ReadOnly(field));
            }

            relation.request
        };

        // Refusals are decided before any assembly work: a refused
        // launch must not run extra builders or read sibling fields.
        // Reuse the attached id while it is still idle; allocate a fresh
        // one once it has reached a terminal state.
        let request = match current.map(|id| (id, self.correlation.state(id))) {
            Some((id, Some(RequestState::Pending))) => {
                return Err(RequestError::AlreadyPending(id));
            }
            Some((id, Some(RequestState::Idle))) => id,
            _ => {
                let id = self.correlation.allocate(field);
                if let Some(relation) = self.fields.get_mut(&field).and_then(FieldSlot::as_relation_mut) {
                    relation.request = Some(id);
                }
                id
            }
        };

        let (entity, filter, context) = {
            let Some(relation) = self.fields.get(&field).and_then(FieldSlot::as_relation) else {
                return Err(RequestError::NoSuchField(field));
            };

            (
                relation.entity().to_string(),
                Self::composed_filter(&self.fields, relation),
                Self::build_context(&self.fields, self.parent.as_ref(), relation),
            )
        };

        self.correlation.begin(request);
        self.sink.emit(EngineEvent::RequestLaunched { field, request });
        launcher.launch(WorkflowRequest {
            kind,
            entity,
            filter,
            context,
            request,
        });

        Ok(request)
    }

    /// Route an inbound workflow outcome to the field that owns the id.
    ///
    /// An id with no live owner, an id that was never launched and an id
    /// already resolved are all dropped silently: the race between
    /// asynchronous completion and form teardown is unavoidable and is
    /// not an error.
    pub fn on_result(&mut self, request: RequestId, outcome: WorkflowOutcome) {
        let applied = !matches!(outcome, WorkflowOutcome::Cancelled);
        let Some(owner) = self.correlation.resolve(request, applied) else {
            self.sink.emit(EngineEvent::StaleResultDropped { request });
            return;
        };

        self.sink.emit(EngineEvent::RequestResolved { request, applied });
        if !applied {
            return;
        }

        let Some(reference) = outcome.reference().cloned() else {
            return;
        };
        let changed = self
            .fields
            .get_mut(&owner)
            .and_then(FieldSlot::as_relation_mut)
            .is_some_and(|relation| relation.apply(reference));
        if changed {
            self.notify_value_changed(owner);
        }
    }

    // ---- filter & context assembly -------------------------------------

    /// Compose the outbound filter for a relation field: its own base
    /// filter plus every registered provider's contribution, in
    /// registration order. Providers with nothing to contribute are
    /// skipped. `None` means "no filter, match everything".
    #[must_use]
    pub fn composed_filter_for(&self, field: FieldId) -> Option<Predicate> {
        self.relation(field)
            .and_then(|relation| Self::composed_filter(&self.fields, relation))
    }

    fn composed_filter(
        fields: &BTreeMap<FieldId, FieldSlot>,
        relation: &RelationField,
    ) -> Option<Predicate> {
        let contributions = relation.constraints.iter().filter_map(|entry| {
            fields
                .get(&entry.provider)
                .and_then(|provider| provider.create_constraint(&entry.attribute))
        });

        compose(relation.base_filter().cloned(), contributions)
    }

    /// Assemble the creation context for a relation field: reverse
    /// parent seed, then common-field copies (last write wins; an empty
    /// source clears its attribute), then extra builders, in that order.
    #[must_use]
    pub fn context_for(&self, field: FieldId) -> Option<ContextBundle> {
        self.relation(field)
            .map(|relation| Self::build_context(&self.fields, self.parent.as_ref(), relation))
    }

    fn build_context(
        fields: &BTreeMap<FieldId, FieldSlot>,
        parent: Option<&EntityRef>,
        relation: &RelationField,
    ) -> ContextBundle {
        let mut bundle = ContextBundle::new();

        if let Some(reverse) = relation.reverse()
            && matches!(reverse.opposite_cardinality, Cardinality::One)
            && let Some(parent) = parent
        {
            bundle.set(reverse.opposite_attribute.clone(), parent.clone());
        }

        for entry in &relation.common_fields {
            match fields.get(&entry.source).and_then(FormField::current_value) {
                Some(value) => bundle.set(entry.attribute.clone(), value),
                None => bundle.unset(&entry.attribute),
            }
        }

        for builder in &relation.extra_builders {
            builder.on_create_context(&mut bundle);
        }

        bundle
    }

    // ---- validation ----------------------------------------------------

    /// Collect field-scoped validation errors. A required field is valid
    /// iff it holds a value; evaluated on demand, never cached.
    #[must_use]
    pub fn validate(&self) -> Vec<ErrorEntry> {
        self.fields
            .iter()
            .filter(|(_, slot)| slot.is_required() && slot.is_empty())
            .map(|(id, slot)| ErrorEntry::required(*id, slot.name()))
            .collect()
    }

    // ---- auxiliary resources & teardown --------------------------------

    /// Record an auxiliary UI resource opened on behalf of `field`.
    pub fn open_resource(&mut self, field: FieldId) -> Result<ResourceId, RequestError> {
        if !self.fields.contains_key(&field) {
            return Err(RequestError::NoSuchField(field));
        }
        let id = ResourceId(self.next_resource);
        self.next_resource += 1;
        self.resources.insert(id, field);

        Ok(id)
    }

    /// Release a resource ahead of teardown (e.g. the prompt was
    /// dismissed). Unknown handles are ignored.
    pub fn release_resource(&mut self, resource: ResourceId) {
        if let Some(field) = self.resources.remove(&resource) {
            self.sink.emit(EngineEvent::ResourceReleased { field });
        }
    }

    /// Form teardown: every pending correlation id resolves to
    /// cancelled and every open resource is released, so no field is
    /// left expecting a result that never comes. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        while let Some((_, field)) = self.resources.pop_first() {
            self.sink.emit(EngineEvent::ResourceReleased { field });
        }

        let cancelled = self.correlation.cancel_all_pending();
        self.sink.emit(EngineEvent::TornDown { cancelled });
    }
}
