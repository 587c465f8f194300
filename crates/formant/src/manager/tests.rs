use crate::{
    field::{Cardinality, FormField, RelationField, ScalarField},
    manager::{FieldManager, RequestError, RequestState},
    obs::{EngineEvent, EventSink},
    value::EntityRef,
    workflow::{WorkflowOutcome, WorkflowRequest},
};
use std::{cell::RefCell, collections::BTreeSet, rc::Rc};
use ulid::Ulid;

fn r(n: u128) -> EntityRef {
    EntityRef::new("district", Ulid::from(n))
}

#[derive(Clone, Default)]
struct SharedSink(Rc<RefCell<Vec<EngineEvent>>>);

impl SharedSink {
    fn events(&self) -> Vec<EngineEvent> {
        self.0.borrow().clone()
    }
}

impl EventSink for SharedSink {
    fn emit(&mut self, event: EngineEvent) {
        self.0.borrow_mut().push(event);
    }
}

#[derive(Clone, Default)]
struct Launchpad(Rc<RefCell<Vec<WorkflowRequest>>>);

impl Launchpad {
    fn launcher(&self) -> impl FnMut(WorkflowRequest) + use<> {
        let log = Rc::clone(&self.0);
        move |request| log.borrow_mut().push(request)
    }
}

#[test]
fn correlation_ids_are_distinct_across_many_cycles() {
    let mut manager = FieldManager::new();
    let field = manager.attach_relation(RelationField::new("d", "district", Cardinality::One));

    let pad = Launchpad::default();
    let mut launcher = pad.launcher();
    let mut seen = BTreeSet::new();

    for n in 0..100u128 {
        let id = manager.request_selection(field, &mut launcher).expect("launch");
        assert!(seen.insert(id), "id {id} reused");
        manager.on_result(id, WorkflowOutcome::Selected(r(n)));
        assert_eq!(manager.request_state(id), Some(RequestState::Applied));
    }
}

#[test]
fn launch_reuses_the_attached_id_while_idle() {
    let mut manager = FieldManager::new();
    let field = manager.attach_relation(RelationField::new("d", "district", Cardinality::One));
    let attached = manager.current_request(field).expect("allocated at attach");
    assert_eq!(manager.request_state(attached), Some(RequestState::Idle));

    let pad = Launchpad::default();
    let launched = manager
        .request_selection(field, &mut pad.launcher())
        .expect("launch");
    assert_eq!(launched, attached);
    assert_eq!(manager.request_state(attached), Some(RequestState::Pending));
}

#[test]
fn second_launch_while_pending_is_refused() {
    let mut manager = FieldManager::new();
    let field = manager.attach_relation(RelationField::new("d", "district", Cardinality::One));

    let pad = Launchpad::default();
    let mut launcher = pad.launcher();
    let id = manager.request_selection(field, &mut launcher).expect("launch");

    assert_eq!(
        manager.request_selection(field, &mut launcher),
        Err(RequestError::AlreadyPending(id))
    );
}

#[test]
fn cancellation_applies_no_change() {
    let mut manager = FieldManager::new();
    let field = manager.attach_relation(RelationField::new("d", "district", Cardinality::One));

    let pad = Launchpad::default();
    let id = manager
        .request_selection(field, &mut pad.launcher())
        .expect("launch");
    manager.on_result(id, WorkflowOutcome::Cancelled);

    assert_eq!(manager.request_state(id), Some(RequestState::Cancelled));
    assert!(manager.relation(field).expect("field").is_empty());
}

#[test]
fn result_for_detached_owner_is_dropped_silently() {
    let sink = SharedSink::default();
    let mut manager = FieldManager::with_sink(Box::new(sink.clone()));
    let field = manager.attach_relation(RelationField::new("d", "district", Cardinality::One));

    let pad = Launchpad::default();
    let id = manager
        .request_selection(field, &mut pad.launcher())
        .expect("launch");
    manager.detach_field(field);

    manager.on_result(id, WorkflowOutcome::Selected(r(1)));

    assert!(manager.relation(field).is_none());
    assert!(
        sink.events()
            .contains(&EngineEvent::StaleResultDropped { request: id })
    );
}

#[test]
fn result_for_never_launched_id_is_dropped_silently() {
    let sink = SharedSink::default();
    let mut manager = FieldManager::with_sink(Box::new(sink.clone()));
    let field = manager.attach_relation(RelationField::new("d", "district", Cardinality::One));
    let idle = manager.current_request(field).expect("attached id");

    manager.on_result(idle, WorkflowOutcome::Selected(r(1)));

    assert!(manager.relation(field).expect("field").is_empty());
    assert_eq!(manager.request_state(idle), Some(RequestState::Idle));
    assert!(
        sink.events()
            .contains(&EngineEvent::StaleResultDropped { request: idle })
    );
}

#[test]
fn provider_change_clears_transitive_dependents() {
    let mut manager = FieldManager::new();
    let region = manager.attach_relation(RelationField::new("region", "region", Cardinality::One));
    let district =
        manager.attach_relation(RelationField::new("district", "district", Cardinality::One));
    let site = manager.attach_relation(RelationField::new("site", "site", Cardinality::One));

    manager
        .register_constraint(district, region, "region_id")
        .expect("register");
    manager
        .register_constraint(site, district, "district_id")
        .expect("register");

    manager.set_reference(district, r(10)).expect("set");
    manager.set_reference(site, r(20)).expect("set");

    manager
        .set_reference(region, EntityRef::new("region", Ulid::from(1u128)))
        .expect("set");

    assert!(manager.relation(district).expect("district").is_empty());
    assert!(manager.relation(site).expect("site").is_empty());
}

#[test]
fn dependency_cycle_terminates() {
    let mut manager = FieldManager::new();
    let a = manager.attach_relation(RelationField::new("a", "x", Cardinality::One));
    let b = manager.attach_relation(RelationField::new("b", "x", Cardinality::One));

    manager.register_constraint(b, a, "a_id").expect("register");
    manager.register_constraint(a, b, "b_id").expect("register");

    manager.set_reference(a, r(1)).expect("set");

    // b cleared, a keeps the value that triggered the pass.
    assert!(manager.relation(b).expect("b").is_empty());
    assert!(!manager.relation(a).expect("a").is_empty());
}

#[test]
fn listeners_fire_for_the_mutated_field_and_cleared_dependents() {
    let mut manager = FieldManager::new();
    let region = manager.attach_relation(RelationField::new("region", "region", Cardinality::One));
    let district =
        manager.attach_relation(RelationField::new("district", "district", Cardinality::One));
    manager
        .register_constraint(district, region, "region_id")
        .expect("register");

    let log = Rc::new(RefCell::new(Vec::new()));
    for field in [region, district] {
        let log = Rc::clone(&log);
        manager.set_on_value_change(field, move |id| log.borrow_mut().push(id));
    }

    manager.set_reference(region, r(1)).expect("set");

    assert_eq!(*log.borrow(), vec![region, district]);
}

#[test]
fn registration_validates_both_endpoints() {
    let mut manager = FieldManager::new();
    let scalar = manager.attach_scalar(ScalarField::new("status"));
    let relation = manager.attach_relation(RelationField::new("d", "district", Cardinality::One));
    let ghost = crate::field::FieldId::new(99);

    assert_eq!(
        manager.register_constraint(scalar, relation, "x"),
        Err(RequestError::NotARelation(scalar))
    );
    assert_eq!(
        manager.register_constraint(relation, ghost, "x"),
        Err(RequestError::NoSuchField(ghost))
    );
    assert_eq!(
        manager.set_value(relation, 1i64),
        Err(RequestError::NotScalar(relation))
    );
}

#[test]
fn validate_reports_required_empty_fields_only() {
    let mut manager = FieldManager::new();
    let required =
        manager.attach_relation(RelationField::new("district", "district", Cardinality::One).required());
    let _optional = manager.attach_relation(RelationField::new("site", "site", Cardinality::One));

    let errors = manager.validate();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, required);
    assert_eq!(errors[0].title, "district");

    manager.set_reference(required, r(1)).expect("set");
    assert!(manager.validate().is_empty());
}

#[test]
fn teardown_cancels_pending_and_releases_resources() {
    let sink = SharedSink::default();
    let mut manager = FieldManager::with_sink(Box::new(sink.clone()));
    let field = manager.attach_relation(RelationField::new("d", "district", Cardinality::One));

    let pad = Launchpad::default();
    let id = manager
        .request_selection(field, &mut pad.launcher())
        .expect("launch");
    let resource = manager.open_resource(field).expect("open");

    manager.teardown();
    manager.teardown(); // idempotent

    assert_eq!(manager.request_state(id), Some(RequestState::Cancelled));
    let events = sink.events();
    assert!(events.contains(&EngineEvent::ResourceReleased { field }));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, EngineEvent::TornDown { .. }))
            .count(),
        1
    );

    // Releasing the already-released handle is a no-op.
    manager.release_resource(resource);
    assert_eq!(sink.events().len(), events.len());
}

#[test]
fn refused_launch_runs_no_extra_builders() {
    let mut manager = FieldManager::new();
    let field = manager.attach_relation(RelationField::new("d", "district", Cardinality::One));

    let runs = Rc::new(RefCell::new(0usize));
    {
        let runs = Rc::clone(&runs);
        manager
            .register_extra_builder(field, move |_: &mut crate::context::ContextBundle| {
                *runs.borrow_mut() += 1;
            })
            .expect("register");
    }

    let pad = Launchpad::default();
    let mut launcher = pad.launcher();
    let id = manager.request_selection(field, &mut launcher).expect("launch");
    assert_eq!(*runs.borrow(), 1);

    assert_eq!(
        manager.request_creation(field, &mut launcher),
        Err(RequestError::AlreadyPending(id))
    );
    assert_eq!(*runs.borrow(), 1);
}

#[test]
fn detach_releases_the_fields_open_resources() {
    let sink = SharedSink::default();
    let mut manager = FieldManager::with_sink(Box::new(sink.clone()));
    let field = manager.attach_relation(RelationField::new("d", "district", Cardinality::One));
    let kept = manager.attach_relation(RelationField::new("k", "site", Cardinality::One));

    let resource = manager.open_resource(field).expect("open");
    let kept_resource = manager.open_resource(kept).expect("open");

    manager.detach_field(field);

    let events = sink.events();
    assert!(events.contains(&EngineEvent::ResourceReleased { field }));
    assert!(!events.contains(&EngineEvent::ResourceReleased { field: kept }));

    // The handle is gone; releasing it again emits nothing new.
    manager.release_resource(resource);
    assert_eq!(sink.events().len(), events.len());

    // The surviving field's resource is still live.
    manager.release_resource(kept_resource);
    assert!(
        sink.events()
            .contains(&EngineEvent::ResourceReleased { field: kept })
    );
}

#[test]
fn duplicate_append_does_not_propagate() {
    let sink = SharedSink::default();
    let mut manager = FieldManager::with_sink(Box::new(sink.clone()));
    let many = manager.attach_relation(RelationField::new("sites", "site", Cardinality::Many));

    manager.set_reference(many, r(1)).expect("set");
    let passes_before = sink
        .events()
        .iter()
        .filter(|e| matches!(e, EngineEvent::PropagationPass { .. }))
        .count();

    manager.set_reference(many, r(1)).expect("set");
    let passes_after = sink
        .events()
        .iter()
        .filter(|e| matches!(e, EngineEvent::PropagationPass { .. }))
        .count();

    assert_eq!(passes_before, passes_after);
}
