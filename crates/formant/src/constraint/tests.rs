use crate::{constraint::ConstraintGraph, field::FieldId};

const F1: FieldId = FieldId::new(1);
const F2: FieldId = FieldId::new(2);
const F3: FieldId = FieldId::new(3);
const F4: FieldId = FieldId::new(4);

#[test]
fn dependents_kept_in_registration_order() {
    let mut graph = ConstraintGraph::new();
    graph.register_dependent(F1, F3);
    graph.register_dependent(F1, F2);

    assert_eq!(graph.dependents_of(F1), &[F3, F2]);
    assert!(graph.dependents_of(F4).is_empty());
}

#[test]
fn duplicate_registration_is_preserved() {
    let mut graph = ConstraintGraph::new();
    graph.register_dependent(F1, F2);
    graph.register_dependent(F1, F2);

    assert_eq!(graph.dependents_of(F1), &[F2, F2]);
    // Propagation still clears the dependent exactly once per pass.
    assert_eq!(graph.propagation_targets(F1), vec![F2]);
}

#[test]
fn propagation_is_transitive() {
    let mut graph = ConstraintGraph::new();
    graph.register_dependent(F1, F2);
    graph.register_dependent(F2, F3);
    graph.register_dependent(F3, F4);

    assert_eq!(graph.propagation_targets(F1), vec![F2, F3, F4]);
    assert_eq!(graph.propagation_targets(F3), vec![F4]);
}

#[test]
fn accidental_cycle_terminates_and_spares_the_provider() {
    let mut graph = ConstraintGraph::new();
    graph.register_dependent(F1, F2);
    graph.register_dependent(F2, F3);
    graph.register_dependent(F3, F1);

    // The pass visits every other node once and never loops back to the
    // field whose change started it.
    assert_eq!(graph.propagation_targets(F1), vec![F2, F3]);
}
