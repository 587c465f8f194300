use crate::{
    predicate::{Predicate, compose, eval},
    value::Value,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn row(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[test]
fn compose_nothing_is_no_filter() {
    assert_eq!(compose(None, []), None);
}

#[test]
fn compose_base_alone_passes_through_unwrapped() {
    let base = Predicate::eq("region", 3i64);
    assert_eq!(compose(Some(base.clone()), []), Some(base));
}

#[test]
fn compose_single_contribution_seeds_expression() {
    let clause = Predicate::eq("region", 3i64);
    assert_eq!(compose(None, [clause.clone()]), Some(clause));
}

#[test]
fn compose_conjoins_in_contribution_order() {
    let base = Predicate::eq("kind", "city");
    let a = Predicate::eq("region", 3i64);
    let b = Predicate::gt("population", 1000i64);

    let composed = compose(Some(base.clone()), [a.clone(), b.clone()]);
    assert_eq!(composed, Some(Predicate::And(vec![base, a, b])));
}

#[test]
fn compose_contributions_do_not_overwrite_each_other() {
    // Two sources constraining the same attribute both survive.
    let a = Predicate::eq("region", 1i64);
    let b = Predicate::eq("region", 2i64);

    let composed = compose(None, [a, b]).expect("composed");
    let satisfiable = row(&[("region", Value::Int(1))]);
    assert!(!eval(&composed, &satisfiable));
}

#[test]
fn eval_missing_attribute_fails_soft() {
    let pred = Predicate::eq("no_such_column", 1i64);
    assert!(!eval(&pred, &row(&[("region", Value::Int(1))])));
    assert!(eval(&Predicate::is_null("no_such_column"), &row(&[])));
}

#[test]
fn eval_boolean_connectives() {
    let r = row(&[("region", Value::Int(3)), ("name", Value::from("north"))]);

    let both = Predicate::eq("region", 3i64) & Predicate::eq("name", "north");
    let either = Predicate::eq("region", 9i64) | Predicate::eq("name", "north");

    assert!(eval(&both, &r));
    assert!(eval(&either, &r));
    assert!(!eval(&Predicate::not(both), &r));
    assert!(eval(&Predicate::True, &r));
}

#[test]
fn eval_in_and_range_operators() {
    let r = row(&[("region", Value::Int(3))]);

    assert!(eval(
        &Predicate::in_("region", vec![Value::Int(1), Value::Int(3)]),
        &r
    ));
    assert!(eval(&Predicate::gte("region", 3i64), &r));
    assert!(eval(&Predicate::lt("region", 4i64), &r));
    assert!(!eval(&Predicate::lt("region", 3i64), &r));
}

// ---- order-insensitivity ------------------------------------------------

const FIELDS: [&str; 3] = ["a", "b", "c"];

fn arb_clause() -> impl Strategy<Value = Predicate> {
    (0usize..FIELDS.len(), -3i64..3, 0u8..3).prop_map(|(f, v, op)| match op {
        0 => Predicate::eq(FIELDS[f], v),
        1 => Predicate::lt(FIELDS[f], v),
        _ => Predicate::gt(FIELDS[f], v),
    })
}

proptest! {
    /// Conjunction order changes the serialized tree, never the set of
    /// satisfying rows.
    #[test]
    fn compose_order_insensitive_filtering(
        clauses in proptest::collection::vec(arb_clause(), 0..5),
        a in -3i64..3,
        b in -3i64..3,
        c in -3i64..3,
    ) {
        let r = row(&[("a", Value::Int(a)), ("b", Value::Int(b)), ("c", Value::Int(c))]);

        let forward = compose(None, clauses.clone());
        let reverse = compose(None, clauses.into_iter().rev());

        let hit_fwd = forward.as_ref().is_none_or(|p| eval(p, &r));
        let hit_rev = reverse.as_ref().is_none_or(|p| eval(p, &r));
        prop_assert_eq!(hit_fwd, hit_rev);
    }
}
