use crate::{
    predicate::{CompareOp, ComparePredicate, Predicate},
    value::Value,
};
use std::cmp::Ordering;

///
/// Row
///
/// Field-read capability over a row-like value. Decouples predicate
/// evaluation from whatever the storage engine actually stores; the
/// engine only needs to expose attributes by name.
///

pub trait Row {
    fn field(&self, name: &str) -> Option<Value>;
}

impl Row for std::collections::BTreeMap<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Evaluate a predicate against a row.
///
/// An attribute the row does not expose satisfies no comparison (and
/// satisfies `IsNull`). A misconfigured constraint source therefore
/// degrades to an empty result set instead of failing the form.
pub fn eval<R: Row + ?Sized>(predicate: &Predicate, row: &R) -> bool {
    match predicate {
        Predicate::True => true,
        Predicate::And(preds) => preds.iter().all(|p| eval(p, row)),
        Predicate::Or(preds) => preds.iter().any(|p| eval(p, row)),
        Predicate::Not(pred) => !eval(pred, row),
        Predicate::Compare(cmp) => eval_compare(cmp, row),
        Predicate::IsNull { field } => row.field(field).is_none(),
    }
}

fn eval_compare<R: Row + ?Sized>(cmp: &ComparePredicate, row: &R) -> bool {
    let Some(actual) = row.field(&cmp.field) else {
        return false;
    };

    match cmp.op {
        CompareOp::Eq => actual == cmp.value,
        CompareOp::Ne => actual != cmp.value,
        CompareOp::Lt => matches!(actual.partial_cmp_value(&cmp.value), Some(Ordering::Less)),
        CompareOp::Lte => matches!(
            actual.partial_cmp_value(&cmp.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Gt => matches!(actual.partial_cmp_value(&cmp.value), Some(Ordering::Greater)),
        CompareOp::Gte => matches!(
            actual.partial_cmp_value(&cmp.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::In => cmp.value.contains(&actual),
        CompareOp::Contains => actual.contains(&cmp.value),
    }
}
