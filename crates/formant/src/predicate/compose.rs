use crate::predicate::Predicate;

/// Conjoin an optional base filter with the clauses contributed by
/// registered constraint sources, in contribution order.
///
/// The first clause seeds the expression and every later clause is
/// AND-ed on; no contribution can overwrite another. With no base and
/// no contributions the result is `None`, which callers must read as
/// "no filter, match everything" rather than "match nothing".
#[must_use]
pub fn compose(
    base: Option<Predicate>,
    contributions: impl IntoIterator<Item = Predicate>,
) -> Option<Predicate> {
    let mut clauses: Vec<Predicate> = base.into_iter().collect();
    clauses.extend(contributions);

    match clauses.len() {
        0 => None,
        // Identity law: a lone clause passes through unwrapped.
        1 => clauses.pop(),
        _ => Some(Predicate::And(clauses)),
    }
}
