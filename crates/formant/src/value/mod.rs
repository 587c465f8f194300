
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use ulid::Ulid;

///
/// EntityRef
///
/// Identity of a related entity: the entity kind it belongs to plus its
/// ulid. Two references are the same entity iff both parts are equal.
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity: String,

    #[serde(with = "ulid_wire")]
    pub id: Ulid,
}

impl EntityRef {
    #[must_use]
    pub fn new(entity: impl Into<String>, id: Ulid) -> Self {
        Self {
            entity: entity.into(),
            id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.id)
    }
}

// Ulid carries no serde impls with default features off, so references
// cross the workflow boundary as their u128 representation.
mod ulid_wire {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use ulid::Ulid;

    pub fn serialize<S: Serializer>(id: &Ulid, serializer: S) -> Result<S::Ok, S::Error> {
        u128::from(*id).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ulid, D::Error> {
        u128::deserialize(deserializer).map(Ulid::from)
    }
}

///
/// Value
///
/// Compact value representation exchanged between fields, predicates and
/// context bundles. Fields expose their current state as a `Value`; the
/// predicate layer compares them without knowing which field produced
/// them.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
    Ref(EntityRef),
    List(Vec<Value>),
}

impl Value {
    #[must_use]
    pub fn entity_ref(entity: impl Into<String>, id: Ulid) -> Self {
        Self::Ref(EntityRef::new(entity, id))
    }

    /// Ordering comparison for range operators. Mismatched variants do
    /// not compare; the caller treats `None` as "predicate not satisfied".
    #[must_use]
    pub fn partial_cmp_value(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Uint(a), Self::Uint(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Ref(a), Self::Ref(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Membership test used by the `In` operator.
    #[must_use]
    pub fn contains(&self, needle: &Self) -> bool {
        match self {
            Self::List(items) => items.contains(needle),
            Self::Text(haystack) => match needle {
                Self::Text(sub) => haystack.contains(sub.as_str()),
                _ => false,
            },
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<EntityRef> for Value {
    fn from(v: EntityRef) -> Self {
        Self::Ref(v)
    }
}
