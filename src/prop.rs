//! Props: comparable descriptions of a single value.
//!
//! A prop denotes a set of values: one value, an enumeration, the complement
//! of an enumeration, everything, or nothing. Props are independent of path
//! structure and are used for keyed-object matching as well as for path
//! segments.

use std::collections::HashSet;
use std::hash::Hash;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::compare::{
    compare_sets, compare_value_to_set, intersect_sets, remap, subset_sets, CompareResult,
    NOT_OR_TO_NOT_OR, NOT_OR_TO_OR, OR_TO_NOT_OR,
};
use crate::error::ConfigError;

/// Raw marker for a negated enumeration: `["!", [..]]`.
pub const NOT: &str = "!";
/// Key that supplies the prop (or rule) for keys missing on one side.
pub const WILD_KEY: &str = "*";
/// Raw JSON encoding of [`Prop::MatchAny`].
pub const MATCH_ANY: i64 = 1;
/// Raw JSON encoding of [`Prop::MatchNone`].
pub const MATCH_NONE: i64 = -1;

/// A parsed prop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prop<T: Eq + Hash> {
    /// Exactly one value.
    Value(T),
    /// Any of the enumerated values (at least two).
    Or(HashSet<T>),
    /// Anything except the enumerated values (at least one).
    NotOr(HashSet<T>),
    /// The universal set.
    MatchAny,
    /// The empty set.
    MatchNone,
}

impl<T: Eq + Hash> Prop<T> {
    /// A single-value prop.
    #[must_use]
    pub const fn value(value: T) -> Self {
        Self::Value(value)
    }

    /// An enumeration. Empty collapses to `MatchNone`, a singleton to `Value`.
    #[must_use]
    pub fn or(values: impl IntoIterator<Item = T>) -> Self {
        let mut set: HashSet<T> = values.into_iter().collect();
        match set.len() {
            0 => Self::MatchNone,
            1 => set.drain().next().map_or(Self::MatchNone, Self::Value),
            _ => Self::Or(set),
        }
    }

    /// A negated enumeration. Empty collapses to `MatchAny`.
    #[must_use]
    pub fn not_or(values: impl IntoIterator<Item = T>) -> Self {
        let set: HashSet<T> = values.into_iter().collect();
        if set.is_empty() {
            Self::MatchAny
        } else {
            Self::NotOr(set)
        }
    }

    /// Returns true if `value` belongs to the set this prop denotes.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        match self {
            Self::Value(v) => v == value,
            Self::Or(set) => set.contains(value),
            Self::NotOr(set) => !set.contains(value),
            Self::MatchAny => true,
            Self::MatchNone => false,
        }
    }
}

impl Prop<String> {
    /// Parses the raw JSON encoding.
    ///
    /// A string is a value, `1` is match-any, `-1` is match-none, an array is
    /// an enumeration and `["!", [..]]` is a negated enumeration.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, ConfigError> {
        use serde_json::Value;

        match raw {
            Value::String(s) => Ok(Self::Value(s.clone())),
            Value::Number(n) if n.as_i64() == Some(MATCH_ANY) => Ok(Self::MatchAny),
            Value::Number(n) if n.as_i64() == Some(MATCH_NONE) => Ok(Self::MatchNone),
            Value::Array(items) => {
                if let [Value::String(not), Value::Array(excluded)] = items.as_slice() {
                    if not == NOT {
                        return Ok(Self::not_or(strings(excluded)?));
                    }
                }
                Ok(Self::or(strings(items)?))
            }
            other => Err(ConfigError::InvalidProp {
                reason: format!("unsupported prop encoding: {other}"),
            }),
        }
    }
}

impl From<&str> for Prop<String> {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

fn strings(items: &[serde_json::Value]) -> Result<Vec<String>, ConfigError> {
    items
        .iter()
        .map(|item| match item {
            serde_json::Value::String(s) => Ok(s.clone()),
            other => Err(ConfigError::InvalidProp {
                reason: format!("enumerated values must be strings, got {other}"),
            }),
        })
        .collect()
}

/// Computes the relation between the sets denoted by two props.
pub fn compare_prop<T: Eq + Hash>(a: &Prop<T>, b: &Prop<T>) -> CompareResult {
    use Prop::{MatchAny, MatchNone, NotOr, Or, Value};

    match (a, b) {
        (MatchNone, _) | (_, MatchNone) => CompareResult::Disjoint,
        (MatchAny, MatchAny) => CompareResult::Identity,
        (MatchAny, _) => CompareResult::Superset,
        (_, MatchAny) => CompareResult::Subset,

        (Value(x), Value(y)) => {
            if x == y {
                CompareResult::Identity
            } else {
                CompareResult::Disjoint
            }
        }
        (Value(x), Or(set)) => compare_value_to_set(x, set),
        (Or(set), Value(y)) => compare_value_to_set(y, set).inverse(),
        (Value(x), NotOr(excluded)) => {
            if excluded.contains(x) {
                CompareResult::Disjoint
            } else {
                CompareResult::Subset
            }
        }
        (NotOr(excluded), Value(y)) => {
            if excluded.contains(y) {
                CompareResult::Disjoint
            } else {
                CompareResult::Superset
            }
        }

        (Or(x), Or(y)) => compare_sets(x, y),
        (Or(x), NotOr(y)) => remap(&OR_TO_NOT_OR, compare_sets(x, y)),
        (NotOr(x), Or(y)) => remap(&NOT_OR_TO_OR, compare_sets(x, y)),
        (NotOr(x), NotOr(y)) => remap(&NOT_OR_TO_NOT_OR, compare_sets(x, y)),
    }
}

/// Returns true if two props denote overlapping sets.
///
/// Cheaper than `compare_prop(a, b) != Disjoint`: no exclusive-member counting.
pub fn intersect_prop<T: Eq + Hash>(a: &Prop<T>, b: &Prop<T>) -> bool {
    use Prop::{MatchAny, MatchNone, NotOr, Or, Value};

    match (a, b) {
        (MatchNone, _) | (_, MatchNone) => false,
        (MatchAny, _) | (_, MatchAny) => true,
        (Value(x), Value(y)) => x == y,
        (Value(x), Or(set)) | (Or(set), Value(x)) => set.contains(x),
        (Value(x), NotOr(excluded)) | (NotOr(excluded), Value(x)) => !excluded.contains(x),
        (Or(x), Or(y)) => intersect_sets(x, y),
        (Or(x), NotOr(y)) => !subset_sets(x, y),
        (NotOr(x), Or(y)) => !subset_sets(y, x),
        (NotOr(_), NotOr(_)) => true,
    }
}

/// The relation a keyed-object match requires for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// The props must not overlap.
    Disjoint,
    /// The props must overlap.
    Intersect,
    /// The left prop must be contained in the right one.
    Subset,
    /// The props must be equal.
    Identity,
    /// The left prop must contain the right one.
    Superset,
}

impl MatchRule {
    /// Returns true if `result` satisfies this rule.
    #[must_use]
    pub const fn accepts(self, result: CompareResult) -> bool {
        use CompareResult as R;

        match self {
            Self::Disjoint => matches!(result, R::Disjoint),
            Self::Intersect => !matches!(result, R::Disjoint),
            Self::Subset => matches!(result, R::Subset | R::Identity),
            Self::Identity => matches!(result, R::Identity),
            Self::Superset => matches!(result, R::Identity | R::Superset),
        }
    }
}

/// Matches two keyed maps of props key by key.
///
/// For a key present on only one side, the other side's `*` entry stands in,
/// or `MatchNone` when there is none. The rule for a key is looked up in
/// `rules`, then under `*`, and defaults to `Intersect`. Returns the first key
/// that fails its rule.
pub fn match_object<T: Eq + Hash>(
    a: &IndexMap<String, Prop<T>>,
    b: &IndexMap<String, Prop<T>>,
    rules: &IndexMap<String, MatchRule>,
) -> Option<String> {
    let none: Prop<T> = Prop::MatchNone;
    let rule_for = |key: &str| {
        rules
            .get(key)
            .or_else(|| rules.get(WILD_KEY))
            .copied()
            .unwrap_or(MatchRule::Intersect)
    };
    let check = |rule: MatchRule, left: &Prop<T>, right: &Prop<T>| match rule {
        MatchRule::Intersect => intersect_prop(left, right),
        other => other.accepts(compare_prop(left, right)),
    };

    for (key, left) in a {
        if key == WILD_KEY {
            continue;
        }
        let right = b.get(key).or_else(|| b.get(WILD_KEY)).unwrap_or(&none);
        if !check(rule_for(key), left, right) {
            return Some(key.clone());
        }
    }
    for (key, right) in b {
        if key == WILD_KEY || a.contains_key(key) {
            continue;
        }
        let left = a.get(WILD_KEY).unwrap_or(&none);
        if !check(rule_for(key), left, right) {
            return Some(key.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(raw: serde_json::Value) -> Prop<String> {
        Prop::from_json(&raw).unwrap()
    }

    #[test]
    fn test_parse_collapsing_rules() {
        assert_eq!(p(json!([])), Prop::MatchNone);
        assert_eq!(p(json!(["!", []])), Prop::MatchAny);
        assert_eq!(p(json!(["a"])), Prop::Value("a".to_string()));
        assert_eq!(p(json!(1)), Prop::MatchAny);
        assert_eq!(p(json!(-1)), Prop::MatchNone);
        assert!(matches!(p(json!(["a", "b"])), Prop::Or(_)));
        assert!(matches!(p(json!(["!", ["a"]])), Prop::NotOr(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_encodings() {
        assert!(Prop::from_json(&json!(true)).is_err());
        assert!(Prop::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_compare_value_props() {
        assert_eq!(compare_prop(&p(json!("a")), &p(json!("a"))), CompareResult::Identity);
        assert_eq!(compare_prop(&p(json!("a")), &p(json!("b"))), CompareResult::Disjoint);
        assert_eq!(compare_prop(&p(json!("a")), &p(json!(["a", "b"]))), CompareResult::Subset);
        assert_eq!(compare_prop(&p(json!(["a", "b"])), &p(json!("a"))), CompareResult::Superset);
        assert_eq!(compare_prop(&p(json!("a")), &p(json!(["!", ["b"]]))), CompareResult::Subset);
        assert_eq!(compare_prop(&p(json!("b")), &p(json!(["!", ["b"]]))), CompareResult::Disjoint);
        assert_eq!(compare_prop(&p(json!(["!", ["b"]])), &p(json!("a"))), CompareResult::Superset);
    }

    #[test]
    fn test_compare_sentinels() {
        assert_eq!(compare_prop(&p(json!(1)), &p(json!("a"))), CompareResult::Superset);
        assert_eq!(compare_prop(&p(json!("a")), &p(json!(1))), CompareResult::Subset);
        assert_eq!(compare_prop(&p(json!(1)), &p(json!(1))), CompareResult::Identity);
        assert_eq!(compare_prop(&p(json!(-1)), &p(json!(-1))), CompareResult::Disjoint);
        assert_eq!(compare_prop(&p(json!(1)), &p(json!([]))), CompareResult::Disjoint);
    }

    #[test]
    fn test_compare_or_against_not_or() {
        // {a, b} vs everything but {c}: contained.
        assert_eq!(
            compare_prop(&p(json!(["a", "b"])), &p(json!(["!", ["c"]]))),
            CompareResult::Subset
        );
        // {a, b} vs everything but {a}: overlap on b only.
        assert_eq!(
            compare_prop(&p(json!(["a", "b"])), &p(json!(["!", ["a"]]))),
            CompareResult::Intersect
        );
        // {a, b} vs everything but {a, b, c}: nothing left.
        assert_eq!(
            compare_prop(&p(json!(["a", "b"])), &p(json!(["!", ["a", "b", "c"]]))),
            CompareResult::Disjoint
        );
        assert_eq!(
            compare_prop(&p(json!(["!", ["c"]])), &p(json!(["a", "b"]))),
            CompareResult::Superset
        );
    }

    #[test]
    fn test_compare_not_or_pairs() {
        assert_eq!(
            compare_prop(&p(json!(["!", ["a"]])), &p(json!(["!", ["a", "b"]]))),
            CompareResult::Superset
        );
        assert_eq!(
            compare_prop(&p(json!(["!", ["a"]])), &p(json!(["!", ["b"]]))),
            CompareResult::Intersect
        );
        assert_eq!(
            compare_prop(&p(json!(["!", ["a", "b"]])), &p(json!(["!", ["b", "a"]]))),
            CompareResult::Identity
        );
    }

    #[test]
    fn test_intersect_agrees_with_compare() {
        let props = [
            json!("a"),
            json!("b"),
            json!(["a", "b"]),
            json!(["b", "c"]),
            json!(["!", ["a"]]),
            json!(["!", ["a", "b"]]),
            json!(1),
            json!(-1),
        ];
        for x in &props {
            for y in &props {
                let (x, y) = (p(x.clone()), p(y.clone()));
                assert_eq!(
                    intersect_prop(&x, &y),
                    compare_prop(&x, &y).overlaps(),
                    "{x:?} vs {y:?}"
                );
                assert_eq!(compare_prop(&x, &y), compare_prop(&y, &x).inverse());
            }
        }
    }

    #[test]
    fn test_contains() {
        assert!(p(json!(["!", ["a"]])).contains(&"z".to_string()));
        assert!(!p(json!(["a", "b"])).contains(&"z".to_string()));
    }

    fn obj(pairs: &[(&str, serde_json::Value)]) -> IndexMap<String, Prop<String>> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), p(v.clone())))
            .collect()
    }

    #[test]
    fn test_match_object_defaults_to_intersect() {
        let a = obj(&[("role", json!(["admin", "user"])), ("region", json!("eu"))]);
        let b = obj(&[("role", json!("admin")), ("region", json!(["eu", "us"]))]);
        assert_eq!(match_object(&a, &b, &IndexMap::new()), None);

        let c = obj(&[("role", json!("guest")), ("region", json!("eu"))]);
        assert_eq!(match_object(&a, &c, &IndexMap::new()), Some("role".to_string()));
    }

    #[test]
    fn test_match_object_with_rules_and_wild_key() {
        let a = obj(&[("role", json!("admin"))]);
        let b = obj(&[("role", json!(["admin", "user"])), ("*", json!(1))]);
        let mut rules = IndexMap::new();
        rules.insert("role".to_string(), MatchRule::Subset);
        assert_eq!(match_object(&a, &b, &rules), None);

        rules.insert("role".to_string(), MatchRule::Superset);
        assert_eq!(match_object(&a, &b, &rules), Some("role".to_string()));

        // Key only on the right, no wild key on the left: MatchNone never intersects.
        let d = obj(&[("role", json!("admin")), ("team", json!("core"))]);
        assert_eq!(match_object(&a, &d, &IndexMap::new()), Some("team".to_string()));
    }
}
