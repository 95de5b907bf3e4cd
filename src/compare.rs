//! Set relations between patterns.
//!
//! A `CompareResult` describes how the sets of concrete values denoted by two
//! patterns relate. Everything in the algebra (props, segments, whole paths)
//! reports its answer in these terms.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Relation between the value sets of two patterns `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareResult {
    /// No value is denoted by both.
    Disjoint = 0,
    /// Some overlap, but neither contains the other.
    Intersect = 1,
    /// `a ⊂ b`.
    Subset = 2,
    /// `a = b`.
    Identity = 3,
    /// `a ⊃ b`.
    Superset = 4,
}

impl CompareResult {
    /// All relations, in discriminant order. Index of a relation in this array
    /// equals `relation as usize`.
    pub const ALL: [Self; 5] = [
        Self::Disjoint,
        Self::Intersect,
        Self::Subset,
        Self::Identity,
        Self::Superset,
    ];

    /// The relation seen from the other side: `compare(b, a)` given `compare(a, b)`.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Subset => Self::Superset,
            Self::Superset => Self::Subset,
            other => other,
        }
    }

    /// Returns true unless the relation is `Disjoint`.
    #[must_use]
    pub const fn overlaps(self) -> bool {
        !matches!(self, Self::Disjoint)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CompareResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disjoint => write!(f, "disjoint"),
            Self::Intersect => write!(f, "intersect"),
            Self::Subset => write!(f, "subset"),
            Self::Identity => write!(f, "identity"),
            Self::Superset => write!(f, "superset"),
        }
    }
}

use CompareResult::{Disjoint, Identity, Intersect, Subset, Superset};

/// `compare(or_set, excluded)` remapped to the relation `Or(or_set)` vs
/// `NotOr(excluded)`.
pub const OR_TO_NOT_OR: [CompareResult; 5] = [Subset, Intersect, Disjoint, Disjoint, Intersect];

/// `compare(excluded, or_set)` remapped to the relation `NotOr(excluded)` vs
/// `Or(or_set)`.
pub const NOT_OR_TO_OR: [CompareResult; 5] = [Superset, Intersect, Intersect, Disjoint, Disjoint];

/// `compare(excluded_a, excluded_b)` remapped to the relation `NotOr(a)` vs
/// `NotOr(b)`.
pub const NOT_OR_TO_NOT_OR: [CompareResult; 5] = [Intersect, Intersect, Superset, Identity, Subset];

/// Looks up `base` in one of the remap tables.
#[must_use]
pub const fn remap(table: &[CompareResult; 5], base: CompareResult) -> CompareResult {
    table[base.index()]
}

/// Compares two closed length ranges. `usize::MAX` stands for an unbounded maximum.
#[must_use]
pub const fn compare_range(min1: usize, max1: usize, min2: usize, max2: usize) -> CompareResult {
    if min1 == min2 && max1 == max2 {
        return Identity;
    }
    if min1 <= min2 && max1 >= max2 {
        return Superset;
    }
    if min1 >= min2 && max1 <= max2 {
        return Subset;
    }
    if max1 < min2 || max2 < min1 {
        return Disjoint;
    }
    Intersect
}

/// Folds the relation of the next component into a running result.
///
/// `Identity` is neutral, equal relations stay as they are, anything mixed
/// collapses to `Intersect`. Callers short-circuit on `Disjoint` themselves.
#[must_use]
pub const fn reduce(prev: CompareResult, next: CompareResult) -> CompareResult {
    match (prev, next) {
        (Identity, n) => n,
        (p, Identity) => p,
        (Disjoint, Disjoint) => Disjoint,
        (Intersect, Intersect) => Intersect,
        (Subset, Subset) => Subset,
        (Superset, Superset) => Superset,
        _ => Intersect,
    }
}

/// Compares two enumerated sets by membership.
///
/// Walks the smaller set first; bails out as soon as no shared member can
/// exist, and stops the second pass at the first exclusive member.
pub fn compare_sets<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> CompareResult {
    let mut intersects = false;
    let mut a_only = false;
    let mut b_only = false;

    if a.len() <= b.len() {
        for item in a {
            if b.contains(item) {
                intersects = true;
            } else {
                a_only = true;
            }
        }
        if !intersects {
            return Disjoint;
        }
        b_only = b.iter().any(|item| !a.contains(item));
    } else {
        for item in b {
            if a.contains(item) {
                intersects = true;
            } else {
                b_only = true;
            }
        }
        if !intersects {
            return Disjoint;
        }
        a_only = a.iter().any(|item| !b.contains(item));
    }

    match (a_only, b_only) {
        (true, true) => Intersect,
        (true, false) => Superset,
        (false, true) => Subset,
        (false, false) => Identity,
    }
}

/// Compares a single value against an enumerated set.
pub fn compare_value_to_set<T: Eq + Hash>(value: &T, set: &HashSet<T>) -> CompareResult {
    if !set.contains(value) {
        Disjoint
    } else if set.len() == 1 {
        Identity
    } else {
        Subset
    }
}

/// Returns true if the two sets share at least one member.
pub fn intersect_sets<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> bool {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().any(|item| large.contains(item))
}

/// Returns true if every member of `a` is in `b`. Empty sets are never subsets.
pub fn subset_sets<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.iter().all(|item| b.contains(item))
}
