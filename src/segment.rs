//! Path segments.
//!
//! A segment is one delimiter-separated token of a path pattern. Segment
//! kinds:
//!
//! | Token        | Kind                  | Length  |
//! |--------------|-----------------------|---------|
//! | `*`, `!()`   | Wildcard (exact)      | 1       |
//! | `*?`         | Wildcard (optional)   | 0..=1   |
//! | `**`         | Wildcard (variable)   | 0..     |
//! | `()`         | Nil (matches nothing) | 1       |
//! | `(a\|b)`     | Or                    | 1       |
//! | `!(a\|b)`    | NotOr                 | 1       |
//! | anything else| Value                 | 1       |
//!
//! A value token may still contain `*`/`?` characters, which act as
//! single-segment wildcards when matching concrete keys.

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::compare::{
    compare_range, compare_sets, compare_value_to_set, intersect_sets, remap, subset_sets,
    CompareResult, NOT_OR_TO_NOT_OR, NOT_OR_TO_OR, OR_TO_NOT_OR,
};
use crate::wildcard::WildcardMatcher;

/// Token of the empty-set segment.
pub const EMPTY_SET: &str = "()";

/// Marks an unbounded maximum in a length range.
pub const UNBOUNDED: usize = usize::MAX;

/// How many path levels a wildcard segment consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WildcardKind {
    /// Exactly one level.
    Exact,
    /// Zero or one level.
    Optional,
    /// Any number of levels.
    Variable,
}

impl WildcardKind {
    /// Inclusive `(min, max)` number of levels.
    #[must_use]
    pub const fn length(self) -> (usize, usize) {
        match self {
            Self::Exact => (1, 1),
            Self::Optional => (0, 1),
            Self::Variable => (0, UNBOUNDED),
        }
    }
}

/// A literal segment token.
#[derive(Debug, Clone)]
pub struct ValueSegment {
    literal: String,
    star: char,
    matcher: OnceLock<WildcardMatcher>,
}

impl ValueSegment {
    fn new(literal: &str, star: char) -> Self {
        Self {
            literal: literal.to_string(),
            star,
            matcher: OnceLock::new(),
        }
    }

    /// The token text.
    #[must_use]
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Returns true if the token carries no wildcard characters.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        !self.literal.contains(self.star) && !self.literal.contains('?')
    }

    fn matches_key(&self, key: &str) -> bool {
        if self.literal == key {
            return true;
        }
        if self.is_literal() {
            return false;
        }
        self.matcher
            .get_or_init(|| WildcardMatcher::compile_with(&self.literal, self.star))
            .is_match(key)
    }
}

/// An enumerated segment: `(a|b)` or `!(a|b)`.
#[derive(Debug, Clone)]
pub struct EnumSegment {
    token: String,
    values: Vec<String>,
    members: OnceLock<HashSet<String>>,
}

impl EnumSegment {
    fn new(token: &str, values: Vec<String>) -> Self {
        Self {
            token: token.to_string(),
            values,
            members: OnceLock::new(),
        }
    }

    /// The token text, including parentheses.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The enumerated values, in source order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Membership set, built on first use.
    #[must_use]
    pub fn members(&self) -> &HashSet<String> {
        self.members
            .get_or_init(|| self.values.iter().cloned().collect())
    }
}

/// A parsed path segment.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Literal token (possibly containing single-segment wildcards).
    Value(ValueSegment),
    /// Level wildcard.
    Wildcard(WildcardKind),
    /// One of the enumerated keys.
    Or(EnumSegment),
    /// Any key except the enumerated ones.
    NotOr(EnumSegment),
    /// Matches nothing.
    Nil,
}

impl Segment {
    /// Parses one segment token using `*` as the wildcard marker.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        Self::parse_with(token, '*')
    }

    /// Parses one segment token with a custom wildcard marker.
    #[must_use]
    pub fn parse_with(token: &str, star: char) -> Self {
        let mut chars = token.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), None, None) if a == star => return Self::Wildcard(WildcardKind::Exact),
            (Some(a), Some('?'), None) if a == star => {
                return Self::Wildcard(WildcardKind::Optional)
            }
            (Some(a), Some(b), None) if a == star && b == star => {
                return Self::Wildcard(WildcardKind::Variable)
            }
            _ => {}
        }
        if token == EMPTY_SET {
            return Self::Nil;
        }

        if let Some(inner) = token.strip_prefix("!(").and_then(|t| t.strip_suffix(')')) {
            // Not one of nothing is anything.
            if inner.is_empty() {
                return Self::Wildcard(WildcardKind::Exact);
            }
            return Self::NotOr(EnumSegment::new(token, split_enum(inner)));
        }
        if let Some(inner) = token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            if inner.is_empty() {
                return Self::Nil;
            }
            return Self::Or(EnumSegment::new(token, split_enum(inner)));
        }
        Self::Value(ValueSegment::new(token, star))
    }

    /// Inclusive `(min, max)` number of path levels this segment consumes.
    #[must_use]
    pub const fn length(&self) -> (usize, usize) {
        match self {
            Self::Wildcard(kind) => kind.length(),
            Self::Value(_) | Self::Or(_) | Self::NotOr(_) | Self::Nil => (1, 1),
        }
    }

    /// Returns true if the segment always consumes exactly one level.
    #[must_use]
    pub const fn is_fixed_length(&self) -> bool {
        let (min, max) = self.length();
        min == max
    }

    /// Returns true for the empty-set segment.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns true if this segment names exactly one literal key.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        match self {
            Self::Value(v) => v.is_literal(),
            Self::Wildcard(_) | Self::Or(_) | Self::NotOr(_) | Self::Nil => false,
        }
    }

    /// Tests one concrete key.
    #[must_use]
    pub fn matches_key(&self, key: &str) -> bool {
        match self {
            Self::Value(v) => v.matches_key(key),
            Self::Wildcard(_) => true,
            Self::Or(e) => e.members().contains(key),
            Self::NotOr(e) => !e.members().contains(key),
            Self::Nil => false,
        }
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a.literal == b.literal,
            (Self::Wildcard(a), Self::Wildcard(b)) => a == b,
            (Self::Or(a), Self::Or(b)) | (Self::NotOr(a), Self::NotOr(b)) => a.token == b.token,
            (Self::Nil, Self::Nil) => true,
            _ => false,
        }
    }
}

fn split_enum(inner: &str) -> Vec<String> {
    inner.split('|').map(str::to_string).collect()
}

/// Computes the relation between the key sets two segments denote.
#[must_use]
pub fn compare_segment(a: &Segment, b: &Segment) -> CompareResult {
    use Segment::{Nil, NotOr, Or, Value, Wildcard};

    if a == b {
        return if a.is_nil() {
            CompareResult::Disjoint
        } else {
            CompareResult::Identity
        };
    }

    match (a, b) {
        (Nil, _) | (_, Nil) => CompareResult::Disjoint,

        (Wildcard(x), Wildcard(y)) => {
            let (min1, max1) = x.length();
            let (min2, max2) = y.length();
            compare_range(min1, max1, min2, max2)
        }
        (Wildcard(_), Value(_) | Or(_) | NotOr(_)) => CompareResult::Superset,
        (Value(_) | Or(_) | NotOr(_), Wildcard(_)) => CompareResult::Subset,

        (Value(x), Value(y)) => {
            if x.literal == y.literal {
                CompareResult::Identity
            } else {
                CompareResult::Disjoint
            }
        }
        (Value(x), Or(y)) => compare_value_to_set(&x.literal, y.members()),
        (Or(x), Value(y)) => compare_value_to_set(&y.literal, x.members()).inverse(),
        (Value(x), NotOr(y)) => remap(&OR_TO_NOT_OR, compare_value_to_set(&x.literal, y.members())),
        (NotOr(x), Value(y)) => remap(
            &NOT_OR_TO_OR,
            compare_value_to_set(&y.literal, x.members()).inverse(),
        ),

        (Or(x), Or(y)) => compare_sets(x.members(), y.members()),
        (Or(x), NotOr(y)) => remap(&OR_TO_NOT_OR, compare_sets(x.members(), y.members())),
        (NotOr(x), Or(y)) => remap(&NOT_OR_TO_OR, compare_sets(x.members(), y.members())),
        (NotOr(x), NotOr(y)) => remap(&NOT_OR_TO_NOT_OR, compare_sets(x.members(), y.members())),
    }
}

/// Returns true if two segments denote overlapping key sets.
#[must_use]
pub fn intersect_segment(a: &Segment, b: &Segment) -> bool {
    use Segment::{Nil, NotOr, Or, Value, Wildcard};

    if a == b {
        return !a.is_nil();
    }

    match (a, b) {
        (Nil, _) | (_, Nil) => false,
        (Wildcard(_), _) | (_, Wildcard(_)) => true,
        (Value(x), Value(y)) => x.literal == y.literal,
        (Value(x), Or(y)) | (Or(y), Value(x)) => y.members().contains(&x.literal),
        (Value(x), NotOr(y)) | (NotOr(y), Value(x)) => !y.members().contains(&x.literal),
        (Or(x), Or(y)) => intersect_sets(x.members(), y.members()),
        (Or(x), NotOr(y)) => !subset_sets(x.members(), y.members()),
        (NotOr(x), Or(y)) => !subset_sets(y.members(), x.members()),
        (NotOr(_), NotOr(_)) => true,
    }
}
