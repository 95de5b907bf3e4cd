//! Multi-segment path patterns.
//!
//! A [`PathPattern`] is an ordered list of [`Segment`]s plus the separator the
//! source string was split on. It answers two kinds of questions:
//!
//! - pattern vs pattern: [`compare_patterns`] and [`intersect_patterns`] give
//!   the relation between the path sets two patterns denote, without
//!   enumerating them;
//! - pattern vs concrete path: [`PathPattern::matches`] and the prefix and
//!   state-advance helpers used by the store's dispatcher.
//!
//! At most one segment per pattern may have a variable length (`*?` or `**`).
//! Fixed segments to the left of it are aligned against the start of the
//! other path, fixed segments to the right of it against the end.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compare::{compare_range, reduce, CompareResult};
use crate::error::ConfigError;
use crate::segment::{compare_segment, intersect_segment, Segment, WildcardKind};
use crate::tree::split;

/// Delimiter and wildcard marker used to read patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSyntax {
    /// Segment separator.
    pub separator: String,
    /// Wildcard marker. Doubled it denotes any depth.
    pub wildcard: char,
}

impl Default for PathSyntax {
    fn default() -> Self {
        Self {
            separator: ".".to_string(),
            wildcard: '*',
        }
    }
}

/// A parsed path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    separator: String,
    segments: Vec<Segment>,
    min_len: usize,
    max_len: usize,
    var_index: Option<usize>,
    has_nil: bool,
}

impl PathPattern {
    /// Parses `pattern` split on `separator`, with `*` as the wildcard marker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MultipleVariableSegments`] if more than one
    /// segment has a variable length.
    pub fn parse(pattern: &str, separator: &str) -> Result<Self, ConfigError> {
        Self::parse_with(
            pattern,
            &PathSyntax {
                separator: separator.to_string(),
                wildcard: '*',
            },
        )
    }

    /// Parses `pattern` with an explicit syntax.
    ///
    /// The empty string is the pattern with no segments; it matches only the
    /// empty path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MultipleVariableSegments`] if more than one
    /// segment has a variable length.
    pub fn parse_with(pattern: &str, syntax: &PathSyntax) -> Result<Self, ConfigError> {
        let segments: Vec<Segment> = split(pattern, &syntax.separator)
            .into_iter()
            .map(|token| Segment::parse_with(token, syntax.wildcard))
            .collect();

        let mut min_len = 0usize;
        let mut max_len = 0usize;
        let mut var_index = None;
        let mut has_nil = false;
        for (i, segment) in segments.iter().enumerate() {
            let (min, max) = segment.length();
            min_len = min_len.saturating_add(min);
            max_len = max_len.saturating_add(max);
            has_nil |= segment.is_nil();
            if !segment.is_fixed_length() {
                if var_index.is_some() {
                    return Err(ConfigError::MultipleVariableSegments {
                        pattern: pattern.to_string(),
                    });
                }
                var_index = Some(i);
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            separator: syntax.separator.clone(),
            segments,
            min_len,
            max_len,
            var_index,
            has_nil,
        })
    }

    /// The source string.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The separator the source was split on.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true for the pattern with no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Inclusive `(min, max)` number of path levels matched.
    #[must_use]
    pub const fn length(&self) -> (usize, usize) {
        (self.min_len, self.max_len)
    }

    /// Index of the variable-length segment, if any.
    #[must_use]
    pub const fn var_index(&self) -> Option<usize> {
        self.var_index
    }

    /// Returns true if any segment is the empty set.
    #[must_use]
    pub const fn has_nil(&self) -> bool {
        self.has_nil
    }

    /// Returns true if the pattern names exactly one concrete path.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.segments.iter().all(Segment::is_literal)
    }

    /// Compares with another pattern. See [`compare_patterns`].
    #[must_use]
    pub fn compare(&self, other: &Self) -> CompareResult {
        compare_patterns(self, other)
    }

    /// Tests overlap with another pattern. See [`intersect_patterns`].
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        intersect_patterns(self, other)
    }

    /// Tests a concrete path string.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.matches_segments(&split(path, &self.separator))
    }

    /// Tests an already split concrete path.
    #[must_use]
    pub fn matches_segments(&self, path: &[&str]) -> bool {
        if self.has_nil {
            return false;
        }
        let n = path.len();
        if n < self.min_len || n > self.max_len {
            return false;
        }
        match self.var_index {
            None => self
                .segments
                .iter()
                .zip(path)
                .all(|(segment, key)| segment.matches_key(key)),
            Some(v) => {
                let right = self.segments.len() - 1 - v;
                let left_ok = self.segments[..v]
                    .iter()
                    .zip(&path[..v])
                    .all(|(segment, key)| segment.matches_key(key));
                // The length check leaves room for the variable segment.
                left_ok
                    && self.segments[v + 1..]
                        .iter()
                        .zip(&path[n - right..])
                        .all(|(segment, key)| segment.matches_key(key))
            }
        }
    }

    /// Length of the longest prefix of `path` this pattern matches.
    #[must_use]
    pub fn matches_prefix(&self, path: &[&str]) -> Option<usize> {
        if self.has_nil || path.len() < self.min_len {
            return None;
        }
        let upper = path.len().min(self.max_len);
        (self.min_len..=upper)
            .rev()
            .find(|&k| self.matches_segments(&path[..k]))
    }

    /// Segment positions reachable after consuming `path` from the start.
    ///
    /// Position `len()` means the whole pattern has been consumed. An empty
    /// result means no continuation of `path` can match. Positions come back
    /// sorted.
    #[must_use]
    pub fn advance(&self, path: &[&str]) -> Vec<usize> {
        if self.has_nil {
            return Vec::new();
        }
        let mut states = self.closure(vec![0]);
        for key in path {
            let next: Vec<usize> = states
                .iter()
                .filter_map(|&state| self.step(state, key))
                .collect();
            if next.is_empty() {
                return next;
            }
            states = self.closure(next);
        }
        states
    }

    /// Position after `segments[state]` consumes `key`.
    pub(crate) fn step(&self, state: usize, key: &str) -> Option<usize> {
        let segment = self.segments.get(state)?;
        if !segment.matches_key(key) {
            return None;
        }
        match segment {
            Segment::Wildcard(WildcardKind::Variable) => Some(state),
            _ => Some(state + 1),
        }
    }

    /// Adds the positions reachable by letting a variable segment consume
    /// nothing; sorts and dedups.
    pub(crate) fn closure(&self, mut states: Vec<usize>) -> Vec<usize> {
        let mut i = 0;
        while i < states.len() {
            let state = states[i];
            if self
                .segments
                .get(state)
                .is_some_and(|segment| !segment.is_fixed_length())
                && !states.contains(&(state + 1))
            {
                states.push(state + 1);
            }
            i += 1;
        }
        states.sort_unstable();
        states.dedup();
        states
    }

    fn left_len(&self) -> usize {
        self.var_index.unwrap_or(self.segments.len())
    }

    fn right_len(&self) -> usize {
        match self.var_index {
            Some(v) => self.segments.len() - 1 - v,
            None => self.segments.len(),
        }
    }

    fn from_right(&self, i: usize) -> &Segment {
        &self.segments[self.segments.len() - 1 - i]
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Relation between the concrete path sets two patterns denote.
#[must_use]
pub fn compare_patterns(a: &PathPattern, b: &PathPattern) -> CompareResult {
    if a.source == b.source && a.separator == b.separator {
        return if a.has_nil {
            CompareResult::Disjoint
        } else {
            CompareResult::Identity
        };
    }

    let mut result = compare_range(a.min_len, a.max_len, b.min_len, b.max_len);
    if result == CompareResult::Disjoint || a.has_nil || b.has_nil {
        return CompareResult::Disjoint;
    }

    let (left_a, left_b) = (a.left_len(), b.left_len());
    for i in 0..left_a.min(left_b) {
        let next = compare_segment(&a.segments[i], &b.segments[i]);
        if next == CompareResult::Disjoint {
            return next;
        }
        result = reduce(result, next);
    }
    // The longer fixed run constrains more.
    if left_a != left_b {
        result = reduce(result, bias(left_a, left_b));
    }

    if a.var_index.is_none() && b.var_index.is_none() {
        return result;
    }

    let (right_a, right_b) = (a.right_len(), b.right_len());
    for i in 0..right_a.min(right_b) {
        let next = compare_segment(a.from_right(i), b.from_right(i));
        if next == CompareResult::Disjoint {
            return next;
        }
        result = reduce(result, next);
    }
    if right_a != right_b {
        result = reduce(result, bias(right_a, right_b));
    }
    result
}

/// Returns true if some concrete path matches both patterns.
#[must_use]
pub fn intersect_patterns(a: &PathPattern, b: &PathPattern) -> bool {
    if a.has_nil || b.has_nil {
        return false;
    }
    if a.source == b.source && a.separator == b.separator {
        return true;
    }
    if !compare_range(a.min_len, a.max_len, b.min_len, b.max_len).overlaps() {
        return false;
    }

    let (left_a, left_b) = (a.left_len(), b.left_len());
    for i in 0..left_a.min(left_b) {
        if !intersect_segment(&a.segments[i], &b.segments[i]) {
            return false;
        }
    }
    if a.var_index.is_none() && b.var_index.is_none() {
        return true;
    }
    for i in 0..a.right_len().min(b.right_len()) {
        if !intersect_segment(a.from_right(i), b.from_right(i)) {
            return false;
        }
    }
    true
}

const fn bias(len_a: usize, len_b: usize) -> CompareResult {
    if len_a > len_b {
        CompareResult::Subset
    } else {
        CompareResult::Superset
    }
}
