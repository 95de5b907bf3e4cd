//! Expansion of a pattern into the concrete paths of a data tree.
//!
//! The scan walks the tree depth-first with an explicit stack. Each frame
//! carries the set of pattern positions still alive at that node, so a
//! variable-length segment can both stop (hand the node to the next segment)
//! and continue (consume the child level) without recursion.

use indexmap::IndexMap;
use serde_json::Value;

use crate::path::PathPattern;
use crate::tree::{children, join};

/// Concrete matches of a scan, in document order.
pub type ScanMatches<'a> = IndexMap<String, &'a Value>;

struct Frame<'a> {
    node: &'a Value,
    path: String,
    states: Vec<usize>,
}

/// Walks a data tree looking for the paths a pattern matches.
#[derive(Debug, Clone, Copy)]
pub struct PathScanner<'a> {
    tree: &'a Value,
}

impl<'a> PathScanner<'a> {
    /// Creates a scanner over `tree`.
    #[must_use]
    pub const fn new(tree: &'a Value) -> Self {
        Self { tree }
    }

    /// Every non-empty concrete path that `pattern` matches, with its value.
    #[must_use]
    pub fn scan(&self, pattern: &PathPattern) -> ScanMatches<'a> {
        self.scan_from(pattern, &[0])
    }

    /// Like [`scan`](Self::scan), but the tree root is treated as already
    /// standing at the given pattern positions (as returned by
    /// [`PathPattern::advance`]). Paths are relative to the root.
    #[must_use]
    pub fn scan_from(&self, pattern: &PathPattern, start: &[usize]) -> ScanMatches<'a> {
        let mut found = ScanMatches::new();
        if pattern.has_nil() || start.is_empty() {
            return found;
        }

        let end = pattern.len();
        let separator = pattern.separator();
        let mut stack = vec![Frame {
            node: self.tree,
            path: String::new(),
            states: pattern.closure(start.to_vec()),
        }];

        while let Some(frame) = stack.pop() {
            if !frame.path.is_empty() && frame.states.contains(&end) {
                found.insert(frame.path.clone(), frame.node);
            }

            let mut next = Vec::new();
            for (key, child) in children(frame.node) {
                let states: Vec<usize> = frame
                    .states
                    .iter()
                    .filter_map(|&state| pattern.step(state, &key))
                    .collect();
                if states.is_empty() {
                    continue;
                }
                next.push(Frame {
                    node: child,
                    path: join(&frame.path, &key, separator),
                    states: pattern.closure(states),
                });
            }
            // Reversed so children pop in document order.
            stack.extend(next.into_iter().rev());
        }
        found
    }
}

/// Scans `tree` for `pattern` in one call.
#[must_use]
pub fn scan<'a>(tree: &'a Value, pattern: &PathPattern) -> ScanMatches<'a> {
    PathScanner::new(tree).scan(pattern)
}
