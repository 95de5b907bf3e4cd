//! Listener collections.
//!
//! Every listener subscribed with the same normalized pattern (placeholders
//! replaced by wildcards, recursion marker kept) shares one collection. The
//! collection's flags and compiled pattern are fixed when it is created.

use std::collections::BTreeMap;

use crate::params::{Params, ParamsInfo};
use crate::path::PathPattern;

use super::events::{ListenerFn, ListenerId, ListenerOptions};

/// One registered callback.
#[derive(Clone)]
pub(crate) struct Listener {
    pub callback: ListenerFn,
    pub options: ListenerOptions,
}

/// Shared registration record for one normalized pattern.
pub(crate) struct ListenerCollection {
    /// Pattern with placeholders replaced, recursion marker stripped.
    pub path: String,
    pub pattern: PathPattern,
    pub is_recursive: bool,
    pub is_wildcard: bool,
    pub params: Option<ParamsInfo>,
    /// Ascending id order is the invocation order.
    pub listeners: BTreeMap<ListenerId, Listener>,
}

impl ListenerCollection {
    pub fn new(path: String, pattern: PathPattern, is_recursive: bool, params: Option<ParamsInfo>) -> Self {
        Self {
            is_wildcard: !pattern.is_concrete(),
            path,
            pattern,
            is_recursive,
            params,
            listeners: BTreeMap::new(),
        }
    }

    pub const fn has_params(&self) -> bool {
        self.params.is_some()
    }

    /// Length of the prefix of `update` this collection fires for.
    ///
    /// Recursive collections fire for anything at or below a matching path;
    /// the others only for an exact match.
    pub fn match_update(&self, update: &[&str]) -> Option<usize> {
        if self.is_recursive {
            self.pattern.matches_prefix(update)
        } else {
            self.pattern
                .matches_segments(update)
                .then_some(update.len())
        }
    }

    /// Parameters captured from a concrete path this collection matches.
    pub fn params_for(&self, concrete: &[&str]) -> Option<Params> {
        self.params
            .as_ref()
            .map(|info| info.extract(&self.pattern, concrete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamParser;

    fn collection(path: &str, recursive: bool) -> ListenerCollection {
        let pattern = PathPattern::parse(path, ".").unwrap();
        ListenerCollection::new(path.to_string(), pattern, recursive, None)
    }

    #[test]
    fn test_flags() {
        assert!(!collection("a.b", true).is_wildcard);
        assert!(collection("a.*", true).is_wildcard);
        assert!(!collection("a.b", true).has_params());
    }

    #[test]
    fn test_recursive_matches_descendants() {
        let c = collection("a", true);
        assert_eq!(c.match_update(&["a"]), Some(1));
        assert_eq!(c.match_update(&["a", "b", "c"]), Some(1));
        assert_eq!(c.match_update(&["b"]), None);
    }

    #[test]
    fn test_non_recursive_needs_exact_path() {
        let c = collection("a", false);
        assert_eq!(c.match_update(&["a"]), Some(1));
        assert_eq!(c.match_update(&["a", "b"]), None);
    }

    #[test]
    fn test_params_for() {
        let info = ParamParser::new(":", ".", '*')
            .unwrap()
            .parse("users.:id")
            .unwrap()
            .unwrap();
        let pattern = PathPattern::parse(info.replaced(), ".").unwrap();
        let c = ListenerCollection::new(info.replaced().to_string(), pattern, true, Some(info));
        let params = c.params_for(&["users", "3"]).unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("3"));
    }
}
