//! # kyrostate - Path Pattern Algebra and Reactive State
//!
//! kyrostate addresses a nested JSON tree with delimited string paths
//! (`users.42.name`) and lets callers describe sets of paths with patterns,
//! reason about how two patterns relate, and react to changes.
//!
//! ## Core Concepts
//!
//! - **Pattern**: a delimited sequence of segments. A segment is a literal
//!   key, a wildcard (`*`, `*?` for zero or one level, `**` for any depth),
//!   an enumeration `(a|b)`, a negated enumeration `!(a|b)` or the empty set
//!   `()`
//! - **CompareResult**: the relation between the path sets of two patterns
//!   (disjoint, intersect, subset, identity, superset), computed without
//!   enumerating either set
//! - **Prop**: the same algebra over single values, for matching keyed
//!   objects against rule sets
//! - **ReactiveStore**: owns the tree, runs listeners synchronously when
//!   paths matching their pattern change
//!
//! ## Usage
//!
//! ```rust
//! use kyrostate::{CompareResult, ListenerOptions, PathPattern, ReactiveStore};
//! use serde_json::json;
//!
//! let all = PathPattern::parse("users.*.name", ".")?;
//! let one = PathPattern::parse("users.42.name", ".")?;
//! assert_eq!(one.compare(&all), CompareResult::Subset);
//!
//! let store = ReactiveStore::new(json!({"users": {"42": {"name": "Ada"}}}));
//! let _names = store.subscribe(
//!     "users.:id.name",
//!     |value, info| println!("{:?} {:?}", info.params, value),
//!     ListenerOptions::default(),
//! )?;
//! store.update("users.42.name", json!("Grace"))?;
//! # Ok::<(), kyrostate::StateError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Algebra
pub mod compare;
pub mod error;
pub mod path;
pub mod prop;
pub mod segment;
pub mod wildcard;

// Trees and stores
pub mod params;
pub mod scan;
pub mod store;
pub mod tree;

// Re-export primary types at crate root for convenience
pub use compare::CompareResult;
pub use error::{ConfigError, ExecutionError, StateError, StateResult};
pub use params::{ParamParser, Params, ParamsInfo, PathTemplate, TemplateOptions};
pub use path::{compare_patterns, intersect_patterns, PathPattern, PathSyntax};
pub use prop::{compare_prop, intersect_prop, match_object, MatchRule, Prop};
pub use scan::{scan, PathScanner, ScanMatches};
pub use segment::{compare_segment, intersect_segment, Segment, WildcardKind};
pub use store::{
    BulkEntry, EventInfo, EventKind, EventValue, ListenerFn, ListenerId, ListenerOptions, PathInfo,
    ReactiveStore, StoreConfig, Subscription, UpdateOptions, Updater,
};
pub use wildcard::{wildcard_match, WildcardMatcher};
