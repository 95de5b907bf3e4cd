//! Listener-facing types: ids, options, updaters and event payloads.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::Params;

/// Identifier of one registered listener. Ids grow monotonically per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A listener callback.
pub type ListenerFn = Rc<dyn Fn(&EventValue, &EventInfo)>;

/// Options of one subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerOptions {
    /// Receive one aggregated call per dispatch instead of one per path.
    pub bulk: bool,
    /// Log registration and every invocation at debug level.
    pub debug: bool,
    /// Free-form label attached to log lines and event info.
    pub source: Option<String>,
    /// Payload handed back in the info of every replay call.
    pub data: Option<Value>,
}

impl ListenerOptions {
    /// Sets `bulk`.
    #[must_use]
    pub const fn with_bulk(mut self, bulk: bool) -> Self {
        self.bulk = bulk;
        self
    }

    /// Sets `debug`.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets `source`.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets `data`.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Options of one update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    /// Sub-paths (relative to the updated path) whose listeners are the only
    /// ones notified when the new value is a container.
    pub only: Vec<String>,
    /// Free-form label attached to log lines and event info.
    pub source: Option<String>,
    /// Log the update and every listener it fires at debug level.
    pub debug: bool,
    /// Payload handed to every listener this update fires.
    pub data: Option<Value>,
}

impl UpdateOptions {
    /// Sets `only`.
    #[must_use]
    pub fn with_only<I, S>(mut self, only: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = only.into_iter().map(Into::into).collect();
        self
    }

    /// Sets `source`.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets `data`.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets `debug`.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// The new value of an update: either given outright or computed from the
/// old one.
pub enum Updater<'a> {
    /// Replace with this value.
    Value(Value),
    /// Compute from the current value (`None` if the path is absent).
    With(Box<dyn Fn(Option<&Value>) -> Value + 'a>),
}

impl<'a> Updater<'a> {
    /// Wraps a function of the old value.
    pub fn with(f: impl Fn(Option<&Value>) -> Value + 'a) -> Self {
        Self::With(Box::new(f))
    }

    pub(crate) fn apply(&self, old: Option<&Value>) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::With(f) => f(old),
        }
    }
}

impl From<Value> for Updater<'_> {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for Updater<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::With(_) => f.write_str("With(..)"),
        }
    }
}

/// Why a listener is being called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Initial replay right after subscribing.
    Subscribe,
    /// A change made by `update`.
    Update,
}

/// Paths involved in one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInfo {
    /// The listener's pattern, placeholders replaced by wildcards and the
    /// non-recursive marker stripped.
    pub listener: String,
    /// The path passed to `update`, if any.
    pub update: Option<String>,
    /// The concrete path of the delivered value. `None` for bulk calls.
    pub resolved: Option<String>,
}

/// Context delivered with every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Replay or update.
    pub kind: EventKind,
    /// Paths involved.
    pub path: PathInfo,
    /// Parameters captured from the resolved path. `None` for bulk calls and
    /// for listeners without parameters.
    pub params: Option<Params>,
    /// Label of the update (or, for replay, of the subscription).
    pub source: Option<String>,
    /// Whether the call is being logged.
    pub debug: bool,
    /// Payload of the update (or, for replay, of the subscription).
    pub data: Option<Value>,
}

/// One element of a bulk call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkEntry {
    /// Concrete path.
    pub path: String,
    /// Parameters captured from `path`.
    pub params: Option<Params>,
    /// Value at `path`; `None` if absent.
    pub value: Option<Value>,
}

/// What a listener receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    /// One value; `None` if the path is absent.
    Single(Option<Value>),
    /// Every match of one dispatch.
    Bulk(Vec<BulkEntry>),
}

impl EventValue {
    /// The single value, if this is a single call with a present value.
    #[must_use]
    pub const fn as_single(&self) -> Option<&Value> {
        match self {
            Self::Single(value) => value.as_ref(),
            Self::Bulk(_) => None,
        }
    }

    /// The entries, if this is a bulk call.
    #[must_use]
    pub fn as_bulk(&self) -> Option<&[BulkEntry]> {
        match self {
            Self::Single(_) => None,
            Self::Bulk(entries) => Some(entries),
        }
    }
}
