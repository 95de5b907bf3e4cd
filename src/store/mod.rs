//! Reactive state store.
//!
//! A [`ReactiveStore`] owns a JSON data tree and a registry of listeners
//! keyed by path pattern. `update` writes into the tree and synchronously
//! calls every listener whose pattern is affected; `subscribe` registers a
//! listener and immediately replays the current matches to it.
//!
//! The store is single-threaded: the handle is `Clone` but not `Send`, and
//! every call runs to completion on the caller's stack. Listeners may call
//! back into the store.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use kyrostate::{ListenerOptions, ReactiveStore};
//! use serde_json::json;
//!
//! let store = ReactiveStore::new(json!({"todos": [{"done": false}, {"done": false}]}));
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let _sub = store
//!     .subscribe(
//!         "todos.*.done",
//!         move |_, info| sink.borrow_mut().push(info.path.resolved.clone()),
//!         ListenerOptions::default(),
//!     )
//!     .unwrap();
//!
//! store.update("todos.1.done", json!(true)).unwrap();
//! assert_eq!(seen.borrow().len(), 3);
//! assert_eq!(store.get("todos.1.done"), Some(json!(true)));
//! ```

/// Store configuration.
pub mod config;
/// Listener-facing types.
pub mod events;
/// Listener collections.
mod collection;
/// Notification planning.
mod dispatch;
/// Subscription handles.
pub mod subscription;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{ExecutionError, StateResult};
use crate::params::{ParamParser, ParamsInfo};
use crate::path::{PathPattern, PathSyntax};
use crate::scan::PathScanner;
use crate::tree::{self, split};

use collection::{Listener, ListenerCollection};
use dispatch::{resolve_change, resolve_replay, Plan, Registry, UpdateContext};

pub use config::StoreConfig;
pub use events::{
    BulkEntry, EventInfo, EventKind, EventValue, ListenerFn, ListenerId, ListenerOptions, PathInfo,
    UpdateOptions, Updater,
};
pub use subscription::Subscription;

struct StoreState {
    /// `None` once destroyed.
    tree: Option<Value>,
    registry: Registry,
    next_id: u64,
}

pub(crate) struct StoreInner {
    config: StoreConfig,
    syntax: PathSyntax,
    params: ParamParser,
    state: RefCell<StoreState>,
}

impl StoreInner {
    pub(crate) fn remove_listener(&self, key: &str, id: ListenerId) {
        let removed = {
            let mut state = self.state.borrow_mut();
            let Some(collection) = state.registry.get_mut(key) else {
                return;
            };
            let removed = collection.listeners.remove(&id);
            if collection.listeners.is_empty() {
                state.registry.shift_remove(key);
                trace!(pattern = key, "listener collection removed");
            }
            removed
        };
        // The callback may own a Subscription; drop it with the state released.
        drop(removed);
    }
}

/// Normalized form of a subscription path.
struct Normalized {
    key: String,
    path: String,
    is_recursive: bool,
    params: Option<ParamsInfo>,
}

/// A JSON tree with pattern-based change notification.
#[derive(Clone)]
pub struct ReactiveStore {
    inner: Rc<StoreInner>,
}

impl ReactiveStore {
    /// Creates a store with the default markers.
    #[must_use]
    pub fn new(tree: Value) -> Self {
        Self::build(tree, StoreConfig::default(), ParamParser::default())
    }

    /// Creates a store with custom markers.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a marker is empty or the parameter
    /// marker cannot be used.
    pub fn with_config(tree: Value, config: StoreConfig) -> StateResult<Self> {
        config.validate()?;
        let params = ParamParser::new(&config.param, &config.delimiter, config.wildcard)?;
        Ok(Self::build(tree, config, params))
    }

    fn build(tree: Value, config: StoreConfig, params: ParamParser) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                syntax: config.syntax(),
                config,
                params,
                state: RefCell::new(StoreState {
                    tree: Some(tree),
                    registry: Registry::new(),
                    next_id: 0,
                }),
            }),
        }
    }

    /// The markers this store was built with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Registers `listener` for `path` and replays the current matches to it.
    ///
    /// `path` may contain wildcards, enumerations, `:name` placeholders and
    /// a trailing non-recursive marker. A concrete path replays once with its
    /// current value (`None` if absent); a wildcard path replays once per
    /// match, or once in total for bulk listeners.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid pattern (nothing is
    /// registered) and [`ExecutionError::Destroyed`] after
    /// [`destroy`](Self::destroy).
    pub fn subscribe(
        &self,
        path: &str,
        listener: impl Fn(&EventValue, &EventInfo) + 'static,
        options: ListenerOptions,
    ) -> StateResult<Subscription> {
        let mut subscription = Subscription::new(Rc::downgrade(&self.inner));
        let (key, id) = self.register(path, Rc::new(listener), options)?;
        subscription.push(key, id);
        Ok(subscription)
    }

    /// Registers one listener for several paths; the returned handle covers
    /// all of them.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid path. Listeners registered for the paths
    /// before it are removed again.
    pub fn subscribe_all<I, S>(
        &self,
        paths: I,
        listener: impl Fn(&EventValue, &EventInfo) + 'static,
        options: ListenerOptions,
    ) -> StateResult<Subscription>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let callback: ListenerFn = Rc::new(listener);
        let mut subscription = Subscription::new(Rc::downgrade(&self.inner));
        for path in paths {
            let (key, id) = self.register(path.as_ref(), Rc::clone(&callback), options.clone())?;
            subscription.push(key, id);
        }
        Ok(subscription)
    }

    fn register(
        &self,
        path: &str,
        callback: ListenerFn,
        options: ListenerOptions,
    ) -> StateResult<(String, ListenerId)> {
        let normalized = self.normalize(path)?;
        let pattern = PathPattern::parse_with(&normalized.path, &self.inner.syntax)?;
        let key = normalized.key.clone();
        let debug = options.debug;
        let source = options.source.clone();

        let mut plan = Plan::default();
        let (id, has_params) = {
            let mut guard = self.inner.state.borrow_mut();
            let state = &mut *guard;
            let tree = state.tree.as_ref().ok_or(ExecutionError::Destroyed)?;
            state.next_id += 1;
            let id = ListenerId::new(state.next_id);

            let collection = state.registry.entry(key.clone()).or_insert_with(|| {
                trace!(pattern = %normalized.key, "listener collection created");
                ListenerCollection::new(
                    normalized.path,
                    pattern,
                    normalized.is_recursive,
                    normalized.params,
                )
            });
            let listener = Listener { callback, options };
            resolve_replay(
                &mut plan,
                collection,
                id,
                &listener,
                tree,
                &self.inner.syntax.separator,
            );
            collection.listeners.insert(id, listener);
            (id, collection.has_params())
        };

        if debug {
            debug!(
                listener_id = id.get(),
                path,
                pattern = %key,
                has_params,
                replay_calls = plan.len(),
                source = ?source,
                "listener subscribed"
            );
        }
        plan.execute();
        Ok((key, id))
    }

    fn normalize(&self, path: &str) -> StateResult<Normalized> {
        let (raw, is_recursive) = match path.strip_suffix(self.inner.config.not_recursive.as_str()) {
            Some(stripped) => (stripped, false),
            None => (path, true),
        };
        let params = self.inner.params.parse(raw)?;
        let normalized = params
            .as_ref()
            .map_or_else(|| raw.to_string(), |info| info.replaced().to_string());
        let key = if is_recursive {
            normalized.clone()
        } else {
            format!("{normalized}{}", self.inner.config.not_recursive)
        };
        Ok(Normalized {
            key,
            path: normalized,
            is_recursive,
            params,
        })
    }

    /// Writes a value (or the result of an updater) at `path` and notifies
    /// listeners. See [`update_with_options`](Self::update_with_options).
    ///
    /// # Errors
    ///
    /// As [`update_with_options`](Self::update_with_options).
    pub fn update<'a>(&self, path: &str, updater: impl Into<Updater<'a>>) -> StateResult<Option<Value>> {
        self.update_with_options(path, updater, &UpdateOptions::default())
    }

    /// Writes at `path` and notifies listeners.
    ///
    /// A concrete `path` returns `Some(new value)`. A wildcard `path` applies
    /// the updater to every existing match and returns `None`. A primitive
    /// value equal to the current one is not written and fires nothing;
    /// containers always count as changed.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid `path` or `only` pattern,
    /// an execution error if the write cannot be applied, and
    /// [`ExecutionError::Destroyed`] after [`destroy`](Self::destroy).
    pub fn update_with_options<'a>(
        &self,
        path: &str,
        updater: impl Into<Updater<'a>>,
        options: &UpdateOptions,
    ) -> StateResult<Option<Value>> {
        let updater = updater.into();
        let syntax = &self.inner.syntax;
        let only = options
            .only
            .iter()
            .map(|relative| PathPattern::parse_with(relative, syntax))
            .collect::<Result<Vec<_>, _>>()?;
        let pattern = PathPattern::parse_with(path, syntax)?;
        let ctx = UpdateContext {
            path,
            separator: &syntax.separator,
            options,
            only: &only,
        };

        if pattern.is_concrete() {
            self.update_one(&updater, &ctx).map(Some)
        } else {
            self.update_matches(&pattern, &updater, &ctx).map(|()| None)
        }
    }

    fn update_one(&self, updater: &Updater<'_>, ctx: &UpdateContext<'_>) -> StateResult<Value> {
        let segments = split(ctx.path, ctx.separator);
        let old = {
            let state = self.inner.state.borrow();
            let tree = state.tree.as_ref().ok_or(ExecutionError::Destroyed)?;
            tree::get(tree, &segments).cloned()
        };
        let new_value = updater.apply(old.as_ref());
        if is_unchanged(old.as_ref(), &new_value) {
            if ctx.options.debug {
                debug!(path = ctx.path, source = ?ctx.options.source, "update skipped, value unchanged");
            }
            return Ok(new_value);
        }

        let plan = {
            let mut guard = self.inner.state.borrow_mut();
            let state = &mut *guard;
            let tree = state.tree.as_mut().ok_or(ExecutionError::Destroyed)?;
            tree::set(tree, &segments, new_value.clone(), ctx.separator)?;
            let mut plan = Plan::default();
            resolve_change(&mut plan, &state.registry, tree, ctx.path, &new_value, ctx);
            plan
        };
        Self::dispatch(plan, ctx);
        Ok(new_value)
    }

    fn update_matches(
        &self,
        pattern: &PathPattern,
        updater: &Updater<'_>,
        ctx: &UpdateContext<'_>,
    ) -> StateResult<()> {
        let candidates: Vec<(String, Value)> = {
            let state = self.inner.state.borrow();
            let tree = state.tree.as_ref().ok_or(ExecutionError::Destroyed)?;
            PathScanner::new(tree)
                .scan(pattern)
                .into_iter()
                .map(|(path, value)| (path, value.clone()))
                .collect()
        };
        let candidate_count = candidates.len();
        let changes: Vec<(String, Value)> = candidates
            .into_iter()
            .filter_map(|(path, old)| {
                let new_value = updater.apply(Some(&old));
                (!is_unchanged(Some(&old), &new_value)).then_some((path, new_value))
            })
            .collect();
        if ctx.options.debug {
            debug!(
                path = ctx.path,
                candidates = candidate_count,
                changed = changes.len(),
                source = ?ctx.options.source,
                "wildcard update"
            );
        }
        if changes.is_empty() {
            return Ok(());
        }

        let plan = {
            let mut guard = self.inner.state.borrow_mut();
            let state = &mut *guard;
            let tree = state.tree.as_mut().ok_or(ExecutionError::Destroyed)?;
            for (path, value) in &changes {
                tree::set(tree, &split(path, ctx.separator), value.clone(), ctx.separator)?;
            }
            let mut plan = Plan::default();
            for (path, value) in &changes {
                resolve_change(&mut plan, &state.registry, tree, path, value, ctx);
            }
            plan
        };
        Self::dispatch(plan, ctx);
        Ok(())
    }

    fn dispatch(plan: Plan, ctx: &UpdateContext<'_>) {
        trace!(path = ctx.path, calls = plan.len(), "update resolved");
        plan.execute();
    }

    /// The value at `path` (the whole tree for the empty path). `None` if
    /// absent or after [`destroy`](Self::destroy).
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        let state = self.inner.state.borrow();
        let tree = state.tree.as_ref()?;
        tree::get(tree, &split(path, &self.inner.syntax.separator)).cloned()
    }

    /// Drops the tree and every listener. Later updates and subscriptions
    /// fail with [`ExecutionError::Destroyed`].
    pub fn destroy(&self) {
        let (tree, registry) = {
            let mut state = self.inner.state.borrow_mut();
            (state.tree.take(), std::mem::take(&mut state.registry))
        };
        trace!(collections = registry.len(), "store destroyed");
        drop((tree, registry));
    }

    /// Returns true after [`destroy`](Self::destroy).
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.state.borrow().tree.is_none()
    }

    /// Returns true if `path` equals `pattern` or `pattern` matches it.
    #[must_use]
    pub fn matches_path(&self, pattern: &str, path: &str) -> bool {
        pattern == path
            || PathPattern::parse_with(pattern, &self.inner.syntax)
                .is_ok_and(|parsed| parsed.matches(path))
    }

    /// Normalized patterns with at least one listener, in creation order.
    /// Non-recursive patterns keep their marker.
    #[must_use]
    pub fn listener_patterns(&self) -> Vec<String> {
        self.inner.state.borrow().registry.keys().cloned().collect()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .state
            .borrow()
            .registry
            .values()
            .map(|collection| collection.listeners.len())
            .sum()
    }
}

impl fmt::Debug for ReactiveStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveStore")
            .field("config", &self.inner.config)
            .field("listeners", &self.listener_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Primitive (or null) values that compare equal count as no change.
fn is_unchanged(old: Option<&Value>, new: &Value) -> bool {
    old.is_some_and(|old| tree::is_primitive(old) && tree::is_primitive(new) && old == new)
}
