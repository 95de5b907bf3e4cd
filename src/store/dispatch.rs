//! Notification planning and delivery.
//!
//! Resolution runs while the store's state is borrowed and produces a
//! [`Plan`]: an owned, ordered list of calls. The borrow is released before
//! [`Plan::execute`] runs any callback, so callbacks may update, subscribe or
//! unsubscribe freely. Listeners removed by a callback still receive the
//! calls already planned for the current pass.
//!
//! A changed path is resolved in one of two ways:
//!
//! - default: a direct phase (collections whose pattern matches the changed
//!   path, or a prefix of it for recursive collections) followed by a nested
//!   phase (collections whose pattern continues below the changed path,
//!   scanned over the new subtree);
//! - `only`: when the update names sub-paths and the new value is a
//!   container, just the listeners matching those sub-paths.
//!
//! Bulk listeners get one call per dispatch, placed where their first entry
//! was resolved.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::path::PathPattern;
use crate::scan::PathScanner;
use crate::tree::{self, join, split};

use super::collection::{Listener, ListenerCollection};
use super::events::{
    BulkEntry, EventInfo, EventKind, EventValue, ListenerFn, ListenerId, PathInfo, UpdateOptions,
};

/// Registered collections keyed by normalized pattern, in creation order.
pub(crate) type Registry = IndexMap<String, ListenerCollection>;

struct Call {
    id: ListenerId,
    callback: ListenerFn,
    value: EventValue,
    info: EventInfo,
}

/// Ordered calls resolved for one operation.
#[derive(Default)]
pub(crate) struct Plan {
    calls: Vec<Call>,
    bulk_slots: HashMap<(String, ListenerId), usize>,
    delivered: HashSet<(String, ListenerId, String)>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    fn push(&mut self, id: ListenerId, listener: &Listener, value: EventValue, info: EventInfo) {
        self.calls.push(Call {
            id,
            callback: ListenerFn::clone(&listener.callback),
            value,
            info,
        });
    }

    /// Appends `entry` to the listener's bulk call, creating the call on
    /// first use.
    fn push_bulk(
        &mut self,
        key: &str,
        id: ListenerId,
        listener: &Listener,
        entry: BulkEntry,
        info: impl FnOnce() -> EventInfo,
    ) {
        if let Some(&slot) = self.bulk_slots.get(&(key.to_string(), id)) {
            if let EventValue::Bulk(entries) = &mut self.calls[slot].value {
                entries.push(entry);
            }
            return;
        }
        self.bulk_slots.insert((key.to_string(), id), self.calls.len());
        self.push(id, listener, EventValue::Bulk(vec![entry]), info());
    }

    /// Runs every planned call in order. Must be called with no store
    /// borrow held.
    pub fn execute(self) {
        for call in self.calls {
            if !call.info.debug {
                (call.callback)(&call.value, &call.info);
                continue;
            }
            let started = Instant::now();
            (call.callback)(&call.value, &call.info);
            let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            debug!(
                listener_id = call.id.get(),
                listener = %call.info.path.listener,
                update = ?call.info.path.update,
                resolved = ?call.info.path.resolved,
                kind = ?call.info.kind,
                source = ?call.info.source,
                elapsed_us,
                "listener called"
            );
        }
    }
}

/// Inputs shared by every changed path of one update.
pub(crate) struct UpdateContext<'a> {
    pub path: &'a str,
    pub separator: &'a str,
    pub options: &'a UpdateOptions,
    pub only: &'a [PathPattern],
}

impl UpdateContext<'_> {
    fn info(&self, listener: &Listener, collection: &str, resolved: Option<String>) -> EventInfo {
        EventInfo {
            kind: EventKind::Update,
            path: PathInfo {
                listener: collection.to_string(),
                update: Some(self.path.to_string()),
                resolved,
            },
            params: None,
            source: self.options.source.clone(),
            debug: listener.options.debug || self.options.debug,
            data: self.options.data.clone(),
        }
    }
}

/// One resolved delivery: the value at `path` for one collection.
struct Delivery<'v> {
    path: String,
    segments_len: usize,
    value: Option<&'v Value>,
}

/// Plans the notifications for one changed path. `tree` already holds
/// `new_value` at `changed`.
pub(crate) fn resolve_change(
    plan: &mut Plan,
    registry: &Registry,
    tree: &Value,
    changed: &str,
    new_value: &Value,
    ctx: &UpdateContext<'_>,
) {
    let segments = split(changed, ctx.separator);
    if !ctx.only.is_empty() && tree::is_container(new_value) {
        resolve_only(plan, registry, tree, changed, new_value, ctx);
        return;
    }

    let mut notified: HashSet<&str> = HashSet::new();

    for (key, collection) in registry {
        let Some(cut) = collection.match_update(&segments) else {
            continue;
        };
        notified.insert(key.as_str());
        let value = if collection.is_recursive || collection.is_wildcard {
            tree::get(tree, &segments[..cut])
        } else {
            Some(new_value)
        };
        let delivery = Delivery {
            path: segments[..cut].join(ctx.separator),
            segments_len: cut,
            value,
        };
        deliver(plan, key, collection, &segments, &delivery, ctx);
    }

    if !tree::is_container(new_value) {
        return;
    }

    for (key, collection) in registry {
        if notified.contains(key.as_str()) {
            continue;
        }
        let start = collection.pattern.advance(&segments);
        if start.is_empty() {
            continue;
        }
        let found = PathScanner::new(new_value).scan_from(&collection.pattern, &start);
        for (relative, value) in found {
            let full = join(changed, &relative, ctx.separator);
            let full_segments = split(&full, ctx.separator);
            let delivery = Delivery {
                path: full.clone(),
                segments_len: full_segments.len(),
                value: Some(value),
            };
            deliver(plan, key, collection, &full_segments, &delivery, ctx);
        }
    }
}

/// Notifies only the listeners matching the update's `only` sub-paths.
fn resolve_only(
    plan: &mut Plan,
    registry: &Registry,
    tree: &Value,
    changed: &str,
    new_value: &Value,
    ctx: &UpdateContext<'_>,
) {
    for relative_pattern in ctx.only {
        let found = PathScanner::new(new_value).scan(relative_pattern);
        for relative in found.keys() {
            let full = join(changed, relative, ctx.separator);
            let full_segments = split(&full, ctx.separator);
            for (key, collection) in registry {
                let Some(cut) = collection.match_update(&full_segments) else {
                    continue;
                };
                let delivery = Delivery {
                    path: full_segments[..cut].join(ctx.separator),
                    segments_len: cut,
                    value: tree::get(tree, &full_segments[..cut]),
                };
                deliver(plan, key, collection, &full_segments, &delivery, ctx);
            }
        }
    }
}

/// Queues one delivery to every listener of `collection`. A single listener
/// receives a given path at most once per plan.
fn deliver(
    plan: &mut Plan,
    key: &str,
    collection: &ListenerCollection,
    segments: &[&str],
    delivery: &Delivery<'_>,
    ctx: &UpdateContext<'_>,
) {
    let params = collection.params_for(&segments[..delivery.segments_len]);
    for (id, listener) in &collection.listeners {
        if !plan
            .delivered
            .insert((key.to_string(), *id, delivery.path.clone()))
        {
            continue;
        }
        if listener.options.bulk {
            let entry = BulkEntry {
                path: delivery.path.clone(),
                params: params.clone(),
                value: delivery.value.cloned(),
            };
            plan.push_bulk(key, *id, listener, entry, || ctx.info(listener, &collection.path, None));
        } else {
            let mut info = ctx.info(listener, &collection.path, Some(delivery.path.clone()));
            info.params = params.clone();
            plan.push(*id, listener, EventValue::Single(delivery.value.cloned()), info);
        }
    }
}

/// Plans the initial replay for a listener that has just subscribed.
pub(crate) fn resolve_replay(
    plan: &mut Plan,
    collection: &ListenerCollection,
    id: ListenerId,
    listener: &Listener,
    tree: &Value,
    separator: &str,
) {
    let info = |resolved: Option<String>, params| EventInfo {
        kind: EventKind::Subscribe,
        path: PathInfo {
            listener: collection.path.clone(),
            update: None,
            resolved,
        },
        params,
        source: listener.options.source.clone(),
        debug: listener.options.debug,
        data: listener.options.data.clone(),
    };

    if !collection.is_wildcard {
        let segments = split(&collection.path, separator);
        let value = tree::get(tree, &segments).cloned();
        let info = info(Some(collection.path.clone()), collection.params_for(&segments));
        plan.push(id, listener, EventValue::Single(value), info);
        return;
    }

    let found = PathScanner::new(tree).scan(&collection.pattern);
    if listener.options.bulk {
        let entries = found
            .into_iter()
            .map(|(path, value)| BulkEntry {
                params: collection.params_for(&split(&path, separator)),
                value: Some(value.clone()),
                path,
            })
            .collect();
        plan.push(id, listener, EventValue::Bulk(entries), info(None, None));
        return;
    }
    for (path, value) in found {
        let params = collection.params_for(&split(&path, separator));
        let info = info(Some(path), params);
        plan.push(id, listener, EventValue::Single(Some(value.clone())), info);
    }
}
