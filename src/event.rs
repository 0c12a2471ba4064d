//! Tag event router: publish/subscribe keyed by event tag, with optional
//! payload filters.
//!
//! Dispatch works on a snapshot of the bindings, taken before the first
//! callback runs. Callbacks may bind, unbind or trigger re-entrantly:
//!
//! - bindings added during a dispatch are not invoked by that dispatch
//! - bindings removed during a dispatch are not invoked after removal
//! - nested triggers run to completion before the outer dispatch resumes

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::{container::TagSet, tag::Tag, taggable::ListenerId, value::TagValue};

/// What a callback receives.
#[derive(Clone, Copy, Debug)]
pub struct TagEvent<'a> {
    /// Object that broadcast the event, if any.
    pub dispatcher: Option<ListenerId>,
    pub tag: Tag,
    pub payload: &'a TagValue,
    pub payload_tags: &'a TagSet,
}

pub type TagEventHandler = Rc<dyn Fn(&TagEvent<'_>)>;

/// A listener-scoped callback.
///
/// Two callbacks are equal when they share a listener and a handler name;
/// the closure takes no part in identity. An unbound callback (no closure)
/// still works as a key for [`TagEventRouter::unbind`].
#[derive(Clone)]
pub struct TagEventCallback {
    listener: ListenerId,
    name: Cow<'static, str>,
    handler: Option<TagEventHandler>,
}

impl TagEventCallback {
    pub fn new(
        listener: ListenerId,
        name: impl Into<Cow<'static, str>>,
        handler: impl Fn(&TagEvent<'_>) + 'static,
    ) -> Self {
        Self {
            listener,
            name: name.into(),
            handler: Some(Rc::new(handler)),
        }
    }

    /// Identity only, without a closure.
    pub fn key(listener: ListenerId, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            listener,
            name: name.into(),
            handler: None,
        }
    }

    pub fn listener(&self) -> ListenerId {
        self.listener
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bound(&self) -> bool {
        self.handler.is_some()
    }

    fn execute(&self, event: &TagEvent<'_>) {
        if let Some(handler) = &self.handler {
            handler(event);
        }
    }
}

impl PartialEq for TagEventCallback {
    fn eq(&self, other: &Self) -> bool {
        self.listener == other.listener && self.name == other.name
    }
}

impl Eq for TagEventCallback {}

impl fmt::Debug for TagEventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagEventCallback")
            .field("listener", &self.listener)
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[derive(Clone)]
struct Binding {
    /// Router-unique, identifies this binding across snapshots.
    seq: u64,
    callback: TagEventCallback,
    filter: TagSet,
}

impl Binding {
    fn accepts(&self, payload_tags: &TagSet) -> bool {
        self.filter.is_empty() || payload_tags.has_all(&self.filter)
    }
}

/// Routes triggered events to the callbacks bound under the event tag.
///
/// Within one tag, callbacks run in binding order. Routing is by exact tag
/// equality: binding `Combat` does not receive `Combat.Hit`.
#[derive(Default)]
pub struct TagEventRouter {
    buckets: RefCell<HashMap<Tag, Vec<Binding>>>,
    next_seq: Cell<u64>,
}

impl TagEventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `callback` under `event_tag`.
    ///
    /// An empty `filter` accepts every payload; otherwise the payload tags
    /// must contain all filter tags (hierarchically). Re-binding an equal
    /// callback is a no-op that keeps the original binding.
    pub fn bind(&self, event_tag: Tag, callback: TagEventCallback, filter: TagSet) -> bool {
        if !event_tag.is_valid() || !callback.is_bound() {
            warn!(%event_tag, ?callback, "ignoring bind of empty tag or unbound callback");
            return false;
        }
        let mut buckets = self.buckets.borrow_mut();
        let bucket = buckets.entry(event_tag).or_default();
        if bucket.iter().any(|b| b.callback == callback) {
            return false;
        }

        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        trace!(%event_tag, listener = %callback.listener, name = callback.name(), "bound callback");
        bucket.push(Binding {
            seq,
            callback,
            filter,
        });
        true
    }

    /// Remove the binding equal to `callback` under `event_tag`.
    pub fn unbind(&self, callback: &TagEventCallback, event_tag: Tag) -> bool {
        self.remove_where(event_tag, |b| b.callback == *callback) > 0
    }

    /// Remove every binding of `listener` under `event_tag`.
    pub fn unbind_all(&self, listener: ListenerId, event_tag: Tag) -> usize {
        self.remove_where(event_tag, |b| b.callback.listener == listener)
    }

    /// Remove every binding of `listener` under any tag.
    pub fn unbind_listener(&self, listener: ListenerId) -> usize {
        let mut buckets = self.buckets.borrow_mut();
        let mut removed = 0;
        buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|b| b.callback.listener != listener);
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        if removed > 0 {
            debug!(%listener, removed, "unbound listener from all tags");
        }
        removed
    }

    fn remove_where(&self, event_tag: Tag, matches: impl Fn(&Binding) -> bool) -> usize {
        let mut buckets = self.buckets.borrow_mut();
        let Some(bucket) = buckets.get_mut(&event_tag) else {
            return 0;
        };
        let before = bucket.len();
        bucket.retain(|b| !matches(b));
        let removed = before - bucket.len();
        if bucket.is_empty() {
            buckets.remove(&event_tag);
        }
        removed
    }

    fn is_live(&self, event_tag: Tag, seq: u64) -> bool {
        self.buckets
            .borrow()
            .get(&event_tag)
            .is_some_and(|bucket| bucket.iter().any(|b| b.seq == seq))
    }

    /// Deliver an event to every binding under `event_tag` whose filter
    /// accepts `payload_tags`. Returns the number of callbacks invoked.
    pub fn trigger(
        &self,
        dispatcher: Option<ListenerId>,
        event_tag: Tag,
        payload: &TagValue,
        payload_tags: &TagSet,
    ) -> usize {
        if !event_tag.is_valid() {
            return 0;
        }
        let snapshot: Vec<Binding> = self
            .buckets
            .borrow()
            .get(&event_tag)
            .cloned()
            .unwrap_or_default();
        if snapshot.is_empty() {
            trace!(%event_tag, "no bindings for triggered tag");
            return 0;
        }

        let event = TagEvent {
            dispatcher,
            tag: event_tag,
            payload,
            payload_tags,
        };
        let mut delivered = 0;
        for binding in &snapshot {
            if !self.is_live(event_tag, binding.seq) {
                continue;
            }
            if !binding.accepts(payload_tags) {
                trace!(%event_tag, listener = %binding.callback.listener, "payload rejected by filter");
                continue;
            }
            binding.callback.execute(&event);
            delivered += 1;
        }
        delivered
    }

    /// Distinct listeners bound under `event_tag`, in binding order.
    pub fn listeners(&self, event_tag: Tag) -> Vec<ListenerId> {
        let buckets = self.buckets.borrow();
        let mut listeners = Vec::new();
        for binding in buckets.get(&event_tag).into_iter().flatten() {
            if !listeners.contains(&binding.callback.listener) {
                listeners.push(binding.callback.listener);
            }
        }
        listeners
    }

    pub fn is_bound(&self, event_tag: Tag) -> bool {
        self.buckets.borrow().contains_key(&event_tag)
    }

    pub fn binding_count(&self, event_tag: Tag) -> usize {
        self.buckets.borrow().get(&event_tag).map_or(0, Vec::len)
    }

    /// Tags with at least one binding.
    pub fn bound_tags(&self) -> Vec<Tag> {
        self.buckets.borrow().keys().copied().collect()
    }

    pub fn clear(&self) {
        self.buckets.borrow_mut().clear();
    }
}
