//! [`TagHub`]: the object registry and event router shared by one session.

use std::rc::Rc;

use tracing::debug;

use crate::{
    container::TagSet,
    event::{TagEventCallback, TagEventRouter},
    registry::TaggedRegistry,
    tag::Tag,
    taggable::{ListenerId, Taggable},
    value::TagValue,
};

/// The world-scoped services tagged objects talk to: the object registry
/// and the event router.
///
/// Share it as `Rc<TagHub>`; objects keep only a weak handle.
#[derive(Default)]
pub struct TagHub {
    registry: TaggedRegistry,
    router: TagEventRouter,
}

impl TagHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &TaggedRegistry {
        &self.registry
    }

    pub fn router(&self) -> &TagEventRouter {
        &self.router
    }

    pub fn register(&self, object: Rc<dyn Taggable>) -> bool {
        self.registry.register(object)
    }

    /// Remove `object` from the registry and drop every event binding it
    /// still holds.
    pub fn unregister<T: ?Sized>(&self, object: &Rc<T>) -> bool {
        self.unregister_id(ListenerId::of(object))
    }

    pub fn unregister_id(&self, id: ListenerId) -> bool {
        self.router.unbind_listener(id);
        self.registry.unregister(id)
    }

    pub fn is_registered<T: ?Sized>(&self, object: &Rc<T>) -> bool {
        self.registry.contains(ListenerId::of(object))
    }

    pub fn query(&self, tag: Tag) -> Vec<Rc<dyn Taggable>> {
        self.registry.query(tag)
    }

    pub fn query_any(&self, tags: &TagSet) -> Vec<Rc<dyn Taggable>> {
        self.registry.query_any(tags)
    }

    pub fn query_all(&self, tags: &TagSet) -> Vec<Rc<dyn Taggable>> {
        self.registry.query_all(tags)
    }

    pub fn bind(&self, event_tag: Tag, callback: TagEventCallback, filter: TagSet) -> bool {
        self.router.bind(event_tag, callback, filter)
    }

    pub fn unbind(&self, callback: &TagEventCallback, event_tag: Tag) -> bool {
        self.router.unbind(callback, event_tag)
    }

    pub fn unbind_all(&self, listener: ListenerId, event_tag: Tag) -> usize {
        self.router.unbind_all(listener, event_tag)
    }

    pub fn trigger(
        &self,
        dispatcher: Option<ListenerId>,
        event_tag: Tag,
        payload: &TagValue,
        payload_tags: &TagSet,
    ) -> usize {
        self.router.trigger(dispatcher, event_tag, payload, payload_tags)
    }

    pub fn listeners(&self, event_tag: Tag) -> Vec<ListenerId> {
        self.router.listeners(event_tag)
    }

    /// Drop all registrations and bindings.
    pub fn shutdown(&self) {
        debug!(
            objects = self.registry.len(),
            tags = self.router.bound_tags().len(),
            "tag hub shutting down"
        );
        self.router.clear();
        self.registry.clear();
    }
}
