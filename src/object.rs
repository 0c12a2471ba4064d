//! [`TaggedObject`], a ready-made [`Taggable`] that broadcasts and receives
//! tag events through a [`TagHub`].

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::{
    container::TagSet,
    event::{TagEvent, TagEventCallback, TagEventHandler},
    hub::TagHub,
    tag::Tag,
    taggable::{ListenerId, TagChange, Taggable},
    value::TagValue,
};

/// Handler name used for the object's own event binding.
pub const EVENT_HANDLER_NAME: &str = "handle_tag_event";

pub type TagChangeHandler = Rc<dyn Fn(&TagSet, TagChange)>;

/// Which incoming events an object accepts, judged on the sender's tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SourceFilter {
    #[default]
    None,
    /// Accept only when the payload tags match one of the listed tags.
    Include(TagSet),
    /// Reject when the payload tags match one of the listed tags.
    Exclude(TagSet),
}

impl SourceFilter {
    pub fn accepts(&self, source_tags: &TagSet) -> bool {
        match self {
            SourceFilter::None => true,
            SourceFilter::Include(required) => required.is_empty() || source_tags.has_any(required),
            SourceFilter::Exclude(rejected) => !source_tags.has_any(rejected),
        }
    }
}

/// A named object with tags, change notifications and a message channel.
///
/// Lifecycle:
///
/// ```ignore
/// let hub = Rc::new(TagHub::new());
/// let guard = TaggedObject::new("Guard");
/// guard.set_message_tag(Tags::Alert::TAG);
/// guard.begin_play(&hub);   // registers and binds to Alert
/// guard.broadcast_message(TagValue::new(3_u32));
/// guard.end_play();         // unbinds and unregisters
/// ```
///
/// Tag mutations notify change handlers with the new tag snapshot when
/// something changed; `set_tags` always notifies. Dropping an object that is
/// still in play ends its play.
pub struct TaggedObject {
    name: String,
    this: Weak<TaggedObject>,
    tags: RefCell<TagSet>,
    change_handlers: RefCell<Vec<TagChangeHandler>>,
    event_handlers: RefCell<Vec<TagEventHandler>>,
    message_tag: Cell<Tag>,
    bound_tag: Cell<Tag>,
    source_filter: RefCell<SourceFilter>,
    hub: RefCell<Weak<TagHub>>,
}

impl TaggedObject {
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Self::with_tags(name, TagSet::new())
    }

    pub fn with_tags(name: impl Into<String>, tags: TagSet) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|this| Self {
            name,
            this: this.clone(),
            tags: RefCell::new(tags),
            change_handlers: RefCell::default(),
            event_handlers: RefCell::default(),
            message_tag: Cell::new(Tag::EMPTY),
            bound_tag: Cell::new(Tag::EMPTY),
            source_filter: RefCell::default(),
            hub: RefCell::new(Weak::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ListenerId {
        ListenerId::of_weak(&self.this)
    }

    pub fn on_tags_changed(&self, handler: impl Fn(&TagSet, TagChange) + 'static) {
        self.change_handlers.borrow_mut().push(Rc::new(handler));
    }

    /// Called for each accepted incoming event.
    pub fn on_event_received(&self, handler: impl Fn(&TagEvent<'_>) + 'static) {
        self.event_handlers.borrow_mut().push(Rc::new(handler));
    }

    pub fn message_tag(&self) -> Tag {
        self.message_tag.get()
    }

    /// Tag the object is currently bound under, or [`Tag::EMPTY`].
    pub fn bound_tag(&self) -> Tag {
        self.bound_tag.get()
    }

    pub fn source_filter(&self) -> SourceFilter {
        self.source_filter.borrow().clone()
    }

    pub fn set_source_filter(&self, filter: SourceFilter) {
        *self.source_filter.borrow_mut() = filter;
    }

    /// Change the channel tag. While in play, the binding moves with it.
    pub fn set_message_tag(&self, tag: Tag) {
        if self.message_tag.get() == tag {
            return;
        }
        self.message_tag.set(tag);
        self.update_binding(true);
    }

    /// Join `hub`: register and bind under the message tag. An object already
    /// in play on another hub leaves that one first.
    pub fn begin_play(&self, hub: &Rc<TagHub>) {
        if self.hub().is_some_and(|current| !Rc::ptr_eq(&current, hub)) {
            self.end_play();
        }
        *self.hub.borrow_mut() = Rc::downgrade(hub);
        if let Some(this) = self.this.upgrade() {
            hub.register(this);
        }
        self.update_binding(false);
        debug!(object = %self.name, "began play");
    }

    /// Leave the hub: unbind and unregister.
    pub fn end_play(&self) {
        if let Some(hub) = self.hub() {
            let bound = self.bound_tag.get();
            if bound.is_valid() {
                hub.unbind_all(self.id(), bound);
            }
            hub.unregister_id(self.id());
        }
        self.bound_tag.set(Tag::EMPTY);
        *self.hub.borrow_mut() = Weak::new();
        debug!(object = %self.name, "ended play");
    }

    pub fn is_in_play(&self) -> bool {
        self.hub().is_some()
    }

    fn hub(&self) -> Option<Rc<TagHub>> {
        self.hub.borrow().upgrade()
    }

    /// Trigger the message tag with `payload`, carrying this object's tags
    /// as the payload tags. Returns the number of callbacks reached.
    pub fn broadcast_message(&self, payload: TagValue) -> usize {
        let tag = self.message_tag.get();
        if !tag.is_valid() {
            warn!(object = %self.name, "cannot broadcast without a message tag");
            return 0;
        }
        let Some(hub) = self.hub() else {
            warn!(object = %self.name, "cannot broadcast outside of play");
            return 0;
        };
        let source_tags = self.tags();
        hub.trigger(Some(self.id()), tag, &payload, &source_tags)
    }

    fn update_binding(&self, force: bool) {
        let Some(hub) = self.hub() else {
            return;
        };
        let bound = self.bound_tag.get();
        let wanted = self.message_tag.get();
        if !force && bound == wanted {
            return;
        }

        if bound.is_valid() {
            hub.unbind_all(self.id(), bound);
        }
        if wanted.is_valid() {
            let this = self.this.clone();
            let callback = TagEventCallback::new(self.id(), EVENT_HANDLER_NAME, move |event| {
                if let Some(object) = this.upgrade() {
                    object.receive(event);
                }
            });
            hub.bind(wanted, callback, TagSet::new());
            self.bound_tag.set(wanted);
        } else {
            self.bound_tag.set(Tag::EMPTY);
        }
    }

    fn receive(&self, event: &TagEvent<'_>) {
        if !self.source_filter.borrow().accepts(event.payload_tags) {
            trace!(object = %self.name, "event rejected by source filter");
            return;
        }
        let handlers = self.event_handlers.borrow().clone();
        for handler in &handlers {
            handler(event);
        }
    }

    fn notify(&self, tags: &TagSet, change: TagChange) {
        let handlers = self.change_handlers.borrow().clone();
        for handler in &handlers {
            handler(tags, change);
        }
    }

    /// Apply `mutate` to the tags, then notify with the resulting snapshot
    /// if it reports a change.
    fn mutate(&self, change: TagChange, mutate: impl FnOnce(&mut TagSet) -> bool) {
        let snapshot = {
            let mut tags = self.tags.borrow_mut();
            if !mutate(&mut tags) {
                return;
            }
            tags.clone()
        };
        self.notify(&snapshot, change);
    }
}

impl Drop for TaggedObject {
    fn drop(&mut self) {
        if self.is_in_play() {
            self.end_play();
        }
    }
}

impl Taggable for TaggedObject {
    fn tags(&self) -> TagSet {
        self.tags.borrow().clone()
    }

    fn set_tags(&self, tags: TagSet) {
        self.mutate(TagChange::Set, |current| {
            *current = tags;
            true
        });
    }

    fn add_tag(&self, tag: Tag) {
        if !tag.is_valid() {
            return;
        }
        self.mutate(TagChange::Add, |current| {
            current.insert(tag);
            true
        });
    }

    fn add_tags(&self, tags: &TagSet) {
        if tags.is_empty() {
            return;
        }
        self.mutate(TagChange::Add, |current| {
            current.append(tags);
            true
        });
    }

    fn remove_tag(&self, tag: Tag) {
        self.mutate(TagChange::Remove, |current| current.remove(tag));
    }

    fn remove_tags(&self, tags: &TagSet) {
        self.mutate(TagChange::Remove, |current| current.remove_all(tags));
    }

    /// Handlers receive the tags as they were before clearing.
    fn clear_tags(&self) {
        let old = std::mem::take(&mut *self.tags.borrow_mut());
        if !old.is_empty() {
            self.notify(&old, TagChange::Clear);
        }
    }

    fn has_tag(&self, tag: Tag) -> bool {
        self.tags.borrow().has(tag)
    }

    fn has_all_tags(&self, tags: &TagSet) -> bool {
        self.tags.borrow().has_all(tags)
    }

    fn has_any_tags(&self, tags: &TagSet) -> bool {
        self.tags.borrow().has_any(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(path: &str) -> Tag {
        Tag::parse(path).unwrap()
    }

    #[test]
    fn change_handlers_see_snapshots() {
        let object = TaggedObject::new("Crate");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        object.on_tags_changed(move |tags, change| sink.borrow_mut().push((tags.len(), change)));

        object.add_tag(tag("A"));
        object.add_tags(&TagSet::from([tag("B"), tag("C")]));
        object.remove_tag(tag("Z"));
        object.remove_tag(tag("A"));
        object.remove_tags(&TagSet::from([tag("B")]));
        object.remove_tags(&TagSet::from([tag("Z")]));
        object.add_tags(&TagSet::new());
        object.set_tags(TagSet::from([tag("D"), tag("E")]));
        object.clear_tags();
        object.clear_tags();
        object.add_tag(Tag::EMPTY);

        assert_eq!(
            *seen.borrow(),
            [
                (1, TagChange::Add),
                (3, TagChange::Add),
                (2, TagChange::Remove),
                (1, TagChange::Remove),
                (2, TagChange::Set),
                (2, TagChange::Clear),
            ]
        );
    }

    #[test]
    fn handlers_may_read_tags() {
        let object = TaggedObject::new("Reader");
        let weak = Rc::downgrade(&object);
        let seen = Rc::new(Cell::new(false));
        let sink = seen.clone();
        object.on_tags_changed(move |_, _| {
            if let Some(object) = weak.upgrade() {
                sink.set(object.has_tag(tag("A")));
            }
        });

        object.add_tag(tag("A.B"));
        assert!(seen.get());
    }

    #[test]
    fn source_filter_modes() {
        let fire = TagSet::from([tag("Damage.Fire")]);
        let burning = TagSet::from([tag("Damage.Fire.Burn"), tag("Team.Red")]);
        let cold = TagSet::from([tag("Damage.Ice")]);

        assert!(SourceFilter::None.accepts(&cold));
        assert!(SourceFilter::Include(fire.clone()).accepts(&burning));
        assert!(!SourceFilter::Include(fire.clone()).accepts(&cold));
        assert!(!SourceFilter::Exclude(fire.clone()).accepts(&burning));
        assert!(SourceFilter::Exclude(fire).accepts(&cold));

        let either = TagSet::from([tag("Damage.Ice"), tag("Team.Blue")]);
        assert!(SourceFilter::Include(either.clone()).accepts(&cold));
        assert!(!SourceFilter::Exclude(either).accepts(&cold));
        assert!(SourceFilter::Include(TagSet::new()).accepts(&cold));
    }

    #[test]
    fn message_tag_rebinds_in_play() {
        let hub = Rc::new(TagHub::new());
        let object = TaggedObject::new("Radio");
        let (one, two) = (tag("Channel.One"), tag("Channel.Two"));

        object.set_message_tag(one);
        assert_eq!(object.bound_tag(), Tag::EMPTY);

        object.begin_play(&hub);
        assert_eq!(object.bound_tag(), one);
        assert_eq!(hub.listeners(one), [object.id()]);

        object.set_message_tag(two);
        assert!(hub.listeners(one).is_empty());
        assert_eq!(hub.listeners(two), [object.id()]);

        object.set_message_tag(Tag::EMPTY);
        assert_eq!(object.bound_tag(), Tag::EMPTY);
        assert!(hub.router().bound_tags().is_empty());
    }

    #[test]
    fn moving_to_another_hub_leaves_the_first() {
        let (first, second) = (Rc::new(TagHub::new()), Rc::new(TagHub::new()));
        let object = TaggedObject::new("Traveler");
        let ping = tag("Ping");
        object.set_message_tag(ping);

        object.begin_play(&first);
        object.begin_play(&second);
        assert!(!first.is_registered(&object));
        assert!(first.listeners(ping).is_empty());
        assert_eq!(first.trigger(None, ping, &TagValue::empty(), &TagSet::new()), 0);
        assert!(second.is_registered(&object));
        assert_eq!(second.listeners(ping), [object.id()]);

        object.begin_play(&second);
        assert_eq!(second.listeners(ping), [object.id()]);

        object.end_play();
        assert!(!second.is_registered(&object));
        assert!(second.router().bound_tags().is_empty());
        assert!(first.registry().is_empty());
    }

    #[test]
    fn broadcast_requires_tag_and_hub() {
        let hub = Rc::new(TagHub::new());
        let object = TaggedObject::new("Mute");
        assert_eq!(object.broadcast_message(TagValue::empty()), 0);

        object.set_message_tag(tag("Ping"));
        assert_eq!(object.broadcast_message(TagValue::empty()), 0);

        object.begin_play(&hub);
        assert_eq!(object.broadcast_message(TagValue::empty()), 1);

        drop(hub);
        assert!(!object.is_in_play());
        assert_eq!(object.broadcast_message(TagValue::empty()), 0);
    }
}
