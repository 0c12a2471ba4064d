//! Tagged-object registry: a weak set of live [`Taggable`] objects with
//! tag queries.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::{
    container::TagSet,
    tag::Tag,
    taggable::{ListenerId, Taggable},
};

struct Entry {
    id: ListenerId,
    object: Weak<dyn Taggable>,
}

/// Registry of tagged objects.
///
/// Holds objects weakly, so registration never extends a lifetime; objects
/// dropped without unregistering simply stop showing up. Query results
/// keep registration order.
#[derive(Default)]
pub struct TaggedRegistry {
    entries: RefCell<Vec<Entry>>,
}

impl TaggedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `object`. Returns `false` if it is already registered.
    pub fn register(&self, object: Rc<dyn Taggable>) -> bool {
        let id = ListenerId::of(&object);
        let mut entries = self.entries.borrow_mut();
        entries.retain(|e| e.object.strong_count() > 0);
        if entries.iter().any(|e| e.id == id) {
            return false;
        }
        entries.push(Entry {
            id,
            object: Rc::downgrade(&object),
        });
        debug!(listener = %id, "registered tagged object");
        true
    }

    /// Remove the object with `id`. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        if removed {
            debug!(listener = %id, "unregistered tagged object");
        }
        removed
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|e| e.id == id && e.object.strong_count() > 0)
    }

    /// Live objects in registration order.
    ///
    /// The registry is not borrowed while callers inspect the result, so
    /// objects may register or unregister from inside their own methods.
    pub fn registered(&self) -> Vec<Rc<dyn Taggable>> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| e.object.upgrade())
            .collect()
    }

    /// Objects whose tags match `tag` hierarchically. Empty for an invalid tag.
    pub fn query(&self, tag: Tag) -> Vec<Rc<dyn Taggable>> {
        if !tag.is_valid() {
            return Vec::new();
        }
        self.filter(|object| object.has_tag(tag))
    }

    /// Objects carrying at least one of `tags`.
    pub fn query_any(&self, tags: &TagSet) -> Vec<Rc<dyn Taggable>> {
        self.filter(|object| object.has_any_tags(tags))
    }

    /// Objects carrying every one of `tags`. Every object matches an empty set.
    pub fn query_all(&self, tags: &TagSet) -> Vec<Rc<dyn Taggable>> {
        self.filter(|object| object.has_all_tags(tags))
    }

    fn filter(&self, predicate: impl Fn(&dyn Taggable) -> bool) -> Vec<Rc<dyn Taggable>> {
        let matches: Vec<_> = self
            .registered()
            .into_iter()
            .filter(|object| predicate(object.as_ref()))
            .collect();
        trace!(matches = matches.len(), "registry query");
        matches
    }

    /// Number of live registered objects.
    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.object.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Barrel {
        tags: RefCell<TagSet>,
    }

    impl Taggable for Barrel {
        fn tags(&self) -> TagSet {
            self.tags.borrow().clone()
        }
        fn set_tags(&self, tags: TagSet) {
            *self.tags.borrow_mut() = tags;
        }
        fn add_tag(&self, tag: Tag) {
            self.tags.borrow_mut().insert(tag);
        }
        fn add_tags(&self, tags: &TagSet) {
            self.tags.borrow_mut().append(tags);
        }
        fn remove_tag(&self, tag: Tag) {
            self.tags.borrow_mut().remove(tag);
        }
        fn remove_tags(&self, tags: &TagSet) {
            self.tags.borrow_mut().remove_all(tags);
        }
        fn clear_tags(&self) {
            self.tags.borrow_mut().clear();
        }
    }

    fn tag(path: &str) -> Tag {
        Tag::parse(path).unwrap()
    }

    fn barrel(paths: &[&str]) -> Rc<Barrel> {
        let object = Rc::new(Barrel::default());
        object.set_tags(paths.iter().map(|p| tag(p)).collect());
        object
    }

    #[test]
    fn register_is_unique() {
        let registry = TaggedRegistry::new();
        let object = barrel(&["A"]);

        assert!(registry.register(object.clone()));
        assert!(!registry.register(object.clone()));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(ListenerId::of(&object)));

        assert!(registry.unregister(ListenerId::of(&object)));
        assert!(!registry.unregister(ListenerId::of(&object)));
        assert!(registry.is_empty());
    }

    #[test]
    fn queries_are_hierarchical_and_ordered() {
        let registry = TaggedRegistry::new();
        let a = barrel(&["Combat.Melee"]);
        let b = barrel(&["Combat.Ranged", "Status.Stunned"]);
        let c = barrel(&["Status.Stunned"]);
        for object in [&a, &b, &c] {
            registry.register(object.clone());
        }

        let ids = |found: Vec<Rc<dyn Taggable>>| -> Vec<ListenerId> {
            found.iter().map(ListenerId::of).collect()
        };
        let (a_id, b_id, c_id) = (ListenerId::of(&a), ListenerId::of(&b), ListenerId::of(&c));

        assert_eq!(ids(registry.query(tag("Combat"))), [a_id, b_id]);
        assert_eq!(ids(registry.query(tag("Status"))), [b_id, c_id]);
        assert!(registry.query(Tag::EMPTY).is_empty());

        let both = TagSet::from([tag("Combat"), tag("Status")]);
        assert_eq!(ids(registry.query_all(&both)), [b_id]);
        assert_eq!(ids(registry.query_any(&both)), [a_id, b_id, c_id]);
        assert_eq!(registry.query_all(&TagSet::new()).len(), 3);
        assert!(registry.query_any(&TagSet::new()).is_empty());
    }

    #[test]
    fn dropped_objects_disappear() {
        let registry = TaggedRegistry::new();
        let keep = barrel(&["A"]);
        registry.register(keep.clone());
        {
            let gone = barrel(&["A"]);
            registry.register(gone.clone());
            assert_eq!(registry.query(tag("A")).len(), 2);
        }
        assert_eq!(registry.query(tag("A")).len(), 1);
        assert_eq!(registry.len(), 1);
    }
}
