//! The capability shared by everything the registry can track.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::{container::TagSet, tag::Tag};

/// An object that owns a [`TagSet`].
///
/// Methods take `&self`: implementors keep their tags behind interior
/// mutability so shared `Rc` handles can update them.
pub trait Taggable {
    /// Snapshot of the current tags.
    fn tags(&self) -> TagSet;

    fn set_tags(&self, tags: TagSet);

    fn add_tag(&self, tag: Tag);

    fn add_tags(&self, tags: &TagSet);

    fn remove_tag(&self, tag: Tag);

    fn remove_tags(&self, tags: &TagSet);

    fn clear_tags(&self);

    /// Hierarchical membership, see [`TagSet::has`].
    fn has_tag(&self, tag: Tag) -> bool {
        self.tags().has(tag)
    }

    fn has_all_tags(&self, tags: &TagSet) -> bool {
        self.tags().has_all(tags)
    }

    fn has_any_tags(&self, tags: &TagSet) -> bool {
        self.tags().has_any(tags)
    }
}

/// Kind of tag mutation reported to change handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagChange {
    Set,
    Add,
    Remove,
    Clear,
}

/// Identity of a shared object, derived from its allocation address.
///
/// Stable for as long as the object is alive. Used to key registry entries
/// and event bindings without holding the object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(usize);

impl ListenerId {
    pub fn of<T: ?Sized>(object: &Rc<T>) -> Self {
        Self(Rc::as_ptr(object).cast::<()>() as usize)
    }

    pub fn of_weak<T: ?Sized>(object: &Weak<T>) -> Self {
        Self(Weak::as_ptr(object).cast::<()>() as usize)
    }

    /// An id not tied to any object, for listeners managed by hand.
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({:#x})", self.0)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
