//! Tag-keyed values: opaque payloads, repositories and the prioritized store.
//!
//! ```text
//! read:  explicit repositories (highest priority first) → default repository
//! write: named repository | first explicit repository | default repository
//! ```

mod asset;
mod memory;
mod scoped;
mod store;

use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::tag::Tag;

pub use asset::AssetRepository;
pub use memory::MemoryRepository;
pub use scoped::ScopedRepository;
pub use store::TagValueStore;

/// An opaque, cheaply clonable value of any `'static` type.
///
/// Clones share the same underlying object. An empty value is "invalid":
/// storing one leaves the tag without a readable value.
#[derive(Clone)]
pub struct TagValue {
    inner: Option<Rc<dyn Any>>,
    type_name: &'static str,
}

impl TagValue {
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            inner: Some(Rc::new(value)),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub const fn empty() -> Self {
        Self {
            inner: None,
            type_name: "<empty>",
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    /// Name of the stored type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Exact runtime type check.
    pub fn is<T: 'static>(&self) -> bool {
        self.inner
            .as_deref()
            .is_some_and(|value| value.is::<T>())
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_deref()?.downcast_ref::<T>()
    }

    /// Clone the value out if it is exactly a `T`.
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Do both values share the same underlying object?
    pub fn ptr_eq(&self, other: &TagValue) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Default for TagValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TagValue").field(&self.type_name).finish()
    }
}

/// A named, prioritized source of tag-keyed values.
///
/// The store reads repositories in descending [`priority`](Self::priority)
/// order and selects write targets by [`name`](Self::name).
pub trait TagValueRepository {
    /// The value stored under `tag`, if any. Invalid payloads read as `None`.
    fn get_value(&self, tag: Tag) -> Option<TagValue>;

    fn set_value(&mut self, tag: Tag, value: TagValue);

    /// True only when a valid payload is stored under `tag`.
    fn has_value(&self, tag: Tag) -> bool;

    fn clear_value(&mut self, tag: Tag);

    fn clear_all_values(&mut self);

    fn name(&self) -> Cow<'_, str>;

    fn priority(&self) -> i32;

    /// Typed read: `Some` only when the stored value is exactly a `T`.
    fn get<T: Clone + 'static>(&self, tag: Tag) -> Option<T>
    where
        Self: Sized,
    {
        self.get_value(tag)?.get::<T>()
    }

    fn set<T: 'static>(&mut self, tag: Tag, value: T)
    where
        Self: Sized,
    {
        self.set_value(tag, TagValue::new(value));
    }
}

/// Shared handle to a repository, as registered with a [`TagValueStore`].
pub type SharedRepository = Rc<RefCell<dyn TagValueRepository>>;

/// The store only observes explicit repositories.
pub(crate) type WeakRepository = Weak<RefCell<dyn TagValueRepository>>;

/// Map storage used by the bundled repositories.
#[derive(Clone, Debug, Default)]
pub struct TagValueMap {
    values: HashMap<Tag, TagValue>,
}

impl TagValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: Tag) -> Option<TagValue> {
        self.values.get(&tag).filter(|v| v.is_valid()).cloned()
    }

    /// Store `value` under `tag`; invalid tags are rejected with a warning
    /// naming `owner`.
    pub fn set(&mut self, tag: Tag, value: TagValue, owner: &str) -> bool {
        if !tag.is_valid() {
            warn!(repository = owner, "refusing to store a value under the empty tag");
            return false;
        }
        self.values.insert(tag, value);
        true
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.values.get(&tag).is_some_and(TagValue::is_valid)
    }

    pub fn remove(&mut self, tag: Tag) -> Option<TagValue> {
        self.values.remove(&tag)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tag, &TagValue)> + '_ {
        self.values.iter().map(|(tag, value)| (*tag, value))
    }
}
