use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use crate::tag::Tag;

use super::{TagValue, TagValueMap, TagValueRepository};

/// Plain in-memory repository. Also serves as the store's default.
#[derive(Clone, Debug)]
pub struct MemoryRepository {
    name: String,
    priority: i32,
    values: TagValueMap,
}

impl MemoryRepository {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            values: TagValueMap::new(),
        }
    }

    /// Convenience for `Rc::new(RefCell::new(..))`.
    pub fn shared(name: impl Into<String>, priority: i32) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(name, priority)))
    }

    pub fn values(&self) -> &TagValueMap {
        &self.values
    }
}

impl TagValueRepository for MemoryRepository {
    fn get_value(&self, tag: Tag) -> Option<TagValue> {
        self.values.get(tag)
    }

    fn set_value(&mut self, tag: Tag, value: TagValue) {
        self.values.set(tag, value, &self.name);
    }

    fn has_value(&self, tag: Tag) -> bool {
        self.values.contains(tag)
    }

    fn clear_value(&mut self, tag: Tag) {
        self.values.remove(tag);
    }

    fn clear_all_values(&mut self) {
        self.values.clear();
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
