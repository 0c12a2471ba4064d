//! Free helpers over [`Taggable`] objects.

use std::rc::Rc;

use crate::{
    container::TagSet,
    taggable::{TagChange, Taggable},
};

/// How [`has_tags`] combines the queried tags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TagCheck {
    /// At least one tag matches.
    #[default]
    Any,
    /// Every tag matches.
    All,
}

pub fn has_tags(object: &dyn Taggable, tags: &TagSet, check: TagCheck) -> bool {
    match check {
        TagCheck::Any => object.has_any_tags(tags),
        TagCheck::All => object.has_all_tags(tags),
    }
}

/// Objects carrying every tag of `tags`, in input order.
pub fn filter_with_tags(objects: &[Rc<dyn Taggable>], tags: &TagSet) -> Vec<Rc<dyn Taggable>> {
    objects
        .iter()
        .filter(|object| object.has_all_tags(tags))
        .cloned()
        .collect()
}

/// Apply a bulk change and return the object's resulting tags.
///
/// `tags` is ignored for [`TagChange::Clear`].
pub fn apply_tag_change(object: &dyn Taggable, tags: &TagSet, change: TagChange) -> TagSet {
    match change {
        TagChange::Set => object.set_tags(tags.clone()),
        TagChange::Add => object.add_tags(tags),
        TagChange::Remove => object.remove_tags(tags),
        TagChange::Clear => object.clear_tags(),
    }
    object.tags()
}
