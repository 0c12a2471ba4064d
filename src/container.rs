//! [`TagSet`], the tag container carried by tagged objects and event payloads.

use std::collections::HashSet;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::tag::Tag;

/// An unordered set of tags with hierarchical queries.
///
/// Also usable as a Bevy component:
///
/// ```ignore
/// commands.spawn(TagSet::new().with(Tags::Combat::Melee::TAG));
/// ```
///
/// Invalid (empty) tags are silently dropped on insertion, so every stored
/// tag is valid.
#[derive(Component, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashSet<Tag>", into = "HashSet<Tag>")]
pub struct TagSet {
    tags: HashSet<Tag>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding just `tag` (or nothing, if `tag` is empty).
    pub fn single(tag: Tag) -> Self {
        Self::new().with(tag)
    }

    /// Builder-style insert.
    pub fn with(mut self, tag: Tag) -> Self {
        self.insert(tag);
        self
    }

    /// Insert a tag. Returns `true` if it was newly added.
    pub fn insert(&mut self, tag: Tag) -> bool {
        tag.is_valid() && self.tags.insert(tag)
    }

    /// Remove a tag. Returns `true` if it was present.
    pub fn remove(&mut self, tag: Tag) -> bool {
        self.tags.remove(&tag)
    }

    /// Add every tag of `other`.
    pub fn append(&mut self, other: &TagSet) {
        self.tags.extend(other.iter());
    }

    /// Remove every tag of `other`. Returns `true` if anything was removed.
    pub fn remove_all(&mut self, other: &TagSet) -> bool {
        let before = self.tags.len();
        self.tags.retain(|tag| !other.tags.contains(tag));
        self.tags.len() != before
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }

    /// Hierarchical membership: does any contained tag equal `tag` or
    /// descend from it?
    ///
    /// A set holding `Combat.Melee.Hit` answers `true` for `Combat`.
    pub fn has(&self, tag: Tag) -> bool {
        tag.is_valid() && self.tags.iter().any(|t| t.is_descendant_of(tag))
    }

    /// Exact membership.
    pub fn has_exact(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// True if every tag of `other` is matched hierarchically. Vacuously true
    /// for an empty `other`.
    pub fn has_all(&self, other: &TagSet) -> bool {
        other.iter().all(|tag| self.has(tag))
    }

    /// True if any tag of `other` is matched hierarchically. False for an
    /// empty `other`.
    pub fn has_any(&self, other: &TagSet) -> bool {
        other.iter().any(|tag| self.has(tag))
    }

    pub fn has_all_exact(&self, other: &TagSet) -> bool {
        other.tags.is_subset(&self.tags)
    }

    pub fn has_any_exact(&self, other: &TagSet) -> bool {
        !self.tags.is_disjoint(&other.tags)
    }

    /// Contained tags under `ancestor` (inclusive).
    pub fn descendants_of(&self, ancestor: Tag) -> impl Iterator<Item = Tag> + '_ {
        self.tags
            .iter()
            .copied()
            .filter(move |tag| tag.is_descendant_of(ancestor))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.tags.iter().copied()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut set = TagSet::new();
        set.extend(iter);
        set
    }
}

impl From<HashSet<Tag>> for TagSet {
    fn from(tags: HashSet<Tag>) -> Self {
        tags.into_iter().collect()
    }
}

impl From<TagSet> for HashSet<Tag> {
    fn from(set: TagSet) -> Self {
        set.tags
    }
}

impl Extend<Tag> for TagSet {
    fn extend<I: IntoIterator<Item = Tag>>(&mut self, iter: I) {
        for tag in iter {
            self.insert(tag);
        }
    }
}

impl From<Tag> for TagSet {
    fn from(tag: Tag) -> Self {
        TagSet::single(tag)
    }
}

impl<const N: usize> From<[Tag; N]> for TagSet {
    fn from(tags: [Tag; N]) -> Self {
        tags.into_iter().collect()
    }
}
