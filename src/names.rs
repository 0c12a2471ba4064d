//! Tag names: runtime lookup between dotted paths and [`Tag`]s.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{error::TagError, tag::Tag};

/// Runtime entry for a registered tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagEntry {
    pub tag: Tag,
    pub path: String,
}

/// Table of known tags.
///
/// Provides:
/// - Path ↔ Tag bidirectional lookup
/// - Runtime registration with automatic parent creation
/// - GID collision detection
///
/// Tags work without ever being registered here; the table only exists so
/// paths can be validated, requested by name and displayed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagNames {
    entries: Vec<TagEntry>,
    path_to_idx: HashMap<String, usize>,
    tag_to_idx: HashMap<Tag, usize>,
}

impl TagNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a list of paths (for instance the `PATHS` constant
    /// generated by `tags!`).
    pub fn from_paths<I, S>(paths: I) -> Result<Self, TagError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = Self::new();
        for path in paths {
            names.register(path.as_ref())?;
        }
        Ok(names)
    }

    /// Register a path at runtime. Parents are created if they don't exist.
    ///
    /// Registering an existing path is a no-op returning its tag.
    ///
    /// # Errors
    ///
    /// - the path is empty, malformed or deeper than `MAX_DEPTH`
    /// - the path hashes to the same GID as a different registered path
    pub fn register(&mut self, path: &str) -> Result<Tag, TagError> {
        if let Some(&idx) = self.path_to_idx.get(path) {
            return Ok(self.entries[idx].tag);
        }
        let tag = Tag::parse(path)?;

        for (end, _) in path.match_indices('.') {
            self.insert(&path[..end])?;
        }
        self.insert(path)?;

        debug!(path, %tag, "registered tag");
        Ok(tag)
    }

    fn insert(&mut self, path: &str) -> Result<Tag, TagError> {
        if let Some(&idx) = self.path_to_idx.get(path) {
            return Ok(self.entries[idx].tag);
        }
        let tag = Tag::parse(path)?;

        if let Some(&existing) = self.tag_to_idx.get(&tag) {
            return Err(TagError::Collision {
                path: path.to_string(),
                existing: self.entries[existing].path.clone(),
                gid: tag.gid(),
            });
        }

        let idx = self.entries.len();
        self.entries.push(TagEntry {
            tag,
            path: path.to_string(),
        });
        self.path_to_idx.insert(path.to_string(), idx);
        self.tag_to_idx.insert(tag, idx);
        Ok(tag)
    }

    /// Path → Tag
    #[inline]
    pub fn tag_of(&self, path: &str) -> Option<Tag> {
        self.path_to_idx.get(path).map(|&i| self.entries[i].tag)
    }

    /// Tag → Path
    #[inline]
    pub fn path_of(&self, tag: Tag) -> Option<&str> {
        self.tag_to_idx
            .get(&tag)
            .map(|&i| self.entries[i].path.as_str())
    }

    /// Look up a registered tag by path, logging and returning
    /// [`Tag::EMPTY`] when it is unknown.
    pub fn request(&self, path: &str) -> Tag {
        match self.tag_of(path) {
            Some(tag) => tag,
            None => {
                warn!(path, "requested tag is not registered");
                Tag::EMPTY
            }
        }
    }

    /// Human readable form: the registered path, or the hex GID otherwise.
    pub fn display(&self, tag: Tag) -> String {
        match self.path_of(tag) {
            Some(path) => path.to_string(),
            None => tag.to_string(),
        }
    }

    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.path_to_idx.contains_key(path)
    }

    #[inline]
    pub fn contains_tag(&self, tag: Tag) -> bool {
        self.tag_to_idx.contains_key(&tag)
    }

    /// All registered tags under `ancestor` (inclusive), in registration order.
    pub fn descendants_of(&self, ancestor: Tag) -> Vec<Tag> {
        self.entries
            .iter()
            .map(|e| e.tag)
            .filter(|tag| tag.is_descendant_of(ancestor))
            .collect()
    }

    /// Registered direct children of `parent`.
    pub fn children_of(&self, parent: Tag) -> Vec<Tag> {
        self.entries
            .iter()
            .map(|e| e.tag)
            .filter(|tag| tag.parent() == Some(parent))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in registration order (parents before children).
    pub fn entries(&self) -> &[TagEntry] {
        &self.entries
    }

    /// `(path, tag)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Tag)> + '_ {
        self.entries.iter().map(|e| (e.path.as_str(), e.tag))
    }
}
