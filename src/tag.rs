//! Hierarchical tags packed into a self-describing 128-bit GID.
//!
//! The GID is self-contained: depth is encoded in the top 3 bits and each
//! path segment is hashed into a fixed bit field, so subtree membership is a
//! single mask comparison with no registry lookup.
//!
//! ## GID Layout (u128)
//!
//! ```text
//! ┌─────────┬──────────┬──────────┬──────────┬──────────┬──────────┬──────────┬──────────┬──────────┐
//! │ Depth   │ Level 0  │ Level 1  │ Level 2  │ Level 3  │ Level 4  │ Level 5  │ Level 6  │ Level 7  │
//! │ 3 bits  │ 21 bits  │ 18 bits  │ 16 bits  │ 16 bits  │ 14 bits  │ 14 bits  │ 13 bits  │ 13 bits  │
//! │[127:125]│[124:104] │ [103:86] │ [85:70]  │ [69:54]  │ [53:40]  │ [39:26]  │ [25:13]  │ [12:0]   │
//! └─────────┴──────────┴──────────┴──────────┴──────────┴──────────┴──────────┴──────────┴──────────┘
//! ```
//!
//! A GID of zero is reserved for [`Tag::EMPTY`]. Every hashed segment is
//! non-zero, so no valid tag can collapse to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{error::TagError, GID};

/// Maximum supported tree depth (0-7, encoded in 3 bits).
pub const MAX_DEPTH: usize = 8;

/// Bit position where depth is stored (bits 127:125).
pub const DEPTH_SHIFT: u32 = 125;

/// Mask to extract depth from a GID.
pub const DEPTH_MASK: u128 = 0b111 << DEPTH_SHIFT;

/// Fixed bit widths per level, summing to the 125 payload bits.
pub const LEVEL_WIDTHS: [u32; MAX_DEPTH] = [21, 18, 16, 16, 14, 14, 13, 13];

/// Lowest bit of each level's field. Level 0 sits right under the depth bits.
pub const LEVEL_OFFSETS: [u32; MAX_DEPTH] = {
    let mut offsets = [0u32; MAX_DEPTH];
    let mut top = DEPTH_SHIFT;
    let mut level = 0;
    while level < MAX_DEPTH {
        top -= LEVEL_WIDTHS[level];
        offsets[level] = top;
        level += 1;
    }
    offsets
};

/// `PREFIX_MASKS[d]` keeps the payload bits of levels `0..=d`.
const PREFIX_MASKS: [u128; MAX_DEPTH] = {
    let mut masks = [0u128; MAX_DEPTH];
    let mut acc = 0u128;
    let mut level = 0;
    while level < MAX_DEPTH {
        acc |= ((1u128 << LEVEL_WIDTHS[level]) - 1) << LEVEL_OFFSETS[level];
        masks[level] = acc;
        level += 1;
    }
    masks
};

const _: () = assert!(
    LEVEL_OFFSETS[MAX_DEPTH - 1] == 0,
    "LEVEL_WIDTHS must sum to exactly 125 bits (128 - 3 depth bits)"
);

/// FNV-1a 64-bit hash.
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x100000001b3);
        i += 1;
    }
    hash
}

/// Hash one segment into the field of `level`, already shifted into place.
///
/// Never zero: zero means "no node at this level".
const fn segment_bits(segment: &[u8], level: usize) -> u128 {
    let full = fnv1a_64(segment);
    let mixed = full ^ (full >> 32) ^ (full >> 17);
    let bits = (mixed as u128) & ((1u128 << LEVEL_WIDTHS[level]) - 1);
    let bits = if bits == 0 { 1 } else { bits };
    bits << LEVEL_OFFSETS[level]
}

/// A hierarchical tag such as `Combat.Melee.Hit`.
///
/// Tags are plain `Copy` values. Equality is GID equality; the dotted path
/// is only needed to build one or to display it through [`TagNames`].
///
/// [`TagNames`]: crate::names::TagNames
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(GID);

impl Tag {
    /// The empty tag. Never matches anything and is ignored by containers.
    pub const EMPTY: Tag = Tag(0);

    /// Build a tag from already split path segments.
    ///
    /// Usable in const contexts; the `tags!` macro emits calls to it.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in const contexts) if `segments` is empty or
    /// deeper than [`MAX_DEPTH`].
    pub const fn from_segments(segments: &[&[u8]]) -> Tag {
        assert!(!segments.is_empty(), "segments cannot be empty");
        assert!(segments.len() <= MAX_DEPTH, "tree depth exceeds MAX_DEPTH (8)");

        let mut payload: u128 = 0;
        let mut i = 0;
        while i < segments.len() {
            payload |= segment_bits(segments[i], i);
            i += 1;
        }
        let depth = (segments.len() - 1) as u128;
        Tag(payload | (depth << DEPTH_SHIFT))
    }

    /// Parse and hash a dotted path.
    ///
    /// Segments must be non-empty and free of whitespace, quotes and commas.
    /// Paths declared through `tags!` are additionally Rust identifiers.
    pub fn parse(path: &str) -> Result<Tag, TagError> {
        validate_path(path)?;
        let segments: Vec<&[u8]> = path.split('.').map(str::as_bytes).collect();
        Ok(Tag::from_segments(&segments))
    }

    /// Wrap a raw GID. Zero yields [`Tag::EMPTY`].
    pub const fn from_gid(gid: GID) -> Tag {
        Tag(gid)
    }

    pub const fn gid(self) -> GID {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Zero-based depth: `Combat` is 0, `Combat.Melee` is 1.
    pub const fn depth(self) -> u8 {
        ((self.0 >> DEPTH_SHIFT) & 0b111) as u8
    }

    /// Parent tag, or `None` for roots and the empty tag.
    pub const fn parent(self) -> Option<Tag> {
        if !self.is_valid() || self.depth() == 0 {
            return None;
        }
        let parent_depth = self.depth() - 1;
        let payload = self.0 & PREFIX_MASKS[parent_depth as usize];
        Some(Tag(payload | ((parent_depth as u128) << DEPTH_SHIFT)))
    }

    /// Is `self` equal to `ancestor` or below it in the tree?
    ///
    /// ```text
    /// Movement.Idle.is_descendant_of(Movement) → true
    /// Combat.Attack.is_descendant_of(Movement) → false
    /// ```
    #[inline]
    pub const fn is_descendant_of(self, ancestor: Tag) -> bool {
        if !self.is_valid() || !ancestor.is_valid() || self.depth() < ancestor.depth() {
            return false;
        }
        let mask = PREFIX_MASKS[ancestor.depth() as usize];
        (self.0 & mask) == (ancestor.0 & mask)
    }

    /// Iterate `self` and all its ancestors, deepest first.
    pub fn ancestors(self) -> impl Iterator<Item = Tag> {
        std::iter::successors(self.is_valid().then_some(self), |tag| tag.parent())
    }
}

/// Characters never allowed in a runtime path, besides whitespace.
const INVALID_CHARS: &str = "\"',";

fn validate_path(path: &str) -> Result<(), TagError> {
    if path.is_empty() {
        return Err(TagError::EmptyPath);
    }
    let invalid = |reason: String| TagError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    let mut depth = 0;
    for segment in path.split('.') {
        depth += 1;
        if segment.is_empty() {
            return Err(invalid("empty segment".into()));
        }
        if let Some(c) = segment.chars().find(|c| c.is_whitespace() || INVALID_CHARS.contains(*c)) {
            return Err(invalid(format!(
                "segment '{segment}' contains invalid character '{c:?}'"
            )));
        }
    }

    if depth > MAX_DEPTH {
        return Err(TagError::TooDeep {
            path: path.to_string(),
            depth,
            max: MAX_DEPTH,
        });
    }
    Ok(())
}

impl FromStr for Tag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::parse(s)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:#034x})", self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{:#034x}", self.0)
        } else {
            f.write_str("<empty>")
        }
    }
}
