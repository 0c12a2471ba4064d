//! # Unified Gameplay Tags (bevy-tag-unify)
//!
//! Hierarchical tags plus three services built on them:
//!
//! - **Tagged-object registry** ([`TaggedRegistry`]): a weak set of live
//!   [`Taggable`] objects with hierarchical tag queries.
//! - **Tag event router** ([`TagEventRouter`]): publish/subscribe keyed by
//!   event tag, with per-binding payload filters and re-entrant dispatch.
//! - **Tag-keyed value store** ([`TagValueStore`]): prioritized repositories
//!   of opaque values with an always-present default repository.
//!
//! ## Tags
//!
//! A [`Tag`] wraps a `u128` GID with embedded depth and fixed bit allocation
//! across 8 levels:
//!
//! ```text
//! ┌─────────┬──────────┬──────────┬──────────┬──────────┬──────────┬──────────┬──────────┬──────────┐
//! │ Depth   │ Level 0  │ Level 1  │ Level 2  │ Level 3  │ Level 4  │ Level 5  │ Level 6  │ Level 7  │
//! │ 3 bits  │ 21 bits  │ 18 bits  │ 16 bits  │ 16 bits  │ 14 bits  │ 14 bits  │ 13 bits  │ 13 bits  │
//! └─────────┴──────────┴──────────┴──────────┴──────────┴──────────┴──────────┴──────────┴──────────┘
//! ```
//!
//! Subtree checks need no lookup:
//!
//! ```ignore
//! use bevy_tag_unify::tags;
//!
//! tags! {
//!     pub mod Tags {
//!         Combat { Melee { Hit; } }
//!     }
//! }
//!
//! assert!(Tags::Combat::Melee::Hit::TAG.is_descendant_of(Tags::Combat::TAG));
//! ```
//!
//! ## Threading
//!
//! The registry, router, hub and value store are single-threaded (`Rc`,
//! `RefCell`). Only plain data ([`TagSet`], [`TagNames`],
//! [`ValueStoreSettings`]) crosses into Bevy's ECS.

pub mod bevy;
pub mod config;
pub mod container;
pub mod error;
pub mod event;
pub mod hub;
pub mod names;
pub mod object;
pub mod ops;
pub mod registry;
pub mod tag;
pub mod taggable;
pub mod value;

pub use bevy_tag_unify_macro::tags;

pub use config::{UnifyConfig, ValueStoreSettings};
pub use container::TagSet;
pub use error::{ConfigError, TagError};
pub use event::{TagEvent, TagEventCallback, TagEventRouter};
pub use hub::TagHub;
pub use names::TagNames;
pub use object::{SourceFilter, TaggedObject};
pub use ops::{apply_tag_change, filter_with_tags, has_tags, TagCheck};
pub use registry::TaggedRegistry;
pub use tag::{Tag, MAX_DEPTH};
pub use taggable::{ListenerId, TagChange, Taggable};
pub use value::{
    AssetRepository, MemoryRepository, ScopedRepository, SharedRepository, TagValue,
    TagValueRepository, TagValueStore,
};

/// Global Identifier: a stable, hierarchical hash packed into u128.
///
/// The top 3 bits encode the depth (0-7), remaining 125 bits are
/// partitioned by tree level with a fixed layout. Zero is the empty tag.
pub type GID = u128;
