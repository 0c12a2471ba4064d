//! Bevy integration.
//!
//! Provides:
//! - `TagUnifyPlugin`: builder-pattern plugin installing [`TagNames`] and
//!   [`ValueStoreSettings`] as resources
//! - [`TagSet`] doubles as a component
//!
//! The registry, router and value store hand out `Rc` handles and stay
//! outside the ECS; build them from the resources in a non-send context.
//!
//! # Example
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_tag_unify::{bevy::TagUnifyPlugin, tags, TagSet};
//!
//! tags! {
//!     pub mod Tags {
//!         Movement { Idle; Running; }
//!         Combat { Attack; Block; }
//!     }
//! }
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(TagUnifyPlugin::from_paths(Tags::PATHS))
//!         .add_systems(Startup, spawn_entities)
//!         .run();
//! }
//!
//! fn spawn_entities(mut commands: Commands) {
//!     commands.spawn(TagSet::new().with(Tags::Movement::Idle::TAG));
//! }
//! ```

use bevy::prelude::*;
use tracing::{info, warn};

use crate::{config::UnifyConfig, config::ValueStoreSettings, names::TagNames};

// =============================================================================
// Plugin
// =============================================================================

/// Bevy plugin for the tag system.
///
/// ```ignore
/// App::new().add_plugins(TagUnifyPlugin::from_config(UnifyConfig::from_file("tags.toml")?))
/// ```
#[derive(Default)]
pub struct TagUnifyPlugin {
    config: UnifyConfig,
}

impl TagUnifyPlugin {
    /// A plugin with an empty tag table and default value-store settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: UnifyConfig) -> Self {
        Self { config }
    }

    /// Register `paths` on startup (typically the `PATHS` of a `tags!` tree).
    pub fn from_paths(paths: &[&str]) -> Self {
        Self::new().with_paths(paths.iter().copied())
    }

    pub fn with_paths<'a>(mut self, paths: impl IntoIterator<Item = &'a str>) -> Self {
        self.config
            .tags
            .paths
            .extend(paths.into_iter().map(str::to_string));
        self
    }

    pub fn with_value_store(mut self, settings: ValueStoreSettings) -> Self {
        self.config.value_store = settings;
        self
    }
}

impl Plugin for TagUnifyPlugin {
    fn build(&self, app: &mut App) {
        let mut names = TagNames::new();
        for path in &self.config.tags.paths {
            if let Err(err) = names.register(path) {
                warn!(%err, "skipping tag path");
            }
        }
        info!(tags = names.len(), "tag names ready");

        app.insert_resource(names);
        app.insert_resource(self.config.value_store.clone());
    }
}

// =============================================================================
// Resource impls
// =============================================================================

impl Resource for TagNames {}

impl Resource for ValueStoreSettings {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_installs_resources() {
        let mut app = App::new();
        app.add_plugins(TagUnifyPlugin::from_paths(&["Combat.Melee", "Bad..Path"]));

        let names = app.world().resource::<TagNames>();
        assert!(names.contains("Combat"));
        assert!(names.contains("Combat.Melee"));
        assert!(!names.contains("Bad..Path"));

        let settings = app.world().resource::<ValueStoreSettings>();
        assert_eq!(*settings, ValueStoreSettings::default());
    }

    #[test]
    fn custom_settings_are_inserted() {
        let settings = ValueStoreSettings {
            default_repository_name: "Fallback".into(),
            ..Default::default()
        };
        let mut app = App::new();
        app.add_plugins(TagUnifyPlugin::new().with_value_store(settings.clone()));

        assert_eq!(*app.world().resource::<ValueStoreSettings>(), settings);
        assert!(app.world().resource::<TagNames>().is_empty());
    }
}
