//! Data-asset repositories loaded from TOML.
//!
//! ```toml
//! name = "SwordStats"          # optional, defaults to "{asset}_DataAsset_Repo"
//! priority = 250               # optional, defaults to the asset priority setting
//! auto_register = false        # optional, defaults to true
//!
//! [values]
//! "Weapon.Sword.Damage" = 50
//!
//! [values.Weapon.Sword]        # nested tables are tag paths too
//! Label = "Longsword"
//! ```
//!
//! Integers load as `i64`, floats as `f64`, booleans as `bool`, strings as
//! `String`. Arrays and datetimes keep their `toml::Value`.

use std::borrow::Cow;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use tracing::debug;

use crate::config::ValueStoreSettings;
use crate::error::ConfigError;
use crate::tag::Tag;

use super::{SharedRepository, TagValue, TagValueMap, TagValueRepository, TagValueStore};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawAsset {
    name: Option<String>,
    priority: Option<i32>,
    auto_register: bool,
    values: toml::Table,
}

impl Default for RawAsset {
    fn default() -> Self {
        Self {
            name: None,
            priority: None,
            auto_register: true,
            values: toml::Table::new(),
        }
    }
}

/// A repository backed by authored data.
#[derive(Clone, Debug)]
pub struct AssetRepository {
    asset: String,
    name: Option<String>,
    priority: i32,
    auto_register: bool,
    values: TagValueMap,
}

impl AssetRepository {
    pub fn new(asset: impl Into<String>) -> Self {
        Self::with_settings(asset, &ValueStoreSettings::default())
    }

    pub fn with_settings(asset: impl Into<String>, settings: &ValueStoreSettings) -> Self {
        Self {
            asset: asset.into(),
            name: None,
            priority: settings.asset_repository_priority,
            auto_register: true,
            values: TagValueMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into()).filter(|n| !n.is_empty());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_auto_register(mut self, enabled: bool) -> Self {
        self.auto_register = enabled;
        self
    }

    /// Parse an asset document. `asset` names the asset for the generated
    /// repository name.
    pub fn from_toml_str(
        asset: impl Into<String>,
        content: &str,
        settings: &ValueStoreSettings,
    ) -> Result<Self, ConfigError> {
        let raw: RawAsset = toml::from_str(content)?;

        let mut repo = Self::with_settings(asset, settings).with_auto_register(raw.auto_register);
        if let Some(name) = raw.name {
            repo = repo.with_name(name);
        }
        if let Some(priority) = raw.priority {
            repo = repo.with_priority(priority);
        }

        let mut entries = Vec::new();
        flatten_values(String::new(), raw.values, &mut entries);
        let name = repo.name().into_owned();
        for (path, value) in entries {
            let tag = Tag::parse(&path)?;
            repo.values.set(tag, value, &name);
        }

        debug!(repository = %name, values = repo.values.len(), "loaded data asset");
        Ok(repo)
    }

    /// Load an asset file; the file stem names the asset.
    pub fn from_file(
        path: impl AsRef<Path>,
        settings: &ValueStoreSettings,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let asset = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_toml_str(asset, &content, settings)
    }

    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn auto_register(&self) -> bool {
        self.auto_register
    }

    /// Registration is owned by the store, so ask it.
    pub fn is_registered(this: &Rc<RefCell<Self>>, store: &TagValueStore) -> bool {
        let shared: SharedRepository = this.clone();
        store.contains(&shared)
    }

    /// Register with `store` when `auto_register` is set.
    pub fn on_loaded(this: &Rc<RefCell<Self>>, store: &mut TagValueStore) {
        let auto_register = this.borrow().auto_register;
        if auto_register {
            Self::register_with(this, store);
        }
    }

    pub fn register_with(this: &Rc<RefCell<Self>>, store: &mut TagValueStore) -> bool {
        let shared: SharedRepository = this.clone();
        if store.contains(&shared) || !store.register_repository(&shared) {
            return false;
        }
        debug!(asset = %this.borrow().asset, "data asset repository registered");
        true
    }

    pub fn unregister_from(this: &Rc<RefCell<Self>>, store: &mut TagValueStore) -> bool {
        let shared: SharedRepository = this.clone();
        store.contains(&shared) && store.unregister_repository(&shared)
    }
}

fn flatten_values(prefix: String, table: toml::Table, out: &mut Vec<(String, TagValue)>) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(nested) => flatten_values(path, nested, out),
            other => out.push((path, value_from_toml(other))),
        }
    }
}

fn value_from_toml(value: toml::Value) -> TagValue {
    match value {
        toml::Value::Integer(v) => TagValue::new(v),
        toml::Value::Float(v) => TagValue::new(v),
        toml::Value::Boolean(v) => TagValue::new(v),
        toml::Value::String(v) => TagValue::new(v),
        other => TagValue::new(other),
    }
}

impl TagValueRepository for AssetRepository {
    fn get_value(&self, tag: Tag) -> Option<TagValue> {
        self.values.get(tag)
    }

    fn set_value(&mut self, tag: Tag, value: TagValue) {
        let name = self.name().into_owned();
        self.values.set(tag, value, &name);
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
        match &self.name {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("{}_DataAsset_Repo", self.asset)),
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(path: &str) -> Tag {
        Tag::parse(path).unwrap()
    }

    const SWORD: &str = r#"
auto_register = true

[values]
"Weapon.Sword.Damage" = 50
"Weapon.Sword.Speed" = 1.25

[values.Weapon.Sword]
Label = "Longsword"
Cursed = false
Sockets = [1, 2]
"#;

    #[test]
    fn loads_typed_values() {
        let repo = AssetRepository::from_toml_str("Sword", SWORD, &ValueStoreSettings::default())
            .unwrap();

        assert_eq!(repo.name(), "Sword_DataAsset_Repo");
        assert_eq!(repo.priority(), 200);
        assert!(repo.auto_register());

        assert_eq!(repo.get::<i64>(tag("Weapon.Sword.Damage")), Some(50));
        assert_eq!(repo.get::<f64>(tag("Weapon.Sword.Speed")), Some(1.25));
        assert_eq!(
            repo.get::<String>(tag("Weapon.Sword.Label")).as_deref(),
            Some("Longsword")
        );
        assert_eq!(repo.get::<bool>(tag("Weapon.Sword.Cursed")), Some(false));
        assert!(repo.get::<toml::Value>(tag("Weapon.Sword.Sockets")).is_some());
    }

    #[test]
    fn header_overrides_name_and_priority() {
        let repo = AssetRepository::from_toml_str(
            "Sword",
            "name = \"Stats\"\npriority = 7\n",
            &ValueStoreSettings::default(),
        )
        .unwrap();
        assert_eq!(repo.name(), "Stats");
        assert_eq!(repo.priority(), 7);
        assert!(repo.auto_register());
    }

    #[test]
    fn auto_register_can_be_turned_off() {
        let mut store = TagValueStore::new();
        let repo = AssetRepository::from_toml_str(
            "Draft",
            "auto_register = false\n[values]\nA = 1\n",
            &ValueStoreSettings::default(),
        )
        .unwrap()
        .into_shared();
        assert!(AssetRepository::new("Plain").auto_register());

        AssetRepository::on_loaded(&repo, &mut store);
        assert!(!AssetRepository::is_registered(&repo, &store));
        assert!(!store.has_value(tag("A")));
    }

    #[test]
    fn on_loaded_registers_again_after_shutdown() {
        let mut store = TagValueStore::new();
        let repo = AssetRepository::from_toml_str("Sword", SWORD, &ValueStoreSettings::default())
            .unwrap()
            .into_shared();

        AssetRepository::on_loaded(&repo, &mut store);
        store.shutdown();
        assert!(!AssetRepository::is_registered(&repo, &store));

        AssetRepository::on_loaded(&repo, &mut store);
        assert!(AssetRepository::is_registered(&repo, &store));
        assert_eq!(store.get::<i64>(tag("Weapon.Sword.Damage")), Some(50));
        assert!(!AssetRepository::register_with(&repo, &mut store));
    }

    #[test]
    fn invalid_value_path_is_an_error() {
        let err = AssetRepository::from_toml_str(
            "Bad",
            "[values]\n\"A..B\" = 1\n",
            &ValueStoreSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Tag(_)));
    }

    #[test]
    fn auto_register_on_load() {
        let mut store = TagValueStore::new();
        let repo = AssetRepository::from_toml_str("Sword", SWORD, &ValueStoreSettings::default())
            .unwrap()
            .into_shared();

        AssetRepository::on_loaded(&repo, &mut store);
        assert!(AssetRepository::is_registered(&repo, &store));
        assert_eq!(store.get::<i64>(tag("Weapon.Sword.Damage")), Some(50));

        AssetRepository::unregister_from(&repo, &mut store);
        assert!(!store.has_value(tag("Weapon.Sword.Damage")));
    }
}
