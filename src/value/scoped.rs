use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::ValueStoreSettings;
use crate::tag::Tag;

use super::{SharedRepository, TagValue, TagValueMap, TagValueRepository, TagValueStore};

/// A repository owned by a gameplay object, living for its play span.
///
/// Without an explicit name it is called `"{owner}_Repo"`. Call
/// [`begin_play`](Self::begin_play) and [`end_play`](Self::end_play) from
/// the owner's lifecycle hooks.
#[derive(Clone, Debug)]
pub struct ScopedRepository {
    owner: String,
    name: Option<String>,
    priority: i32,
    register_on_begin_play: bool,
    values: TagValueMap,
}

impl ScopedRepository {
    pub fn new(owner: impl Into<String>) -> Self {
        Self::with_settings(owner, &ValueStoreSettings::default())
    }

    pub fn with_settings(owner: impl Into<String>, settings: &ValueStoreSettings) -> Self {
        Self {
            owner: owner.into(),
            name: None,
            priority: settings.scoped_repository_priority,
            register_on_begin_play: true,
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

    /// Opt out of registering in [`begin_play`](Self::begin_play).
    pub fn with_register_on_begin_play(mut self, enabled: bool) -> Self {
        self.register_on_begin_play = enabled;
        self
    }

    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Registration is owned by the store, so ask it.
    pub fn is_registered(this: &Rc<RefCell<Self>>, store: &TagValueStore) -> bool {
        let shared: SharedRepository = this.clone();
        store.contains(&shared)
    }

    /// Register with `store` if configured to and not registered already.
    pub fn begin_play(this: &Rc<RefCell<Self>>, store: &mut TagValueStore) {
        let register = this.borrow().register_on_begin_play;
        if register {
            Self::register_with(this, store);
        }
    }

    /// Unregister from `store` if registered.
    pub fn end_play(this: &Rc<RefCell<Self>>, store: &mut TagValueStore) {
        Self::unregister_from(this, store);
    }

    pub fn register_with(this: &Rc<RefCell<Self>>, store: &mut TagValueStore) -> bool {
        let shared: SharedRepository = this.clone();
        !store.contains(&shared) && store.register_repository(&shared)
    }

    pub fn unregister_from(this: &Rc<RefCell<Self>>, store: &mut TagValueStore) -> bool {
        let shared: SharedRepository = this.clone();
        if !store.contains(&shared) || !store.unregister_repository(&shared) {
            return false;
        }
        debug!(owner = %this.borrow().owner, "scoped repository left play");
        true
    }
}

impl TagValueRepository for ScopedRepository {
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
            None => Cow::Owned(format!("{}_Repo", self.owner)),
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_name_and_default_priority() {
        let repo = ScopedRepository::new("Hero");
        assert_eq!(repo.name(), "Hero_Repo");
        assert_eq!(repo.priority(), 100);

        let named = ScopedRepository::new("Hero").with_name("Custom").with_priority(7);
        assert_eq!(named.name(), "Custom");
        assert_eq!(named.priority(), 7);

        assert_eq!(ScopedRepository::new("Hero").with_name("").name(), "Hero_Repo");
    }

    #[test]
    fn lifecycle_registers_and_unregisters() {
        let mut store = TagValueStore::new();
        let repo = ScopedRepository::new("Hero").into_shared();

        ScopedRepository::begin_play(&repo, &mut store);
        assert!(ScopedRepository::is_registered(&repo, &store));
        assert_eq!(store.read_order(), ["Hero_Repo", "DefaultSubsystemRepository"]);

        ScopedRepository::begin_play(&repo, &mut store);
        assert_eq!(store.repositories().len(), 1);

        ScopedRepository::end_play(&repo, &mut store);
        assert!(!ScopedRepository::is_registered(&repo, &store));
        assert!(store.repositories().is_empty());
    }

    #[test]
    fn begin_play_recovers_after_store_side_removal() {
        let mut store = TagValueStore::new();
        let repo = ScopedRepository::new("Hero").into_shared();
        let shared: SharedRepository = repo.clone();
        let tag = Tag::parse("Stats.Speed").unwrap();
        repo.borrow_mut().set(tag, 2.0_f64);

        ScopedRepository::begin_play(&repo, &mut store);
        assert!(store.unregister_repository(&shared));
        assert!(!ScopedRepository::is_registered(&repo, &store));

        ScopedRepository::begin_play(&repo, &mut store);
        assert!(ScopedRepository::is_registered(&repo, &store));
        assert_eq!(store.get::<f64>(tag), Some(2.0));

        store.shutdown();
        assert!(!ScopedRepository::is_registered(&repo, &store));
        ScopedRepository::begin_play(&repo, &mut store);
        assert_eq!(store.repositories().len(), 1);
        assert_eq!(store.get::<f64>(tag), Some(2.0));

        assert!(ScopedRepository::unregister_from(&repo, &mut store));
        assert!(!ScopedRepository::unregister_from(&repo, &mut store));
    }

    #[test]
    fn opt_out_of_begin_play() {
        let mut store = TagValueStore::new();
        let repo = ScopedRepository::new("Hero")
            .with_register_on_begin_play(false)
            .into_shared();

        ScopedRepository::begin_play(&repo, &mut store);
        assert!(!ScopedRepository::is_registered(&repo, &store));
        assert!(store.repositories().is_empty());
    }

    #[test]
    fn writes_through_store_by_generated_name() {
        let mut store = TagValueStore::new();
        let repo = ScopedRepository::new("Hero").into_shared();
        ScopedRepository::begin_play(&repo, &mut store);

        let tag = Tag::parse("Stats.Speed").unwrap();
        assert!(store.set(tag, 3.5_f32, Some("Hero_Repo")));
        assert_eq!(repo.borrow().get::<f32>(tag), Some(3.5));
    }
}
