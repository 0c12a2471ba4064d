use std::cell::RefCell;
use std::cmp::Reverse;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::ValueStoreSettings;
use crate::tag::Tag;

use super::{MemoryRepository, SharedRepository, TagValue, TagValueRepository, WeakRepository};

fn same_repository(weak: &WeakRepository, repo: &SharedRepository) -> bool {
    std::ptr::addr_eq(weak.as_ptr(), Rc::as_ptr(repo))
}

/// Prioritized lookup over registered repositories plus an always-present
/// default repository.
///
/// Explicit repositories are held weakly: the store never keeps one alive,
/// and dropped repositories are skipped and pruned. Reads walk them in
/// descending priority (ties keep registration order), then fall back to
/// the default.
pub struct TagValueStore {
    repositories: Vec<WeakRepository>,
    default_repository: Rc<RefCell<MemoryRepository>>,
}

impl Default for TagValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TagValueStore {
    pub fn new() -> Self {
        Self::with_settings(&ValueStoreSettings::default())
    }

    pub fn with_settings(settings: &ValueStoreSettings) -> Self {
        debug!(
            default = %settings.default_repository_name,
            "value store initialized"
        );
        Self {
            repositories: Vec::new(),
            default_repository: MemoryRepository::shared(
                settings.default_repository_name.clone(),
                settings.default_repository_priority,
            ),
        }
    }

    pub fn default_repository(&self) -> &Rc<RefCell<MemoryRepository>> {
        &self.default_repository
    }

    fn is_default(&self, repo: &SharedRepository) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.default_repository), Rc::as_ptr(repo))
    }

    /// Add an explicit repository. Duplicates and the default repository
    /// are rejected with a warning.
    pub fn register_repository(&mut self, repo: &SharedRepository) -> bool {
        let name = repo.borrow().name().into_owned();
        if self.is_default(repo) {
            warn!(repository = %name, "the default repository cannot be registered explicitly");
            return false;
        }
        if self.repositories.iter().any(|w| same_repository(w, repo)) {
            warn!(repository = %name, "repository is already registered");
            return false;
        }

        self.repositories.push(Rc::downgrade(repo));
        self.sort_repositories();
        debug!(repository = %name, priority = repo.borrow().priority(), "registered value repository");
        true
    }

    /// Remove an explicit repository. The default repository can never be
    /// removed; unknown repositories are reported.
    pub fn unregister_repository(&mut self, repo: &SharedRepository) -> bool {
        let name = repo.borrow().name().into_owned();
        if self.is_default(repo) {
            warn!(repository = %name, "the default repository cannot be unregistered");
            return false;
        }
        let before = self.repositories.len();
        self.repositories.retain(|w| !same_repository(w, repo));
        if self.repositories.len() == before {
            warn!(repository = %name, "repository was not registered");
            return false;
        }
        debug!(repository = %name, "unregistered value repository");
        true
    }

    /// Is `repo` currently registered as an explicit repository?
    pub fn contains(&self, repo: &SharedRepository) -> bool {
        self.repositories
            .iter()
            .any(|w| w.strong_count() > 0 && same_repository(w, repo))
    }

    fn sort_repositories(&mut self) {
        self.repositories.retain(|w| w.strong_count() > 0);
        // Stable: equal priorities keep registration order.
        self.repositories.sort_by_cached_key(|w| {
            Reverse(w.upgrade().map_or(i32::MIN, |r| r.borrow().priority()))
        });
    }

    fn live_repositories(&self) -> impl Iterator<Item = SharedRepository> + '_ {
        self.repositories.iter().filter_map(|w| w.upgrade())
    }

    /// Live explicit repositories, highest priority first.
    pub fn repositories(&self) -> Vec<SharedRepository> {
        self.live_repositories().collect()
    }

    /// Names in read order, default repository last.
    pub fn read_order(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .live_repositories()
            .map(|r| r.borrow().name().into_owned())
            .collect();
        names.push(self.default_repository.borrow().name().into_owned());
        names
    }

    /// First value found for `tag`, walking repositories by priority and
    /// then the default.
    pub fn get_value(&self, tag: Tag) -> Option<TagValue> {
        if !tag.is_valid() {
            return None;
        }
        for repo in self.live_repositories() {
            let repo = repo.borrow();
            if repo.has_value(tag) {
                return repo.get_value(tag);
            }
        }
        let value = self.default_repository.borrow().get_value(tag);
        if value.is_none() {
            debug!(%tag, "no value stored for tag");
        }
        value
    }

    /// Typed read. `None` when missing or not exactly a `T`.
    pub fn get<T: Clone + 'static>(&self, tag: Tag) -> Option<T> {
        let value = self.get_value(tag)?;
        let typed = value.get::<T>();
        if typed.is_none() {
            debug!(
                %tag,
                stored = value.type_name(),
                requested = std::any::type_name::<T>(),
                "stored value has a different type"
            );
        }
        typed
    }

    pub fn has_value(&self, tag: Tag) -> bool {
        tag.is_valid()
            && (self.live_repositories().any(|r| r.borrow().has_value(tag))
                || self.default_repository.borrow().has_value(tag))
    }

    /// Resolve a write target.
    ///
    /// A non-empty name selects the repository with that name (the default
    /// included). Without a name, the first explicit repository is used,
    /// or the default when none is registered.
    fn writable_repository(&self, target: Option<&str>) -> Option<SharedRepository> {
        let default: SharedRepository = self.default_repository.clone();
        match target.filter(|name| !name.is_empty()) {
            Some(name) => self
                .live_repositories()
                .find(|r| r.borrow().name() == name)
                .or_else(|| (default.borrow().name() == name).then_some(default.clone())),
            None => self.live_repositories().next().or(Some(default)),
        }
    }

    /// Write `value` under `tag` in the resolved repository.
    pub fn set_value(&mut self, tag: Tag, value: TagValue, target: Option<&str>) -> bool {
        if !tag.is_valid() {
            warn!("refusing to store a value under the empty tag");
            return false;
        }
        let Some(repo) = self.writable_repository(target) else {
            warn!(repository = ?target, %tag, "no repository matches the write target");
            return false;
        };
        repo.borrow_mut().set_value(tag, value);
        true
    }

    pub fn set<T: 'static>(&mut self, tag: Tag, value: T, target: Option<&str>) -> bool {
        self.set_value(tag, TagValue::new(value), target)
    }

    /// Remove `tag` from the resolved repository only.
    pub fn clear_value(&mut self, tag: Tag, target: Option<&str>) -> bool {
        if !tag.is_valid() {
            return false;
        }
        let Some(repo) = self.writable_repository(target) else {
            warn!(repository = ?target, %tag, "no repository matches the clear target");
            return false;
        };
        repo.borrow_mut().clear_value(tag);
        true
    }

    /// Empty the resolved repository.
    pub fn clear_all(&mut self, target: Option<&str>) -> bool {
        let Some(repo) = self.writable_repository(target) else {
            warn!(repository = ?target, "no repository matches the clear target");
            return false;
        };
        repo.borrow_mut().clear_all_values();
        true
    }

    /// Forget every explicit repository and empty the default one.
    pub fn shutdown(&mut self) {
        self.repositories.clear();
        self.default_repository.borrow_mut().clear_all_values();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(path: &str) -> Tag {
        Tag::parse(path).unwrap()
    }

    fn repo(name: &str, priority: i32) -> Rc<RefCell<MemoryRepository>> {
        MemoryRepository::shared(name, priority)
    }

    #[test]
    fn default_only_store_round_trips() {
        let mut store = TagValueStore::new();
        let t = tag("Stats.Health");

        assert!(store.set(t, 100_i32, None));
        assert!(store.has_value(t));
        assert_eq!(store.get::<i32>(t), Some(100));
        assert_eq!(store.read_order(), ["DefaultSubsystemRepository"]);
    }

    #[test]
    fn rejects_default_and_duplicates() {
        let mut store = TagValueStore::new();
        let default: SharedRepository = store.default_repository().clone();
        assert!(!store.register_repository(&default));
        assert!(!store.unregister_repository(&default));

        let a: SharedRepository = repo("A", 1);
        assert!(store.register_repository(&a));
        assert!(!store.register_repository(&a));
        assert_eq!(store.repositories().len(), 1);

        assert!(store.unregister_repository(&a));
        assert!(!store.unregister_repository(&a));
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let mut store = TagValueStore::new();
        let x: SharedRepository = repo("X", 50);
        let y: SharedRepository = repo("Y", 50);
        let z: SharedRepository = repo("Z", 200);
        store.register_repository(&x);
        store.register_repository(&y);
        store.register_repository(&z);

        assert_eq!(store.read_order(), ["Z", "X", "Y", "DefaultSubsystemRepository"]);
    }

    #[test]
    fn dropped_repositories_are_skipped() {
        let mut store = TagValueStore::new();
        let t = tag("A");
        {
            let gone: SharedRepository = repo("Gone", 10);
            store.register_repository(&gone);
            gone.borrow_mut().set_value(t, TagValue::new(1_i32));
            assert_eq!(store.get::<i32>(t), Some(1));
        }
        assert!(!store.has_value(t));
        assert!(store.get_value(t).is_none());
        assert!(store.repositories().is_empty());

        store.set(t, 2_i32, None);
        assert_eq!(store.default_repository().borrow().get::<i32>(t), Some(2));
    }

    #[test]
    fn invalid_tag_is_rejected() {
        let mut store = TagValueStore::new();
        assert!(!store.set(Tag::EMPTY, 1_i32, None));
        assert!(!store.has_value(Tag::EMPTY));
        assert!(store.get_value(Tag::EMPTY).is_none());
    }

    #[test]
    fn unknown_target_writes_nothing() {
        let mut store = TagValueStore::new();
        let t = tag("A");
        assert!(!store.set(t, 1_i32, Some("Missing")));
        assert!(!store.has_value(t));

        assert!(store.set(t, 1_i32, Some("")));
        assert!(store.has_value(t));
    }

    #[test]
    fn shutdown_forgets_everything() {
        let mut store = TagValueStore::new();
        let a: SharedRepository = repo("A", 1);
        store.register_repository(&a);
        store.set(tag("T"), 1_i32, Some("DefaultSubsystemRepository"));

        store.shutdown();
        assert!(store.repositories().is_empty());
        assert!(!store.has_value(tag("T")));
    }
}
