//! Entity registry - tracked entities and their render handles

use std::collections::{BTreeMap, BTreeSet};

use roadplay_core::EntityId;
use tracing::debug;

/// Value binding captured by each render handle.
/// Carries the entity id only; positions and lanes are looked up per frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityBinding {
    pub entity: EntityId,
}

impl EntityBinding {
    pub fn new(entity: EntityId) -> Self {
        EntityBinding { entity }
    }
}

/// A registry entry pairing a model entity with its render handle
#[derive(Debug)]
pub struct TrackedEntity<H> {
    pub binding: EntityBinding,
    pub handle: H,
}

/// Outcome of a registry sync. Removed entries are handed back so the
/// caller can release their render handles.
#[derive(Debug)]
pub struct Synced<H> {
    pub created: usize,
    pub retained: usize,
    pub removed: Vec<TrackedEntity<H>>,
}

/// Tracked entities indexed by id
#[derive(Debug)]
pub struct EntityRegistry<H> {
    entities: BTreeMap<EntityId, TrackedEntity<H>>,
}

impl<H> EntityRegistry<H> {
    pub fn new() -> Self {
        EntityRegistry {
            entities: BTreeMap::new(),
        }
    }

    /// Make the tracked set exactly `ids`: remove every entity not listed,
    /// create one for every listed id not yet tracked.
    pub fn sync<I, C>(&mut self, ids: I, mut create: C) -> Synced<H>
    where
        I: IntoIterator<Item = EntityId>,
        C: FnMut(EntityBinding) -> H,
    {
        let wanted: BTreeSet<EntityId> = ids.into_iter().collect();

        let stale: Vec<EntityId> = self
            .entities
            .keys()
            .filter(|id| !wanted.contains(*id))
            .cloned()
            .collect();
        let removed: Vec<TrackedEntity<H>> = stale
            .iter()
            .filter_map(|id| self.entities.remove(id))
            .collect();

        let mut created = 0;
        let mut retained = 0;
        for id in wanted {
            if self.entities.contains_key(&id) {
                retained += 1;
                continue;
            }
            let binding = EntityBinding::new(id.clone());
            let handle = create(binding.clone());
            self.entities.insert(id, TrackedEntity { binding, handle });
            created += 1;
        }

        debug!(created, retained, removed = removed.len(), "entity registry synced");
        Synced {
            created,
            retained,
            removed,
        }
    }

    /// Remove every tracked entity, handing them back for release
    pub fn drain(&mut self) -> Vec<TrackedEntity<H>> {
        std::mem::take(&mut self.entities).into_values().collect()
    }

    pub fn get(&self, id: &str) -> Option<&TrackedEntity<H>> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Tracked ids, sorted
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedEntity<H>> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<H> Default for EntityRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(names: &[&str]) -> Vec<EntityId> {
        names.iter().map(|n| EntityId::new(*n)).collect()
    }

    #[test]
    fn test_sync_creates_and_removes() {
        let mut registry: EntityRegistry<u32> = EntityRegistry::new();
        let mut next = 0;

        let synced = registry.sync(ids(&["A", "B"]), |_| {
            next += 1;
            next
        });
        assert_eq!(synced.created, 2);
        assert!(synced.removed.is_empty());
        assert_eq!(registry.ids(), ids(&["A", "B"]));

        let synced = registry.sync(ids(&["B", "C"]), |_| {
            next += 1;
            next
        });
        assert_eq!(synced.created, 1);
        assert_eq!(synced.retained, 1);
        let removed: Vec<_> = synced.removed.into_iter().map(|t| t.binding.entity).collect();
        assert_eq!(removed, ids(&["A"]));
        assert_eq!(registry.ids(), ids(&["B", "C"]));
        // B kept its original handle
        assert_eq!(registry.get("B").map(|t| t.handle), Some(2));
    }

    #[test]
    fn test_drain_releases_all() {
        let mut registry: EntityRegistry<()> = EntityRegistry::new();
        registry.sync(ids(&["A", "B", "C"]), |_| ());

        assert_eq!(registry.drain().len(), 3);
        assert!(registry.is_empty());
        assert!(!registry.contains("A"));
    }

    #[test]
    fn test_binding_matches_key() {
        let mut registry: EntityRegistry<EntityBinding> = EntityRegistry::new();
        registry.sync(ids(&["A", "B"]), |b| b);
        for tracked in registry.iter() {
            assert_eq!(tracked.binding, tracked.handle);
        }
    }

    proptest! {
        #[test]
        fn prop_sync_yields_exact_set(
            rounds in proptest::collection::vec(
                proptest::collection::btree_set("[A-F]", 0..6),
                1..8,
            )
        ) {
            let mut registry: EntityRegistry<()> = EntityRegistry::new();
            let mut live = 0usize;
            for round in rounds {
                let wanted: Vec<EntityId> = round.iter().map(|s| EntityId::new(s.as_str())).collect();
                let synced = registry.sync(wanted.clone(), |_| ());
                live = live + synced.created - synced.removed.len();
                prop_assert_eq!(registry.ids(), wanted);
                prop_assert_eq!(live, registry.len());
            }
        }
    }
}
