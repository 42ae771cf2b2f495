//! In-memory entity store with whole-collection replacement.
//!
//! The store holds one immutable [`Dataset`] behind an `Arc`. Loaders build
//! the next collection off to the side and publish it with
//! [`EntityStore::replace_entities`], which swaps the `Arc` under a write
//! lock held only for the assignment. Readers take a [`snapshot`] (an `Arc`
//! clone under a read lock) and scan it without holding any lock, so a
//! query sees either the old or the new collection in full.
//!
//! [`snapshot`]: EntityStore::snapshot

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::models::Entity;

/// One published, immutable entity collection.
#[derive(Debug, Clone)]
pub struct Dataset {
    entities: Vec<Entity>,
    generation: u64,
    source: String,
    loaded_at: DateTime<Utc>,
}

impl Dataset {
    fn empty() -> Self {
        Self {
            entities: Vec::new(),
            generation: 0,
            source: "empty".to_string(),
            loaded_at: Utc::now(),
        }
    }

    /// Entities in load order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of replacements published before this one. The initial empty
    /// store is generation 0.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Where the collection came from (file path or upload name).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// First entity with the given id, in load order.
    pub fn find(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }
}

/// Shared handle to the current [`Dataset`].
#[derive(Debug)]
pub struct EntityStore {
    current: RwLock<Arc<Dataset>>,
}

impl EntityStore {
    /// An empty store at generation 0.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Dataset::empty())),
        }
    }

    /// The collection visible right now. Later replacements do not affect
    /// the returned snapshot.
    pub fn snapshot(&self) -> Arc<Dataset> {
        // The guarded value is only ever replaced whole, so a poisoned lock
        // still holds a complete dataset.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Publish `entities` as the new collection and return its size.
    ///
    /// Entities without a name are dropped before publishing.
    pub fn replace_entities(&self, mut entities: Vec<Entity>, source: impl Into<String>) -> usize {
        entities.retain(|e| !e.name.trim().is_empty());
        let count = entities.len();
        let source = source.into();
        let loaded_at = Utc::now();

        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = guard.generation + 1;
        *guard = Arc::new(Dataset {
            entities,
            generation,
            source,
            loaded_at,
        });
        count
    }

    /// Number of entities in the current collection.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
