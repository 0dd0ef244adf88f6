use crate::engine::Score;
use crate::logic::board::{Board, Color, PositionKey};
use crate::logic::rules::{attacked_squares, AttackSet};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug)]
struct CacheEntry {
    score: Score,
    accesses: u32,
}

/// Bounded memo of evaluator results with least-frequently-used eviction.
///
/// When full, `put` drops one entry holding the smallest access count. Among
/// several such entries the one dropped is whichever the map yields first.
#[derive(Debug)]
pub struct EvalCache {
    entries: HashMap<PositionKey, CacheEntry>,
    capacity: usize,
}

impl EvalCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get(&mut self, key: &PositionKey) -> Option<Score> {
        let entry = self.entries.get_mut(key)?;
        entry.accesses = entry.accesses.saturating_add(1);
        Some(entry.score)
    }

    /// Stores `score` with an access count of 1. Overwriting an existing key never evicts.
    pub fn put(&mut self, key: PositionKey, score: Score) {
        if self.capacity == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_least_used();
        }
        self.entries.insert(
            key,
            CacheEntry {
                score,
                accesses: 1,
            },
        );
    }

    fn evict_least_used(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.accesses)
            .map(|(key, _)| *key);
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }

    #[must_use]
    pub fn access_count(&self, key: &PositionKey) -> Option<u32> {
        self.entries.get(key).map(|e| e.accesses)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Attack sets computed during one search, keyed by position and attacking side.
#[derive(Debug)]
pub struct AttackCache {
    sets: HashMap<(PositionKey, Color), AttackSet>,
    capacity: usize,
}

impl AttackCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            sets: HashMap::new(),
            capacity,
        }
    }

    pub fn attacks(&mut self, board: &Board, key: PositionKey, by: Color) -> AttackSet {
        if let Some(set) = self.sets.get(&(key, by)) {
            return *set;
        }
        let set = attacked_squares(board, by);
        if self.capacity > 0 {
            // Wholesale flush; entries are cheap to rebuild.
            if self.sets.len() >= self.capacity {
                self.sets.clear();
            }
            self.sets.insert((key, by), set);
        }
        set
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }
}
