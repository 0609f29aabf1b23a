use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

/// Transposition table keyed by board fingerprint. Each entry holds the
/// largest remaining height at which that position was already expanded.
#[derive(Debug, Default)]
pub struct Memo {
    heights: FxHashMap<u64, usize>,
    hits: u64,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` at `height`. Returns false when the position was
    /// already seen at an equal or greater height, so exploring it again
    /// cannot find anything new.
    pub fn add(&mut self, key: u64, height: usize) -> bool {
        match self.heights.entry(key) {
            Entry::Occupied(mut entry) => {
                if *entry.get() >= height {
                    self.hits += 1;
                    false
                } else {
                    entry.insert(height);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(height);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_key_is_explored() {
        let mut memo = Memo::new();
        assert!(memo.is_empty());
        assert!(memo.add(42, 3));
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.hits(), 0);
    }

    #[test]
    fn equal_or_lower_height_is_pruned() {
        let mut memo = Memo::new();
        assert!(memo.add(42, 3));
        assert!(!memo.add(42, 3));
        assert!(!memo.add(42, 1));
        assert_eq!(memo.hits(), 2);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn higher_height_replaces_entry() {
        let mut memo = Memo::new();
        assert!(memo.add(7, 2));
        assert!(memo.add(7, 5));
        assert!(!memo.add(7, 4));
        assert!(memo.add(8, 1));
        assert_eq!(memo.len(), 2);
        assert_eq!(memo.hits(), 1);
    }
}
