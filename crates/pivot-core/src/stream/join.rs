/// Combine-latest join over a fixed set of slots.
///
/// Each slot keeps the most recent value seen for it. A combined snapshot exists only once every
/// slot has produced at least one value; after that, every accepted update yields a new snapshot
/// made of the latest value of each slot.
///
/// Updates that carry the same value as the slot already holds are rejected, which gives callers
/// per-slot distinct-until-changed semantics for free.
#[derive(Debug, Clone)]
pub struct LatestJoin<V> {
    slots: Vec<Option<V>>,
    filled: usize,
}

impl<V: Clone + PartialEq> LatestJoin<V> {
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self { slots: vec![None; slots], filled: 0 }
    }

    /// Stores `value` in `slot`. Returns `false` when the value is unchanged or the slot does not
    /// exist.
    pub fn update(&mut self, slot: usize, value: V) -> bool {
        let Some(current) = self.slots.get_mut(slot) else {
            return false;
        };
        match current {
            Some(existing) if *existing == value => false,
            Some(existing) => {
                *existing = value;
                true
            }
            None => {
                *current = Some(value);
                self.filled += 1;
                true
            }
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&V> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Latest value of every slot, or `None` while any slot is still empty.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<V>> {
        if !self.is_complete() {
            return None;
        }
        self.slots.iter().cloned().collect()
    }
}
