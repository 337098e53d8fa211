//! Per-entity transform history.
//!
//! Each movable entity owns a small ring of read-only transform copies. The most recent
//! entry is the "last known good" position that collision correction rolls back to.

use bevy::prelude::*;

/// How many snapshots an entity keeps before the oldest is overwritten.
pub const SNAPSHOT_CAPACITY: usize = 4;

/// A frozen copy of an entity's transform state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Position in the parent's space.
    pub position: Vec3,
    /// Position in world space.
    pub world_position: Vec3,
    pub velocity: Vec3,
}

/// Fixed-capacity ring of snapshots, newest first when indexed.
#[derive(Clone, Debug, Default)]
pub struct SnapshotRing {
    entries: [Snapshot; SNAPSHOT_CAPACITY],
    /// Slot the next push writes to.
    head: usize,
    len: usize,
}

impl SnapshotRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.entries[self.head] = snapshot;
        self.head = (self.head + 1) % SNAPSHOT_CAPACITY;
        self.len = (self.len + 1).min(SNAPSHOT_CAPACITY);
    }

    /// The `n`th most recent snapshot (0 = newest).
    pub fn get(&self, n: usize) -> Option<&Snapshot> {
        if n >= self.len {
            return None;
        }
        let idx = (self.head + SNAPSHOT_CAPACITY - 1 - n) % SNAPSHOT_CAPACITY;
        Some(&self.entries[idx])
    }

    #[inline]
    pub fn latest(&self) -> Option<&Snapshot> {
        self.get(0)
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32) -> Snapshot {
        Snapshot {
            world_position: Vec3::new(x, 0.0, 0.0),
            ..default()
        }
    }

    #[test]
    fn test_newest_first() {
        let mut ring = SnapshotRing::new();
        ring.push(at(1.0));
        ring.push(at(2.0));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.latest().unwrap().world_position.x, 2.0);
        assert_eq!(ring.get(1).unwrap().world_position.x, 1.0);
        assert!(ring.get(2).is_none());
    }

    #[test]
    fn test_overwrites_oldest_when_full() {
        let mut ring = SnapshotRing::new();
        for i in 0..(SNAPSHOT_CAPACITY + 2) {
            ring.push(at(i as f32));
        }
        assert_eq!(ring.len(), SNAPSHOT_CAPACITY);
        assert_eq!(
            ring.latest().unwrap().world_position.x,
            (SNAPSHOT_CAPACITY + 1) as f32
        );
        assert_eq!(
            ring.get(SNAPSHOT_CAPACITY - 1).unwrap().world_position.x,
            2.0
        );
    }

    #[test]
    fn test_clear_forgets_history() {
        let mut ring = SnapshotRing::new();
        ring.push(at(1.0));
        ring.clear();
        assert!(ring.is_empty());
        assert!(ring.latest().is_none());
        ring.push(at(3.0));
        assert_eq!(ring.latest().unwrap().world_position.x, 3.0);
    }
}
