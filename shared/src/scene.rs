//! Scene graph: an arena of positioned volumes with parent/child ownership.
//!
//! Nodes are addressed by [`NodeId`], a generational handle. Destroying a node bumps the
//! slot generation, so any handle still held elsewhere (partitioner registrations, provider
//! results, pending events) simply stops resolving instead of aliasing a new node.

use bevy::prelude::*;

use crate::geometry::WorldBox;
use crate::snapshot::{Snapshot, SnapshotRing};

/// Weak, generational handle to a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// A positioned volume with velocity, an optional bounding box and a snapshot history.
#[derive(Clone, Debug, Default)]
pub struct Node {
    pub name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Position in parent space.
    position: Vec3,
    velocity: Vec3,
    acceleration: Vec3,
    /// Bounding box in the node's own space.
    local_box: WorldBox,
    pub visible: bool,
    snapshots: SnapshotRing,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn local_box(&self) -> WorldBox {
        self.local_box
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena owning every node of a level.
#[derive(Debug, Default)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root-level node.
    pub fn spawn(&mut self, name: impl Into<String>) -> NodeId {
        let node = Node {
            name: name.into(),
            visible: true,
            ..default()
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Create a node owned by `parent`. Returns `None` if the parent is gone.
    pub fn spawn_child(&mut self, parent: NodeId, name: impl Into<String>) -> Option<NodeId> {
        if !self.is_alive(parent) {
            return None;
        }
        let child = self.spawn(name);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        Some(child)
    }

    /// Destroy a node and everything it owns.
    pub fn destroy(&mut self, id: NodeId) {
        let Some(node) = self.node(id) else { return };
        let parent = node.parent;
        let children = node.children.clone();

        for child in children {
            self.destroy(child);
        }
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|c| *c != id);
        }

        let slot = &mut self.slots[id.index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }

    #[inline]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The node that owns `id`, or `id` itself for root-level nodes.
    pub fn owner(&self, id: NodeId) -> NodeId {
        self.node(id).and_then(|n| n.parent).unwrap_or(id)
    }

    /// Topmost ancestor of `id`.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.node(current).and_then(|n| n.parent) {
            current = parent;
        }
        current
    }

    /// Depth-first search of `id`'s descendants for a node named `name`.
    pub fn hook(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let node = self.node(id)?;
        for &child in &node.children {
            if self.node(child).is_some_and(|c| c.name == name) {
                return Some(child);
            }
            if let Some(found) = self.hook(child, name) {
                return Some(found);
            }
        }
        None
    }

    // --- Transform ---

    pub fn position(&self, id: NodeId) -> Option<Vec3> {
        self.node(id).map(|n| n.position)
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) {
        if let Some(node) = self.node_mut(id) {
            node.position = position;
        }
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        let node = self.node(id)?;
        let parent_world = match node.parent {
            Some(parent) => self.world_position(parent)?,
            None => Vec3::ZERO,
        };
        Some(parent_world + node.position)
    }

    pub fn set_world_position(&mut self, id: NodeId, world: Vec3) {
        let Some(node) = self.node(id) else { return };
        let parent_world = node
            .parent
            .and_then(|p| self.world_position(p))
            .unwrap_or(Vec3::ZERO);
        self.set_position(id, world - parent_world);
    }

    /// Move a node by `delta` in parent space.
    pub fn translate(&mut self, id: NodeId, delta: Vec3) {
        if let Some(node) = self.node_mut(id) {
            node.position += delta;
        }
    }

    pub fn velocity(&self, id: NodeId) -> Option<Vec3> {
        self.node(id).map(|n| n.velocity)
    }

    pub fn set_velocity(&mut self, id: NodeId, velocity: Vec3) {
        if let Some(node) = self.node_mut(id) {
            node.velocity = velocity;
        }
    }

    pub fn acceleration(&self, id: NodeId) -> Option<Vec3> {
        self.node(id).map(|n| n.acceleration)
    }

    pub fn set_acceleration(&mut self, id: NodeId, acceleration: Vec3) {
        if let Some(node) = self.node_mut(id) {
            node.acceleration = acceleration;
        }
    }

    pub fn set_local_box(&mut self, id: NodeId, local_box: WorldBox) {
        if let Some(node) = self.node_mut(id) {
            node.local_box = local_box;
        }
    }

    /// The node's bounding box in world space.
    pub fn world_box(&self, id: NodeId) -> Option<WorldBox> {
        let local = self.node(id)?.local_box;
        Some(local.translated(self.world_position(id)?))
    }

    // --- Snapshots ---

    /// Record the current transform as the newest snapshot.
    pub fn snapshot(&mut self, id: NodeId) {
        let Some(world_position) = self.world_position(id) else { return };
        let Some(node) = self.node_mut(id) else { return };
        let snapshot = Snapshot {
            position: node.position,
            world_position,
            velocity: node.velocity,
        };
        node.snapshots.push(snapshot);
    }

    /// The `n`th most recent snapshot (0 = newest).
    pub fn snapshot_at(&self, id: NodeId, n: usize) -> Option<Snapshot> {
        self.node(id)?.snapshots.get(n).copied()
    }

    pub fn clear_snapshots(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.snapshots.clear();
        }
    }

    pub fn num_snapshots(&self, id: NodeId) -> usize {
        self.node(id).map_or(0, |n| n.snapshots.len())
    }

    // --- Integration ---

    /// Advance every live node: velocity picks up acceleration, position picks up velocity.
    pub fn integrate(&mut self, dt: f32) {
        for slot in self.slots.iter_mut() {
            let Some(node) = slot.node.as_mut() else { continue };
            node.velocity += node.acceleration * dt;
            node.position += node.velocity * dt;
        }
    }
}
