//! Axis-separated collision correction.
//!
//! Pushes a mover out of solid geometry using the mover's own history, never the
//! geometry's. The most recent snapshot is the rollback target; each axis is restored on
//! its own before falling back to a full rollback:
//!
//! 1. Restore Y, keep the new X. If that clears the overlap the intrusion was vertical:
//!    vertical velocity is zeroed and horizontal motion is accepted.
//! 2. Otherwise restore X, keep the new Y. If that clears it the intrusion was horizontal.
//! 3. Otherwise (wedged in a corner) restore both and stop dead.
//!
//! Trying Y first makes actors slide along floors and ceilings instead of being shoved
//! sideways.

use bevy::prelude::*;

use crate::category::Category;
use crate::partition::Partitioner;
use crate::scene::{NodeId, Scene};

/// What a correction pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Correction {
    /// Nothing overlapped on entry; nothing was touched.
    Clear,
    /// No snapshot to roll back to; the mover keeps its uncorrected position this tick.
    NoSnapshot,
    /// Y restored, X motion kept, vertical velocity zeroed.
    RestoredY,
    /// X restored, Y motion kept, velocity untouched.
    RestoredX,
    /// Both axes restored and velocity zeroed.
    Wedged,
}

/// Whether probe `a` still intrudes into solid geometry.
///
/// Checks the partitioner's live STATIC set and, separately, the raw boxes of `a` and `b`,
/// since `b` may belong to a category (such as a ledge) that the STATIC set does not cover.
pub fn still_overlapping(scene: &Scene, partitioner: &Partitioner, a: NodeId, b: NodeId) -> bool {
    if !partitioner
        .get_collisions_for(scene, a, Category::Static)
        .is_empty()
    {
        return true;
    }
    match (scene.world_box(a), scene.world_box(b)) {
        (Some(probe), Some(solid)) => probe.collides(&solid),
        _ => false,
    }
}

/// Push `mover` (or `a`'s owner when `None`) out of `b`.
///
/// Safe to call again on an already-corrected pair: if nothing overlaps on entry the call
/// is a no-op.
pub fn resolve_to_static(
    scene: &mut Scene,
    partitioner: &Partitioner,
    a: NodeId,
    b: NodeId,
    mover: Option<NodeId>,
) -> Correction {
    let m = mover.unwrap_or_else(|| scene.owner(a));

    if !still_overlapping(scene, partitioner, a, b) {
        return Correction::Clear;
    }

    let Some(last_good) = scene.snapshot_at(m, 0) else {
        debug!("No snapshot for {:?}; skipping correction this tick", m);
        return Correction::NoSnapshot;
    };
    let Some(p) = scene.world_position(m) else {
        return Correction::Clear;
    };
    let v = scene.velocity(m).unwrap_or(Vec3::ZERO);
    let old = last_good.world_position;

    scene.set_world_position(m, Vec3::new(p.x, old.y, p.z));
    if !still_overlapping(scene, partitioner, a, b) {
        scene.set_velocity(m, Vec3::new(v.x, 0.0, v.z));
        return Correction::RestoredY;
    }

    scene.set_world_position(m, Vec3::new(old.x, p.y, p.z));
    if !still_overlapping(scene, partitioner, a, b) {
        return Correction::RestoredX;
    }

    scene.set_world_position(m, Vec3::new(old.x, old.y, p.z));
    scene.set_velocity(m, Vec3::ZERO);
    Correction::Wedged
}
