//! Axis-aligned world boxes.
//!
//! The world uses a Y-down screen convention: positive Y points toward the bottom
//! of the screen, so "above" means a smaller Y and gravity is a positive Y acceleration.

use bevy::prelude::*;

/// An axis-aligned box in world (or local) space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorldBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl WorldBox {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box with the given minimum corner and size.
    pub fn from_corner_size(corner: Vec3, size: Vec3) -> Self {
        Self {
            min: corner,
            max: corner + size,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Same box moved by `offset`.
    #[inline]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Scale each axis, keeping min <= max.
    pub fn scaled(&self, scale: Vec3) -> Self {
        let a = self.min * scale;
        let b = self.max * scale;
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Reorder corners so that `min <= max` on every axis.
    ///
    /// Flipped tile masks end up with swapped corners; this restores a valid box.
    pub fn normalized(&self) -> Self {
        Self {
            min: self.min.min(self.max),
            max: self.min.max(self.max),
        }
    }

    /// Strict overlap test. Boxes that only share a face do not collide.
    #[inline]
    pub fn collides(&self, other: &WorldBox) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Overlap region of two boxes, if any.
    pub fn intersect(&self, other: &WorldBox) -> Option<WorldBox> {
        if !self.collides(other) {
            return None;
        }
        Some(WorldBox {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_at(x: f32, y: f32) -> WorldBox {
        WorldBox::from_corner_size(Vec3::new(x, y, -1.0), Vec3::new(1.0, 1.0, 2.0))
    }

    #[test]
    fn test_touching_faces_do_not_collide() {
        let a = unit_at(0.0, 0.0);
        let b = unit_at(1.0, 0.0);
        assert!(!a.collides(&b));
        assert!(!b.collides(&a));
    }

    #[test]
    fn test_partial_overlap_collides() {
        let a = unit_at(0.0, 0.0);
        let b = unit_at(0.5, 0.5);
        assert!(a.collides(&b));
        let overlap = a.intersect(&b).unwrap();
        assert!((overlap.size().x - 0.5).abs() < 1e-6);
        assert!((overlap.size().y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_flipped_box() {
        let flipped = WorldBox::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.75, 1.0, 1.0));
        let fixed = flipped.normalized();
        assert_eq!(fixed.min.x, 0.75);
        assert_eq!(fixed.max.x, 1.0);
    }
}
