//! Collision category tags.

use serde::{Deserialize, Serialize};

/// The label a registered probe volume carries. A probe carries exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Actor body probe.
    Character,
    /// Actor feet probe (grounded test).
    CharacterFeet,
    /// Actor side probe (wall test).
    CharacterSides,
    /// Solid tile geometry.
    Static,
    /// One-way platform, solid only from above.
    Ledge,
    /// Geometry that kills on contact.
    Fatal,
    /// Interactive world object.
    Thing,
    /// Projectile.
    Bullet,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Character,
        Category::CharacterFeet,
        Category::CharacterSides,
        Category::Static,
        Category::Ledge,
        Category::Fatal,
        Category::Thing,
        Category::Bullet,
    ];
}

/// An ordered `(a, b)` category pair. Order matters: handlers receive the `a` node first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryPair {
    pub a: Category,
    pub b: Category,
}

impl CategoryPair {
    pub const fn new(a: Category, b: Category) -> Self {
        Self { a, b }
    }
}
