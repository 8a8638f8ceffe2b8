use bitflags::bitflags;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

bitflags! {
    /// Collision category bits. A shape belongs to its `categories` and
    /// collides with shapes whose categories intersect its `mask`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
    pub struct Categories: u32 {
        /// Every category
        const ALL = u32::MAX;
    }
}

impl Default for Categories {
    fn default() -> Self {
        Categories::ALL
    }
}

/// Filter deciding which shapes may collide with or be found by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ShapeFilter {
    /// Shapes sharing a non-zero group never collide with each other
    pub group: u64,

    /// Categories this shape belongs to
    pub categories: Categories,

    /// Categories this shape collides with
    pub mask: Categories,
}

impl ShapeFilter {
    /// Filter that collides with everything
    pub const ALL: ShapeFilter = ShapeFilter {
        group: 0,
        categories: Categories::ALL,
        mask: Categories::ALL,
    };

    /// Filter that collides with nothing
    pub const NONE: ShapeFilter = ShapeFilter {
        group: 0,
        categories: Categories::empty(),
        mask: Categories::empty(),
    };

    /// Creates a new filter from a group and raw category/mask bits
    pub fn new(group: u64, categories: u32, mask: u32) -> Self {
        Self {
            group,
            categories: Categories::from_bits_retain(categories),
            mask: Categories::from_bits_retain(mask),
        }
    }

    /// Returns true when a shape with this filter must not interact with one using `other`
    pub fn reject(&self, other: &ShapeFilter) -> bool {
        (self.group != 0 && self.group == other.group)
            || !self.categories.intersects(other.mask)
            || !other.categories.intersects(self.mask)
    }
}

impl Default for ShapeFilter {
    fn default() -> Self {
        ShapeFilter::ALL
    }
}
