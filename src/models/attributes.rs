//! Compact attribute sets for skills and tools.

use serde::{Deserialize, Serialize};

/// A set of attribute ids (skills or tools) stored as a 64-bit mask.
///
/// Attribute ids range over `0..64`.
///
/// # Examples
///
/// ```
/// use trsp_alns::models::AttributeSet;
///
/// let held = AttributeSet::from_ids(&[0, 3, 5]).unwrap();
/// let required = AttributeSet::from_ids(&[3]).unwrap();
/// assert!(held.contains_all(required));
/// assert!(!required.contains_all(held));
/// assert_eq!(held.len(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttributeSet(u64);

impl AttributeSet {
    /// Largest number of distinct attributes.
    pub const CAPACITY: usize = 64;

    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The set holding every attribute.
    pub const fn all() -> Self {
        Self(u64::MAX)
    }

    /// Builds a set from attribute ids.
    ///
    /// Returns `None` if an id is not below [`Self::CAPACITY`].
    pub fn from_ids(ids: &[usize]) -> Option<Self> {
        let mut set = Self::empty();
        for &id in ids {
            if !set.insert(id) {
                return None;
            }
        }
        Some(set)
    }

    /// Adds an attribute. Returns `false` if the id is out of range.
    pub fn insert(&mut self, id: usize) -> bool {
        if id >= Self::CAPACITY {
            return false;
        }
        self.0 |= 1 << id;
        true
    }

    /// Returns `true` if the attribute belongs to the set.
    pub fn contains(&self, id: usize) -> bool {
        id < Self::CAPACITY && self.0 & (1 << id) != 0
    }

    /// Returns `true` if every attribute of `other` belongs to this set.
    pub fn contains_all(&self, other: AttributeSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of both sets.
    pub fn union(&self, other: AttributeSet) -> AttributeSet {
        Self(self.0 | other.0)
    }

    /// Number of attributes held by both sets.
    pub fn intersection_len(&self, other: AttributeSet) -> usize {
        (self.0 & other.0).count_ones() as usize
    }

    /// Number of attributes in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns `true` if the set holds no attribute.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the attribute ids in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..Self::CAPACITY).filter(move |&id| self.contains(id))
    }
}
