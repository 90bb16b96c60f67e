//! Canonical component-set identity.
//!
//! A [`Signature`] is the identity of an archetype: the ordered,
//! deduplicated sequence of component types its entities carry, plus a
//! cached hash so archetype lookup and query caching never re-hash on the
//! hot path.

use std::hash::{Hash, Hasher};

use crate::engine::bitset::BitSet;
use crate::engine::component::ComponentType;
use crate::engine::types::{ComponentID, HASH_MASK};


/// Ordered, deduplicated set of component types with a cached hash.
///
/// ## Purpose
/// Signatures identify archetypes: two signatures built from permutations
/// of the same component set are equal and hash identically, because
/// construction sorts by component id and deduplicates before hashing.
///
/// ## Invariants
/// - `types` is strictly ascending by component id.
/// - `hash` is non-negative (63-bit masked) and computed exactly once.
/// - Equality compares the hash first and the id sequence second, so a
///   hash collision can never conflate two distinct signatures.

#[derive(Clone, Debug)]
pub struct Signature {
    types: Box<[ComponentType]>,
    hash: i64,
}

impl Default for Signature {
    fn default() -> Self {
        Self::from_types(std::iter::empty())
    }
}

impl Signature {

    /// Creates the empty signature.
    #[inline]
    pub fn empty() -> Self { Self::default() }

    /// Builds a signature from an arbitrary component list.
    ///
    /// ## Behavior
    /// Sorts by component id, removes duplicates, and computes the cached
    /// hash. Input order is irrelevant to the result.

    pub fn from_types<I: IntoIterator<Item = ComponentType>>(types: I) -> Self {
        let mut types: Vec<ComponentType> = types.into_iter().collect();
        types.sort_unstable_by_key(|ty| ty.id);
        types.dedup_by_key(|ty| ty.id);

        let hash = hash_sorted_ids(&types);
        Self { types: types.into_boxed_slice(), hash }
    }

    /// Returns the component types in ascending id order.
    #[inline]
    pub fn types(&self) -> &[ComponentType] { &self.types }

    /// Iterates over the component ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ComponentID> + '_ {
        self.types.iter().map(|ty| ty.id)
    }

    /// Returns the number of component types.
    #[inline]
    pub fn len(&self) -> usize { self.types.len() }

    /// Returns `true` if the signature holds no components.
    #[inline]
    pub fn is_empty(&self) -> bool { self.types.is_empty() }

    /// Returns `true` if `component_id` is part of this signature.
    pub fn contains(&self, component_id: ComponentID) -> bool {
        self.types
            .binary_search_by_key(&component_id, |ty| ty.id)
            .is_ok()
    }

    /// Returns the cached 63-bit hash.
    ///
    /// ## Notes
    /// Never negative; the sign bit is masked off so negative values remain
    /// free for sentinel use by callers.
    #[inline]
    pub fn hash_value(&self) -> i64 { self.hash }

    /// Returns a new signature extended with `added`.
    ///
    /// Adding a component already present yields an equal signature.
    pub fn with(&self, added: ComponentType) -> Signature {
        Signature::from_types(self.types.iter().copied().chain(std::iter::once(added)))
    }

    /// Returns a new signature with `removed` taken out.
    ///
    /// Removing an absent component yields an equal signature.
    pub fn without(&self, removed: ComponentID) -> Signature {
        Signature::from_types(self.types.iter().copied().filter(|ty| ty.id != removed))
    }

    /// Materializes the signature as a predicate bitset.
    pub fn bitset(&self) -> BitSet {
        BitSet::from_ids(self.ids())
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        if self.hash != other.hash {
            return false;
        }
        self.types.len() == other.types.len()
            && self.ids().zip(other.ids()).all(|(a, b)| a == b)
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i64(self.hash);
    }
}

/// Polynomial hash over an ascending id sequence, masked to 63 bits.
///
/// Sorting before hashing is what makes the hash permutation-independent.
fn hash_sorted_ids(types: &[ComponentType]) -> i64 {
    let mut hash: i64 = 17;
    for ty in types {
        hash = hash
            .wrapping_mul(31)
            .wrapping_add(ty.id as i64 + 1);
    }
    hash & HASH_MASK
}
