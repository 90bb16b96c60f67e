//! Declarative query descriptions and the compiled query cache.
//!
//! This module turns a declarative [`QueryDescription`] (four component
//! signatures with All / Any / None / Exclusive roles) into a compiled
//! [`Query`]: four predicate bitsets plus a cached list of matching
//! archetype indices.
//!
//! ## Execution model
//! 1. The world looks up the description's composite hash in its query
//!    cache, compiling and scanning on first use.
//! 2. The compiled query holds matching archetypes *by index*; it never
//!    owns storage.
//! 3. When a new archetype is created, the world walks the cache and
//!    appends the archetype to every query it satisfies, so cached queries
//!    never go stale.
//!
//! ## Matching semantics
//! - With a non-empty `exclusive` signature, an archetype matches iff its
//!   bitset equals the exclusive mask exactly.
//! - Otherwise an archetype matches iff it has every `all` component,
//!   at least one `any` component (vacuously true when `any` is empty),
//!   and no `none` component.
//! - Combining `exclusive` with any other predicate is rejected with
//!   [`MalformedQueryError`] at compile time.

use std::cell::Cell;

use crate::engine::archetype::Archetype;
use crate::engine::bitset::BitSet;
use crate::engine::error::{ECSResult, MalformedQueryError};
use crate::engine::iter::{ArchetypeIter, ChunkIter, ChunkIterMut, EntityIter};
use crate::engine::signature::Signature;
use crate::engine::types::{ArchetypeID, HASH_MASK, UNCOMPUTED_HASH};


/// Declarative description of an archetype filter.
///
/// ## Purpose
/// `QueryDescription` is the user-facing half of the query system: four
/// signatures describing which component sets an archetype must carry
/// (`all`), intersect (`any`), avoid (`none`), or equal exactly
/// (`exclusive`). An all-empty description matches every archetype.
///
/// ## Mutation
/// The signatures are public and may be replaced after construction; call
/// [`QueryDescription::rebuild`] afterwards to invalidate the cached
/// composite hash. The world's query cache is keyed by the post-rebuild
/// hash.

#[derive(Clone, Debug)]
pub struct QueryDescription {

    /// Components an archetype must all contain.
    pub all: Signature,

    /// Components of which an archetype must contain at least one.
    pub any: Signature,

    /// Components an archetype must not contain.
    pub none: Signature,

    /// Exact component set an archetype must equal; mutually exclusive
    /// with the three predicates above.
    pub exclusive: Signature,

    hash: Cell<i64>,
}

impl QueryDescription {

    /// Creates an empty description, matching every archetype.
    pub fn new() -> Self {
        Self {
            all: Signature::empty(),
            any: Signature::empty(),
            none: Signature::empty(),
            exclusive: Signature::empty(),
            hash: Cell::new(UNCOMPUTED_HASH),
        }
    }

    /// Replaces the `all` signature.
    pub fn with_all(mut self, signature: Signature) -> Self {
        self.all = signature;
        self.rebuild();
        self
    }

    /// Replaces the `any` signature.
    pub fn with_any(mut self, signature: Signature) -> Self {
        self.any = signature;
        self.rebuild();
        self
    }

    /// Replaces the `none` signature.
    pub fn with_none(mut self, signature: Signature) -> Self {
        self.none = signature;
        self.rebuild();
        self
    }

    /// Replaces the `exclusive` signature.
    pub fn with_exclusive(mut self, signature: Signature) -> Self {
        self.exclusive = signature;
        self.rebuild();
        self
    }

    /// Invalidates the cached composite hash after signature mutation.
    pub fn rebuild(&self) {
        self.hash.set(UNCOMPUTED_HASH);
    }

    /// Returns the composite hash over the four signatures.
    ///
    /// ## Behavior
    /// Computed lazily and cached; [`QueryDescription::rebuild`] resets the
    /// cache. The combination is order-sensitive, so swapping the roles of
    /// two signatures yields a different query identity.

    pub fn hash_value(&self) -> i64 {
        let cached = self.hash.get();
        if cached != UNCOMPUTED_HASH {
            return cached;
        }

        let mut hash: i64 = 17;
        for signature in [&self.all, &self.any, &self.none, &self.exclusive] {
            hash = hash.wrapping_mul(23).wrapping_add(signature.hash_value());
        }
        let hash = hash & HASH_MASK;

        self.hash.set(hash);
        hash
    }

    /// Checks the exclusive-predicate invariant.
    ///
    /// ## Errors
    /// Returns [`MalformedQueryError`] if `exclusive` is non-empty together
    /// with any of `all`, `any`, or `none`.

    pub fn validate(&self) -> Result<(), MalformedQueryError> {
        let exclusive_set = !self.exclusive.is_empty();
        let others_set =
            !self.all.is_empty() || !self.any.is_empty() || !self.none.is_empty();
        if exclusive_set && others_set {
            return Err(MalformedQueryError);
        }
        Ok(())
    }
}

impl Default for QueryDescription {
    fn default() -> Self { Self::new() }
}

/// Compiled, cached archetype match-set for one query description.
///
/// ## Purpose
/// A `Query` holds the description's signatures materialized as bitsets and
/// the indices of every matching archetype, appended incrementally as new
/// archetypes are created. It holds weak (by-index) references only and
/// never owns storage.

pub struct Query {
    all: BitSet,
    any: BitSet,
    none: BitSet,
    exclusive: BitSet,
    uses_exclusive: bool,
    matches: Vec<ArchetypeID>,
}

impl Query {

    /// Compiles a description into predicate bitsets.
    ///
    /// ## Errors
    /// Propagates [`MalformedQueryError`] from validation.

    pub(crate) fn compile(description: &QueryDescription) -> ECSResult<Self> {
        description.validate()?;

        Ok(Self {
            all: description.all.bitset(),
            any: description.any.bitset(),
            none: description.none.bitset(),
            exclusive: description.exclusive.bitset(),
            uses_exclusive: !description.exclusive.is_empty(),
            matches: Vec::new(),
        })
    }

    /// Returns `true` if an archetype bitset satisfies this query.
    pub fn valid(&self, bits: &BitSet) -> bool {
        if self.uses_exclusive {
            return bits.exclusive(&self.exclusive);
        }
        bits.all(&self.all) && bits.any(&self.any) && bits.none(&self.none)
    }

    /// Scans existing archetypes and records every match.
    pub(crate) fn scan(&mut self, archetypes: &[Archetype]) {
        for archetype in archetypes {
            self.consider(archetype);
        }
    }

    /// Appends `archetype` to the match list if it satisfies the query.
    pub(crate) fn consider(&mut self, archetype: &Archetype) {
        if self.valid(archetype.bitset()) {
            self.matches.push(archetype.id());
        }
    }

    /// Indices of matching archetypes, in archetype creation order.
    #[inline]
    pub fn matches(&self) -> &[ArchetypeID] { &self.matches }

    /// Number of matching archetypes.
    #[inline]
    pub fn match_count(&self) -> usize { self.matches.len() }
}

/// Shared view over a cached query's matching storage.
///
/// ## Purpose
/// Borrowing the world shared for the lifetime of the view statically rules
/// out structural changes during iteration.

pub struct QueryView<'w> {
    pub(crate) archetypes: &'w [Archetype],
    pub(crate) query: &'w Query,
}

impl<'w> QueryView<'w> {

    /// The compiled query behind this view.
    #[inline]
    pub fn query(&self) -> &'w Query { self.query }

    /// Iterates over matching archetypes.
    pub fn archetypes(&self) -> ArchetypeIter<'w> {
        ArchetypeIter::new(self.archetypes, self.query.matches())
    }

    /// Iterates over all non-empty chunks of matching archetypes.
    pub fn chunks(&self) -> ChunkIter<'w> {
        ChunkIter::new(self.archetypes, self.query.matches())
    }

    /// Iterates over `(entity, row, chunk)` triples in archetype-major,
    /// chunk-major, row order.
    pub fn entities(&self) -> EntityIter<'w> {
        EntityIter::new(self.archetypes, self.query.matches())
    }

    /// Total number of entities the query currently matches.
    pub fn entity_count(&self) -> usize {
        self.archetypes().map(Archetype::len).sum()
    }
}

/// Mutable view over a cached query's matching storage.
///
/// ## Purpose
/// Grants chunk-level write access for in-place component mutation while
/// the exclusive world borrow rules out structural changes.

pub struct QueryViewMut<'w> {
    pub(crate) archetypes: &'w mut [Archetype],
    pub(crate) matches: &'w [ArchetypeID],
}

impl<'w> QueryViewMut<'w> {

    /// Iterates mutably over all non-empty chunks of matching archetypes.
    pub fn chunks_mut(self) -> ChunkIterMut<'w> {
        ChunkIterMut::new(self.archetypes, self.matches)
    }
}
