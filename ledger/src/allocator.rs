//! # Token Identity Allocation
//!
//! Non-fungible ids live above [`ID_ENCODING_PREFIX`]. The allocator hands
//! out `PREFIX + 1`, `PREFIX + 2`, ... and takes burned ids back into a
//! reuse pool. The pool is a stack: the most recently burned id is the
//! next one issued, and fresh ids are only drawn once the pool is empty.
//!
//! There is exactly one allocator per ledger. It is owned by the
//! [`NonFungibleLedger`](crate::nonfungible::NonFungibleLedger) and reached
//! by reference from every mutation; nothing ever copies it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ID_ENCODING_PREFIX;

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// A raw non-fungible token id.
///
/// Any `u128` can be wrapped so that callers can ask about arbitrary ids;
/// validity (`raw > ID_ENCODING_PREFIX` and currently owned) is checked at
/// the ownership lookup, not here.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(u128);

impl TokenId {
    /// Wraps a raw id without validation.
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// The `n`-th id of the encoded space (`n >= 1`).
    pub const fn from_index(n: u128) -> Self {
        Self(ID_ENCODING_PREFIX + n)
    }

    /// The raw integer.
    pub const fn raw(&self) -> u128 {
        self.0
    }

    /// Position in the encoded space, or `None` if the id is at or below
    /// the prefix.
    pub fn index(&self) -> Option<u128> {
        self.0.checked_sub(ID_ENCODING_PREFIX).filter(|n| *n > 0)
    }

    /// `true` if the id lies in the range the allocator issues from.
    pub fn is_encoded(&self) -> bool {
        self.0 > ID_ENCODING_PREFIX
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(n) => write!(f, "TokenId(PREFIX+{})", n),
            None => write!(f, "TokenId({})", self.0),
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TokenId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>().map(Self)
    }
}

// ---------------------------------------------------------------------------
// IdentityAllocator
// ---------------------------------------------------------------------------

/// Issues and recycles token ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityAllocator {
    /// Number of fresh ids issued so far. The last fresh id is
    /// `PREFIX + minted`.
    minted: u128,
    /// Burned ids awaiting reuse; the top of the stack is the last element.
    reuse_pool: Vec<TokenId>,
}

impl IdentityAllocator {
    /// Creates an allocator that has issued nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id: the top of the reuse pool if any, otherwise a
    /// fresh one.
    pub fn allocate(&mut self) -> TokenId {
        if let Some(id) = self.reuse_pool.pop() {
            return id;
        }
        self.minted += 1;
        TokenId::from_index(self.minted)
    }

    /// Returns an id to the pool.
    ///
    /// The caller guarantees `id` came from this allocator and is no longer
    /// owned by anyone.
    pub fn release(&mut self, id: TokenId) {
        debug_assert!(id.is_encoded(), "released id below the encoding prefix");
        self.reuse_pool.push(id);
    }

    /// The id the next [`allocate`](Self::allocate) would return.
    pub fn peek_next(&self) -> TokenId {
        match self.reuse_pool.last() {
            Some(id) => *id,
            None => TokenId::from_index(self.minted + 1),
        }
    }

    /// Fresh ids issued so far.
    pub fn minted(&self) -> u128 {
        self.minted
    }

    /// Number of ids waiting in the reuse pool.
    pub fn queue_len(&self) -> usize {
        self.reuse_pool.len()
    }

    /// Up to `count` pooled ids starting `start` positions from the top,
    /// in the order they would be reissued.
    pub fn queued(&self, start: usize, count: usize) -> Vec<TokenId> {
        self.reuse_pool
            .iter()
            .rev()
            .skip(start)
            .take(count)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_id_is_just_above_prefix() {
        let mut alloc = IdentityAllocator::new();
        let id = alloc.allocate();
        assert_eq!(id.raw(), ID_ENCODING_PREFIX + 1);
        assert_eq!(id.index(), Some(1));
        assert_eq!(alloc.minted(), 1);
    }

    #[test]
    fn fresh_ids_are_sequential() {
        let mut alloc = IdentityAllocator::new();
        let ids: Vec<_> = (0..5).map(|_| alloc.allocate()).collect();
        let indexes: Vec<_> = ids.iter().map(|id| id.index().unwrap()).collect();
        assert_eq!(indexes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn reuse_pool_is_lifo_and_drained_first() {
        let mut alloc = IdentityAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        let c = alloc.allocate();

        alloc.release(a);
        alloc.release(c);
        assert_eq!(alloc.queue_len(), 2);
        assert_eq!(alloc.peek_next(), c);

        assert_eq!(alloc.allocate(), c);
        assert_eq!(alloc.allocate(), a);
        // Pool empty: fresh id continues after the high-water mark.
        let d = alloc.allocate();
        assert_eq!(d.index(), Some(4));
        assert_ne!(d, b);
        assert_eq!(alloc.minted(), 4);
    }

    #[test]
    fn queued_lists_top_of_stack_first() {
        let mut alloc = IdentityAllocator::new();
        let ids: Vec<_> = (0..4).map(|_| alloc.allocate()).collect();
        for id in &ids {
            alloc.release(*id);
        }
        assert_eq!(alloc.queued(0, 2), vec![ids[3], ids[2]]);
        assert_eq!(alloc.queued(3, 10), vec![ids[0]]);
        assert!(alloc.queued(4, 1).is_empty());
    }

    #[test]
    fn index_rejects_prefix_and_below() {
        assert_eq!(TokenId::new(ID_ENCODING_PREFIX).index(), None);
        assert_eq!(TokenId::new(7).index(), None);
        assert!(!TokenId::new(ID_ENCODING_PREFIX).is_encoded());
        assert!(TokenId::new(ID_ENCODING_PREFIX + 1).is_encoded());
    }

    #[test]
    fn parses_decimal() {
        let id: TokenId = (ID_ENCODING_PREFIX + 9).to_string().parse().unwrap();
        assert_eq!(id.index(), Some(9));
    }
}
