//! # Non-Fungible Ledger
//!
//! Ownership of every live token id, each owner's tokens in acquisition
//! order, the count of tokens currently minted, and ERC-721 style
//! approvals. Ids come from (and go back to) the single
//! [`IdentityAllocator`] owned here.
//!
//! The "latest" helpers (`burn_latest`, `reassign_latest`) work on the end
//! of an owner's acquisition list, which is what gives the engine its
//! most-recently-acquired-first burn order.

use std::collections::{HashMap, HashSet};

use crate::address::Address;
use crate::allocator::{IdentityAllocator, TokenId};
use crate::error::LedgerError;
use crate::exempt::ExemptRegistry;

/// Token ownership and approvals.
#[derive(Debug, Clone, Default)]
pub struct NonFungibleLedger {
    allocator: IdentityAllocator,
    owners: HashMap<TokenId, Address>,
    /// Per-owner tokens, oldest first.
    owned: HashMap<Address, Vec<TokenId>>,
    token_approvals: HashMap<TokenId, Address>,
    operators: HashMap<Address, HashSet<Address>>,
    total_supply: u128,
}

impl NonFungibleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens currently minted (owned by someone).
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn allocator(&self) -> &IdentityAllocator {
        &self.allocator
    }

    /// Owner of `id`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidTokenId`] if `id` is at or below
    /// [`ID_ENCODING_PREFIX`](crate::config::ID_ENCODING_PREFIX) (never
    /// issued, whatever the mint history) or has no current owner.
    pub fn owner_of(&self, id: TokenId) -> Result<Address, LedgerError> {
        if !id.is_encoded() {
            return Err(LedgerError::InvalidTokenId(id));
        }
        self.owners
            .get(&id)
            .copied()
            .ok_or(LedgerError::InvalidTokenId(id))
    }

    /// Tokens held by `account`, oldest acquisition first.
    pub fn owned(&self, account: &Address) -> &[TokenId] {
        self.owned.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn balance_of(&self, account: &Address) -> usize {
        self.owned(account).len()
    }

    /// Every account with a non-empty holding.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &[TokenId])> {
        self.owned
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(addr, ids)| (addr, ids.as_slice()))
    }

    /// Every live token and its owner.
    pub fn tokens(&self) -> impl Iterator<Item = (TokenId, Address)> + '_ {
        self.owners.iter().map(|(id, owner)| (*id, *owner))
    }

    // -----------------------------------------------------------------------
    // Mint / Burn / Transfer
    // -----------------------------------------------------------------------

    /// Mints one token to `to` from the allocator.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidRecipient`] for the zero address,
    /// [`LedgerError::ExemptRecipient`] if `to` is exempt.
    pub fn mint_to(&mut self, to: Address, exempt: &ExemptRegistry) -> Result<TokenId, LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        if exempt.is_exempt(&to) {
            return Err(LedgerError::ExemptRecipient(to));
        }
        Ok(self.issue(to))
    }

    /// Burns a specific token held by `from` and returns its id to the pool.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotOwner`] if `from` does not hold `id`.
    pub fn burn_from(&mut self, from: Address, id: TokenId) -> Result<(), LedgerError> {
        self.ensure_owner(&from, id)?;
        self.detach(&from, id);
        self.total_supply -= 1;
        self.allocator.release(id);
        Ok(())
    }

    /// Moves `id` from `from` to `to` without touching fungible balances.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidRecipient`] for the zero address,
    /// [`LedgerError::NotOwner`] if `from` does not hold `id`.
    pub fn transfer(&mut self, from: Address, to: Address, id: TokenId) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        self.ensure_owner(&from, id)?;
        self.detach(&from, id);
        self.attach(to, id);
        Ok(())
    }

    pub(crate) fn issue(&mut self, to: Address) -> TokenId {
        let id = self.allocator.allocate();
        self.attach(to, id);
        self.total_supply += 1;
        id
    }

    /// Burns the most recently acquired token of `from`.
    pub(crate) fn burn_latest(&mut self, from: &Address) -> Option<TokenId> {
        let id = self.pop_latest(from)?;
        self.total_supply -= 1;
        self.allocator.release(id);
        Some(id)
    }

    /// Hands the most recently acquired token of `from` to `to`.
    pub(crate) fn reassign_latest(&mut self, from: &Address, to: Address) -> Option<TokenId> {
        let id = self.pop_latest(from)?;
        self.attach(to, id);
        Some(id)
    }

    #[cfg(test)]
    pub(crate) fn overwrite_total_supply(&mut self, supply: u128) {
        self.total_supply = supply;
    }

    /// Rewrites the owner record of `id` without touching any holding list.
    #[cfg(test)]
    pub(crate) fn overwrite_owner(&mut self, id: TokenId, owner: Address) {
        self.owners.insert(id, owner);
    }

    // -----------------------------------------------------------------------
    // Approvals
    // -----------------------------------------------------------------------

    /// Records `spender` as the approved party for `id`. Authorization is
    /// the caller's job.
    pub fn approve(&mut self, spender: Address, id: TokenId) {
        if spender.is_zero() {
            self.token_approvals.remove(&id);
        } else {
            self.token_approvals.insert(id, spender);
        }
    }

    pub fn get_approved(&self, id: TokenId) -> Option<Address> {
        self.token_approvals.get(&id).copied()
    }

    pub fn set_approval_for_all(&mut self, owner: Address, operator: Address, approved: bool) {
        let ops = self.operators.entry(owner).or_default();
        if approved {
            ops.insert(operator);
        } else {
            ops.remove(&operator);
        }
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operators
            .get(owner)
            .map(|ops| ops.contains(operator))
            .unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_owner(&self, account: &Address, id: TokenId) -> Result<(), LedgerError> {
        match self.owners.get(&id) {
            Some(owner) if owner == account => Ok(()),
            _ => Err(LedgerError::NotOwner {
                account: *account,
                id,
            }),
        }
    }

    fn attach(&mut self, to: Address, id: TokenId) {
        self.owners.insert(id, to);
        self.owned.entry(to).or_default().push(id);
    }

    /// Removes `id` from `from`, keeping the rest in acquisition order.
    /// Clears any per-token approval.
    fn detach(&mut self, from: &Address, id: TokenId) {
        if let Some(ids) = self.owned.get_mut(from) {
            if let Some(pos) = ids.iter().position(|held| *held == id) {
                ids.remove(pos);
            }
        }
        self.owners.remove(&id);
        self.token_approvals.remove(&id);
    }

    fn pop_latest(&mut self, from: &Address) -> Option<TokenId> {
        let id = self.owned.get_mut(from)?.pop()?;
        self.owners.remove(&id);
        self.token_approvals.remove(&id);
        Some(id)
    }
}
