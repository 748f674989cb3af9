//! # Fungible Ledger
//!
//! Balances in base units, allowances, and the aggregate supply with its
//! ceiling. Knows nothing about whole units or tokens; the
//! [`TransferEngine`](crate::engine::TransferEngine) layers that on top.
//!
//! Accounts appear on first credit and are never removed. A zero balance is
//! a perfectly good terminal state.
//!
//! The ceiling is only checked on [`mint`](FungibleLedger::mint). Transfers
//! conserve supply and cannot breach it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::address::Address;
use crate::config::UNLIMITED_ALLOWANCE;
use crate::error::LedgerError;

/// Fungible balances, allowances, and supply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FungibleLedger {
    balances: HashMap<Address, u128>,
    /// `owner -> spender -> amount`.
    allowances: HashMap<Address, HashMap<Address, u128>>,
    total_supply: u128,
    max_total_supply: u128,
}

impl FungibleLedger {
    /// Creates an empty ledger with the given ceiling (base units).
    pub fn new(max_total_supply: u128) -> Self {
        Self {
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: 0,
            max_total_supply,
        }
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn max_total_supply(&self) -> u128 {
        self.max_total_supply
    }

    /// Every account that has ever held a balance.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, u128)> {
        self.balances.iter().map(|(addr, bal)| (addr, *bal))
    }

    /// Fails unless `account` holds at least `amount`.
    pub fn ensure_balance(&self, account: &Address, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: *account,
                available,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Adds `amount` to `account`. Returns the new balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ArithmeticOverflow`] if the balance would exceed `u128`.
    pub fn credit(&mut self, account: Address, amount: u128) -> Result<u128, LedgerError> {
        let current = self.balance_of(&account);
        let updated = current
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.balances.insert(account, updated);
        Ok(updated)
    }

    /// Subtracts `amount` from `account`. Returns the new balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] if `amount` exceeds the balance.
    pub fn debit(&mut self, account: Address, amount: u128) -> Result<u128, LedgerError> {
        self.ensure_balance(&account, amount)?;
        let updated = self.balance_of(&account) - amount;
        self.balances.insert(account, updated);
        Ok(updated)
    }

    /// Moves `amount` from `from` to `to`. Either both sides update or
    /// neither does.
    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        self.ensure_balance(&from, amount)?;
        if from == to {
            return Ok(());
        }
        let from_after = self.balance_of(&from) - amount;
        let to_after = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.balances.insert(from, from_after);
        self.balances.insert(to, to_after);
        Ok(())
    }

    /// Creates `amount` new base units for `to`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::SupplyCeilingExceeded`] if the supply would pass
    /// the ceiling.
    pub fn mint(&mut self, to: Address, amount: u128) -> Result<(), LedgerError> {
        let new_total = self
            .total_supply
            .checked_add(amount)
            .filter(|total| *total <= self.max_total_supply)
            .ok_or(LedgerError::SupplyCeilingExceeded {
                ceiling: self.max_total_supply,
                current: self.total_supply,
                requested: amount,
            })?;
        self.credit(to, amount)?;
        self.total_supply = new_total;
        Ok(())
    }

    /// Destroys `amount` base units held by `from`.
    pub fn burn(&mut self, from: Address, amount: u128) -> Result<(), LedgerError> {
        self.debit(from, amount)?;
        self.total_supply -= amount;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Allowances
    // -----------------------------------------------------------------------

    /// Sets the allowance to exactly `amount` (not additive).
    /// [`UNLIMITED_ALLOWANCE`] is never decremented.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) {
        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Fails unless `spender` may move `amount` of `owner`'s funds.
    pub fn ensure_allowance(
        &self,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let allowance = self.allowance(owner, spender);
        if allowance != UNLIMITED_ALLOWANCE && allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: *owner,
                spender: *spender,
                allowance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Checks and consumes allowance. Unlimited allowances stay untouched.
    pub fn spend_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.ensure_allowance(&owner, &spender, amount)?;
        let allowance = self.allowance(&owner, &spender);
        if allowance != UNLIMITED_ALLOWANCE {
            self.approve(owner, spender, allowance - amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bob() -> Address {
        Address::derive("bob")
    }

    #[test]
    fn mint_respects_ceiling() {
        let mut ledger = FungibleLedger::new(1_000);
        ledger.mint(alice(), 600).unwrap();
        ledger.mint(bob(), 400).unwrap();
        assert_eq!(ledger.total_supply(), 1_000);

        let err = ledger.mint(alice(), 1).unwrap_err();
        assert_eq!(
            err,
            LedgerError::SupplyCeilingExceeded {
                ceiling: 1_000,
                current: 1_000,
                requested: 1,
            }
        );
        assert_eq!(ledger.balance_of(&alice()), 600);
    }

    #[test]
    fn mint_overflowing_u128_is_a_ceiling_error() {
        let mut ledger = FungibleLedger::new(u128::MAX);
        ledger.mint(alice(), u128::MAX).unwrap();
        assert!(matches!(
            ledger.mint(bob(), 1),
            Err(LedgerError::SupplyCeilingExceeded { .. })
        ));
    }

    #[test]
    fn debit_more_than_balance_rejected() {
        let mut ledger = FungibleLedger::new(1_000);
        ledger.mint(alice(), 100).unwrap();
        let err = ledger.debit(alice(), 101).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                available: 100,
                requested: 101,
                ..
            }
        ));
        assert_eq!(ledger.balance_of(&alice()), 100);
    }

    #[test]
    fn transfer_conserves_supply() {
        let mut ledger = FungibleLedger::new(1_000);
        ledger.mint(alice(), 500).unwrap();
        ledger.transfer(alice(), bob(), 200).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 300);
        assert_eq!(ledger.balance_of(&bob()), 200);
        assert_eq!(ledger.total_supply(), 500);
        let sum: u128 = ledger.accounts().map(|(_, b)| b).sum();
        assert_eq!(sum, ledger.total_supply());
    }

    #[test]
    fn self_transfer_is_a_noop_but_checks_balance() {
        let mut ledger = FungibleLedger::new(1_000);
        ledger.mint(alice(), 50).unwrap();
        ledger.transfer(alice(), alice(), 50).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 50);
        assert!(ledger.transfer(alice(), alice(), 51).is_err());
    }

    #[test]
    fn burn_reduces_supply() {
        let mut ledger = FungibleLedger::new(1_000);
        ledger.mint(alice(), 500).unwrap();
        ledger.burn(alice(), 120).unwrap();
        assert_eq!(ledger.total_supply(), 380);
        assert_eq!(ledger.balance_of(&alice()), 380);
    }

    #[test]
    fn approve_sets_literal_amount() {
        let mut ledger = FungibleLedger::new(0);
        ledger.approve(alice(), bob(), 100_000);
        assert_eq!(ledger.allowance(&alice(), &bob()), 100_000);
        ledger.approve(alice(), bob(), 7);
        assert_eq!(ledger.allowance(&alice(), &bob()), 7);
        assert_eq!(ledger.allowance(&bob(), &alice()), 0);
    }

    #[test]
    fn spend_allowance_decrements() {
        let mut ledger = FungibleLedger::new(0);
        ledger.approve(alice(), bob(), 100);
        ledger.spend_allowance(alice(), bob(), 40).unwrap();
        assert_eq!(ledger.allowance(&alice(), &bob()), 60);
        let err = ledger.spend_allowance(alice(), bob(), 61).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientAllowance {
                allowance: 60,
                requested: 61,
                ..
            }
        ));
        assert_eq!(ledger.allowance(&alice(), &bob()), 60);
    }

    #[test]
    fn unlimited_allowance_is_never_decremented() {
        let mut ledger = FungibleLedger::new(0);
        ledger.approve(alice(), bob(), UNLIMITED_ALLOWANCE);
        for _ in 0..3 {
            ledger.spend_allowance(alice(), bob(), 1_000_000).unwrap();
        }
        assert_eq!(ledger.allowance(&alice(), &bob()), UNLIMITED_ALLOWANCE);
    }
}
