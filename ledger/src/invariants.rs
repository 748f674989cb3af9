//! # Cross-View Audit
//!
//! Walks the whole ledger and checks the accounting rules that tie the two
//! views together. Cheap enough for tests after every step and for an
//! on-demand health endpoint; far too slow for the transfer hot path.

use std::collections::HashSet;
use thiserror::Error;

use crate::address::Address;
use crate::allocator::TokenId;
use crate::engine::TransferEngine;

/// The first rule found broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("erc20 supply {recorded} != sum of balances {summed}")]
    Erc20SupplyMismatch { recorded: u128, summed: u128 },

    #[error("erc721 supply {recorded} != sum of holdings {summed}")]
    Erc721SupplyMismatch { recorded: u128, summed: u128 },

    #[error("erc20 supply {supply} exceeds ceiling {ceiling}")]
    CeilingExceeded { supply: u128, ceiling: u128 },

    #[error("{account} holds {held} tokens but balance {balance} backs {expected}")]
    WholeUnitMismatch {
        account: Address,
        balance: u128,
        expected: u128,
        held: u128,
    },

    #[error("exempt account {account} holds {held} tokens")]
    ExemptHoldsTokens { account: Address, held: u128 },

    #[error("token {0} is at or below the encoding prefix")]
    IdBelowPrefix(TokenId),

    #[error("token {id} listed under {holder} but recorded owner is {recorded:?}")]
    OwnershipMismatch {
        id: TokenId,
        holder: Address,
        recorded: Option<Address>,
    },

    #[error("token {0} is held by more than one account")]
    DuplicateId(TokenId),
}

/// Checks every cross-view invariant of `engine`.
pub fn audit(engine: &TransferEngine) -> Result<(), InvariantViolation> {
    let fungible = engine.fungible();
    let nonfungible = engine.nonfungible();
    let exempt = engine.exempt_registry();

    let summed: u128 = fungible.accounts().map(|(_, bal)| bal).sum();
    if summed != fungible.total_supply() {
        return Err(InvariantViolation::Erc20SupplyMismatch {
            recorded: fungible.total_supply(),
            summed,
        });
    }
    if fungible.total_supply() > fungible.max_total_supply() {
        return Err(InvariantViolation::CeilingExceeded {
            supply: fungible.total_supply(),
            ceiling: fungible.max_total_supply(),
        });
    }

    let mut seen = HashSet::new();
    let mut held_total: u128 = 0;
    for (holder, ids) in nonfungible.holders() {
        held_total += ids.len() as u128;
        for id in ids {
            if !id.is_encoded() {
                return Err(InvariantViolation::IdBelowPrefix(*id));
            }
            if !seen.insert(*id) {
                return Err(InvariantViolation::DuplicateId(*id));
            }
            let recorded = nonfungible.owner_of(*id).ok();
            if recorded != Some(*holder) {
                return Err(InvariantViolation::OwnershipMismatch {
                    id: *id,
                    holder: *holder,
                    recorded,
                });
            }
        }
    }
    if held_total != nonfungible.total_supply() {
        return Err(InvariantViolation::Erc721SupplyMismatch {
            recorded: nonfungible.total_supply(),
            summed: held_total,
        });
    }
    // An owner entry with no matching holding would slip past the loop above.
    if let Some((id, owner)) = nonfungible.tokens().find(|(id, _)| !seen.contains(id)) {
        return Err(InvariantViolation::OwnershipMismatch {
            id,
            holder: owner,
            recorded: Some(owner),
        });
    }

    let accounts: HashSet<Address> = fungible
        .accounts()
        .map(|(addr, _)| *addr)
        .chain(nonfungible.holders().map(|(addr, _)| *addr))
        .collect();
    for account in accounts {
        let held = nonfungible.balance_of(&account) as u128;
        if exempt.is_exempt(&account) {
            if held != 0 {
                return Err(InvariantViolation::ExemptHoldsTokens { account, held });
            }
            continue;
        }
        let balance = fungible.balance_of(&account);
        let expected = balance / engine.units();
        if held != expected {
            return Err(InvariantViolation::WholeUnitMismatch {
                account,
                balance,
                expected,
                held,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;

    const UNITS: u128 = 1_000_000_000_000_000_000;

    fn alice() -> Address {
        Address::derive("alice")
    }

    /// Deployed ledger where alice holds three whole units and three tokens.
    fn alice_holds_three() -> TransferEngine {
        let mut engine =
            TransferEngine::with_initial_mint(LedgerConfig::default(), Address::derive("deployer")).unwrap();
        engine
            .transfer(Address::derive("deployer"), alice(), 3 * UNITS)
            .unwrap();
        audit(&engine).unwrap();
        engine
    }

    #[test]
    fn fresh_and_deployed_ledgers_pass() {
        let engine = TransferEngine::new(LedgerConfig::default()).unwrap();
        audit(&engine).unwrap();

        let mut engine =
            TransferEngine::with_initial_mint(LedgerConfig::default(), Address::derive("deployer")).unwrap();
        let units = engine.units();
        engine
            .transfer(Address::derive("deployer"), Address::derive("alice"), 3 * units + 1)
            .unwrap();
        audit(&engine).unwrap();
    }

    #[test]
    fn detects_balance_without_supply() {
        let mut engine = alice_holds_three();
        let (fungible, _, _) = engine.views_mut();
        fungible.credit(alice(), 1).unwrap();
        assert_eq!(
            audit(&engine),
            Err(InvariantViolation::Erc20SupplyMismatch {
                recorded: 100 * UNITS,
                summed: 100 * UNITS + 1,
            })
        );
    }

    #[test]
    fn detects_missing_token() {
        let mut engine = alice_holds_three();
        let (_, nonfungible, _) = engine.views_mut();
        nonfungible.burn_latest(&alice()).unwrap();
        assert_eq!(
            audit(&engine),
            Err(InvariantViolation::WholeUnitMismatch {
                account: alice(),
                balance: 3 * UNITS,
                expected: 3,
                held: 2,
            })
        );
    }

    #[test]
    fn detects_stale_token_supply() {
        let mut engine = alice_holds_three();
        let (_, nonfungible, _) = engine.views_mut();
        nonfungible.overwrite_total_supply(5);
        assert_eq!(
            audit(&engine),
            Err(InvariantViolation::Erc721SupplyMismatch { recorded: 5, summed: 3 })
        );
    }

    #[test]
    fn detects_exempt_account_holding_tokens() {
        let mut engine = alice_holds_three();
        let (_, _, exempt) = engine.views_mut();
        exempt.set_exempt(alice(), true);
        assert_eq!(
            audit(&engine),
            Err(InvariantViolation::ExemptHoldsTokens {
                account: alice(),
                held: 3,
            })
        );
    }

    #[test]
    fn detects_owner_record_disagreeing_with_holding() {
        let mut engine = alice_holds_three();
        let id = engine.owned(&alice())[0];
        let bob = Address::derive("bob");
        let (_, nonfungible, _) = engine.views_mut();
        nonfungible.overwrite_owner(id, bob);
        assert_eq!(
            audit(&engine),
            Err(InvariantViolation::OwnershipMismatch {
                id,
                holder: alice(),
                recorded: Some(bob),
            })
        );
    }
}
