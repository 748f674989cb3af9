//! Events recorded by ledger mutations.
//!
//! Mints and burns use [`Address::ZERO`] as the counterparty, on both the
//! fungible and the non-fungible side. A failed call records nothing.

use serde::Serialize;

use crate::address::Address;
use crate::allocator::TokenId;

/// One observable effect of a ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Fungible balance moved, minted, or burned.
    Erc20Transfer {
        from: Address,
        to: Address,
        amount: u128,
    },
    /// Fungible allowance set.
    Approval {
        owner: Address,
        spender: Address,
        amount: u128,
    },
    /// Token moved, minted, or burned.
    Erc721Transfer {
        from: Address,
        to: Address,
        id: TokenId,
    },
    /// Per-token approval set.
    Erc721Approval {
        owner: Address,
        spender: Address,
        id: TokenId,
    },
    /// Operator approval toggled.
    ApprovalForAll {
        owner: Address,
        operator: Address,
        approved: bool,
    },
    /// Exemption flag changed.
    ExemptionChanged { account: Address, exempt: bool },
}

impl LedgerEvent {
    /// `true` for a non-fungible mint.
    pub fn is_erc721_mint(&self) -> bool {
        matches!(self, LedgerEvent::Erc721Transfer { from, .. } if from.is_zero())
    }

    /// `true` for a non-fungible burn.
    pub fn is_erc721_burn(&self) -> bool {
        matches!(self, LedgerEvent::Erc721Transfer { to, .. } if to.is_zero())
    }

    /// `true` for a non-fungible move between two real accounts.
    pub fn is_erc721_reassignment(&self) -> bool {
        matches!(
            self,
            LedgerEvent::Erc721Transfer { from, to, .. } if !from.is_zero() && !to.is_zero()
        )
    }
}
