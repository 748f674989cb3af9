//! # Exempt Registry
//!
//! Accounts that hold fungible balance without taking part in the
//! non-fungible view: exchange pools, routers, position managers, and the
//! initial mint recipient. Unknown accounts are not exempt.
//!
//! The registry itself is a plain set. Authorization of who may flip a flag
//! and what happens to an account's tokens when it flips are decided by the
//! caller (see [`TransferEngine::set_erc721_transfer_exempt`]).
//!
//! [`TransferEngine::set_erc721_transfer_exempt`]: crate::engine::TransferEngine::set_erc721_transfer_exempt

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::address::Address;

/// Set of exempt accounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExemptRegistry {
    exempt: HashSet<Address>,
}

impl ExemptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Returns `true` if the status actually changed.
    pub fn set_exempt(&mut self, account: Address, state: bool) -> bool {
        if state {
            self.exempt.insert(account)
        } else {
            self.exempt.remove(&account)
        }
    }

    pub fn is_exempt(&self, account: &Address) -> bool {
        self.exempt.contains(account)
    }

    pub fn len(&self) -> usize {
        self.exempt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exempt.is_empty()
    }

    /// All exempt accounts, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.exempt.iter()
    }
}
