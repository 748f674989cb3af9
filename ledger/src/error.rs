//! Error types for the hybrid ledger.
//!
//! Every failure is a caller precondition violation: synchronous, precise,
//! and not worth retrying unchanged. No operation applies partially before
//! returning one of these.

use thiserror::Error;

use crate::address::Address;
use crate::allocator::TokenId;

/// Errors returned by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The account's fungible balance does not cover the amount.
    #[error("insufficient balance: {account} has {available}, requested {requested}")]
    InsufficientBalance {
        /// Account being debited.
        account: Address,
        /// Its current balance.
        available: u128,
        /// Amount the caller tried to move.
        requested: u128,
    },

    /// The spender's allowance does not cover the amount.
    #[error("insufficient allowance: {spender} may spend {allowance} of {owner}, requested {requested}")]
    InsufficientAllowance {
        /// Owner of the funds.
        owner: Address,
        /// Party spending on the owner's behalf.
        spender: Address,
        /// Recorded allowance.
        allowance: u128,
        /// Amount the spender tried to move.
        requested: u128,
    },

    /// The id is at or below the encoding prefix, or no one owns it.
    #[error("invalid token id: {0}")]
    InvalidTokenId(TokenId),

    /// The account does not own the token.
    #[error("{account} does not own token {id}")]
    NotOwner {
        /// Account named as the holder.
        account: Address,
        /// Token in question.
        id: TokenId,
    },

    /// A mint would push the fungible supply past its ceiling.
    #[error("supply ceiling exceeded: ceiling {ceiling}, current {current}, mint {requested}")]
    SupplyCeilingExceeded {
        /// Configured maximum fungible supply.
        ceiling: u128,
        /// Supply before the mint.
        current: u128,
        /// Amount the caller tried to mint.
        requested: u128,
    },

    /// Transfers to the zero address are not allowed.
    #[error("invalid recipient: the zero address cannot receive")]
    InvalidRecipient,

    /// The zero address cannot send.
    #[error("invalid sender: the zero address cannot send")]
    InvalidSender,

    /// The zero address cannot be approved as spender or operator.
    #[error("invalid spender: the zero address cannot be approved")]
    InvalidSpender,

    /// The zero address cannot be marked exempt.
    #[error("invalid exemption target: the zero address")]
    InvalidExemption,

    /// Non-fungible tokens cannot be minted or transferred to an exempt account.
    #[error("recipient {0} is exempt from non-fungible transfers")]
    ExemptRecipient(Address),

    /// The caller is neither owner, approved spender, nor operator.
    #[error("{caller} is not authorized for token {id}")]
    Unauthorized {
        /// Party attempting the operation.
        caller: Address,
        /// Token in question.
        id: TokenId,
    },

    /// Decimal precision below the supported floor.
    #[error("decimals too low: {decimals} (minimum {minimum})")]
    DecimalsTooLow {
        /// Requested precision.
        decimals: u8,
        /// Supported floor.
        minimum: u8,
    },

    /// Decimal precision whose scale does not fit the amount type.
    #[error("decimals too high: {decimals} (maximum {maximum})")]
    DecimalsTooHigh {
        /// Requested precision.
        decimals: u8,
        /// Supported ceiling.
        maximum: u8,
    },

    /// Leaving the exempt set would mint more tokens than one call allows.
    #[error("re-syncing {account} would mint {owed} tokens (limit {limit})")]
    ResyncTooLarge {
        /// Account leaving the exempt set.
        account: Address,
        /// Tokens its balance backs.
        owed: u128,
        /// Configured per-call limit.
        limit: u128,
    },

    /// An amount computation overflowed `u128`.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
}
