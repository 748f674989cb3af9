// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NumberGoUp Ledger — Core Library
//!
//! One pool of value, two views of it. Every account holds a fungible
//! balance in base units, and every non-exempt account additionally owns one
//! individually numbered non-fungible token per whole unit (`units` base
//! units) of that balance. Move half a unit and nothing happens on the
//! non-fungible side; cross a whole-unit boundary and a token is minted,
//! burned, or handed over.
//!
//! Exempt accounts (exchange pools, routers, position managers) hold
//! fungible balance only. They never own tokens and never trigger mints or
//! burns on their side of a transfer.
//!
//! ## Architecture
//!
//! - **allocator** — token id space: prefix encoding, fresh ids, LIFO reuse.
//! - **exempt** — which accounts sit outside the non-fungible view.
//! - **fungible** — balances, allowances, supply ceiling.
//! - **nonfungible** — ownership, per-owner acquisition order, approvals.
//! - **engine** — the orchestrator. Every balance-changing call goes through
//!   here and leaves both views consistent.
//! - **events** — the log of what each mutation did.
//! - **invariants** — an audit of the cross-view accounting rules.
//! - **sync** — a single-writer handle for concurrent hosts.
//! - **config** — constants and construction parameters.
//!
//! ## Design Philosophy
//!
//! 1. Validate everything, then mutate. A failed call leaves no trace.
//! 2. Checked arithmetic on every amount. `u128` is big, not infinite.
//! 3. One allocator, owned by the non-fungible ledger, never sharded.

pub mod address;
pub mod allocator;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod exempt;
pub mod fungible;
pub mod invariants;
pub mod nonfungible;
pub mod sync;

pub use address::Address;
pub use allocator::{IdentityAllocator, TokenId};
pub use config::{LedgerConfig, MaxSupply, ID_ENCODING_PREFIX, UNLIMITED_ALLOWANCE};
pub use engine::{ExemptionRoute, TransferEngine, TransferSummary};
pub use error::LedgerError;
pub use events::LedgerEvent;
pub use exempt::ExemptRegistry;
pub use fungible::FungibleLedger;
pub use invariants::{audit, InvariantViolation};
pub use nonfungible::NonFungibleLedger;
pub use sync::Shared;
