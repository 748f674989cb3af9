//! # NumberGoUp Contracts
//!
//! The deployable token built on top of `ngu-ledger`. The ledger knows how
//! to keep fungible balances and non-fungible tokens in lockstep; this crate
//! decides who is allowed to do what, and which accounts are wired as
//! exempt at deployment:
//!
//! - **NumberGoUp** — owner-gated exemption management, the initial mint,
//!   and the exchange wiring (router, position manager, one pool per fee
//!   tier) that must never hold tokens.
//! - **Pool addressing** — deterministic pool addresses for a token pair and
//!   fee tier, so pools can be exempted before they exist.
//!
//! ## Design Principles
//!
//! 1. Privileged calls name their caller explicitly. There is no ambient
//!    sender.
//! 2. Ledger errors pass through untouched; this crate only adds
//!    authorization failures on top.
//! 3. Every public parameter type is serializable (serde) so a host can load
//!    a deployment from a file.

pub mod number_go_up;
pub mod pool;

pub use number_go_up::{ContractError, NguParams, NumberGoUp, RouterInfo};
pub use pool::compute_pool_address;
