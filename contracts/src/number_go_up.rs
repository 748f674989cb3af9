//! # NumberGoUp Token
//!
//! A hybrid token deployed with its exchange wiring in place. At deployment
//! the whole ceiling is minted to an exempt recipient, and the router, the
//! position manager, and the token/wrapped-native pool of every configured
//! fee tier are made exempt. Liquidity can then move through the exchange
//! without minting or burning a token on every hop.
//!
//! ## Authorization
//!
//! - Exemption of arbitrary accounts is restricted to the owner.
//! - Any account may toggle its own exemption.
//! - Fungible and non-fungible transfers follow the ledger's own rules
//!   (balance, allowance, token approvals).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use ngu_ledger::config::DEFAULT_FEE_TIERS;
use ngu_ledger::{Address, LedgerConfig, LedgerError, LedgerEvent, TokenId, TransferEngine, TransferSummary};

use crate::pool::compute_pool_address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur in contract calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The caller is not the contract owner.
    #[error("unauthorized: {caller} is not the owner")]
    Unauthorized {
        /// The account that attempted the call.
        caller: Address,
    },

    /// The zero address cannot own the contract.
    #[error("invalid owner: the zero address cannot own the contract")]
    InvalidOwner,

    /// The zero address cannot be the token's own address.
    #[error("invalid ledger address: the zero address cannot host the token")]
    InvalidLedgerAddress,

    /// The underlying ledger rejected the call.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

// ---------------------------------------------------------------------------
// Deployment Parameters
// ---------------------------------------------------------------------------

/// The exchange router and the two addresses it is built on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterInfo {
    /// The swap router itself.
    pub address: Address,
    /// The pool factory used to derive pool addresses.
    pub factory: Address,
    /// The wrapped native token every pool pairs against.
    pub weth: Address,
}

/// Everything needed to deploy a [`NumberGoUp`] token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NguParams {
    /// Name, symbol, decimals and ceiling of the ledger.
    pub config: LedgerConfig,
    /// Account allowed to manage exemptions.
    pub initial_owner: Address,
    /// Account that receives the entire supply at deployment.
    pub initial_mint_recipient: Address,
    pub router: RouterInfo,
    /// The liquidity position manager.
    pub position_manager: Address,
    /// Fee tiers whose token/weth pools are exempted at deployment.
    #[serde(default = "default_fee_tiers")]
    pub fee_tiers: Vec<u32>,
}

fn default_fee_tiers() -> Vec<u32> {
    DEFAULT_FEE_TIERS.to_vec()
}

// ---------------------------------------------------------------------------
// NumberGoUp
// ---------------------------------------------------------------------------

/// The deployed token: a ledger plus ownership and exchange wiring.
#[derive(Debug, Clone)]
pub struct NumberGoUp {
    address: Address,
    owner: Address,
    router: RouterInfo,
    position_manager: Address,
    /// `(fee, pool)` pairs exempted at deployment.
    pools: Vec<(u32, Address)>,
    ledger: TransferEngine,
}

impl NumberGoUp {
    /// Deploys the token at `address`.
    ///
    /// The mint recipient is exempted and receives the whole ceiling, then
    /// the router, the position manager and one pool per fee tier are
    /// exempted in that order.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidOwner`] or
    /// [`ContractError::InvalidLedgerAddress`] for zero addresses, and any
    /// [`LedgerError`] raised while building the ledger (bad decimals, zero
    /// recipient, zero router or position manager).
    pub fn deploy(address: Address, params: NguParams) -> Result<Self, ContractError> {
        if address.is_zero() {
            return Err(ContractError::InvalidLedgerAddress);
        }
        if params.initial_owner.is_zero() {
            return Err(ContractError::InvalidOwner);
        }

        let mut ledger = TransferEngine::with_initial_mint(params.config, params.initial_mint_recipient)?;
        ledger.set_erc721_transfer_exempt(params.router.address, true)?;
        ledger.set_erc721_transfer_exempt(params.position_manager, true)?;

        let mut pools = Vec::with_capacity(params.fee_tiers.len());
        for fee in params.fee_tiers {
            let pool = compute_pool_address(params.router.factory, address, params.router.weth, fee);
            ledger.set_erc721_transfer_exempt(pool, true)?;
            pools.push((fee, pool));
        }

        info!(
            address = %address,
            owner = %params.initial_owner,
            router = %params.router.address,
            position_manager = %params.position_manager,
            pools = pools.len(),
            "NumberGoUp deployed"
        );

        Ok(Self {
            address,
            owner: params.initial_owner,
            router: params.router,
            position_manager: params.position_manager,
            pools,
            ledger,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The token's own address.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn router(&self) -> &RouterInfo {
        &self.router
    }

    pub fn position_manager(&self) -> Address {
        self.position_manager
    }

    /// Pools exempted at deployment, as `(fee, address)`.
    pub fn pools(&self) -> &[(u32, Address)] {
        &self.pools
    }

    /// Pool address for one fee tier, whether or not it was exempted.
    pub fn pool_for_fee(&self, fee: u32) -> Address {
        compute_pool_address(self.router.factory, self.address, self.router.weth, fee)
    }

    /// Read access to the underlying ledger.
    pub fn ledger(&self) -> &TransferEngine {
        &self.ledger
    }

    /// Drains the ledger's event log. Nothing else empties it.
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        self.ledger.take_events()
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Sets `target`'s exemption. Only the owner may call this.
    pub fn set_erc721_transfer_exempt(
        &mut self,
        caller: Address,
        target: Address,
        state: bool,
    ) -> Result<TransferSummary, ContractError> {
        self.ensure_owner(caller)?;
        Ok(self.ledger.set_erc721_transfer_exempt(target, state)?)
    }

    /// Hands ownership to `new_owner`. Only the current owner may call this.
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), ContractError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(ContractError::InvalidOwner);
        }
        info!(from = %self.owner, to = %new_owner, "ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), ContractError> {
        if caller != self.owner {
            return Err(ContractError::Unauthorized { caller });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ledger Calls
    // -----------------------------------------------------------------------

    pub fn transfer(&mut self, caller: Address, to: Address, amount: u128) -> Result<TransferSummary, ContractError> {
        Ok(self.ledger.transfer(caller, to, amount)?)
    }

    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<TransferSummary, ContractError> {
        Ok(self.ledger.transfer_from(caller, from, to, amount)?)
    }

    pub fn approve(&mut self, caller: Address, spender: Address, amount: u128) -> Result<(), ContractError> {
        Ok(self.ledger.approve(caller, spender, amount)?)
    }

    pub fn erc721_transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        id: TokenId,
    ) -> Result<(), ContractError> {
        Ok(self.ledger.erc721_transfer_from(caller, from, to, id)?)
    }

    pub fn approve_token(&mut self, caller: Address, spender: Address, id: TokenId) -> Result<(), ContractError> {
        Ok(self.ledger.approve_token(caller, spender, id)?)
    }

    pub fn set_approval_for_all(
        &mut self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), ContractError> {
        Ok(self.ledger.set_approval_for_all(caller, operator, approved)?)
    }

    /// Toggles the caller's own exemption.
    pub fn set_self_erc721_transfer_exempt(
        &mut self,
        caller: Address,
        state: bool,
    ) -> Result<TransferSummary, ContractError> {
        Ok(self.ledger.set_self_erc721_transfer_exempt(caller, state)?)
    }
}
