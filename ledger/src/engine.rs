//! # Transfer Engine
//!
//! The orchestrator. Every balance-changing call (transfer, transferFrom,
//! mint, burn, exemption change) enters here, updates the fungible ledger
//! first, then derives the non-fungible delta from the before/after
//! whole-unit counts of the two parties and applies it.
//!
//! ## The whole-unit rule
//!
//! For a non-exempt account `a`, `|owned(a)| == balance(a) / units` after
//! every call. A transfer `from -> to` of `amount` is resolved once into an
//! [`ExemptionRoute`] and then handled by one of four sub-algorithms:
//!
//! | Route        | Non-fungible effect                                      |
//! |--------------|----------------------------------------------------------|
//! | `Neither`    | reassign `min(burn, mint)` tokens, burn/mint the rest    |
//! | `FromExempt` | mint the whole units `to` gained                         |
//! | `ToExempt`   | burn the whole units `from` lost                         |
//! | `Both`       | nothing                                                  |
//!
//! Burns and reassignments always take the sender's most recently acquired
//! tokens first, mirroring the allocator's LIFO reuse.
//!
//! ## Atomicity
//!
//! Each public method checks every precondition before its first write.
//! The writes that follow cannot fail, so a call either applies fully or
//! returns an error with no side effects and no events.

use tracing::{debug, info};

use crate::address::Address;
use crate::allocator::TokenId;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::exempt::ExemptRegistry;
use crate::fungible::FungibleLedger;
use crate::nonfungible::NonFungibleLedger;

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Exemption combination of a transfer's two parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExemptionRoute {
    /// Both parties hold tokens.
    Neither,
    /// Only the receiver holds tokens: pure mint path.
    FromExempt,
    /// Only the sender holds tokens: pure burn path.
    ToExempt,
    /// Neither party holds tokens.
    Both,
}

impl ExemptionRoute {
    pub fn resolve(from_exempt: bool, to_exempt: bool) -> Self {
        match (from_exempt, to_exempt) {
            (false, false) => ExemptionRoute::Neither,
            (true, false) => ExemptionRoute::FromExempt,
            (false, true) => ExemptionRoute::ToExempt,
            (true, true) => ExemptionRoute::Both,
        }
    }
}

/// Non-fungible side effects of one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Tokens minted to the receiver.
    pub minted: u128,
    /// Tokens burned from the sender.
    pub burned: u128,
    /// Tokens handed from sender to receiver with their identity intact.
    pub reassigned: u128,
}

// ---------------------------------------------------------------------------
// TransferEngine
// ---------------------------------------------------------------------------

/// The hybrid ledger: fungible and non-fungible views kept in lockstep.
///
/// Every call appends to an in-memory event log that is only emptied by
/// [`take_events`](Self::take_events). Long-lived embedders must drain it
/// after each call or batch, or it grows with every token ever moved.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    config: LedgerConfig,
    units: u128,
    fungible: FungibleLedger,
    nonfungible: NonFungibleLedger,
    exempt: ExemptRegistry,
    events: Vec<LedgerEvent>,
}

impl TransferEngine {
    /// Creates an empty ledger.
    ///
    /// # Errors
    ///
    /// Decimal precision out of range, or a whole-unit ceiling that
    /// overflows once scaled.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        let units = config.units()?;
        let max_total_supply = config.max_total_supply.scaled(units)?;
        Ok(Self {
            config,
            units,
            fungible: FungibleLedger::new(max_total_supply),
            nonfungible: NonFungibleLedger::new(),
            exempt: ExemptRegistry::new(),
            events: Vec::new(),
        })
    }

    /// Creates a ledger and mints the entire ceiling to `recipient`.
    ///
    /// The recipient is made exempt before the mint, so construction never
    /// mints `max_supply / units` tokens in one go. Later transfers out of
    /// the recipient follow the exempt-sender path.
    pub fn with_initial_mint(config: LedgerConfig, recipient: Address) -> Result<Self, LedgerError> {
        if recipient.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        let mut engine = Self::new(config)?;
        engine.set_erc721_transfer_exempt(recipient, true)?;
        let supply = engine.fungible.max_total_supply();
        engine.mint(recipient, supply)?;
        info!(
            name = %engine.config.name,
            symbol = %engine.config.symbol,
            units = engine.units,
            max_total_supply = supply,
            recipient = %recipient,
            "ledger constructed with initial mint"
        );
        Ok(engine)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Base units per whole unit.
    pub fn units(&self) -> u128 {
        self.units
    }

    pub fn erc20_total_supply(&self) -> u128 {
        self.fungible.total_supply()
    }

    pub fn erc721_total_supply(&self) -> u128 {
        self.nonfungible.total_supply()
    }

    /// Fungible ceiling in base units.
    pub fn max_total_supply(&self) -> u128 {
        self.fungible.max_total_supply()
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.fungible.balance_of(account)
    }

    pub fn erc20_balance_of(&self, account: &Address) -> u128 {
        self.balance_of(account)
    }

    pub fn erc721_balance_of(&self, account: &Address) -> usize {
        self.nonfungible.balance_of(account)
    }

    /// Tokens held by `account`, oldest acquisition first.
    pub fn owned(&self, account: &Address) -> &[TokenId] {
        self.nonfungible.owned(account)
    }

    pub fn owner_of(&self, id: TokenId) -> Result<Address, LedgerError> {
        self.nonfungible.owner_of(id)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.fungible.allowance(owner, spender)
    }

    pub fn get_approved(&self, id: TokenId) -> Result<Option<Address>, LedgerError> {
        self.nonfungible.owner_of(id)?;
        Ok(self.nonfungible.get_approved(id))
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.nonfungible.is_approved_for_all(owner, operator)
    }

    pub fn erc721_transfer_exempt(&self, account: &Address) -> bool {
        self.exempt.is_exempt(account)
    }

    /// Burned ids waiting for reuse.
    pub fn erc721_queue_length(&self) -> usize {
        self.nonfungible.allocator().queue_len()
    }

    /// Pooled ids in reissue order, paginated.
    pub fn erc721_tokens_in_queue(&self, start: usize, count: usize) -> Vec<TokenId> {
        self.nonfungible.allocator().queued(start, count)
    }

    /// Fresh ids issued so far.
    pub fn minted(&self) -> u128 {
        self.nonfungible.allocator().minted()
    }

    pub fn fungible(&self) -> &FungibleLedger {
        &self.fungible
    }

    pub fn nonfungible(&self) -> &NonFungibleLedger {
        &self.nonfungible
    }

    pub fn exempt_registry(&self) -> &ExemptRegistry {
        &self.exempt
    }

    /// Events recorded since the last [`take_events`](Self::take_events).
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Direct access to the three views, for tests that corrupt state.
    #[cfg(test)]
    pub(crate) fn views_mut(&mut self) -> (&mut FungibleLedger, &mut NonFungibleLedger, &mut ExemptRegistry) {
        (&mut self.fungible, &mut self.nonfungible, &mut self.exempt)
    }

    fn whole_units(&self, account: &Address) -> u128 {
        self.fungible.balance_of(account) / self.units
    }

    // -----------------------------------------------------------------------
    // Fungible Mutations
    // -----------------------------------------------------------------------

    /// Sets `spender`'s allowance over `owner`'s funds to exactly `amount`
    /// base units. [`UNLIMITED_ALLOWANCE`](crate::config::UNLIMITED_ALLOWANCE)
    /// is never decremented.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) -> Result<(), LedgerError> {
        if spender.is_zero() {
            return Err(LedgerError::InvalidSpender);
        }
        self.fungible.approve(owner, spender, amount);
        self.events.push(LedgerEvent::Approval {
            owner,
            spender,
            amount,
        });
        Ok(())
    }

    /// Moves `amount` base units from `from` to `to`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<TransferSummary, LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::InvalidSender);
        }
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        self.fungible.ensure_balance(&from, amount)?;
        self.apply_transfer(from, to, amount)
    }

    /// Moves `amount` of `from`'s funds on `spender`'s allowance.
    ///
    /// The allowance is checked before the balance, so a spender probing
    /// without authorization always sees `InsufficientAllowance`.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<TransferSummary, LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::InvalidSender);
        }
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        self.fungible.ensure_allowance(&from, &spender, amount)?;
        self.fungible.ensure_balance(&from, amount)?;

        let summary = self.apply_transfer(from, to, amount)?;
        self.fungible.spend_allowance(from, spender, amount)?;
        Ok(summary)
    }

    /// Mints `amount` new base units to `to`, bounded by the ceiling.
    pub fn mint(&mut self, to: Address, amount: u128) -> Result<TransferSummary, LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        let before = self.whole_units(&to);
        self.fungible.mint(to, amount)?;
        self.events.push(LedgerEvent::Erc20Transfer {
            from: Address::ZERO,
            to,
            amount,
        });

        let summary = if self.exempt.is_exempt(&to) {
            TransferSummary::default()
        } else {
            let gained = self.whole_units(&to).saturating_sub(before);
            self.mint_tokens(to, gained)
        };
        debug!(to = %to, amount, minted = summary.minted, "fungible mint applied");
        Ok(summary)
    }

    /// Burns `amount` base units held by `from`.
    pub fn burn(&mut self, from: Address, amount: u128) -> Result<TransferSummary, LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::InvalidSender);
        }
        let before = self.whole_units(&from);
        self.fungible.burn(from, amount)?;
        self.events.push(LedgerEvent::Erc20Transfer {
            from,
            to: Address::ZERO,
            amount,
        });

        let summary = if self.exempt.is_exempt(&from) {
            TransferSummary::default()
        } else {
            let lost = before.saturating_sub(self.whole_units(&from));
            self.burn_tokens(from, lost)
        };
        debug!(from = %from, amount, burned = summary.burned, "fungible burn applied");
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Non-Fungible Mutations
    // -----------------------------------------------------------------------

    /// Moves token `id` from `from` to `to`, together with exactly one whole
    /// unit of fungible balance.
    ///
    /// `spender` must be `from`, the approved spender of `id`, or an
    /// operator of `from`. Exempt accounts cannot receive tokens.
    pub fn erc721_transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        id: TokenId,
    ) -> Result<(), LedgerError> {
        let owner = self.nonfungible.owner_of(id)?;
        if owner != from {
            return Err(LedgerError::NotOwner { account: from, id });
        }
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        if self.exempt.is_exempt(&to) {
            return Err(LedgerError::ExemptRecipient(to));
        }
        let authorized = spender == from
            || self.nonfungible.is_approved_for_all(&from, &spender)
            || self.nonfungible.get_approved(id) == Some(spender);
        if !authorized {
            return Err(LedgerError::Unauthorized { caller: spender, id });
        }

        self.fungible.transfer(from, to, self.units)?;
        self.nonfungible.transfer(from, to, id)?;
        self.events.push(LedgerEvent::Erc20Transfer {
            from,
            to,
            amount: self.units,
        });
        self.events.push(LedgerEvent::Erc721Transfer { from, to, id });
        debug!(from = %from, to = %to, id = %id, "token transferred");
        Ok(())
    }

    /// Approves `spender` for token `id`. The caller must own the token or
    /// be an operator of its owner. Approving the zero address clears it.
    pub fn approve_token(&mut self, caller: Address, spender: Address, id: TokenId) -> Result<(), LedgerError> {
        let owner = self.nonfungible.owner_of(id)?;
        if caller != owner && !self.nonfungible.is_approved_for_all(&owner, &caller) {
            return Err(LedgerError::Unauthorized { caller, id });
        }
        self.nonfungible.approve(spender, id);
        self.events.push(LedgerEvent::Erc721Approval { owner, spender, id });
        Ok(())
    }

    pub fn set_approval_for_all(&mut self, owner: Address, operator: Address, approved: bool) -> Result<(), LedgerError> {
        if operator.is_zero() {
            return Err(LedgerError::InvalidSpender);
        }
        self.nonfungible.set_approval_for_all(owner, operator, approved);
        self.events.push(LedgerEvent::ApprovalForAll {
            owner,
            operator,
            approved,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Exemption
    // -----------------------------------------------------------------------

    /// Sets `account`'s exemption flag and re-syncs its holdings at once.
    ///
    /// Becoming exempt burns every token the account holds; leaving the
    /// exempt set mints one token per whole unit of its balance. Setting the
    /// current value again is a no-op. Who may call this is decided by the
    /// embedding contract.
    ///
    /// Both re-syncs cost one id and one event per token. For a large
    /// exempt holder that is linear in its whole balance, so embedders
    /// exposing this to untrusted callers should set
    /// [`LedgerConfig::max_resync_mint`].
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidExemption`] for the zero address,
    /// [`LedgerError::ResyncTooLarge`] if leaving the exempt set would mint
    /// more than the configured limit.
    pub fn set_erc721_transfer_exempt(&mut self, account: Address, state: bool) -> Result<TransferSummary, LedgerError> {
        if account.is_zero() {
            return Err(LedgerError::InvalidExemption);
        }
        if self.exempt.is_exempt(&account) == state {
            return Ok(TransferSummary::default());
        }

        let summary = if state {
            let held = self.nonfungible.balance_of(&account) as u128;
            let summary = self.burn_tokens(account, held);
            self.exempt.set_exempt(account, true);
            summary
        } else {
            let owed = self
                .whole_units(&account)
                .saturating_sub(self.nonfungible.balance_of(&account) as u128);
            if let Some(limit) = self.config.max_resync_mint {
                if owed > limit {
                    return Err(LedgerError::ResyncTooLarge { account, owed, limit });
                }
            }
            self.exempt.set_exempt(account, false);
            self.mint_tokens(account, owed)
        };
        self.events.push(LedgerEvent::ExemptionChanged {
            account,
            exempt: state,
        });
        info!(
            account = %account,
            exempt = state,
            minted = summary.minted,
            burned = summary.burned,
            "exemption changed"
        );
        Ok(summary)
    }

    /// Lets an account toggle its own exemption flag.
    pub fn set_self_erc721_transfer_exempt(&mut self, caller: Address, state: bool) -> Result<TransferSummary, LedgerError> {
        self.set_erc721_transfer_exempt(caller, state)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Applies a validated transfer: fungible move, then the non-fungible
    /// delta for the resolved route.
    fn apply_transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<TransferSummary, LedgerError> {
        let route = ExemptionRoute::resolve(self.exempt.is_exempt(&from), self.exempt.is_exempt(&to));
        let from_before = self.whole_units(&from);
        let to_before = self.whole_units(&to);

        self.fungible.transfer(from, to, amount)?;
        self.events.push(LedgerEvent::Erc20Transfer { from, to, amount });

        let from_lost = from_before.saturating_sub(self.whole_units(&from));
        let to_gained = self.whole_units(&to).saturating_sub(to_before);

        let summary = match route {
            ExemptionRoute::Neither => self.rebalance_pair(from, to, from_lost, to_gained),
            ExemptionRoute::FromExempt => self.mint_tokens(to, to_gained),
            ExemptionRoute::ToExempt => self.burn_tokens(from, from_lost),
            ExemptionRoute::Both => TransferSummary::default(),
        };

        debug!(
            from = %from,
            to = %to,
            amount,
            route = ?route,
            minted = summary.minted,
            burned = summary.burned,
            reassigned = summary.reassigned,
            "transfer applied"
        );
        Ok(summary)
    }

    /// Non-exempt to non-exempt: overlap between burns and mints becomes
    /// direct reassignment so token identity survives.
    fn rebalance_pair(&mut self, from: Address, to: Address, burn: u128, mint: u128) -> TransferSummary {
        let reassign = burn.min(mint);
        let mut moved = 0;
        for _ in 0..reassign {
            if let Some(id) = self.nonfungible.reassign_latest(&from, to) {
                self.events.push(LedgerEvent::Erc721Transfer { from, to, id });
                moved += 1;
            }
        }
        let burned = self.burn_tokens(from, burn - reassign).burned;
        let minted = self.mint_tokens(to, mint - reassign).minted;
        TransferSummary {
            minted,
            burned,
            reassigned: moved,
        }
    }

    fn mint_tokens(&mut self, to: Address, count: u128) -> TransferSummary {
        for _ in 0..count {
            let id = self.nonfungible.issue(to);
            self.events.push(LedgerEvent::Erc721Transfer {
                from: Address::ZERO,
                to,
                id,
            });
        }
        TransferSummary {
            minted: count,
            ..TransferSummary::default()
        }
    }

    fn burn_tokens(&mut self, from: Address, count: u128) -> TransferSummary {
        let mut burned = 0;
        for _ in 0..count {
            match self.nonfungible.burn_latest(&from) {
                Some(id) => {
                    self.events.push(LedgerEvent::Erc721Transfer {
                        from,
                        to: Address::ZERO,
                        id,
                    });
                    burned += 1;
                }
                None => break,
            }
        }
        TransferSummary {
            burned,
            ..TransferSummary::default()
        }
    }
}
