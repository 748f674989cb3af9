//! # Ledger Configuration & Constants
//!
//! Every magic number of the hybrid ledger lives here, together with the
//! construction parameters that are consumed once and never re-validated.
//!
//! The fungible side counts in base units. `units = 10^decimals` base units
//! make one whole unit, and one whole unit is one non-fungible token.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

// ---------------------------------------------------------------------------
// Token Id Encoding
// ---------------------------------------------------------------------------

/// Offset of the non-fungible id space. Every valid token id is strictly
/// greater than this value; the first id ever issued is `PREFIX + 1`.
///
/// The top bit of the id word is set for every valid id, so a raw integer
/// can never be confused with a small fungible amount.
pub const ID_ENCODING_PREFIX: u128 = 1 << 127;

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Allowance value that is never decremented by spends.
pub const UNLIMITED_ALLOWANCE: u128 = u128::MAX;

/// Lowest accepted decimal precision. Below 18 the whole-unit boundary gets
/// coarse enough that dust transfers start minting tokens.
pub const MIN_DECIMALS: u8 = 18;

/// Highest precision whose `10^decimals` still fits in `u128`.
pub const MAX_DECIMALS: u8 = 38;

/// Default precision, same as the reference deployment.
pub const DEFAULT_DECIMALS: u8 = 18;

// ---------------------------------------------------------------------------
// Exchange Wiring
// ---------------------------------------------------------------------------

/// Fee tiers (hundredths of a basis point) for which exchange pools are
/// exempted at deployment: 0.01%, 0.05%, 0.3%, 1%.
pub const DEFAULT_FEE_TIERS: [u32; 4] = [100, 500, 3_000, 10_000];

// ---------------------------------------------------------------------------
// Construction Parameters
// ---------------------------------------------------------------------------

/// The supply ceiling, in either of the two accepted forms.
///
/// `WholeUnits(n)` and `Scaled(n * units)` describe the same ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxSupply {
    /// A count of whole units (non-fungible tokens).
    WholeUnits(u128),
    /// An already scaled amount of fungible base units.
    Scaled(u128),
}

impl MaxSupply {
    /// Resolves the ceiling to base units.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ArithmeticOverflow`] if `WholeUnits(n) * units`
    /// does not fit in `u128`.
    pub fn scaled(&self, units: u128) -> Result<u128, LedgerError> {
        match *self {
            MaxSupply::WholeUnits(n) => n.checked_mul(units).ok_or(LedgerError::ArithmeticOverflow),
            MaxSupply::Scaled(n) => Ok(n),
        }
    }
}

/// Static parameters of a ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Human-readable name, e.g. "NumberGoUp".
    pub name: String,
    /// Ticker, e.g. "NGU".
    pub symbol: String,
    /// Decimal precision of the fungible view.
    pub decimals: u8,
    /// Supply ceiling of the fungible view.
    pub max_total_supply: MaxSupply,
    /// Most tokens a single exemption removal may mint while re-syncing the
    /// account. `None` leaves it unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_resync_mint: Option<u128>,
}

impl LedgerConfig {
    /// Builds a config with [`DEFAULT_DECIMALS`].
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, max_total_supply: MaxSupply) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals: DEFAULT_DECIMALS,
            max_total_supply,
            max_resync_mint: None,
        }
    }

    /// Caps the tokens one exemption removal may mint.
    pub fn with_max_resync_mint(mut self, limit: u128) -> Self {
        self.max_resync_mint = Some(limit);
        self
    }

    /// Base units per whole unit: `10^decimals`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DecimalsTooLow`] below [`MIN_DECIMALS`],
    /// [`LedgerError::DecimalsTooHigh`] above [`MAX_DECIMALS`].
    pub fn units(&self) -> Result<u128, LedgerError> {
        if self.decimals < MIN_DECIMALS {
            return Err(LedgerError::DecimalsTooLow {
                decimals: self.decimals,
                minimum: MIN_DECIMALS,
            });
        }
        if self.decimals > MAX_DECIMALS {
            return Err(LedgerError::DecimalsTooHigh {
                decimals: self.decimals,
                maximum: MAX_DECIMALS,
            });
        }
        Ok(10u128.pow(u32::from(self.decimals)))
    }

    /// The ceiling in base units.
    pub fn max_total_supply_scaled(&self) -> Result<u128, LedgerError> {
        self.max_total_supply.scaled(self.units()?)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::new("NumberGoUp", "NGU", MaxSupply::WholeUnits(100))
    }
}
