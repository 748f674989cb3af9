//! # Deployment Configuration
//!
//! The node deploys one NumberGoUp token at startup from a JSON file. JSON
//! rather than TOML because amounts and ceilings are `u128`, which TOML
//! integers cannot hold.
//!
//! `ngu-node init` writes the devnet default below; every address in it is
//! derived from a fixed label so that scripts written against devnet stay
//! valid across runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use ngu_contracts::{NguParams, NumberGoUp, RouterInfo};
use ngu_ledger::config::DEFAULT_FEE_TIERS;
use ngu_ledger::{Address, LedgerConfig};

/// Default config file name when `--config` is omitted.
pub const DEFAULT_CONFIG_FILE: &str = "ngu-node.json";

/// Per-call re-sync mint limit of the devnet config. Exemption changes are
/// open to every API caller, so the node never ships without one.
pub const DEVNET_MAX_RESYNC_MINT: u128 = 10_000;

/// Everything the node needs to deploy its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Free-form network label reported by `/status`.
    pub network: String,
    /// Address the token is deployed at. Pool addresses derive from it.
    pub ledger_address: Address,
    pub deployment: NguParams,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        let owner = Address::derive("devnet-owner");
        Self {
            network: "devnet".into(),
            ledger_address: Address::derive("devnet-ngu"),
            deployment: NguParams {
                config: LedgerConfig::default().with_max_resync_mint(DEVNET_MAX_RESYNC_MINT),
                initial_owner: owner,
                initial_mint_recipient: owner,
                router: RouterInfo {
                    address: Address::derive("devnet-router"),
                    factory: Address::derive("devnet-factory"),
                    weth: Address::derive("devnet-weth"),
                },
                position_manager: Address::derive("devnet-position-manager"),
                fee_tiers: DEFAULT_FEE_TIERS.to_vec(),
            },
        }
    }
}

impl DeploymentConfig {
    /// Reads and parses a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Loads `path` if given, otherwise the devnet default.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Writes the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_vec_pretty(self).context("failed to encode config")?;
        std::fs::write(path, body)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }

    /// Deploys the token described by this config.
    pub fn deploy(&self) -> Result<NumberGoUp> {
        NumberGoUp::deploy(self.ledger_address, self.deployment.clone())
            .context("token deployment failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngu_ledger::MaxSupply;

    #[test]
    fn default_deploys_with_full_supply_at_owner() {
        let config = DeploymentConfig::default();
        let ngu = config.deploy().unwrap();
        let owner = config.deployment.initial_owner;
        assert_eq!(ngu.ledger().balance_of(&owner), ngu.ledger().max_total_supply());
        assert_eq!(ngu.pools().len(), DEFAULT_FEE_TIERS.len());
    }

    #[test]
    fn save_then_load_preserves_large_ceilings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let mut config = DeploymentConfig::default();
        // Above u64::MAX once written out.
        config.deployment.config.max_total_supply = MaxSupply::Scaled(50_000_000_000_000_000_000_000);
        config.save(&path).unwrap();

        assert_eq!(DeploymentConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = DeploymentConfig::load(Path::new("/nonexistent/ngu.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/ngu.json"));
    }

    #[test]
    fn devnet_bounds_resync_and_keeps_it_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        DeploymentConfig::default().save(&path).unwrap();

        let loaded = DeploymentConfig::load(&path).unwrap();
        assert_eq!(loaded.deployment.config.max_resync_mint, Some(DEVNET_MAX_RESYNC_MINT));
    }

    #[test]
    fn no_path_falls_back_to_devnet() {
        let config = DeploymentConfig::load_or_default(None).unwrap();
        assert_eq!(config.network, "devnet");
    }
}
