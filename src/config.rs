use crate::{CappedToken, HypError, Result, TOKEN_NAME, TOKEN_SYMBOL};
use primitive_types::{H160, U256};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default state file for the CLI
pub const DEFAULT_STATE_PATH: &str = "./hyp-data/ledger.json";

/// Mint performed by the deployer right after construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialMint {
    pub to: H160,
    pub amount: U256,
}

/// Parameters for a new deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub name: String,
    pub symbol: String,
    pub cap: U256,
    pub deployer: H160,
    pub initial_mint: Option<InitialMint>,
    pub state_path: PathBuf,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            // 100M tokens with 18 decimals
            cap: U256::from(100_000_000u64) * U256::exp10(18),
            deployer: H160::zero(),
            initial_mint: None,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

impl DeployConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.symbol.is_empty() {
            return Err(HypError::Config("Token name and symbol must not be empty".to_string()));
        }
        if self.cap.is_zero() {
            return Err(HypError::Config("Cap must be greater than zero".to_string()));
        }
        if self.deployer.is_zero() {
            return Err(HypError::Config("Deployer must not be the zero address".to_string()));
        }
        if let Some(mint) = &self.initial_mint {
            if mint.to.is_zero() {
                return Err(HypError::Config("Initial mint recipient must not be the zero address".to_string()));
            }
            if mint.amount > self.cap {
                return Err(HypError::Config(format!(
                    "Initial mint of {} exceeds cap {}",
                    mint.amount, self.cap
                )));
            }
        }
        Ok(())
    }

    /// Construct the ledger and run the optional initial mint as the deployer
    pub fn bootstrap(&self) -> Result<CappedToken> {
        self.validate()?;

        let mut token = CappedToken::new(self.name.clone(), self.symbol.clone(), self.cap, self.deployer)?;
        if let Some(mint) = &self.initial_mint {
            token.mint(self.deployer, mint.to, mint.amount)?;
            tracing::info!("Initial mint of {} {} to 0x{:x}", mint.amount, self.symbol, mint.to);
        }

        tracing::info!(
            "Deployed {} ({}) with cap {} by 0x{:x}",
            self.name,
            self.symbol,
            self.cap,
            self.deployer
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn deployer() -> H160 {
        H160::from_low_u64_be(1)
    }

    #[test]
    fn test_defaults() {
        let config = DeployConfig::default();
        assert_eq!(config.name, "Hypmydata");
        assert_eq!(config.symbol, "HYP");
        assert_eq!(config.cap, U256::from_dec_str("100000000000000000000000000").unwrap());
        assert!(config.initial_mint.is_none());
        // zero deployer must be filled in before use
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let base = DeployConfig { deployer: deployer(), ..DeployConfig::default() };
        assert!(base.validate().is_ok());

        let zero_cap = DeployConfig { cap: U256::zero(), ..base.clone() };
        assert!(matches!(zero_cap.validate(), Err(HypError::Config(_))));

        let over_cap = DeployConfig {
            initial_mint: Some(InitialMint { to: deployer(), amount: base.cap + U256::one() }),
            ..base.clone()
        };
        assert!(matches!(over_cap.validate(), Err(HypError::Config(_))));

        let zero_recipient = DeployConfig {
            initial_mint: Some(InitialMint { to: H160::zero(), amount: U256::one() }),
            ..base
        };
        assert!(matches!(zero_recipient.validate(), Err(HypError::Config(_))));
    }

    #[test]
    fn test_bootstrap_with_initial_mint() {
        let holder = H160::from_low_u64_be(2);
        let config = DeployConfig {
            cap: U256::from(1_000_000),
            deployer: deployer(),
            initial_mint: Some(InitialMint { to: holder, amount: U256::from(250_000) }),
            ..DeployConfig::default()
        };

        let token = config.bootstrap().unwrap();
        assert_eq!(token.balance_of(holder), U256::from(250_000));
        assert_eq!(token.total_supply(), U256::from(250_000));
        assert!(token.has_role(Role::Minter, deployer()));
        // four role grants plus the mint
        assert_eq!(token.events().len(), 5);
    }
}
