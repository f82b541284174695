//! In-memory deployment: tokens, feeds, the synthetic asset and the engine.

use alloy::primitives::{keccak256, Address, U256};
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use synthvault_chain::{
    CollateralTransfer, Erc20Token, ManualAggregator, PriceFeed, SyntheticAssetIssuer,
    SyntheticToken,
};
use synthvault_core::{Engine, ResolvedDeployment};

/// Deploys the synthetic before handing ownership to the engine.
const DEPLOYER: &str = "deployer";

/// Address of a named scenario account, or a literal `0x` address.
pub fn account_address(name: &str) -> Result<Address> {
    if name.starts_with("0x") {
        return name
            .parse()
            .with_context(|| format!("Invalid address '{name}'"));
    }
    Ok(Address::from_word(keccak256(name.as_bytes())))
}

pub struct World {
    pub engine: Arc<Engine>,
    pub synthetic: Arc<SyntheticToken>,
    /// Collateral symbols in registration order
    symbols: Vec<String>,
    collateral: HashMap<String, Arc<Erc20Token>>,
    feeds: HashMap<String, Arc<ManualAggregator>>,
}

impl World {
    /// Instantiate every token and feed of `deployment` and wire the engine.
    pub fn build(deployment: &ResolvedDeployment) -> Result<Self> {
        let deployer = account_address(DEPLOYER)?;
        let synthetic = Arc::new(SyntheticToken::new(
            deployment.synthetic.address,
            deployment.synthetic.symbol.clone(),
            deployer,
        ));

        let tokens: Vec<Arc<Erc20Token>> = deployment
            .collateral
            .iter()
            .map(|c| Arc::new(Erc20Token::new(c.token, c.symbol.clone(), c.decimals)))
            .collect();
        let feeds: Vec<Arc<ManualAggregator>> = deployment
            .feeds
            .iter()
            .map(|f| Arc::new(ManualAggregator::new(f.address, f.decimals, f.initial_answer)))
            .collect();

        let engine = Engine::new(
            deployment.engine_address,
            tokens
                .iter()
                .map(|t| t.clone() as Arc<dyn CollateralTransfer>)
                .collect(),
            feeds.iter().map(|f| f.clone() as Arc<dyn PriceFeed>).collect(),
            synthetic.clone() as Arc<dyn SyntheticAssetIssuer>,
        )
        .context("Failed to construct engine")?
        .with_config(&deployment.engine);

        synthetic
            .transfer_ownership(deployer, engine.address())
            .context("Failed to hand synthetic ownership to the engine")?;

        info!(
            deployment = %deployment.name,
            engine = %engine.address(),
            synthetic = %synthetic.address(),
            "World ready"
        );

        let symbols: Vec<String> = deployment
            .collateral
            .iter()
            .map(|c| c.symbol.clone())
            .collect();
        let collateral = symbols.iter().cloned().zip(tokens).collect();
        let feeds = symbols.iter().cloned().zip(feeds).collect();

        Ok(Self {
            engine: Arc::new(engine),
            synthetic,
            symbols,
            collateral,
            feeds,
        })
    }

    pub fn token(&self, symbol: &str) -> Result<&Arc<Erc20Token>> {
        self.collateral
            .get(symbol)
            .ok_or_else(|| anyhow!("Unknown collateral '{symbol}'"))
    }

    pub fn feed(&self, symbol: &str) -> Result<&Arc<ManualAggregator>> {
        self.feeds
            .get(symbol)
            .ok_or_else(|| anyhow!("No price feed for '{symbol}'"))
    }

    /// Collateral asset address by symbol, or a literal `0x` address.
    pub fn asset(&self, symbol: &str) -> Result<Address> {
        if symbol.starts_with("0x") {
            return account_address(symbol);
        }
        Ok(self.token(symbol)?.address())
    }

    /// Let the engine pull `amount` of `token` (a collateral or the synthetic) from `account`.
    pub fn approve(&self, account: Address, token: &str, amount: U256) -> Result<()> {
        let engine = self.engine.address();
        if token == self.synthetic.symbol() {
            self.synthetic.approve(account, engine, amount);
        } else {
            self.token(token)?.approve(account, engine, amount);
        }
        Ok(())
    }

    /// Wallet balance of `account` in `token` (a collateral or the synthetic).
    pub fn wallet_balance(&self, account: Address, token: &str) -> Result<U256> {
        if token == self.synthetic.symbol() {
            Ok(self.synthetic.balance_of(account))
        } else {
            Ok(self.token(token)?.balance_of(account))
        }
    }

    pub fn collateral_symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}
