//! In-memory world shared by the unit tests.

use alloy::primitives::{Address, I256, U256};
use std::sync::Arc;
use synthvault_chain::{
    CollateralTransfer, Erc20Token, ManualAggregator, PriceFeed, SyntheticAssetIssuer,
    SyntheticToken, PRICE_DECIMALS,
};

use crate::config::SolvencyPolicy;
use crate::engine::Engine;
use crate::u256_math::WAD;

pub(crate) const ENGINE: Address = Address::repeat_byte(0xEE);

pub(crate) fn wad(n: u64) -> U256 {
    U256::from(n) * WAD
}

/// Oracle answer for a whole-dollar price.
pub(crate) fn usd(dollars: i64) -> I256 {
    I256::try_from(dollars * 100_000_000).unwrap()
}

pub(crate) struct World {
    pub engine: Engine,
    pub weth: Arc<Erc20Token>,
    pub wbtc: Arc<Erc20Token>,
    pub weth_feed: Arc<ManualAggregator>,
    pub wbtc_feed: Arc<ManualAggregator>,
    pub synth: Arc<SyntheticToken>,
    pub alice: Address,
    pub bob: Address,
    pub carol: Address,
}

impl World {
    /// WETH at $2000 and WBTC at $1000, default solvency policy.
    pub fn new() -> Self {
        Self::with_policy(SolvencyPolicy::default())
    }

    pub fn with_policy(policy: SolvencyPolicy) -> Self {
        let weth = Arc::new(Erc20Token::new(Address::repeat_byte(0xE1), "WETH", 18));
        let wbtc = Arc::new(Erc20Token::new(Address::repeat_byte(0xB1), "WBTC", 18));
        let weth_feed = Arc::new(ManualAggregator::new(
            Address::repeat_byte(0xF1),
            PRICE_DECIMALS,
            usd(2000),
        ));
        let wbtc_feed = Arc::new(ManualAggregator::new(
            Address::repeat_byte(0xF2),
            PRICE_DECIMALS,
            usd(1000),
        ));
        let synth = Arc::new(SyntheticToken::new(Address::repeat_byte(0x5D), "sUSD", ENGINE));

        let collateral: Vec<Arc<dyn CollateralTransfer>> = vec![weth.clone(), wbtc.clone()];
        let feeds: Vec<Arc<dyn PriceFeed>> = vec![weth_feed.clone(), wbtc_feed.clone()];
        let issuer: Arc<dyn SyntheticAssetIssuer> = synth.clone();
        let engine = Engine::new(ENGINE, collateral, feeds, issuer)
            .unwrap()
            .with_policy(policy);

        Self {
            engine,
            weth,
            wbtc,
            weth_feed,
            wbtc_feed,
            synth,
            alice: Address::repeat_byte(0xA1),
            bob: Address::repeat_byte(0xB0),
            carol: Address::repeat_byte(0xC0),
        }
    }

    fn token(&self, asset: Address) -> &Erc20Token {
        if asset == self.weth.address() {
            &self.weth
        } else {
            &self.wbtc
        }
    }

    /// Give `account` collateral tokens and let the engine pull them.
    pub fn fund(&self, account: Address, asset: Address, amount: U256) {
        let token = self.token(asset);
        token.mint(account, amount).unwrap();
        token.approve(account, ENGINE, U256::MAX);
    }

    /// Let the engine pull `account`'s synthetic for burns.
    pub fn approve_synthetic(&self, account: Address, amount: U256) {
        self.synth.approve(account, ENGINE, amount);
    }

    pub fn set_weth_price(&self, dollars: i64) {
        self.weth_feed.update_answer(usd(dollars));
    }
}
