//! Registered collateral assets and their price feeds.

use alloy::primitives::Address;
use std::collections::HashMap;
use std::sync::Arc;
use synthvault_chain::{CollateralTransfer, PriceFeed, COLLATERAL_DECIMALS, PRICE_DECIMALS};
use tracing::info;

use crate::error::{EngineError, Result};

/// A registered collateral asset: its token and the feed that prices it.
#[derive(Debug, Clone)]
pub struct CollateralAsset {
    pub token: Arc<dyn CollateralTransfer>,
    pub feed: Arc<dyn PriceFeed>,
}

/// Allow-list of collateral assets, fixed at construction.
#[derive(Debug, Clone)]
pub struct CollateralRegistry {
    /// Registration order
    order: Vec<Address>,
    assets: HashMap<Address, CollateralAsset>,
}

impl CollateralRegistry {
    /// Pair each token with the feed at the same position.
    ///
    /// Valuation assumes 18-decimal tokens and 8-decimal feeds; anything else
    /// is rejected rather than mispriced.
    pub fn new(
        tokens: Vec<Arc<dyn CollateralTransfer>>,
        feeds: Vec<Arc<dyn PriceFeed>>,
    ) -> Result<Self> {
        if tokens.len() != feeds.len() {
            return Err(EngineError::LengthMismatch {
                tokens: tokens.len(),
                feeds: feeds.len(),
            });
        }

        let mut order = Vec::with_capacity(tokens.len());
        let mut assets = HashMap::with_capacity(tokens.len());
        for (token, feed) in tokens.into_iter().zip(feeds) {
            let asset = token.address();
            if assets.contains_key(&asset) {
                return Err(EngineError::DuplicateAsset(asset));
            }
            if token.decimals() != COLLATERAL_DECIMALS {
                return Err(EngineError::UnsupportedTokenDecimals {
                    asset,
                    decimals: token.decimals(),
                    expected: COLLATERAL_DECIMALS,
                });
            }
            if feed.decimals() != PRICE_DECIMALS {
                return Err(EngineError::UnsupportedFeedDecimals {
                    feed: feed.address(),
                    decimals: feed.decimals(),
                    expected: PRICE_DECIMALS,
                });
            }
            info!(
                %asset,
                symbol = token.symbol(),
                feed = %feed.address(),
                "Registered collateral asset"
            );
            order.push(asset);
            assets.insert(asset, CollateralAsset { token, feed });
        }

        Ok(Self { order, assets })
    }

    pub fn get(&self, asset: &Address) -> Result<&CollateralAsset> {
        self.assets
            .get(asset)
            .ok_or(EngineError::UnsupportedAsset(*asset))
    }

    /// Registered assets in registration order.
    pub fn assets(&self) -> &[Address] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
