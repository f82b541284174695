//! Scenario files: a list of steps replayed against the engine.
//!
//! ```toml
//! [[step]]
//! action = "deposit"
//! account = "alice"
//! asset = "WETH"
//! amount = "10e18"
//! expect_error = "HealthFactorBroken"   # optional
//! ```

use alloy::primitives::U256;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use synthvault_core::EngineError;

use crate::world::{account_address, World};

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "step", default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    /// Engine error kind this step must fail with
    #[serde(default)]
    pub expect_error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Mint collateral tokens into a wallet
    Fund {
        account: String,
        asset: String,
        amount: Amount,
    },
    /// Allow the engine to pull a collateral token or the synthetic
    Approve {
        account: String,
        token: String,
        amount: Amount,
    },
    Deposit {
        account: String,
        asset: String,
        amount: Amount,
    },
    Mint {
        account: String,
        amount: Amount,
    },
    DepositAndMint {
        account: String,
        asset: String,
        collateral: Amount,
        debt: Amount,
    },
    Redeem {
        from: String,
        #[serde(default)]
        to: Option<String>,
        asset: String,
        amount: Amount,
    },
    Burn {
        on_behalf_of: String,
        #[serde(default)]
        payer: Option<String>,
        amount: Amount,
    },
    RedeemForDebt {
        account: String,
        asset: String,
        collateral: Amount,
        debt: Amount,
    },
    /// Push a new oracle answer, in feed decimals
    SetPrice {
        asset: String,
        price: Amount,
    },
    Liquidate {
        liquidator: String,
        debtor: String,
        asset: String,
        debt: Amount,
    },
    /// Log the position of each account
    Report {
        accounts: Vec<String>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fund { .. } => "fund",
            Self::Approve { .. } => "approve",
            Self::Deposit { .. } => "deposit",
            Self::Mint { .. } => "mint",
            Self::DepositAndMint { .. } => "deposit_and_mint",
            Self::Redeem { .. } => "redeem",
            Self::Burn { .. } => "burn",
            Self::RedeemForDebt { .. } => "redeem_for_debt",
            Self::SetPrice { .. } => "set_price",
            Self::Liquidate { .. } => "liquidate",
            Self::Report { .. } => "report",
        }
    }
}

/// Token amount written as an integer or as `<mantissa>e<exponent>`
/// (`"100e18"`, `"1.5e18"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAmount")]
pub struct Amount(pub U256);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Integer(u64),
    Text(String),
}

impl TryFrom<RawAmount> for Amount {
    type Error = anyhow::Error;

    fn try_from(raw: RawAmount) -> Result<Self> {
        match raw {
            RawAmount::Integer(value) => Ok(Self(U256::from(value))),
            RawAmount::Text(text) => parse_amount(&text).map(Self),
        }
    }
}

fn parse_amount(text: &str) -> Result<U256> {
    let cleaned = text.trim().replace('_', "");
    let (mantissa, exponent) = match cleaned.split_once(|c: char| c == 'e' || c == 'E') {
        Some((m, e)) => (m, e.parse::<usize>().with_context(|| format!("Bad exponent in '{text}'"))?),
        None => (cleaned.as_str(), 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if fraction.len() > exponent {
        bail!("'{text}' is not a whole number of base units");
    }
    let digits = format!("{whole}{fraction}");
    let base = U256::from_str_radix(&digits, 10).with_context(|| format!("Bad amount '{text}'"))?;
    let scale = U256::from(10u64)
        .checked_pow(U256::from(exponent - fraction.len()))
        .ok_or_else(|| anyhow!("Amount '{text}' overflows"))?;
    base.checked_mul(scale)
        .ok_or_else(|| anyhow!("Amount '{text}' overflows"))
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }
}

/// Counts of a finished run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub steps: usize,
    pub expected_failures: usize,
}

/// Replay every step, stopping at the first unexpected outcome.
pub fn run(world: &World, scenario: &Scenario) -> Result<RunSummary> {
    info!(scenario = %scenario.name, steps = scenario.steps.len(), "Running scenario");
    let mut summary = RunSummary::default();

    for (index, step) in scenario.steps.iter().enumerate() {
        let number = index + 1;
        let name = step.action.name();
        let outcome = execute(world, &step.action)
            .with_context(|| format!("step {number} ({name}) could not run"))?;

        match (outcome, step.expect_error.as_deref()) {
            (Ok(()), None) => info!(step = number, action = name, "Step succeeded"),
            (Err(e), Some(expected)) if e.kind() == expected => {
                info!(step = number, action = name, error = %e, "Step failed as expected");
                summary.expected_failures += 1;
            }
            (Ok(()), Some(expected)) => {
                bail!("step {number} ({name}) succeeded but {expected} was expected")
            }
            (Err(e), expected) => {
                warn!(step = number, action = name, error = %e, ?expected, "Unexpected failure");
                bail!("step {number} ({name}) failed with {}: {e}", e.kind())
            }
        }
        summary.steps += 1;
    }

    Ok(summary)
}

/// Run one action. The outer error means the step itself is malformed; the
/// inner result is the engine's verdict.
fn execute(world: &World, action: &Action) -> Result<std::result::Result<(), EngineError>> {
    let engine = &world.engine;
    let outcome = match action {
        Action::Fund { account, asset, amount } => {
            world
                .token(asset)?
                .mint(account_address(account)?, amount.0)
                .with_context(|| format!("Failed to fund {account}"))?;
            Ok(())
        }
        Action::Approve { account, token, amount } => {
            world.approve(account_address(account)?, token, amount.0)?;
            Ok(())
        }
        Action::Deposit { account, asset, amount } => {
            engine.deposit_collateral(account_address(account)?, world.asset(asset)?, amount.0)
        }
        Action::Mint { account, amount } => engine.mint_debt(account_address(account)?, amount.0),
        Action::DepositAndMint { account, asset, collateral, debt } => engine.deposit_and_mint(
            account_address(account)?,
            world.asset(asset)?,
            collateral.0,
            debt.0,
        ),
        Action::Redeem { from, to, asset, amount } => {
            let from = account_address(from)?;
            let to = match to {
                Some(to) => account_address(to)?,
                None => from,
            };
            engine.redeem_collateral(from, to, world.asset(asset)?, amount.0)
        }
        Action::Burn { on_behalf_of, payer, amount } => {
            let on_behalf_of = account_address(on_behalf_of)?;
            let payer = match payer {
                Some(payer) => account_address(payer)?,
                None => on_behalf_of,
            };
            engine.burn_debt(amount.0, on_behalf_of, payer)
        }
        Action::RedeemForDebt { account, asset, collateral, debt } => engine
            .redeem_for_debt_repayment(
                account_address(account)?,
                world.asset(asset)?,
                collateral.0,
                debt.0,
            ),
        Action::SetPrice { asset, price } => {
            let answer = alloy::primitives::I256::try_from(price.0)
                .with_context(|| format!("Price for {asset} out of range"))?;
            world.feed(asset)?.update_answer(answer);
            info!(%asset, %answer, "Price updated");
            Ok(())
        }
        Action::Liquidate { liquidator, debtor, asset, debt } => engine
            .liquidate(
                world.asset(asset)?,
                account_address(debtor)?,
                debt.0,
                account_address(liquidator)?,
            )
            .map(|outcome| {
                info!(
                    %debtor,
                    %liquidator,
                    base_seized = %outcome.base_seized,
                    bonus = %outcome.bonus,
                    total_seized = %outcome.total_seized,
                    starting_hf = %outcome.starting_health_factor,
                    ending_hf = %outcome.ending_health_factor,
                    "Liquidation executed"
                );
            }),
        Action::Report { accounts } => {
            for name in accounts {
                report(world, name)?;
            }
            Ok(())
        }
    };
    Ok(outcome)
}

fn report(world: &World, name: &str) -> Result<()> {
    let account = account_address(name)?;
    let engine = &world.engine;
    let summary = engine.account_summary(account)?;
    let health = engine.health_factor(account)?;
    let synthetic = world.wallet_balance(account, world.synthetic.symbol())?;
    info!(
        account = name,
        address = %account,
        debt = %summary.minted_debt,
        collateral_value = %summary.collateral_value,
        health_factor = %health,
        synthetic = %synthetic,
        "Account report"
    );
    for symbol in world.collateral_symbols() {
        let asset = world.asset(symbol)?;
        info!(
            account = name,
            asset = symbol,
            deposited = %engine.collateral_balance(account, asset),
            wallet = %world.wallet_balance(account, symbol)?,
            "Holding"
        );
    }
    Ok(())
}
