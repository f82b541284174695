//! Position operations: deposit, mint, redeem, burn and their composites.
//!
//! Each public entry point is one transaction. The step functions below
//! apply ledger effects and queue token interactions without checking
//! solvency, so composite flows (and liquidation) can check once at the end.

use alloy::primitives::{Address, U256};
use tracing::instrument;

use crate::config::MintCheck;
use crate::engine::Engine;
use crate::error::{ensure_nonzero, Result};
use crate::events::EngineEvent;
use crate::transaction::{Interaction, Transaction};

/// Credit collateral and queue the pull from `account`.
pub(crate) fn deposit(
    tx: &mut Transaction<'_>,
    account: Address,
    asset: Address,
    amount: U256,
) -> Result<()> {
    ensure_nonzero(amount)?;
    let token = tx.engine().registry().get(&asset)?.token.clone();
    tx.credit(account, asset, amount)?;
    tx.emit(EngineEvent::CollateralDeposited { account, asset, amount });
    tx.queue(Interaction::CollateralIn {
        token,
        from: account,
        amount,
    });
    Ok(())
}

/// Increase debt and queue the synthetic mint, checking solvency as the
/// policy's mint check dictates.
pub(crate) fn mint(tx: &mut Transaction<'_>, account: Address, amount: U256) -> Result<()> {
    ensure_nonzero(amount)?;
    let mint_check = tx.engine().policy().mint_check;
    if mint_check == MintCheck::PreMint && !tx.debt(account).is_zero() {
        tx.require_healthy(account)?;
    }
    tx.increase_debt(account, amount)?;
    if mint_check == MintCheck::PostMint {
        tx.require_healthy(account)?;
    }
    tx.emit(EngineEvent::DebtMinted { account, amount });
    tx.queue(Interaction::SyntheticMint { to: account, amount });
    Ok(())
}

/// Debit `from`'s collateral and queue the transfer to `to`.
///
/// A zero amount is a no-op here; a liquidation whose seizure rounds down to
/// nothing still burns the covered debt. Public entry points reject zero.
pub(crate) fn redeem(
    tx: &mut Transaction<'_>,
    asset: Address,
    amount: U256,
    from: Address,
    to: Address,
) -> Result<()> {
    let token = tx.engine().registry().get(&asset)?.token.clone();
    if amount.is_zero() {
        return Ok(());
    }
    tx.debit(from, asset, amount)?;
    tx.emit(EngineEvent::CollateralRedeemed {
        from,
        to,
        asset,
        amount,
    });
    tx.queue(Interaction::CollateralOut { token, to, amount });
    Ok(())
}

/// Reduce `on_behalf_of`'s debt and queue the pull-and-burn from `payer`.
pub(crate) fn burn(
    tx: &mut Transaction<'_>,
    amount: U256,
    on_behalf_of: Address,
    payer: Address,
) -> Result<()> {
    ensure_nonzero(amount)?;
    tx.decrease_debt(on_behalf_of, amount)?;
    tx.emit(EngineEvent::DebtBurned {
        on_behalf_of,
        payer,
        amount,
    });
    tx.queue(Interaction::SyntheticBurn { payer, amount });
    Ok(())
}

impl Engine {
    /// Deposit `amount` of `asset` from `account` as collateral.
    #[instrument(skip(self), fields(account = %account, asset = %asset, amount = %amount))]
    pub fn deposit_collateral(&self, account: Address, asset: Address, amount: U256) -> Result<()> {
        self.transact("deposit_collateral", |tx| deposit(tx, account, asset, amount))
    }

    /// Mint `amount` of synthetic debt to `account`.
    #[instrument(skip(self), fields(account = %account, amount = %amount))]
    pub fn mint_debt(&self, account: Address, amount: U256) -> Result<()> {
        self.transact("mint_debt", |tx| mint(tx, account, amount))
    }

    /// Deposit and mint as one unit.
    #[instrument(skip(self), fields(account = %account, asset = %asset))]
    pub fn deposit_and_mint(
        &self,
        account: Address,
        asset: Address,
        collateral_amount: U256,
        mint_amount: U256,
    ) -> Result<()> {
        self.transact("deposit_and_mint", |tx| {
            deposit(tx, account, asset, collateral_amount)?;
            mint(tx, account, mint_amount)
        })
    }

    /// Move `amount` of `from`'s collateral to `to`. `from` must stay healthy.
    #[instrument(skip(self), fields(from = %from, to = %to, asset = %asset, amount = %amount))]
    pub fn redeem_collateral(
        &self,
        from: Address,
        to: Address,
        asset: Address,
        amount: U256,
    ) -> Result<()> {
        self.transact("redeem_collateral", |tx| {
            ensure_nonzero(amount)?;
            redeem(tx, asset, amount, from, to)?;
            tx.require_healthy(from)?;
            Ok(())
        })
    }

    /// Repay `amount` of `on_behalf_of`'s debt with synthetic pulled from
    /// `payer`. Any debt left must still be healthy.
    #[instrument(skip(self), fields(on_behalf_of = %on_behalf_of, payer = %payer, amount = %amount))]
    pub fn burn_debt(&self, amount: U256, on_behalf_of: Address, payer: Address) -> Result<()> {
        self.transact("burn_debt", |tx| {
            burn(tx, amount, on_behalf_of, payer)?;
            tx.require_healthy(on_behalf_of)?;
            Ok(())
        })
    }

    /// Burn debt, then redeem collateral, as one unit.
    #[instrument(skip(self), fields(account = %account, asset = %asset))]
    pub fn redeem_for_debt_repayment(
        &self,
        account: Address,
        asset: Address,
        collateral_amount: U256,
        debt_amount: U256,
    ) -> Result<()> {
        self.transact("redeem_for_debt_repayment", |tx| {
            burn(tx, debt_amount, account, account)?;
            ensure_nonzero(collateral_amount)?;
            redeem(tx, asset, collateral_amount, account, account)?;
            tx.require_healthy(account)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolvencyPolicy;
    use crate::error::EngineError;
    use crate::health::HealthFactor;
    use crate::testing::{usd, wad, World, ENGINE};
    use crate::u256_math::MIN_HEALTH_FACTOR;
    use parking_lot::Mutex;
    use std::sync::{Arc, OnceLock, Weak};
    use synthvault_chain::{
        CollateralTransfer, Erc20Token, ManualAggregator, PriceFeed, SyntheticAssetIssuer,
        SyntheticToken,
    };

    fn deposit_weth(world: &World, account: Address, amount: U256) {
        world.fund(account, world.weth.address(), amount);
        world
            .engine
            .deposit_collateral(account, world.weth.address(), amount)
            .unwrap();
    }

    #[test]
    fn test_deposit_zero_fails() {
        let world = World::new();
        let err = world
            .engine
            .deposit_collateral(world.alice, world.weth.address(), U256::ZERO)
            .unwrap_err();
        assert_eq!(err, EngineError::ZeroAmount);
    }

    #[test]
    fn test_deposit_unsupported_asset_fails() {
        let world = World::new();
        let unknown = Address::repeat_byte(0x77);
        let err = world
            .engine
            .deposit_collateral(world.alice, unknown, wad(1))
            .unwrap_err();
        assert_eq!(err, EngineError::UnsupportedAsset(unknown));
        assert_eq!(world.engine.account_count(), 0);
    }

    #[test]
    fn test_deposit_moves_tokens_into_engine() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));

        assert_eq!(world.engine.collateral_balance(world.alice, world.weth.address()), wad(10));
        assert_eq!(world.weth.balance_of(world.alice), U256::ZERO);
        assert_eq!(world.weth.balance_of(ENGINE), wad(10));
    }

    #[test]
    fn test_deposit_transfer_failure_rolls_back_credit() {
        let world = World::new();
        // Approved but unfunded
        world.weth.approve(world.alice, ENGINE, U256::MAX);

        let err = world
            .engine
            .deposit_collateral(world.alice, world.weth.address(), wad(1))
            .unwrap_err();
        assert_eq!(err, EngineError::TransferFailed);
        assert_eq!(world.engine.collateral_balance(world.alice, world.weth.address()), U256::ZERO);
        // The account record opened by the credit is gone too
        assert_eq!(world.engine.account_count(), 0);
    }

    #[test]
    fn test_deposit_then_redeem_restores_external_balance() {
        let world = World::new();
        world.fund(world.alice, world.weth.address(), wad(7));
        let before = world.weth.balance_of(world.alice);

        world
            .engine
            .deposit_collateral(world.alice, world.weth.address(), wad(7))
            .unwrap();
        world
            .engine
            .redeem_collateral(world.alice, world.alice, world.weth.address(), wad(7))
            .unwrap();

        assert_eq!(world.weth.balance_of(world.alice), before);
        assert!(world.engine.total_collateral(world.alice).is_empty());
    }

    #[test]
    fn test_mint_then_burn_clears_debt() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));

        world.engine.mint_debt(world.alice, U256::from(10u64)).unwrap();
        assert_eq!(world.engine.minted_debt(world.alice), U256::from(10u64));
        assert_eq!(world.synth.balance_of(world.alice), U256::from(10u64));

        world.approve_synthetic(world.alice, U256::from(10u64));
        world
            .engine
            .burn_debt(U256::from(10u64), world.alice, world.alice)
            .unwrap();

        assert_eq!(world.engine.minted_debt(world.alice), U256::ZERO);
        assert_eq!(world.engine.collateral_balance(world.alice, world.weth.address()), wad(10));
        assert_eq!(world.synth.balance_of(world.alice), U256::ZERO);
        assert_eq!(world.synth.total_supply(), U256::ZERO);
    }

    #[test]
    fn test_mint_zero_fails() {
        let world = World::new();
        assert_eq!(world.engine.mint_debt(world.alice, U256::ZERO), Err(EngineError::ZeroAmount));
    }

    #[test]
    fn test_mint_up_to_threshold() {
        let world = World::new();
        // 10 WETH at $2000 supports $10000 of debt at 50% threshold
        deposit_weth(&world, world.alice, wad(10));

        world.engine.mint_debt(world.alice, wad(10_000)).unwrap();
        assert_eq!(
            world.engine.health_factor(world.alice),
            Ok(HealthFactor::Ratio(MIN_HEALTH_FACTOR))
        );

        let err = world.engine.mint_debt(world.alice, U256::from(1u64)).unwrap_err();
        assert!(matches!(err, EngineError::HealthFactorBroken(hf) if hf < MIN_HEALTH_FACTOR));
        assert_eq!(world.engine.minted_debt(world.alice), wad(10_000));
        assert_eq!(world.synth.balance_of(world.alice), wad(10_000));
    }

    #[test]
    fn test_first_mint_without_collateral_fails_by_default() {
        let world = World::new();
        let err = world.engine.mint_debt(world.alice, wad(1)).unwrap_err();
        assert_eq!(err, EngineError::HealthFactorBroken(U256::ZERO));
        assert_eq!(world.engine.minted_debt(world.alice), U256::ZERO);
        assert_eq!(world.synth.total_supply(), U256::ZERO);
    }

    #[test]
    fn test_legacy_policy_checks_pre_mint_debt() {
        let world = World::with_policy(SolvencyPolicy::legacy());
        deposit_weth(&world, world.alice, wad(1));

        // Zero debt skips the check entirely
        world.engine.mint_debt(world.alice, wad(1_000_000)).unwrap();
        let health = world.engine.health_factor(world.alice).unwrap();
        assert!(!health.meets(MIN_HEALTH_FACTOR));

        // The unscaled threshold of 1 still passes a ratio of 0.001
        world.engine.mint_debt(world.alice, wad(1)).unwrap();
        assert_eq!(world.engine.minted_debt(world.alice), wad(1_000_001));
    }

    #[test]
    fn test_legacy_policy_rejects_worthless_position() {
        let world = World::with_policy(SolvencyPolicy::legacy());
        deposit_weth(&world, world.alice, wad(1));
        world.engine.mint_debt(world.alice, wad(100)).unwrap();

        world.set_weth_price(0);
        let err = world.engine.mint_debt(world.alice, wad(1)).unwrap_err();
        assert_eq!(err, EngineError::HealthFactorBroken(U256::ZERO));
    }

    #[test]
    fn test_mint_collaborator_failure() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));
        world.synth.transfer_ownership(ENGINE, world.carol).unwrap();

        let err = world.engine.mint_debt(world.alice, wad(1)).unwrap_err();
        assert_eq!(err, EngineError::MintFailed);
        assert_eq!(world.engine.minted_debt(world.alice), U256::ZERO);
    }

    #[test]
    fn test_deposit_and_mint() {
        let world = World::new();
        world.fund(world.alice, world.weth.address(), wad(10));
        world
            .engine
            .deposit_and_mint(world.alice, world.weth.address(), wad(10), wad(100))
            .unwrap();

        let summary = world.engine.account_summary(world.alice).unwrap();
        assert_eq!(summary.minted_debt, wad(100));
        assert_eq!(summary.collateral_value, wad(20_000));
        assert_eq!(world.synth.balance_of(world.alice), wad(100));
    }

    #[test]
    fn test_deposit_and_mint_unhealthy_aborts_both() {
        let world = World::new();
        world.fund(world.alice, world.weth.address(), wad(1));
        let err = world
            .engine
            .deposit_and_mint(world.alice, world.weth.address(), wad(1), wad(1_001))
            .unwrap_err();

        assert!(matches!(err, EngineError::HealthFactorBroken(_)));
        assert_eq!(world.engine.collateral_balance(world.alice, world.weth.address()), U256::ZERO);
        assert_eq!(world.weth.balance_of(world.alice), wad(1));
        assert_eq!(world.engine.minted_debt(world.alice), U256::ZERO);
    }

    #[test]
    fn test_deposit_and_mint_returns_collateral_when_mint_fails() {
        let world = World::new();
        world.fund(world.alice, world.weth.address(), wad(10));
        world.synth.transfer_ownership(ENGINE, world.carol).unwrap();

        let err = world
            .engine
            .deposit_and_mint(world.alice, world.weth.address(), wad(10), wad(100))
            .unwrap_err();

        assert_eq!(err, EngineError::MintFailed);
        // The collateral pull had settled and was sent back
        assert_eq!(world.weth.balance_of(world.alice), wad(10));
        assert_eq!(world.weth.balance_of(ENGINE), U256::ZERO);
        assert_eq!(world.engine.collateral_balance(world.alice, world.weth.address()), U256::ZERO);
        assert_eq!(world.engine.minted_debt(world.alice), U256::ZERO);
    }

    #[test]
    fn test_redeem_breaking_health_fails() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));
        world.engine.mint_debt(world.alice, wad(5_000)).unwrap();

        // 4 WETH left would back only $4000 of debt
        let err = world
            .engine
            .redeem_collateral(world.alice, world.alice, world.weth.address(), wad(6))
            .unwrap_err();
        assert!(matches!(err, EngineError::HealthFactorBroken(_)));
        assert_eq!(world.engine.collateral_balance(world.alice, world.weth.address()), wad(10));
        assert_eq!(world.weth.balance_of(world.alice), U256::ZERO);

        world
            .engine
            .redeem_collateral(world.alice, world.alice, world.weth.address(), wad(5))
            .unwrap();
        assert_eq!(world.weth.balance_of(world.alice), wad(5));
    }

    #[test]
    fn test_redeem_more_than_deposited_fails() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(1));
        let err = world
            .engine
            .redeem_collateral(world.alice, world.alice, world.weth.address(), wad(2))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientCollateral {
                account: world.alice,
                asset: world.weth.address(),
                balance: wad(1),
                requested: wad(2),
            }
        );
    }

    #[test]
    fn test_redeem_to_other_recipient() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(3));
        world
            .engine
            .redeem_collateral(world.alice, world.bob, world.weth.address(), wad(3))
            .unwrap();
        assert_eq!(world.weth.balance_of(world.bob), wad(3));
        assert_eq!(world.engine.collateral_balance(world.bob, world.weth.address()), U256::ZERO);
    }

    #[test]
    fn test_burn_more_than_debt_fails() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));
        world.engine.mint_debt(world.alice, wad(5)).unwrap();
        world.approve_synthetic(world.alice, U256::MAX);

        let err = world.engine.burn_debt(wad(6), world.alice, world.alice).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientDebt {
                account: world.alice,
                debt: wad(5),
                requested: wad(6),
            }
        );
    }

    #[test]
    fn test_burn_without_allowance_fails() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));
        world.engine.mint_debt(world.alice, wad(5)).unwrap();

        let err = world.engine.burn_debt(wad(5), world.alice, world.alice).unwrap_err();
        assert_eq!(err, EngineError::TransferFailed);
        assert_eq!(world.engine.minted_debt(world.alice), wad(5));
        assert_eq!(world.synth.balance_of(world.alice), wad(5));
    }

    #[test]
    fn test_burn_on_behalf_of_another_account() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));
        deposit_weth(&world, world.bob, wad(10));
        world.engine.mint_debt(world.alice, wad(50)).unwrap();
        world.engine.mint_debt(world.bob, wad(50)).unwrap();

        world.approve_synthetic(world.bob, wad(20));
        world.engine.burn_debt(wad(20), world.alice, world.bob).unwrap();

        assert_eq!(world.engine.minted_debt(world.alice), wad(30));
        assert_eq!(world.engine.minted_debt(world.bob), wad(50));
        assert_eq!(world.synth.balance_of(world.alice), wad(50));
        assert_eq!(world.synth.balance_of(world.bob), wad(30));
    }

    #[test]
    fn test_redeem_for_debt_repayment() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));
        world.engine.mint_debt(world.alice, wad(10_000)).unwrap();
        world.approve_synthetic(world.alice, U256::MAX);

        // Redeeming alone would break health, repaying first keeps it intact
        world
            .engine
            .redeem_for_debt_repayment(world.alice, world.weth.address(), wad(5), wad(5_000))
            .unwrap();

        assert_eq!(world.engine.minted_debt(world.alice), wad(5_000));
        assert_eq!(world.engine.collateral_balance(world.alice, world.weth.address()), wad(5));
        assert_eq!(world.weth.balance_of(world.alice), wad(5));
        assert_eq!(world.synth.balance_of(world.alice), wad(5_000));
    }

    #[test]
    fn test_zero_redeem_amounts_fail() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));
        world.engine.mint_debt(world.alice, wad(1_000)).unwrap();
        world.approve_synthetic(world.alice, U256::MAX);
        let weth = world.weth.address();

        assert_eq!(
            world.engine.redeem_collateral(world.alice, world.alice, weth, U256::ZERO),
            Err(EngineError::ZeroAmount)
        );
        assert_eq!(
            world
                .engine
                .redeem_for_debt_repayment(world.alice, weth, U256::ZERO, wad(500)),
            Err(EngineError::ZeroAmount)
        );
        assert_eq!(world.engine.minted_debt(world.alice), wad(1_000));
        assert_eq!(world.synth.balance_of(world.alice), wad(1_000));
    }

    #[test]
    fn test_redeem_for_debt_repayment_is_atomic() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));
        world.engine.mint_debt(world.alice, wad(1_000)).unwrap();
        world.approve_synthetic(world.alice, U256::MAX);

        let err = world
            .engine
            .redeem_for_debt_repayment(world.alice, world.weth.address(), wad(11), wad(500))
            .unwrap_err();

        assert!(matches!(err, EngineError::InsufficientCollateral { .. }));
        assert_eq!(world.engine.minted_debt(world.alice), wad(1_000));
        assert_eq!(world.synth.balance_of(world.alice), wad(1_000));
        assert_eq!(world.engine.collateral_balance(world.alice, world.weth.address()), wad(10));
    }

    #[test]
    fn test_failed_redeem_after_settled_burn_remints() {
        let world = World::new();
        deposit_weth(&world, world.alice, wad(10));
        world.engine.mint_debt(world.alice, wad(1_000)).unwrap();
        world.approve_synthetic(world.alice, U256::MAX);
        // The engine no longer holds the collateral it owes
        world.weth.approve(ENGINE, world.carol, U256::MAX);
        assert!(world.weth.transfer_from(world.carol, ENGINE, world.carol, wad(10)));

        let err = world
            .engine
            .redeem_for_debt_repayment(world.alice, world.weth.address(), wad(1), wad(500))
            .unwrap_err();

        assert_eq!(err, EngineError::TransferFailed);
        assert_eq!(world.engine.minted_debt(world.alice), wad(1_000));
        assert_eq!(world.synth.balance_of(world.alice), wad(1_000));
        assert_eq!(world.engine.collateral_balance(world.alice, world.weth.address()), wad(10));
    }

    #[test]
    fn test_events_published_on_commit_only() {
        let world = World::new();
        let mut events = world.engine.subscribe();
        world.fund(world.alice, world.weth.address(), wad(10));

        world
            .engine
            .deposit_and_mint(world.alice, world.weth.address(), wad(10), wad(100))
            .unwrap();
        let _ = world.engine.mint_debt(world.alice, wad(1_000_000));

        assert_eq!(
            events.try_recv().unwrap(),
            EngineEvent::CollateralDeposited {
                account: world.alice,
                asset: world.weth.address(),
                amount: wad(10),
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            EngineEvent::DebtMinted {
                account: world.alice,
                amount: wad(100),
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_health_holds_after_every_successful_operation() {
        let world = World::new();
        world.fund(world.alice, world.weth.address(), wad(10));
        world.approve_synthetic(world.alice, U256::MAX);
        let engine = &world.engine;
        let weth = world.weth.address();

        let attempts: Vec<Box<dyn Fn() -> Result<()> + '_>> = vec![
            Box::new(|| engine.deposit_collateral(world.alice, weth, wad(4))),
            Box::new(|| engine.mint_debt(world.alice, wad(3_000))),
            Box::new(|| engine.mint_debt(world.alice, wad(3_000))),
            Box::new(|| engine.redeem_collateral(world.alice, world.alice, weth, wad(2))),
            Box::new(|| engine.deposit_and_mint(world.alice, weth, wad(6), wad(6_000))),
            Box::new(|| engine.redeem_collateral(world.alice, world.alice, weth, wad(1))),
            Box::new(|| engine.burn_debt(wad(1_000), world.alice, world.alice)),
            Box::new(|| engine.redeem_for_debt_repayment(world.alice, weth, wad(3), wad(500))),
        ];

        let mut succeeded = 0;
        for attempt in &attempts {
            if attempt().is_ok() {
                succeeded += 1;
                let health = engine.health_factor(world.alice).unwrap();
                assert!(health.meets(MIN_HEALTH_FACTOR), "unhealthy after success: {health}");
            }
        }
        assert!(succeeded >= 4);
    }

    #[test]
    fn test_concurrent_deposits_are_serialized() {
        let world = Arc::new(World::new());
        let accounts: Vec<Address> = (1u8..=8).map(Address::repeat_byte).collect();
        for account in &accounts {
            world.fund(*account, world.weth.address(), wad(100));
        }

        std::thread::scope(|scope| {
            for account in &accounts {
                let world = world.clone();
                scope.spawn(move || {
                    for _ in 0..10 {
                        world
                            .engine
                            .deposit_collateral(*account, world.weth.address(), wad(10))
                            .unwrap();
                    }
                });
            }
        });

        for account in &accounts {
            assert_eq!(world.engine.collateral_balance(*account, world.weth.address()), wad(100));
        }
        assert_eq!(world.weth.balance_of(ENGINE), wad(800));
    }

    /// Collateral token that calls back into the engine while a transfer is
    /// being pulled.
    #[derive(Debug)]
    struct CallbackToken {
        inner: Erc20Token,
        engine: OnceLock<Weak<Engine>>,
        observed: Mutex<Vec<(Result<()>, U256)>>,
    }

    impl CollateralTransfer for CallbackToken {
        fn address(&self) -> Address {
            self.inner.address()
        }
        fn symbol(&self) -> &str {
            self.inner.symbol()
        }
        fn decimals(&self) -> u8 {
            self.inner.decimals()
        }
        fn transfer_from(&self, spender: Address, from: Address, to: Address, amount: U256) -> bool {
            if let Some(engine) = self.engine.get().and_then(Weak::upgrade) {
                let nested = engine.deposit_collateral(from, self.address(), amount);
                let visible = engine.collateral_balance(from, self.address());
                self.observed.lock().push((nested, visible));
            }
            self.inner.transfer_from(spender, from, to, amount)
        }
        fn transfer(&self, sender: Address, to: Address, amount: U256) -> bool {
            self.inner.transfer(sender, to, amount)
        }
        fn balance_of(&self, owner: Address) -> U256 {
            self.inner.balance_of(owner)
        }
    }

    #[test]
    fn test_reentrant_call_is_blocked() {
        let alice = Address::repeat_byte(0xA1);
        let token = Arc::new(CallbackToken {
            inner: Erc20Token::new(Address::repeat_byte(0xCB), "CB", 18),
            engine: OnceLock::new(),
            observed: Mutex::new(Vec::new()),
        });
        let feed: Arc<dyn PriceFeed> = Arc::new(ManualAggregator::new(
            Address::repeat_byte(0xFC),
            8,
            usd(1),
        ));
        let synth: Arc<dyn SyntheticAssetIssuer> =
            Arc::new(SyntheticToken::new(Address::repeat_byte(0x5D), "sUSD", ENGINE));
        let collateral: Arc<dyn CollateralTransfer> = token.clone();
        let engine = Arc::new(Engine::new(ENGINE, vec![collateral], vec![feed], synth).unwrap());
        token.engine.set(Arc::downgrade(&engine)).unwrap();

        token.inner.mint(alice, wad(5)).unwrap();
        token.inner.approve(alice, ENGINE, U256::MAX);
        engine.deposit_collateral(alice, token.address(), wad(5)).unwrap();

        let observed = token.observed.lock();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].0, Err(EngineError::ReentrancyBlocked));
        // The credit was applied before the token was called
        assert_eq!(observed[0].1, wad(5));
        drop(observed);

        assert_eq!(engine.collateral_balance(alice, token.address()), wad(5));
        assert_eq!(token.balance_of(ENGINE), wad(5));
        // The guard is released afterwards
        token.inner.mint(alice, wad(1)).unwrap();
        assert!(engine.deposit_collateral(alice, token.address(), wad(1)).is_ok());
    }
}
