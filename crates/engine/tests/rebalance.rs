//! Trigger and rebalance behavior for the redemption kind.

mod common;

use alloy_primitives::U256;

use common::{keeper, manager, recipient, redemption_bed, wad};
use topup_engine::adapters::{Tokens, Vault};
use topup_engine::{EngineError, Event};

#[test]
fn test_trigger_false_when_recipient_at_or_above_threshold() {
    let bed = redemption_bed(wad(100));
    bed.fund_and_deposit(manager(), wad(1_000));

    bed.env.ledger.mint(bed.env.asset, recipient(), wad(100));
    assert!(!bed.position.rebalance_trigger().expect("trigger"));

    bed.env.ledger.mint(bed.env.asset, recipient(), wad(50));
    assert!(!bed.position.rebalance_trigger().expect("trigger"));
}

#[test]
fn test_trigger_false_without_capacity_regardless_of_gap() {
    let bed = redemption_bed(wad(100));
    // recipient is at zero, but the position holds nothing
    assert!(!bed.position.rebalance_trigger().expect("trigger"));
}

#[test]
fn test_trigger_false_when_vault_illiquid() {
    let bed = redemption_bed(wad(100));
    bed.fund_and_deposit(manager(), wad(1_000));
    // drain the vault's liquid assets out from under the shares
    bed.env
        .ledger
        .transfer(
            bed.env.asset,
            bed.env.vault.address(),
            keeper(),
            wad(1_000),
        )
        .expect("drain");
    assert!(!bed.position.rebalance_trigger().expect("trigger"));
}

#[test]
fn test_rebalance_tops_recipient_up_to_threshold() {
    let bed = redemption_bed(wad(100));
    bed.fund_and_deposit(manager(), wad(1_000));
    assert!(bed.position.rebalance_trigger().expect("trigger"));

    let before = bed.asset_balance(recipient());
    let transferred = bed.position.rebalance(keeper()).expect("rebalance");

    assert_eq!(transferred, wad(100));
    assert_eq!(bed.asset_balance(recipient()) - before, transferred);
    assert!(!bed.position.rebalance_trigger().expect("trigger"));

    let events = bed.registry.events().drain();
    assert!(events.contains(&Event::Rebalance {
        position: bed.position.id(),
        needed: wad(100),
        transferred: wad(100),
    }));
}

#[test]
fn test_rebalance_partial_when_capacity_short() {
    let bed = redemption_bed(wad(100));
    bed.fund_and_deposit(manager(), wad(60));

    let transferred = bed.position.rebalance(keeper()).expect("rebalance");
    assert_eq!(transferred, wad(60));
    assert_eq!(bed.asset_balance(recipient()), wad(60));
    // recipient still below threshold, but capacity is exhausted
    assert!(!bed.position.rebalance_trigger().expect("trigger"));

    let events = bed.registry.events().drain();
    assert!(events.contains(&Event::Rebalance {
        position: bed.position.id(),
        needed: wad(100),
        transferred: wad(60),
    }));
}

#[test]
fn test_rebalance_fails_when_trigger_not_met() {
    let bed = redemption_bed(wad(100));
    bed.fund_and_deposit(manager(), wad(1_000));
    bed.env.ledger.mint(bed.env.asset, recipient(), wad(100));

    assert!(matches!(
        bed.position.rebalance(keeper()),
        Err(EngineError::TriggerNotMet)
    ));
    assert_eq!(bed.asset_balance(recipient()), wad(100));
}

#[test]
fn test_rebalance_is_permissionless() {
    let bed = redemption_bed(wad(100));
    bed.fund_and_deposit(manager(), wad(1_000));
    // an arbitrary keeper, not the manager, drives the top-up
    assert!(bed.position.rebalance(keeper()).is_ok());
}

#[test]
fn test_rebalance_resumes_after_recipient_spends() {
    let bed = redemption_bed(wad(100));
    bed.fund_and_deposit(manager(), wad(1_000));
    bed.position.rebalance(keeper()).expect("first top-up");

    // recipient spends below the threshold again
    bed.env
        .ledger
        .transfer(bed.env.asset, recipient(), keeper(), wad(70))
        .expect("spend");
    assert!(bed.position.rebalance_trigger().expect("trigger"));
    let transferred = bed.position.rebalance(keeper()).expect("second top-up");
    assert_eq!(transferred, wad(70));
    assert_eq!(bed.asset_balance(recipient()), wad(100));
}

#[test]
fn test_underlying_tracks_vault_value() {
    let bed = redemption_bed(wad(100));
    bed.fund_and_deposit(manager(), wad(1_000));
    assert_eq!(bed.position.balance_of_underlying().unwrap(), wad(1_000));

    // simulate yield: rate 1.1, backed by extra assets in the vault
    bed.env
        .vault
        .set_exchange_rate(U256::from(1_100_000_000_000_000_000u128));
    bed.env
        .ledger
        .mint(bed.env.asset, bed.env.vault.address(), wad(100));
    assert_eq!(bed.position.balance_of_underlying().unwrap(), wad(1_100));
}
