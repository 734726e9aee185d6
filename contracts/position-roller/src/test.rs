#![cfg(test)]
extern crate std;

use crate::error::Error;
use crate::roller::{PositionRollerContract, PositionRollerContractClient};
use minting_hub::{HubConfig, MintingHubContract, MintingHubContractClient, PositionTerms};
use savings::SavingsContract;
use soroban_sdk::testutils::Ledger;
use soroban_sdk::token::{StellarAssetClient, TokenClient};
use soroban_sdk::{Address, Env, String, testutils::Address as _};
use stable_token::{StableTokenContract, StableTokenContractClient};

const DAY: u64 = 24 * 60 * 60;
const START: u64 = 1_700_000_000;
const ONE: i128 = 1_000_000_000_000_000_000;
const PRICE: i128 = 5_000 * ONE;
const FEE: i128 = 1000_0000000;

/// Debt of a 10k position after 10 days at 3%
const SOURCE_DEBT: i128 = 10_000_0000000 + 82_191_780;
/// What repaying that debt costs net of the freed reserve
const SPENT: i128 = 8_000_0000000 + 82_191_780;
/// Gross mint at a 20% reserve that credits `SPENT`
const REMINT: i128 = 100_102_739_725;

struct Setup<'a> {
    ledger: StableTokenContractClient<'a>,
    hub: MintingHubContractClient<'a>,
    roller: PositionRollerContractClient<'a>,
    admin: Address,
    collateral: TokenClient<'a>,
    collateral_admin: StellarAssetClient<'a>,
    bank: Address,
    owner: Address,
}

fn create_roller<'a>(e: &Env) -> Setup<'a> {
    e.ledger().set_timestamp(START);
    let admin = Address::generate(e);
    let ledger_id = e.register(
        StableTokenContract,
        (
            admin.clone(),
            String::from_str(e, "Stable Unit"),
            String::from_str(e, "STBL"),
            7u32,
        ),
    );
    let ledger = StableTokenContractClient::new(e, &ledger_id);
    let savings_id = e.register(SavingsContract, (admin.clone(), ledger_id.clone(), 20_000u32));
    let config = HubConfig {
        opening_fee: FEE,
        challenger_reward_ppm: 20_000,
        min_opening_value: 5000_0000000,
        min_init_period: 3 * DAY,
        min_challenge_period: DAY,
        price_increase_cooldown: 3 * DAY,
        avert_cooldown: DAY,
        success_cooldown: DAY,
        min_remainder_value: 100_0000000,
        expired_price_factor: 10,
        expired_tail_periods: 4,
    };
    let hub_id = e.register(
        MintingHubContract,
        (admin.clone(), ledger_id.clone(), savings_id, config),
    );
    let hub = MintingHubContractClient::new(e, &hub_id);
    let roller_id = e.register(
        PositionRollerContract,
        (admin.clone(), hub_id.clone(), ledger_id.clone()),
    );
    let sac = e.register_stellar_asset_contract_v2(admin.clone());
    let bank = Address::generate(e);
    ledger.add_minter(&bank);
    ledger.add_minter(&hub_id);
    ledger.add_minter(&roller_id);
    hub.set_roller(&roller_id);

    Setup {
        ledger,
        hub,
        roller: PositionRollerContractClient::new(e, &roller_id),
        admin,
        collateral: TokenClient::new(e, &sac.address()),
        collateral_admin: StellarAssetClient::new(e, &sac.address()),
        bank,
        owner: Address::generate(e),
    }
}

fn terms(limit: i128, price: i128) -> PositionTerms {
    PositionTerms {
        minimum_collateral: 10_0000000,
        initial_collateral: 110_0000000,
        limit,
        init_period: 3 * DAY,
        duration: 180 * DAY,
        challenge_period: DAY,
        risk_premium_ppm: 10_000,
        liquidation_price: price,
        reserve_ppm: 200_000,
    }
}

fn open(s: &Setup, owner: &Address, collateral: &StellarAssetClient, terms: &PositionTerms) -> u64 {
    s.ledger.mint(&s.bank, owner, &FEE);
    collateral.mint(owner, &terms.initial_collateral);
    s.hub.open_position(owner, &collateral.address, terms)
}

/// Source position of `s.owner` with 10k minted at start and 10 days of interest.
fn source_with_debt(e: &Env, s: &Setup) -> u64 {
    let id = open(s, &s.owner, &s.collateral_admin, &terms(1_000_000_0000000, PRICE));
    e.ledger().set_timestamp(START + 3 * DAY);
    s.hub.mint(&s.owner, &id, &s.owner, &10_000_0000000);
    e.ledger().set_timestamp(START + 13 * DAY);
    assert_eq!(s.hub.debt(&id), SOURCE_DEBT);
    id
}

#[test]
fn test_roll_into_clone_of_foreign_position() {
    let e = Env::default();
    e.mock_all_auths_allowing_non_root_auth();
    let s = create_roller(&e);
    let bob = Address::generate(&e);
    let target = open(&s, &bob, &s.collateral_admin, &terms(1_000_000_0000000, PRICE));
    let source = source_with_debt(&e, &s);

    let rolled = s.roller.roll_fully(&s.owner, &source, &target);
    assert_eq!(rolled, 2);

    let old = s.hub.position(&source);
    assert!(old.closed);
    assert_eq!(old.debt, 0);
    assert_eq!(old.collateral_balance, 0);

    let new = s.hub.position(&rolled);
    assert_eq!(new.owner, s.owner);
    assert_eq!(new.original, target);
    assert_eq!(new.expiration, s.hub.position(&target).expiration);
    assert_eq!(new.principal, REMINT);
    // only the minimum is needed to back the debt; the rest goes back to the owner
    assert_eq!(new.collateral_balance, 10_0000000);
    assert_eq!(s.collateral.balance(&s.owner), 100_0000000);

    assert_eq!(s.ledger.balance(&s.owner), 8_000_0000000);
    assert_eq!(s.ledger.balance(&s.roller.address), 0);
    assert_eq!(s.hub.position(&target).owner, bob);
}

#[test]
fn test_roll_into_own_position() {
    let e = Env::default();
    e.mock_all_auths_allowing_non_root_auth();
    let s = create_roller(&e);
    let target = open(&s, &s.owner, &s.collateral_admin, &terms(1_000_000_0000000, PRICE));
    let source = source_with_debt(&e, &s);

    let rolled = s.roller.roll_fully(&s.owner, &source, &target);
    assert_eq!(rolled, target);
    assert_eq!(s.hub.position_count(), 2);

    let view = s.hub.position(&target);
    assert_eq!(view.principal, REMINT);
    assert_eq!(view.collateral_balance, 110_0000000);
    assert_eq!(s.collateral.balance(&s.owner), 110_0000000);
    assert_eq!(s.ledger.balance(&s.owner), 8_000_0000000);
    assert!(s.hub.position(&source).closed);
}

#[test]
fn test_owner_pays_what_the_target_cannot_back() {
    let e = Env::default();
    e.mock_all_auths_allowing_non_root_auth();
    let s = create_roller(&e);
    let bob = Address::generate(&e);
    let mut cheap = terms(20_000_0000000, 50 * ONE);
    cheap.minimum_collateral = 100_0000000;
    let target = open(&s, &bob, &s.collateral_admin, &cheap);
    let source = source_with_debt(&e, &s);

    let rolled = s.roller.roll_fully(&s.owner, &source, &target);
    let view = s.hub.position(&rolled);
    assert_eq!(view.principal, 5_500_0000000);
    assert_eq!(view.collateral_balance, 110_0000000);
    assert_eq!(s.collateral.balance(&s.owner), 0);
    assert_eq!(
        s.ledger.balance(&s.owner),
        8_000_0000000 + 4_400_0000000 - SPENT
    );
    assert_eq!(s.ledger.balance(&s.roller.address), 0);
}

#[test]
fn test_roll_validation() {
    let e = Env::default();
    e.mock_all_auths_allowing_non_root_auth();
    let s = create_roller(&e);
    let bob = Address::generate(&e);
    let target = open(&s, &bob, &s.collateral_admin, &terms(1_000_000_0000000, PRICE));
    let pricey = open(
        &s,
        &bob,
        &s.collateral_admin,
        &terms(2_000_000_0000000, 10_001 * ONE),
    );
    let other_asset = e.register_stellar_asset_contract_v2(s.admin.clone());
    let foreign = open(
        &s,
        &bob,
        &StellarAssetClient::new(&e, &other_asset.address()),
        &terms(1_000_000_0000000, PRICE),
    );
    let source = source_with_debt(&e, &s);

    assert_eq!(
        s.roller.try_roll_fully(&bob, &source, &target),
        Err(Ok(Error::NotOwner))
    );
    assert_eq!(
        s.roller.try_roll_fully(&s.owner, &source, &foreign),
        Err(Ok(Error::CollateralMismatch))
    );
    assert_eq!(
        s.roller.try_roll_fully(&s.owner, &source, &pricey),
        Err(Ok(Error::InvalidPriceReference))
    );
    let expiration = s.hub.position(&target).expiration;
    assert_eq!(
        s.roller.try_roll_fully_with_expiration(&s.owner, &source, &target, &(expiration + 1)),
        Err(Ok(Error::InvalidExpiration))
    );
    assert_eq!(
        s.roller.try_roll_fully(&s.owner, &source, &source),
        Err(Ok(Error::NothingToRoll))
    );

    // a shorter expiration always produces a clone, even of an own position
    let own = open(&s, &s.owner, &s.collateral_admin, &terms(1_000_000_0000000, PRICE));
    e.ledger().set_timestamp(START + 16 * DAY);
    let rolled =
        s.roller.roll_fully_with_expiration(&s.owner, &source, &own, &(START + 100 * DAY));
    assert_ne!(rolled, own);
    assert_eq!(s.hub.position(&rolled).expiration, START + 100 * DAY);
    assert_eq!(s.hub.position(&rolled).original, own);
}
