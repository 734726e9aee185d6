#![cfg(test)]
extern crate std;

use crate::error::Error;
use crate::token::{StableTokenContract, StableTokenContractClient};
use soroban_sdk::testutils::Events;
use soroban_sdk::{Address, Env, IntoVal, String, symbol_short, testutils::Address as _, vec};

fn create_token_contract_id(e: &Env, admin: &Address) -> Address {
    e.register(
        StableTokenContract,
        (
            admin.clone(),
            String::from_str(e, "Stable Unit"),
            String::from_str(e, "STBL"),
            7u32,
        ),
    )
}

fn create_token_contract<'a>(e: &Env, admin: &Address) -> StableTokenContractClient<'a> {
    StableTokenContractClient::new(e, &create_token_contract_id(e, admin))
}

fn setup<'a>(e: &Env) -> (StableTokenContractClient<'a>, Address) {
    let admin = Address::generate(e);
    let token = create_token_contract(e, &admin);
    let minter = Address::generate(e);
    token.add_minter(&minter);
    (token, minter)
}

#[test]
fn test_token_initialization() {
    let e = Env::default();
    e.mock_all_auths();
    let admin = Address::generate(&e);
    let token = create_token_contract(&e, &admin);
    assert_eq!(token.symbol(), String::from_str(&e, "STBL"));
    assert_eq!(token.name(), String::from_str(&e, "Stable Unit"));
    assert_eq!(token.decimals(), 7);
    assert_eq!(token.admin(), Some(admin));
    assert_eq!(token.reserve_balance(), 0);
    assert_eq!(token.equity(), 0);
}

#[test]
fn test_token_transfers() {
    let e = Env::default();
    e.mock_all_auths();
    let (token, minter) = setup(&e);
    let alice = Address::generate(&e);
    let bob = Address::generate(&e);

    token.mint(&minter, &alice, &1000_0000000);
    token.transfer(&alice, &bob, &500_0000000);
    assert_eq!(token.balance(&alice), 500_0000000);
    assert_eq!(token.balance(&bob), 500_0000000);

    let result = token.try_transfer(&alice, &bob, &600_0000000);
    assert!(result.is_err());

    let result = token.try_transfer(&alice, &alice, &100_0000000);
    assert_eq!(
        result.unwrap_err().unwrap(),
        Error::CannotTransferToSelf.into()
    );
}

#[test]
fn test_allowances() {
    let e = Env::default();
    e.mock_all_auths();
    let (token, minter) = setup(&e);
    let alice = Address::generate(&e);
    let bob = Address::generate(&e);
    let carol = Address::generate(&e);

    token.mint(&minter, &alice, &1000_0000000);
    token.approve(&alice, &carol, &600_0000000, &1000);
    assert_eq!(token.allowance(&alice, &carol), 600_0000000);

    token.transfer_from(&carol, &alice, &bob, &400_0000000);
    assert_eq!(token.balance(&bob), 400_0000000);
    assert_eq!(token.allowance(&alice, &carol), 200_0000000);

    let result = token.try_transfer_from(&carol, &alice, &bob, &300_0000000);
    assert_eq!(
        result.unwrap_err().unwrap(),
        Error::InsufficientAllowance.into()
    );

    token.increase_allowance(&alice, &carol, &100_0000000);
    assert_eq!(token.allowance(&alice, &carol), 300_0000000);
    token.burn_from(&carol, &alice, &300_0000000);
    assert_eq!(token.balance(&alice), 300_0000000);
    assert_eq!(token.allowance(&alice, &carol), 0);

    let result = token.try_decrease_allowance(&alice, &carol, &1);
    assert_eq!(result.unwrap_err().unwrap(), Error::ValueNotPositive.into());
}

#[test]
fn test_minter_registration() {
    let e = Env::default();
    e.mock_all_auths();
    let (token, minter) = setup(&e);
    let outsider = Address::generate(&e);
    let alice = Address::generate(&e);

    assert!(token.is_minter(&minter));
    assert!(!token.is_minter(&outsider));
    assert_eq!(
        token.try_add_minter(&minter),
        Err(Ok(Error::MinterAlreadyRegistered))
    );
    assert_eq!(
        token.try_mint(&outsider, &alice, &100),
        Err(Ok(Error::NotMinter))
    );

    token.remove_minter(&minter);
    assert_eq!(token.try_mint(&minter, &alice, &100), Err(Ok(Error::NotMinter)));
    assert_eq!(token.try_remove_minter(&minter), Err(Ok(Error::NotMinter)));
}

#[test]
fn test_mint_and_burn_with_reserve() {
    let e = Env::default();
    e.mock_all_auths();
    let (token, minter) = setup(&e);
    let alice = Address::generate(&e);

    let usable = token.mint_with_reserve(&minter, &alice, &1000_0000000, &200_000);
    assert_eq!(usable, 800_0000000);
    assert_eq!(token.balance(&alice), 800_0000000);
    assert_eq!(token.reserve_balance(), 200_0000000);
    assert_eq!(token.minter_reserve(), 200_0000000);
    assert_eq!(token.equity(), 0);

    assert_eq!(
        token.calculate_assigned_reserve(&1000_0000000, &200_000),
        200_0000000
    );
    assert_eq!(
        token.calculate_freed_amount(&800_0000000, &200_000),
        1000_0000000
    );

    let charged = token.burn_from_with_reserve(&minter, &alice, &1000_0000000, &200_000);
    assert_eq!(charged, 800_0000000);
    assert_eq!(token.balance(&alice), 0);
    assert_eq!(token.reserve_balance(), 0);
    assert_eq!(token.minter_reserve(), 0);

    assert_eq!(
        token.try_mint_with_reserve(&minter, &alice, &1000, &1_000_001),
        Err(Ok(Error::InvalidReservePPM))
    );
}

#[test]
fn test_burn_with_reserve_requires_payer_balance() {
    let e = Env::default();
    e.mock_all_auths();
    let (token, minter) = setup(&e);
    let alice = Address::generate(&e);
    let bob = Address::generate(&e);

    token.mint_with_reserve(&minter, &alice, &1000_0000000, &100_000);
    assert_eq!(
        token.try_burn_from_with_reserve(&minter, &bob, &1000_0000000, &100_000),
        Err(Ok(Error::InsufficientBalance))
    );
    // nothing changed
    assert_eq!(token.minter_reserve(), 100_0000000);
}

#[test]
fn test_profits_and_losses() {
    let e = Env::default();
    e.mock_all_auths();
    let (token, minter) = setup(&e);
    let alice = Address::generate(&e);
    let bob = Address::generate(&e);

    token.mint(&minter, &alice, &100_0000000);
    token.collect_profits(&minter, &alice, &40_0000000);
    assert_eq!(token.balance(&alice), 60_0000000);
    assert_eq!(token.equity(), 40_0000000);

    token.distribute_profits(&minter, &bob, &10_0000000);
    assert_eq!(token.balance(&bob), 10_0000000);
    assert_eq!(token.equity(), 30_0000000);

    // the reserve only holds 30, the remaining 20 is minted
    token.cover_loss(&minter, &bob, &50_0000000);
    assert_eq!(token.balance(&bob), 60_0000000);
    assert_eq!(token.reserve_balance(), 0);

    assert_eq!(
        token.try_collect_profits(&minter, &bob, &100_0000000),
        Err(Ok(Error::InsufficientBalance))
    );
}

#[test]
fn test_underfunded_reserve_is_shared() {
    let e = Env::default();
    e.mock_all_auths();
    let (token, minter) = setup(&e);
    let alice = Address::generate(&e);
    let bob = Address::generate(&e);

    token.mint_with_reserve(&minter, &alice, &1000_0000000, &200_000);
    // a loss eats half of the reserve
    token.cover_loss(&minter, &bob, &100_0000000);
    assert_eq!(token.reserve_balance(), 100_0000000);
    assert_eq!(token.minter_reserve(), 200_0000000);
    assert_eq!(token.equity(), 0);

    assert_eq!(
        token.calculate_assigned_reserve(&1000_0000000, &200_000),
        100_0000000
    );
    // the effective reserve ratio is 10%
    assert_eq!(
        token.calculate_freed_amount(&900_0000000, &200_000),
        1000_0000000
    );
}

#[test]
fn test_burn_without_reserve_frees_equity() {
    let e = Env::default();
    e.mock_all_auths();
    let (token, minter) = setup(&e);
    let alice = Address::generate(&e);

    token.mint_with_reserve(&minter, &alice, &1000_0000000, &100_000);
    token.mint(&minter, &minter, &1000_0000000);
    token.burn_without_reserve(&minter, &1000_0000000, &100_000);
    assert_eq!(token.balance(&minter), 0);
    assert_eq!(token.minter_reserve(), 0);
    assert_eq!(token.equity(), 100_0000000);
}

#[test]
fn test_events_on_mint() {
    let e = Env::default();
    e.mock_all_auths();
    let admin = Address::generate(&e);
    let contract_id = create_token_contract_id(&e, &admin);
    let token = StableTokenContractClient::new(&e, &contract_id);
    let minter = Address::generate(&e);
    token.add_minter(&minter);
    let alice = Address::generate(&e);

    token.mint(&minter, &alice, &1000_0000000);

    assert_eq!(
        e.events().all(),
        vec![
            &e,
            (
                contract_id.clone(),
                (symbol_short!("mint"), alice.clone()).into_val(&e),
                1000_0000000i128.into_val(&e)
            ),
        ]
    );
}
