#![cfg(test)]
extern crate std;

use crate::error::Error;
use crate::savings::{SavingsContract, SavingsContractClient};
use soroban_sdk::testutils::Ledger;
use soroban_sdk::{Address, Env, String, testutils::Address as _};
use stable_token::{StableTokenContract, StableTokenContractClient};

const DAY: u64 = 24 * 60 * 60;
const YEAR: u64 = 365 * DAY;
const START: u64 = 1_700_000_000;

struct Setup<'a> {
    ledger: StableTokenContractClient<'a>,
    savings: SavingsContractClient<'a>,
    /// test-only minter used to fund accounts and the reserve
    bank: Address,
}

fn create_savings<'a>(e: &Env, rate_ppm: u32) -> Setup<'a> {
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
    let savings_id = e.register(SavingsContract, (admin, ledger_id.clone(), rate_ppm));
    let savings = SavingsContractClient::new(e, &savings_id);
    let bank = Address::generate(e);
    ledger.add_minter(&bank);
    ledger.add_minter(&savings_id);
    Setup {
        ledger,
        savings,
        bank,
    }
}

fn fund_reserve(s: &Setup, amount: i128) {
    s.ledger.mint(&s.bank, &s.bank, &amount);
    s.ledger.collect_profits(&s.bank, &s.bank, &amount);
}

fn advance(e: &Env, seconds: u64) {
    let now = e.ledger().timestamp();
    e.ledger().set_timestamp(now + seconds);
}

#[test]
fn test_rate_change_lifecycle() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_savings(&e, 20_000);

    assert_eq!(s.savings.current_rate_ppm(), 20_000);
    assert_eq!(
        s.savings.try_apply_change(),
        Err(Ok(Error::NoPendingChange))
    );

    s.savings.propose_change(&50_000);
    assert_eq!(s.savings.next_rate_ppm(), 50_000);
    assert_eq!(s.savings.next_change(), START + 7 * DAY);

    advance(&e, 7 * DAY - 1);
    assert_eq!(s.savings.try_apply_change(), Err(Ok(Error::ChangeNotReady)));

    advance(&e, 1);
    s.savings.apply_change();
    assert_eq!(s.savings.current_rate_ppm(), 50_000);

    assert_eq!(
        s.savings.try_propose_change(&1_000_001),
        Err(Ok(Error::InvalidRate))
    );
}

#[test]
fn test_ticks_are_continuous_across_rate_changes() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_savings(&e, 10_000);

    advance(&e, 100);
    assert_eq!(s.savings.current_ticks(), 1_000_000);

    s.savings.propose_change(&30_000);
    advance(&e, 7 * DAY);
    let before = s.savings.current_ticks();
    s.savings.apply_change();
    assert_eq!(s.savings.current_ticks(), before);

    advance(&e, 10);
    assert_eq!(s.savings.current_ticks(), before + 300_000);
    assert_eq!(
        s.savings.ticks(&(e.ledger().timestamp() + 10)),
        before + 600_000
    );
}

#[test]
fn test_save_earns_after_interest_delay() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_savings(&e, 100_000);
    fund_reserve(&s, 1000_0000000);
    let alice = Address::generate(&e);
    s.ledger.mint(&s.bank, &alice, &1000_0000000);

    s.savings.save(&alice, &1000_0000000);
    assert_eq!(s.ledger.balance(&alice), 0);
    assert_eq!(s.savings.account(&alice).saved, 1000_0000000);

    advance(&e, 3 * DAY);
    assert_eq!(s.savings.accrued_interest(&alice), 0);

    // a full year at 10% after the delay
    advance(&e, YEAR);
    assert_eq!(s.savings.accrued_interest(&alice), 100_0000000);
    assert_eq!(s.savings.refresh_balance(&alice), 1100_0000000);
    assert_eq!(s.ledger.equity(), 900_0000000);

    let withdrawn = s.savings.withdraw(&alice, &alice, &5000_0000000);
    assert_eq!(withdrawn, 1100_0000000);
    assert_eq!(s.ledger.balance(&alice), 1100_0000000);
    assert_eq!(s.savings.account(&alice).saved, 0);
}

#[test]
fn test_interest_capped_by_equity() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_savings(&e, 100_000);
    fund_reserve(&s, 5_0000000);
    let alice = Address::generate(&e);
    s.ledger.mint(&s.bank, &alice, &1000_0000000);

    s.savings.save(&alice, &1000_0000000);
    advance(&e, 3 * DAY + YEAR);
    assert_eq!(s.savings.accrued_interest(&alice), 5_0000000);
    assert_eq!(s.savings.refresh_balance(&alice), 1005_0000000);
    assert_eq!(s.ledger.equity(), 0);
}

#[test]
fn test_adjust_moves_funds_both_ways() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_savings(&e, 50_000);
    let alice = Address::generate(&e);
    s.ledger.mint(&s.bank, &alice, &1000_0000000);

    s.savings.adjust(&alice, &600_0000000);
    assert_eq!(s.savings.account(&alice).saved, 600_0000000);
    assert_eq!(s.ledger.balance(&alice), 400_0000000);

    s.savings.adjust(&alice, &100_0000000);
    assert_eq!(s.savings.account(&alice).saved, 100_0000000);
    assert_eq!(s.ledger.balance(&alice), 900_0000000);
}

#[test]
fn test_module_disabled() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_savings(&e, 0);
    let alice = Address::generate(&e);
    s.ledger.mint(&s.bank, &alice, &1000_0000000);
    assert_eq!(
        s.savings.try_save(&alice, &100_0000000),
        Err(Ok(Error::ModuleDisabled))
    );

    let s = create_savings(&e, 10_000);
    s.ledger.mint(&s.bank, &alice, &1000_0000000);
    s.savings.save(&alice, &100_0000000);
    s.savings.propose_change(&0);
    advance(&e, 7 * DAY);
    // disabled as soon as the zero rate can be applied
    assert_eq!(
        s.savings.try_save(&alice, &100_0000000),
        Err(Ok(Error::ModuleDisabled))
    );
    assert_eq!(
        s.savings.try_save(&alice, &0),
        Err(Ok(Error::ValueNotPositive))
    );
}
