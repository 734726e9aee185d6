#![cfg(test)]
extern crate std;

use crate::error::Error;
use crate::math::ONE;
use crate::test::{DAY, PRICE, Setup, advance, create_hub, default_terms, fund, open};
use soroban_sdk::{Address, Env, testutils::Address as _, testutils::Ledger, vec};

/// Open the default position and mint 10k against it as soon as it starts.
fn minted_position(e: &Env, s: &Setup) -> u64 {
    let id = open(s, &default_terms(550_000_0000000));
    advance(e, 3 * DAY);
    s.hub.mint(&s.owner, &id, &s.owner, &10_000_0000000);
    id
}

fn challenger(e: &Env, s: &Setup, amount: i128) -> Address {
    let challenger = Address::generate(e);
    s.collateral_admin.mint(&challenger, &amount);
    challenger
}

#[test]
fn test_challenge_averted_by_owner() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_hub(&e);
    let id = minted_position(&e, &s);
    let charlie = challenger(&e, &s, 20_0000000);

    assert_eq!(
        s.hub.try_challenge(&charlie, &id, &20_0000000, &(PRICE + ONE)),
        Err(Ok(Error::UnexpectedPrice))
    );
    assert_eq!(
        s.hub.try_challenge(&charlie, &id, &5_0000000, &PRICE),
        Err(Ok(Error::ChallengeTooSmall))
    );

    let index = s.hub.challenge(&charlie, &id, &20_0000000, &PRICE);
    assert_eq!(index, 0);
    assert_eq!(s.hub.challenge_count(), 1);
    assert_eq!(s.hub.challenges_of(&id), vec![&e, 0u32]);
    assert_eq!(s.collateral.balance(&charlie), 0);
    let challenge = s.hub.get_challenge(&index);
    assert_eq!(challenge.size, 20_0000000);
    assert_eq!(challenge.liq_price, PRICE);
    assert_eq!(s.hub.position(&id).challenged_amount, 20_0000000);

    assert_eq!(
        s.hub.try_mint(&s.owner, &id, &s.owner, &1_000_0000000),
        Err(Ok(Error::Challenged))
    );
    assert_eq!(
        s.hub.try_withdraw_collateral(&s.owner, &id, &s.owner, &1_0000000),
        Err(Ok(Error::Challenged))
    );
    assert_eq!(
        s.hub.try_bid(&s.owner, &index, &20_0000000, &false),
        Err(Ok(Error::AvertTooEarly))
    );

    advance(&e, 3600);
    fund(&s, &s.owner, 100_000_0000000);
    s.hub.bid(&s.owner, &index, &20_0000000, &false);

    assert_eq!(s.ledger.balance(&charlie), 100_000_0000000);
    assert_eq!(s.ledger.balance(&s.owner), 8_000_0000000);
    assert_eq!(s.collateral.balance(&s.owner), 20_0000000);

    let view = s.hub.position(&id);
    assert_eq!(view.challenged_amount, 0);
    assert_eq!(view.collateral_balance, 110_0000000);
    assert_eq!(view.principal, 10_000_0000000);
    assert_eq!(view.cooldown, e.ledger().timestamp() + DAY);
    assert_eq!(
        s.hub.try_mint(&s.owner, &id, &s.owner, &1_000_0000000),
        Err(Ok(Error::Hot))
    );

    assert_eq!(s.hub.get_challenge(&index).challenger, None);
    assert_eq!(
        s.hub.try_bid(&s.owner, &index, &20_0000000, &false),
        Err(Ok(Error::InvalidChallenge))
    );
}

#[test]
fn test_challenger_can_withdraw_own_challenge() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_hub(&e);
    let id = minted_position(&e, &s);
    let charlie = challenger(&e, &s, 20_0000000);
    let index = s.hub.challenge(&charlie, &id, &20_0000000, &PRICE);
    advance(&e, 3600);

    // a partial bid may not leave a challenge below the minimum
    assert_eq!(
        s.hub.try_bid(&charlie, &index, &15_0000000, &false),
        Err(Ok(Error::LeaveNoDust))
    );
    s.hub.bid(&charlie, &index, &10_0000000, &false);
    assert_eq!(s.hub.get_challenge(&index).size, 10_0000000);
    assert_eq!(s.hub.position(&id).challenged_amount, 10_0000000);

    s.hub.bid(&charlie, &index, &10_0000000, &false);
    assert_eq!(s.collateral.balance(&charlie), 20_0000000);
    assert_eq!(s.ledger.balance(&charlie), 0);
    assert_eq!(s.hub.position(&id).challenged_amount, 0);
}

#[test]
fn test_challenge_succeeds_at_decayed_price() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_hub(&e);
    let id = minted_position(&e, &s);
    let charlie = challenger(&e, &s, 20_0000000);
    advance(&e, 3600);
    let index = s.hub.challenge(&charlie, &id, &20_0000000, &PRICE);

    advance(&e, DAY);
    assert_eq!(s.hub.price(&index), PRICE);
    advance(&e, DAY / 2);
    assert_eq!(s.hub.price(&index), PRICE / 2);

    let dave = Address::generate(&e);
    fund(&s, &dave, 50_000_0000000);
    s.hub.bid(&dave, &index, &20_0000000, &false);

    assert_eq!(s.ledger.balance(&dave), 0);
    assert_eq!(s.collateral.balance(&dave), 20_0000000);
    assert_eq!(s.collateral.balance(&charlie), 20_0000000);
    // 2% of the bid
    assert_eq!(s.ledger.balance(&charlie), 1_000_0000000);
    // surplus over the retired debt, less the reserve share
    assert_eq!(
        s.ledger.balance(&s.owner),
        8_000_0000000 + 377_452_702_368
    );
    assert_eq!(s.ledger.balance(&s.hub.address), 0);

    let view = s.hub.position(&id);
    assert_eq!(view.collateral_balance, 90_0000000);
    assert_eq!(view.principal, 81_818_181_819);
    assert_eq!(view.interest, 10_367_372);
    assert_eq!(view.challenged_amount, 0);
    assert_eq!(view.cooldown, e.ledger().timestamp() + DAY);
    assert!(!view.closed);
    assert_eq!(s.collateral.balance(&s.hub.address), 90_0000000);
}

#[test]
fn test_postponed_collateral_return() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_hub(&e);
    let id = minted_position(&e, &s);
    let charlie = challenger(&e, &s, 20_0000000);
    let index = s.hub.challenge(&charlie, &id, &20_0000000, &PRICE);
    advance(&e, DAY + 1);

    let dave = Address::generate(&e);
    fund(&s, &dave, 100_000_0000000);
    s.hub.bid(&dave, &index, &20_0000000, &true);

    let collateral = s.collateral.address.clone();
    assert_eq!(s.collateral.balance(&charlie), 0);
    assert_eq!(s.hub.pending_return(&collateral, &charlie), 20_0000000);
    assert_eq!(s.collateral.balance(&dave), 20_0000000);

    let target = Address::generate(&e);
    assert_eq!(
        s.hub.return_postponed_collateral(&charlie, &collateral, &target),
        20_0000000
    );
    assert_eq!(s.collateral.balance(&target), 20_0000000);
    assert_eq!(s.hub.pending_return(&collateral, &charlie), 0);
    assert_eq!(
        s.hub.return_postponed_collateral(&charlie, &collateral, &target),
        0
    );
}

#[test]
fn test_worthless_auction_covers_loss_from_reserve() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_hub(&e);
    let id = minted_position(&e, &s);
    let charlie = challenger(&e, &s, 110_0000000);
    let index = s.hub.challenge(&charlie, &id, &110_0000000, &PRICE);
    advance(&e, 2 * DAY);
    assert_eq!(s.hub.price(&index), 0);

    let dave = Address::generate(&e);
    s.hub.bid(&dave, &index, &110_0000000, &false);

    assert_eq!(s.collateral.balance(&dave), 110_0000000);
    assert_eq!(s.collateral.balance(&charlie), 110_0000000);
    assert_eq!(s.ledger.balance(&charlie), 0);

    let view = s.hub.position(&id);
    assert!(view.closed);
    assert_eq!(view.principal, 0);
    assert_eq!(view.debt, 0);
    assert_eq!(view.collateral_balance, 0);
    assert_eq!(s.ledger.minter_reserve(), 0);
    assert_eq!(s.ledger.balance(&s.hub.address), 0);
    // the owner keeps what was minted
    assert_eq!(s.ledger.balance(&s.owner), 8_000_0000000);
}

#[test]
fn test_buy_expired_collateral() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_hub(&e);
    let id = minted_position(&e, &s);
    let dave = Address::generate(&e);

    assert_eq!(
        s.hub.try_buy_expired_collateral(&dave, &id, &10_0000000),
        Err(Ok(Error::Alive))
    );

    let expiration = s.hub.position(&id).expiration;
    e.ledger().set_timestamp(expiration);
    assert_eq!(s.hub.expired_purchase_price(&id), PRICE);
    assert_eq!(
        s.hub.try_mint(&s.owner, &id, &s.owner, &1_000_0000000),
        Err(Ok(Error::Expired))
    );
    assert_eq!(
        s.hub.try_buy_expired_collateral(&dave, &id, &(110_0000000 - 100)),
        Err(Ok(Error::LeaveNoDust))
    );

    let interest = s.hub.interest(&id);
    fund(&s, &dave, 550_000_0000000);
    assert_eq!(
        s.hub.buy_expired_collateral(&dave, &id, &55_0000000),
        55_0000000
    );
    let view = s.hub.position(&id);
    assert_eq!(view.principal, 5_000_0000000);
    assert_eq!(view.collateral_balance, 55_0000000);
    assert!(!view.closed);

    // asking for more than is left buys the rest
    assert_eq!(
        s.hub.buy_expired_collateral(&dave, &id, &100_0000000),
        55_0000000
    );
    let view = s.hub.position(&id);
    assert!(view.closed);
    assert_eq!(view.debt, 0);

    assert_eq!(s.collateral.balance(&dave), 110_0000000);
    assert_eq!(s.ledger.balance(&dave), 0);
    assert_eq!(
        s.ledger.balance(&s.owner),
        8_000_0000000 + 550_000_0000000 - 10_000_0000000 - interest
    );
    // the position paid its principal in full, so its reserve turns into equity
    assert_eq!(s.ledger.equity(), 3_000_0000000 + interest);
    assert_eq!(
        s.hub.try_buy_expired_collateral(&dave, &id, &1),
        Err(Ok(Error::Closed))
    );
}

#[test]
fn test_forced_sale_price_schedule() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_hub(&e);
    let id = minted_position(&e, &s);
    let expiration = s.hub.position(&id).expiration;

    e.ledger().set_timestamp(expiration + DAY);
    assert_eq!(s.hub.expired_purchase_price(&id), PRICE);
    e.ledger().set_timestamp(expiration + DAY + DAY / 2);
    assert_eq!(s.hub.expired_purchase_price(&id), PRICE * 11 / 2);
    e.ledger().set_timestamp(expiration + 2 * DAY);
    assert_eq!(s.hub.expired_purchase_price(&id), PRICE * 10);
    e.ledger().set_timestamp(expiration + 6 * DAY);
    assert_eq!(s.hub.expired_purchase_price(&id), 0);
}

#[test]
fn test_expired_or_closed_positions_cannot_be_challenged() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_hub(&e);
    let id = minted_position(&e, &s);
    let charlie = challenger(&e, &s, 20_0000000);

    let expiration = s.hub.position(&id).expiration;
    e.ledger().set_timestamp(expiration);
    assert_eq!(
        s.hub.try_challenge(&charlie, &id, &20_0000000, &0),
        Err(Ok(Error::Expired))
    );
    assert_eq!(
        s.hub.try_challenge(&charlie, &99, &20_0000000, &0),
        Err(Ok(Error::InvalidPos))
    );
}

#[test]
fn test_bid_on_challenge_larger_than_remaining_collateral() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_hub(&e);
    let id = minted_position(&e, &s);
    let charlie = challenger(&e, &s, 100_0000000);
    let dora = challenger(&e, &s, 100_0000000);
    advance(&e, 3600);
    let first = s.hub.challenge(&charlie, &id, &100_0000000, &PRICE);
    let second = s.hub.challenge(&dora, &id, &100_0000000, &PRICE);
    assert_eq!(s.hub.position(&id).challenged_amount, 200_0000000);

    advance(&e, DAY + DAY / 2);
    assert_eq!(s.hub.price(&second), PRICE / 2);
    let dave = Address::generate(&e);
    fund(&s, &dave, 275_000_0000000);
    s.hub.bid(&dave, &first, &100_0000000, &false);
    assert_eq!(s.hub.position(&id).collateral_balance, 10_0000000);

    // only the 10 units the position still holds are sold
    let before = s.ledger.balance(&dave);
    s.hub.bid(&dave, &second, &100_0000000, &false);
    assert_eq!(before - s.ledger.balance(&dave), 25_000_0000000);
    assert_eq!(s.collateral.balance(&dave), 110_0000000);
    assert_eq!(s.collateral.balance(&dora), 100_0000000);
    assert_eq!(s.collateral.balance(&charlie), 100_0000000);

    let view = s.hub.position(&id);
    assert!(view.closed);
    assert_eq!(view.principal, 0);
    assert_eq!(view.interest, 0);
    assert_eq!(view.challenged_amount, 0);
    assert_eq!(view.collateral_balance, 0);
    assert_eq!(s.hub.get_challenge(&second).challenger, None);
}

#[test]
fn test_bid_on_position_with_long_challenge_period() {
    let e = Env::default();
    e.mock_all_auths();
    let s = create_hub(&e);
    let mut terms = default_terms(550_000_0000000);
    let expiration = e.ledger().timestamp() + terms.init_period + terms.duration;
    terms.challenge_period = (u64::MAX - expiration) / 2;
    let id = open(&s, &terms);
    advance(&e, 3 * DAY);
    s.hub.mint(&s.owner, &id, &s.owner, &10_000_0000000);

    let charlie = challenger(&e, &s, 20_0000000);
    let index = s.hub.challenge(&charlie, &id, &20_0000000, &PRICE);
    advance(&e, 10);
    assert_eq!(s.hub.price(&index), PRICE);
    s.hub.bid(&charlie, &index, &20_0000000, &false);

    assert_eq!(s.collateral.balance(&charlie), 20_0000000);
    assert_eq!(s.hub.position(&id).challenged_amount, 0);
}
