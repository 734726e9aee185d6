use soroban_sdk::{Address, Env};

use crate::{
    Error,
    storage::{self, Family, HubStorage, Position, PositionTerms},
};

/// Stamps out position records, either as an original with fresh terms and its own
/// limit family, or as a clone that inherits its parent's terms and shares the
/// original's limit.
pub struct PositionFactory;

impl PositionFactory {
    fn next_id(state: &mut HubStorage) -> u64 {
        let id = state.position_count;
        state.position_count += 1;
        id
    }

    /// Create an original position and its limit family.
    pub fn create_original(
        env: &Env,
        state: &mut HubStorage,
        owner: Address,
        collateral: Address,
        terms: &PositionTerms,
        lead_rate_ppm: u32,
    ) -> Result<(u64, Position), Error> {
        let now = env.ledger().timestamp();
        let Some(start) = now.checked_add(terms.init_period) else {
            return Err(Error::PeriodTooLong);
        };
        let Some(expiration) = start.checked_add(terms.duration) else {
            return Err(Error::PeriodTooLong);
        };
        let id = Self::next_id(state);
        let mut position = Position {
            owner,
            collateral,
            original: id,
            minimum_collateral: terms.minimum_collateral,
            reserve_ppm: terms.reserve_ppm,
            risk_premium_ppm: terms.risk_premium_ppm,
            fixed_annual_rate_ppm: 0,
            principal: 0,
            accrued_interest: 0,
            last_accrual: now,
            price: terms.liquidation_price,
            collateral_balance: terms.initial_collateral,
            start,
            cooldown: start,
            expiration,
            challenge_period: terms.challenge_period,
            challenged_amount: 0,
            closed: false,
        };
        position.lock_rate(lead_rate_ppm);
        storage::set_family(
            env,
            id,
            &Family {
                limit: terms.limit,
                total_minted: 0,
            },
        );
        Ok((id, position))
    }

    /// Create a clone of `parent`. The clone starts immediately, takes the parent's
    /// price and terms, and expires at `expiration`, which may not lie beyond the
    /// original's expiration.
    pub fn create_clone(
        env: &Env,
        state: &mut HubStorage,
        parent: &Position,
        owner: Address,
        initial_collateral: i128,
        expiration: u64,
        lead_rate_ppm: u32,
    ) -> Result<(u64, Position), Error> {
        let now = env.ledger().timestamp();
        let original = storage::get_position(env, parent.original)?;
        if expiration <= now || expiration > original.expiration {
            return Err(Error::InvalidExpiration);
        }
        let id = Self::next_id(state);
        let mut position = Position {
            owner,
            collateral: parent.collateral.clone(),
            original: parent.original,
            minimum_collateral: parent.minimum_collateral,
            reserve_ppm: parent.reserve_ppm,
            risk_premium_ppm: parent.risk_premium_ppm,
            fixed_annual_rate_ppm: 0,
            principal: 0,
            accrued_interest: 0,
            last_accrual: now,
            price: parent.price,
            collateral_balance: initial_collateral,
            start: now,
            cooldown: now,
            expiration,
            challenge_period: parent.challenge_period,
            challenged_amount: 0,
            closed: false,
        };
        position.lock_rate(lead_rate_ppm);
        Ok((id, position))
    }
}
