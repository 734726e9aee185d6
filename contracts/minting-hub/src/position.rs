use soroban_sdk::Address;

use crate::{
    Error,
    math::{ONE, PPM, checked_add, interest_for, mul_div, mul_div_ceil, value_of},
    storage::{Family, Position},
};

/// Lifecycle checks and accounting on a single position record. Nothing here touches
/// storage or tokens; callers persist the record and move funds afterwards.
impl Position {
    pub fn is_hot(&self, now: u64) -> bool {
        now < self.cooldown
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiration
    }

    pub fn is_challenged(&self) -> bool {
        self.challenged_amount > 0
    }

    pub fn is_original(&self, id: u64) -> bool {
        self.original == id
    }

    pub fn require_owner(&self, caller: &Address) -> Result<(), Error> {
        if *caller != self.owner {
            return Err(Error::NotOwner);
        }
        Ok(())
    }

    pub fn require_open(&self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    pub fn require_alive(&self, now: u64) -> Result<(), Error> {
        if self.is_expired(now) {
            return Err(Error::Expired);
        }
        Ok(())
    }

    pub fn require_not_hot(&self, now: u64) -> Result<(), Error> {
        if self.is_hot(now) {
            return Err(Error::Hot);
        }
        Ok(())
    }

    pub fn require_unchallenged(&self) -> Result<(), Error> {
        if self.is_challenged() {
            return Err(Error::Challenged);
        }
        Ok(())
    }

    /// Interest owed at `now`: the stored accrual plus what the locked rate added since.
    pub fn interest_at(&self, now: u64) -> Result<i128, Error> {
        let pending = interest_for(
            self.principal,
            self.fixed_annual_rate_ppm,
            now.saturating_sub(self.last_accrual),
        )?;
        checked_add(self.accrued_interest, pending)
    }

    pub fn debt_at(&self, now: u64) -> Result<i128, Error> {
        checked_add(self.principal, self.interest_at(now)?)
    }

    /// Fold pending interest into the stored accrual at the still locked rate.
    pub fn accrue(&mut self, now: u64) -> Result<(), Error> {
        self.accrued_interest = self.interest_at(now)?;
        self.last_accrual = now;
        Ok(())
    }

    /// Lock the rate for the time until the next principal-changing call.
    pub fn lock_rate(&mut self, lead_rate_ppm: u32) {
        self.fixed_annual_rate_ppm = lead_rate_ppm.saturating_add(self.risk_premium_ppm);
    }

    /// Price implied by the debt if it exceeds the stated price.
    pub fn virtual_price_at(&self, now: u64) -> Result<i128, Error> {
        let debt = self.debt_at(now)?;
        if debt == 0 || self.collateral_balance == 0 {
            return Ok(self.price);
        }
        let implied = mul_div_ceil(debt, ONE, self.collateral_balance)?;
        Ok(implied.max(self.price))
    }

    /// Collateral below the minimum counts as none.
    pub fn check_collateral(&self, balance: i128, price: i128) -> Result<(), Error> {
        let relevant = if balance < self.minimum_collateral {
            0
        } else {
            balance
        };
        let Some(value) = relevant.checked_mul(price) else {
            return Err(Error::ArithmeticError);
        };
        let Some(required) = checked_add(self.principal, self.accrued_interest)?.checked_mul(ONE)
        else {
            return Err(Error::ArithmeticError);
        };
        if value < required {
            return Err(Error::InsufficientCollateral);
        }
        Ok(())
    }

    /// Value of collateral not yet used to back principal.
    pub fn unused_potential(&self, now: u64) -> Result<i128, Error> {
        if self.is_expired(now) {
            return Ok(0);
        }
        let potential = value_of(self.collateral_balance, self.price)?;
        Ok((potential - self.principal).max(0))
    }

    /// Reduce principal and interest by the share of collateral given by
    /// `taken / collateral_balance`. Returns `(principal, interest)` retired.
    pub fn retire_share(&mut self, taken: i128) -> Result<(i128, i128), Error> {
        let balance = self.collateral_balance;
        if balance == 0 || taken == 0 {
            return Ok((0, 0));
        }
        let principal = mul_div(self.principal, taken, balance)?;
        let interest = mul_div(self.accrued_interest, taken, balance)?;
        self.principal -= principal;
        self.accrued_interest -= interest;
        self.collateral_balance -= taken;
        Ok((principal, interest))
    }

    /// Split a gross repayment into `(interest, principal)` parts, interest first.
    pub fn split_repayment(&self, amount: i128) -> (i128, i128) {
        let interest = amount.min(self.accrued_interest);
        let principal = (amount - interest).min(self.principal);
        (interest, principal)
    }

    /// Close once the debt is gone and what collateral remains is below the floor.
    pub fn close_if_drained(&mut self) {
        if self.principal == 0 && self.collateral_balance < self.minimum_collateral {
            self.closed = true;
        }
    }

    /// Stable units credited to the owner when minting `amount`.
    pub fn usable_mint(&self, amount: i128) -> Result<i128, Error> {
        mul_div(amount, PPM - i128::from(self.reserve_ppm), PPM)
    }

    /// Gross mint needed for the owner to receive `usable`.
    pub fn mint_amount_for_usable(&self, usable: i128) -> Result<i128, Error> {
        mul_div_ceil(usable, PPM, PPM - i128::from(self.reserve_ppm))
    }
}

impl Family {
    pub fn add_minted(&mut self, amount: i128) -> Result<(), Error> {
        self.total_minted = checked_add(self.total_minted, amount)?;
        Ok(())
    }

    pub fn remove_minted(&mut self, amount: i128) {
        self.total_minted = (self.total_minted - amount).max(0);
    }

    /// Room left for the original itself.
    pub fn available(&self) -> i128 {
        (self.limit - self.total_minted).max(0)
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use super::*;
    use soroban_sdk::{Env, testutils::Address as _};

    fn sample(env: &Env) -> Position {
        Position {
            owner: Address::generate(env),
            collateral: Address::generate(env),
            original: 0,
            minimum_collateral: 10,
            reserve_ppm: 200_000,
            risk_premium_ppm: 10_000,
            fixed_annual_rate_ppm: 50_000,
            principal: 10_000,
            accrued_interest: 0,
            last_accrual: 0,
            price: 2_000 * ONE,
            collateral_balance: 100,
            start: 0,
            cooldown: 0,
            expiration: 1_000_000_000,
            challenge_period: 86_400,
            challenged_amount: 0,
            closed: false,
        }
    }

    #[test]
    fn locked_rate_survives_until_next_lock() {
        let env = Env::default();
        let mut position = sample(&env);
        let year = crate::math::SECONDS_PER_YEAR;
        assert_eq!(position.interest_at(year), Ok(500));
        position.accrue(year).unwrap();
        position.lock_rate(90_000);
        assert_eq!(position.fixed_annual_rate_ppm, 100_000);
        assert_eq!(position.accrued_interest, 500);
        assert_eq!(position.interest_at(2 * year), Ok(1_500));
    }

    #[test]
    fn virtual_price_covers_debt() {
        let env = Env::default();
        let mut position = sample(&env);
        assert_eq!(position.virtual_price_at(0), Ok(2_000 * ONE));
        position.principal = 300_000;
        assert_eq!(position.virtual_price_at(0), Ok(3_000 * ONE));
    }

    #[test]
    fn collateral_below_minimum_counts_as_none() {
        let env = Env::default();
        let position = sample(&env);
        assert_eq!(position.check_collateral(100, 2_000 * ONE), Ok(()));
        assert_eq!(
            position.check_collateral(9, 2_000 * ONE),
            Err(Error::InsufficientCollateral)
        );
        assert_eq!(
            position.check_collateral(10, 999 * ONE),
            Err(Error::InsufficientCollateral)
        );
    }

    #[test]
    fn retiring_everything_clears_debt() {
        let env = Env::default();
        let mut position = sample(&env);
        position.accrued_interest = 77;
        assert_eq!(position.retire_share(40), Ok((4_000, 30)));
        assert_eq!(position.retire_share(60), Ok((6_000, 47)));
        assert_eq!(position.principal, 0);
        assert_eq!(position.accrued_interest, 0);
        position.close_if_drained();
        assert!(position.closed);
    }

    #[test]
    fn mint_amounts_round_trip() {
        let env = Env::default();
        let position = sample(&env);
        assert_eq!(position.usable_mint(1_000), Ok(800));
        assert_eq!(position.mint_amount_for_usable(800), Ok(1_000));
        assert_eq!(position.mint_amount_for_usable(801), Ok(1_002));
    }
}
