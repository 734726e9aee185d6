use soroban_sdk::{
    Address, BytesN, Env, String, Vec, contract, contractimpl, log, token::TokenClient,
};

use crate::{
    Error,
    factory::PositionFactory,
    hub::IsMintingHub,
    index_types::{
        ChallengeAverted, ChallengeStarted, ChallengeSucceeded, ForcedSale, MintingUpdate,
        OwnershipTransferred, PositionDenied, PositionOpened, PostponedReturn,
    },
    interfaces::{RateSourceClient, StableLedgerClient},
    math::{self, ONE, PPM, checked_add, mul_div, value_of},
    positions::IsPosition,
    storage::{
        self, ADMIN_KEY, Challenge, HubConfig, HubStorage, Position, PositionTerms, PositionView,
    },
};

const MAX_COLLATERAL_DECIMALS: u32 = 24;

#[contract]
pub struct MintingHubContract;

#[contractimpl]
impl MintingHubContract {
    pub fn __constructor(
        env: &Env,
        admin: Address,
        ledger: Address,
        rate_source: Address,
        config: HubConfig,
    ) -> Result<(), Error> {
        Self::validate_config(&config)?;
        Self::set_admin(env, &admin);
        HubStorage::set_state(
            env,
            &HubStorage {
                ledger,
                rate_source,
                roller: None,
                config,
                position_count: 0,
                challenge_count: 0,
            },
        );
        Ok(())
    }

    /// Upgrade the contract to new wasm. Admin-only.
    pub fn upgrade(env: &Env, new_wasm_hash: BytesN<32>) {
        Self::require_admin(env);
        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }

    /// Get the admin address
    pub fn admin(env: &Env) -> Option<Address> {
        env.storage().instance().get(&ADMIN_KEY)
    }

    /// Register the position roller, which may mint and withdraw on behalf of owners.
    /// Admin-only.
    pub fn set_roller(env: &Env, roller: Address) {
        Self::require_admin(env);
        let mut state = HubStorage::get_state(env);
        state.roller = Some(roller);
        HubStorage::set_state(env, &state);
    }

    pub fn roller(env: &Env) -> Option<Address> {
        HubStorage::get_state(env).roller
    }

    /// Replace the hub configuration. Admin-only.
    pub fn set_config(env: &Env, config: HubConfig) -> Result<(), Error> {
        Self::require_admin(env);
        Self::validate_config(&config)?;
        let mut state = HubStorage::get_state(env);
        state.config = config;
        HubStorage::set_state(env, &state);
        Ok(())
    }

    /// Recover tokens sent to the hub by mistake. Admin-only. The stable unit and any
    /// collateral asset ever accepted are off limits.
    pub fn rescue_token(
        env: &Env,
        token: Address,
        target: Address,
        amount: i128,
    ) -> Result<(), Error> {
        Self::require_admin(env);
        let state = HubStorage::get_state(env);
        if token == state.ledger || storage::is_collateral_asset(env, &token) {
            return Err(Error::CannotRescueCollateral);
        }
        Self::push(env, &token, &target, amount);
        Ok(())
    }
}

impl MintingHubContract {
    fn set_admin(env: &Env, admin: &Address) {
        if env.storage().instance().has(&ADMIN_KEY) {
            panic!("admin already set");
        }
        env.storage().instance().set(&ADMIN_KEY, admin);
    }

    fn require_admin(env: &Env) {
        let Some(admin) = Self::admin(env) else {
            panic!("admin not set");
        };
        admin.require_auth();
    }

    fn validate_config(config: &HubConfig) -> Result<(), Error> {
        if i128::from(config.challenger_reward_ppm) > PPM {
            return Err(Error::InvalidReservePPM);
        }
        if config.opening_fee < 0 || config.min_opening_value < 0 || config.min_remainder_value < 0
        {
            return Err(Error::ValueNotPositive);
        }
        Ok(())
    }

    fn now(env: &Env) -> u64 {
        env.ledger().timestamp()
    }

    fn ledger<'a>(env: &Env, state: &HubStorage) -> StableLedgerClient<'a> {
        StableLedgerClient::new(env, &state.ledger)
    }

    fn lead_rate(env: &Env, state: &HubStorage) -> u32 {
        RateSourceClient::new(env, &state.rate_source).current_rate_ppm()
    }

    /// Take `amount` of `token` from `from` into the hub. Contracts approve the hub and
    /// are pulled through their allowance; accounts authorize a direct transfer.
    fn pull(env: &Env, token: &Address, from: &Address, amount: i128) {
        if amount <= 0 {
            return;
        }
        let client = TokenClient::new(env, token);
        let hub = env.current_contract_address();
        if client.allowance(from, &hub) >= amount {
            client.transfer_from(&hub, from, &hub, &amount);
        } else {
            client.transfer(from, &hub, &amount);
        }
    }

    fn push(env: &Env, token: &Address, to: &Address, amount: i128) {
        if amount <= 0 {
            return;
        }
        TokenClient::new(env, token).transfer(&env.current_contract_address(), to, &amount);
    }

    /// A token is only accepted as collateral if it refuses transfers beyond balance.
    fn probe_collateral(env: &Env, token: &TokenClient, recipient: &Address) -> Result<(), Error> {
        let hub = env.current_contract_address();
        let invalid_amount = token.balance(&hub).saturating_add(1);
        match token.try_transfer(&hub, recipient, &invalid_amount) {
            Ok(Ok(())) => Err(Error::IncompatibleCollateral),
            _ => Ok(()),
        }
    }

    fn require_owner_or_roller(
        state: &HubStorage,
        position: &Position,
        caller: &Address,
    ) -> Result<(), Error> {
        if *caller == position.owner || state.roller.as_ref() == Some(caller) {
            return Ok(());
        }
        Err(Error::NotOwner)
    }

    /// Minting room left for `position`. Clones additionally leave room for the unused
    /// potential of their original.
    fn available_for(env: &Env, id: u64, position: &Position, now: u64) -> Result<i128, Error> {
        if position.closed || position.is_expired(now) {
            return Ok(0);
        }
        let family = storage::get_family(env, position.original)?;
        if position.is_original(id) {
            return Ok(family.available());
        }
        let original = storage::get_position(env, position.original)?;
        let unused = if original.closed {
            0
        } else {
            original.unused_potential(now)?
        };
        Ok((family.available() - unused).max(0))
    }

    fn emit_update(env: &Env, id: u64, position: &Position) {
        MintingUpdate {
            position: id,
            collateral: position.collateral_balance,
            price: position.price,
            principal: position.principal,
        }
        .publish(env);
    }

    fn view(env: &Env, id: u64, position: &Position) -> Result<PositionView, Error> {
        let now = Self::now(env);
        let interest = position.interest_at(now)?;
        let family = storage::get_family(env, position.original)?;
        Ok(PositionView {
            id,
            owner: position.owner.clone(),
            collateral: position.collateral.clone(),
            original: position.original,
            minimum_collateral: position.minimum_collateral,
            limit: family.limit,
            reserve_ppm: position.reserve_ppm,
            risk_premium_ppm: position.risk_premium_ppm,
            fixed_annual_rate_ppm: position.fixed_annual_rate_ppm,
            principal: position.principal,
            interest,
            debt: checked_add(position.principal, interest)?,
            price: position.price,
            virtual_price: position.virtual_price_at(now)?,
            collateral_balance: position.collateral_balance,
            start: position.start,
            cooldown: position.cooldown,
            expiration: position.expiration,
            challenge_period: position.challenge_period,
            challenged_amount: position.challenged_amount,
            closed: position.closed,
            available_for_minting: Self::available_for(env, id, position, now)?,
        })
    }

    fn do_mint(
        env: &Env,
        state: &HubStorage,
        id: u64,
        to: &Address,
        amount: i128,
    ) -> Result<i128, Error> {
        if amount <= 0 {
            return Err(Error::ValueNotPositive);
        }
        let now = Self::now(env);
        let mut position = storage::get_position(env, id)?;
        position.require_open()?;
        position.require_alive(now)?;
        position.require_unchallenged()?;
        position.require_not_hot(now)?;
        if amount > Self::available_for(env, id, &position, now)? {
            return Err(Error::LimitExceeded);
        }

        position.accrue(now)?;
        position.lock_rate(Self::lead_rate(env, state));
        position.principal = checked_add(position.principal, amount)?;
        position.check_collateral(position.collateral_balance, position.price)?;

        let mut family = storage::get_family(env, position.original)?;
        family.add_minted(amount)?;
        storage::set_family(env, position.original, &family);
        storage::set_position(env, id, &position);
        Self::emit_update(env, id, &position);

        let usable = Self::ledger(env, state).mint_with_reserve(
            &env.current_contract_address(),
            to,
            &amount,
            &position.reserve_ppm,
        );
        Ok(usable)
    }

    fn do_repay(
        env: &Env,
        state: &HubStorage,
        id: u64,
        payer: &Address,
        amount: i128,
    ) -> Result<i128, Error> {
        if amount <= 0 {
            return Err(Error::ValueNotPositive);
        }
        let now = Self::now(env);
        let mut position = storage::get_position(env, id)?;
        position.accrue(now)?;
        let (interest, principal) = position.split_repayment(amount);
        position.accrued_interest -= interest;
        position.principal -= principal;
        position.lock_rate(Self::lead_rate(env, state));
        position.close_if_drained();

        if principal > 0 {
            let mut family = storage::get_family(env, position.original)?;
            family.remove_minted(principal);
            storage::set_family(env, position.original, &family);
        }
        storage::set_position(env, id, &position);
        Self::emit_update(env, id, &position);

        let hub = env.current_contract_address();
        let ledger = Self::ledger(env, state);
        if interest > 0 {
            ledger.collect_profits(&hub, payer, &interest);
        }
        if principal > 0 {
            ledger.burn_from_with_reserve(&hub, payer, &principal, &position.reserve_ppm);
        }
        Ok(interest + principal)
    }

    fn do_set_price(
        env: &Env,
        state: &HubStorage,
        id: u64,
        new_price: i128,
        reference: Option<u64>,
    ) -> Result<(), Error> {
        if new_price <= 0 {
            return Err(Error::ValueNotPositive);
        }
        let now = Self::now(env);
        let mut position = storage::get_position(env, id)?;
        position.require_open()?;
        position.require_alive(now)?;
        position.require_unchallenged()?;
        position.accrue(now)?;

        if new_price > position.price {
            position.require_not_hot(now)?;
            let Some(doubled) = position.price.checked_mul(2) else {
                return Err(Error::ArithmeticError);
            };
            if now >= position.start && new_price > doubled {
                return Err(Error::PriceTooHigh);
            }
            let bounds = checked_add(
                position.principal,
                Self::available_for(env, id, &position, now)?,
            )?;
            let Some(value) = position.collateral_balance.checked_mul(new_price) else {
                return Err(Error::ArithmeticError);
            };
            let Some(max_value) = bounds.checked_mul(ONE) else {
                return Err(Error::ArithmeticError);
            };
            if value > max_value {
                return Err(Error::PriceTooHigh);
            }
            match reference {
                Some(reference) => {
                    Self::validate_reference(env, id, &position, reference, new_price, now)?
                }
                None => {
                    position.cooldown = position
                        .cooldown
                        .max(now.saturating_add(state.config.price_increase_cooldown))
                }
            }
        }
        position.check_collateral(position.collateral_balance, new_price)?;
        position.price = new_price;
        storage::set_position(env, id, &position);
        Self::emit_update(env, id, &position);
        Ok(())
    }

    /// A reference justifies `new_price` if it is a healthy position on the same
    /// collateral, at least as strictly challengeable, that already carries the price.
    fn validate_reference(
        env: &Env,
        id: u64,
        position: &Position,
        reference: u64,
        new_price: i128,
        now: u64,
    ) -> Result<(), Error> {
        if reference == id {
            return Err(Error::InvalidPriceReference);
        }
        let Ok(other) = storage::get_position(env, reference) else {
            return Err(Error::InvalidPriceReference);
        };
        let valid = other.collateral == position.collateral
            && !other.closed
            && !other.is_challenged()
            && !other.is_hot(now)
            && !other.is_expired(now)
            && other.challenge_period >= position.challenge_period
            && other.price >= new_price
            && other.principal > 0;
        if !valid {
            return Err(Error::InvalidPriceReference);
        }
        Ok(())
    }

    fn do_deposit(env: &Env, id: u64, from: &Address, amount: i128) -> Result<(), Error> {
        if amount <= 0 {
            return Err(Error::ValueNotPositive);
        }
        let mut position = storage::get_position(env, id)?;
        position.require_open()?;
        position.collateral_balance = checked_add(position.collateral_balance, amount)?;
        storage::set_position(env, id, &position);
        Self::emit_update(env, id, &position);
        Self::pull(env, &position.collateral, from, amount);
        Ok(())
    }

    fn do_withdraw(env: &Env, id: u64, to: &Address, amount: i128) -> Result<(), Error> {
        if amount <= 0 {
            return Err(Error::ValueNotPositive);
        }
        let now = Self::now(env);
        let mut position = storage::get_position(env, id)?;
        position.require_not_hot(now)?;
        position.require_unchallenged()?;
        if amount > position.collateral_balance {
            return Err(Error::InsufficientCollateral);
        }
        position.accrue(now)?;
        let remaining = position.collateral_balance - amount;
        position.check_collateral(remaining, position.price)?;
        position.collateral_balance = remaining;
        position.close_if_drained();
        storage::set_position(env, id, &position);
        Self::emit_update(env, id, &position);
        Self::push(env, &position.collateral, to, amount);
        Ok(())
    }

    /// Route auction or forced sale proceeds. Debt retired by the sale is burned; a
    /// surplus goes to the owner (minus the reserve share as profit when
    /// `share_surplus`), a shortfall is covered by the reserve.
    #[allow(clippy::too_many_arguments)]
    fn settle(
        env: &Env,
        state: &HubStorage,
        owner: &Address,
        funds: i128,
        principal: i128,
        interest: i128,
        reserve_ppm: u32,
        share_surplus: bool,
    ) -> Result<(), Error> {
        let hub = env.current_contract_address();
        let ledger = Self::ledger(env, state);
        let owed = checked_add(principal, interest)?;
        if funds > owed {
            let surplus = funds - owed;
            let profits = if share_surplus {
                mul_div(surplus, i128::from(reserve_ppm), PPM)?
            } else {
                0
            };
            if profits + interest > 0 {
                ledger.collect_profits(&hub, &hub, &(profits + interest));
            }
            Self::push(env, &state.ledger, owner, surplus - profits);
        } else {
            if owed > funds {
                log!(env, "sale proceeds short of debt", owed - funds);
                ledger.cover_loss(&hub, &hub, &(owed - funds));
            }
            if interest > 0 {
                ledger.collect_profits(&hub, &hub, &interest);
            }
        }
        if principal > 0 {
            ledger.burn_without_reserve(&hub, &principal, &reserve_ppm);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn avert(
        env: &Env,
        state: &HubStorage,
        index: u32,
        mut challenge: Challenge,
        mut position: Position,
        bidder: Address,
        challenger: Address,
        size: i128,
    ) -> Result<(), Error> {
        let now = Self::now(env);
        if now == challenge.start {
            return Err(Error::AvertTooEarly);
        }
        challenge.size -= size;
        if challenge.size == 0 {
            challenge.challenger = None;
        }
        position.challenged_amount = (position.challenged_amount - size).max(0);
        position.cooldown = position.cooldown.max(now.saturating_add(state.config.avert_cooldown));
        storage::set_challenge(env, index, &challenge);
        storage::set_position(env, challenge.position, &position);
        ChallengeAverted {
            position: challenge.position,
            index,
            size,
        }
        .publish(env);

        if bidder != challenger {
            let cost = value_of(size, challenge.liq_price)?;
            if cost > 0 {
                TokenClient::new(env, &state.ledger).transfer(&bidder, &challenger, &cost);
            }
        }
        Self::push(env, &position.collateral, &bidder, size);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn succeed(
        env: &Env,
        state: &HubStorage,
        index: u32,
        mut challenge: Challenge,
        mut position: Position,
        bidder: Address,
        challenger: Address,
        size: i128,
        postpone_collateral_return: bool,
    ) -> Result<(), Error> {
        let now = Self::now(env);
        let config = &state.config;
        challenge.size -= size;
        if challenge.size == 0 {
            challenge.challenger = None;
        }

        position.accrue(now)?;
        position.challenged_amount = (position.challenged_amount - size).max(0);
        // the challenge may be larger than what is left after withdrawals or other bids
        let taken = size.min(position.collateral_balance);
        let (principal, interest) = position.retire_share(taken)?;
        position.cooldown = position.cooldown.max(now.saturating_add(config.success_cooldown));
        position.close_if_drained();
        if principal > 0 {
            let mut family = storage::get_family(env, position.original)?;
            family.remove_minted(principal);
            storage::set_family(env, position.original, &family);
        }

        let price = math::auction_price(
            now,
            challenge.start,
            position.challenge_period,
            challenge.liq_price,
        )?;
        let offer = value_of(taken, price)?;
        let reward = mul_div(offer, i128::from(config.challenger_reward_ppm), PPM)?;

        storage::set_challenge(env, index, &challenge);
        storage::set_position(env, challenge.position, &position);
        if postpone_collateral_return {
            let pending = storage::get_pending_return(env, &position.collateral, &challenger);
            storage::set_pending_return(
                env,
                &position.collateral,
                &challenger,
                checked_add(pending, size)?,
            );
            PostponedReturn {
                collateral: position.collateral.clone(),
                beneficiary: challenger.clone(),
                amount: size,
            }
            .publish(env);
        }
        ChallengeSucceeded {
            position: challenge.position,
            index,
            bid: offer,
            acquired_collateral: taken,
            challenge_size: size,
        }
        .publish(env);
        Self::emit_update(env, challenge.position, &position);

        if !postpone_collateral_return {
            Self::push(env, &position.collateral, &challenger, size);
        }
        Self::pull(env, &state.ledger, &bidder, offer);
        Self::push(env, &state.ledger, &challenger, reward);
        Self::settle(
            env,
            state,
            &position.owner,
            offer - reward,
            principal,
            interest,
            position.reserve_ppm,
            true,
        )?;
        Self::push(env, &position.collateral, &bidder, taken);
        Ok(())
    }

    fn forced_sale_price(
        config: &HubConfig,
        position: &Position,
        now: u64,
    ) -> Result<i128, Error> {
        math::expired_purchase_price(
            now.saturating_sub(position.expiration),
            position.challenge_period,
            position.virtual_price_at(now)?,
            config.expired_price_factor,
            config.expired_tail_periods,
        )
    }
}

#[contractimpl]
impl IsPosition for MintingHubContract {
    fn mint(
        env: &Env,
        caller: Address,
        position: u64,
        to: Address,
        amount: i128,
    ) -> Result<i128, Error> {
        caller.require_auth();
        let state = HubStorage::get_state(env);
        let record = storage::get_position(env, position)?;
        Self::require_owner_or_roller(&state, &record, &caller)?;
        Self::do_mint(env, &state, position, &to, amount)
    }

    fn repay(env: &Env, caller: Address, position: u64, amount: i128) -> Result<i128, Error> {
        caller.require_auth();
        let state = HubStorage::get_state(env);
        Self::do_repay(env, &state, position, &caller, amount)
    }

    fn repay_full(env: &Env, caller: Address, position: u64) -> Result<i128, Error> {
        caller.require_auth();
        let state = HubStorage::get_state(env);
        let debt = storage::get_position(env, position)?.debt_at(Self::now(env))?;
        if debt == 0 {
            return Ok(0);
        }
        Self::do_repay(env, &state, position, &caller, debt)
    }

    fn adjust_price(
        env: &Env,
        caller: Address,
        position: u64,
        new_price: i128,
    ) -> Result<(), Error> {
        caller.require_auth();
        storage::get_position(env, position)?.require_owner(&caller)?;
        let state = HubStorage::get_state(env);
        Self::do_set_price(env, &state, position, new_price, None)
    }

    fn adjust_price_with_reference(
        env: &Env,
        caller: Address,
        position: u64,
        new_price: i128,
        reference: u64,
    ) -> Result<(), Error> {
        caller.require_auth();
        storage::get_position(env, position)?.require_owner(&caller)?;
        let state = HubStorage::get_state(env);
        Self::do_set_price(env, &state, position, new_price, Some(reference))
    }

    fn adjust(
        env: &Env,
        caller: Address,
        position: u64,
        new_principal: i128,
        new_collateral: i128,
        new_price: i128,
    ) -> Result<(), Error> {
        caller.require_auth();
        if new_principal < 0 || new_collateral < 0 {
            return Err(Error::ValueNotPositive);
        }
        let state = HubStorage::get_state(env);
        let record = storage::get_position(env, position)?;
        record.require_owner(&caller)?;
        let balance = record.collateral_balance;

        // deposit first so that it backs the rest of the adjustment
        if new_collateral > balance {
            Self::do_deposit(env, position, &caller, new_collateral - balance)?;
        }
        if new_principal < record.principal {
            let interest = record.interest_at(Self::now(env))?;
            let amount = checked_add(interest, record.principal - new_principal)?;
            Self::do_repay(env, &state, position, &caller, amount)?;
        }
        if new_price != record.price {
            Self::do_set_price(env, &state, position, new_price, None)?;
        }
        if new_principal > record.principal {
            Self::do_mint(env, &state, position, &caller, new_principal - record.principal)?;
        }
        // withdraw last, once the new debt and price are in place
        if new_collateral < balance {
            Self::do_withdraw(env, position, &caller, balance - new_collateral)?;
        }
        Ok(())
    }

    fn add_collateral(
        env: &Env,
        caller: Address,
        position: u64,
        amount: i128,
    ) -> Result<(), Error> {
        caller.require_auth();
        Self::do_deposit(env, position, &caller, amount)
    }

    fn withdraw_collateral(
        env: &Env,
        caller: Address,
        position: u64,
        to: Address,
        amount: i128,
    ) -> Result<(), Error> {
        caller.require_auth();
        let state = HubStorage::get_state(env);
        let record = storage::get_position(env, position)?;
        Self::require_owner_or_roller(&state, &record, &caller)?;
        Self::do_withdraw(env, position, &to, amount)
    }

    fn deny(env: &Env, caller: Address, position: u64, message: String) -> Result<(), Error> {
        caller.require_auth();
        let mut record = storage::get_position(env, position)?;
        record.require_owner(&caller)?;
        record.require_open()?;
        if Self::now(env) >= record.start {
            return Err(Error::TooLate);
        }
        if !storage::challenges_of(env, position).is_empty() {
            return Err(Error::Challenged);
        }
        let returned = record.collateral_balance;
        record.collateral_balance = 0;
        record.closed = true;
        storage::set_position(env, position, &record);
        PositionDenied {
            position,
            sender: caller,
            message,
        }
        .publish(env);
        Self::emit_update(env, position, &record);
        Self::push(env, &record.collateral, &record.owner, returned);
        Ok(())
    }

    fn transfer_ownership(
        env: &Env,
        caller: Address,
        position: u64,
        new_owner: Address,
    ) -> Result<(), Error> {
        caller.require_auth();
        let mut record = storage::get_position(env, position)?;
        record.require_owner(&caller)?;
        record.owner = new_owner.clone();
        storage::set_position(env, position, &record);
        OwnershipTransferred {
            position,
            previous_owner: caller,
            new_owner,
        }
        .publish(env);
        Ok(())
    }

    fn position(env: &Env, position: u64) -> Result<PositionView, Error> {
        let record = storage::get_position(env, position)?;
        Self::view(env, position, &record)
    }

    fn debt(env: &Env, position: u64) -> Result<i128, Error> {
        storage::get_position(env, position)?.debt_at(Self::now(env))
    }

    fn interest(env: &Env, position: u64) -> Result<i128, Error> {
        storage::get_position(env, position)?.interest_at(Self::now(env))
    }

    fn virtual_price(env: &Env, position: u64) -> Result<i128, Error> {
        storage::get_position(env, position)?.virtual_price_at(Self::now(env))
    }

    fn available_for_minting(env: &Env, position: u64) -> Result<i128, Error> {
        let record = storage::get_position(env, position)?;
        Self::available_for(env, position, &record, Self::now(env))
    }

    fn usable_mint(env: &Env, position: u64, amount: i128) -> Result<i128, Error> {
        storage::get_position(env, position)?.usable_mint(amount)
    }

    fn mint_amount_for_usable(env: &Env, position: u64, usable: i128) -> Result<i128, Error> {
        storage::get_position(env, position)?.mint_amount_for_usable(usable)
    }

    fn repay_amount_for(env: &Env, position: u64, net: i128) -> Result<i128, Error> {
        if net <= 0 {
            return Ok(0);
        }
        let record = storage::get_position(env, position)?;
        let interest = record.interest_at(Self::now(env))?;
        if net <= interest {
            return Ok(net);
        }
        let state = HubStorage::get_state(env);
        let principal = Self::ledger(env, &state)
            .calculate_freed_amount(&(net - interest), &record.reserve_ppm)
            .min(record.principal);
        checked_add(interest, principal)
    }
}

#[contractimpl]
impl IsMintingHub for MintingHubContract {
    fn open_position(
        env: &Env,
        owner: Address,
        collateral: Address,
        terms: PositionTerms,
    ) -> Result<u64, Error> {
        owner.require_auth();
        let mut state = HubStorage::get_state(env);
        let config = state.config.clone();
        if terms.minimum_collateral <= 0
            || terms.limit <= 0
            || terms.liquidation_price <= 0
            || terms.duration == 0
        {
            return Err(Error::ValueNotPositive);
        }
        if i128::from(terms.risk_premium_ppm) > PPM {
            return Err(Error::InvalidRiskPremium);
        }
        if i128::from(terms.reserve_ppm) > PPM
            || terms.reserve_ppm < config.challenger_reward_ppm
        {
            return Err(Error::InvalidReservePPM);
        }
        let token = TokenClient::new(env, &collateral);
        if token.decimals() > MAX_COLLATERAL_DECIMALS {
            return Err(Error::InvalidCollateralDecimals);
        }
        if terms.challenge_period < config.min_challenge_period {
            return Err(Error::ChallengeTimeTooShort);
        }
        if terms.init_period < config.min_init_period {
            return Err(Error::InitPeriodTooShort);
        }
        // the auction of a challenge opened at expiration must end at a representable time
        let expiration = Self::now(env)
            .checked_add(terms.init_period)
            .and_then(|start| start.checked_add(terms.duration));
        let auction = terms.challenge_period.checked_mul(2);
        if expiration.zip(auction).and_then(|(a, b)| a.checked_add(b)).is_none() {
            return Err(Error::PeriodTooLong);
        }
        Self::probe_collateral(env, &token, &owner)?;
        if terms.initial_collateral < terms.minimum_collateral {
            return Err(Error::InsufficientCollateral);
        }
        let Some(min_value) = config.min_opening_value.checked_mul(ONE) else {
            return Err(Error::ArithmeticError);
        };
        let Some(opening_value) = terms.minimum_collateral.checked_mul(terms.liquidation_price)
        else {
            return Err(Error::ArithmeticError);
        };
        if opening_value < min_value {
            return Err(Error::InsufficientCollateral);
        }
        let Some(initial_value) = terms.initial_collateral.checked_mul(terms.liquidation_price)
        else {
            return Err(Error::ArithmeticError);
        };
        let Some(limit_value) = terms.limit.checked_mul(ONE) else {
            return Err(Error::ArithmeticError);
        };
        if initial_value > limit_value {
            return Err(Error::PriceTooHigh);
        }

        let rate = Self::lead_rate(env, &state);
        let (id, position) = PositionFactory::create_original(
            env,
            &mut state,
            owner.clone(),
            collateral.clone(),
            &terms,
            rate,
        )?;
        storage::set_position(env, id, &position);
        storage::register_collateral_asset(env, &collateral);
        HubStorage::set_state(env, &state);
        PositionOpened {
            owner: owner.clone(),
            position: id,
            original: id,
            collateral: collateral.clone(),
        }
        .publish(env);
        Self::emit_update(env, id, &position);

        if config.opening_fee > 0 {
            Self::ledger(env, &state).collect_profits(
                &env.current_contract_address(),
                &owner,
                &config.opening_fee,
            );
        }
        Self::pull(env, &collateral, &owner, terms.initial_collateral);
        Ok(id)
    }

    fn clone_position(
        env: &Env,
        caller: Address,
        owner: Address,
        parent: u64,
        initial_collateral: i128,
        initial_mint: i128,
        expiration: u64,
    ) -> Result<u64, Error> {
        caller.require_auth();
        if initial_mint < 0 {
            return Err(Error::ValueNotPositive);
        }
        let now = Self::now(env);
        let mut state = HubStorage::get_state(env);
        let parent_record = storage::get_position(env, parent)?;
        parent_record.require_open()?;
        parent_record.require_alive(now)?;
        parent_record.require_unchallenged()?;
        parent_record.require_not_hot(now)?;
        if initial_collateral < parent_record.minimum_collateral {
            return Err(Error::InsufficientCollateral);
        }

        let rate = Self::lead_rate(env, &state);
        let (id, mut position) = PositionFactory::create_clone(
            env,
            &mut state,
            &parent_record,
            owner.clone(),
            initial_collateral,
            expiration,
            rate,
        )?;
        if initial_mint > 0 {
            if initial_mint > Self::available_for(env, id, &position, now)? {
                return Err(Error::LimitExceeded);
            }
            position.principal = initial_mint;
            let mut family = storage::get_family(env, position.original)?;
            family.add_minted(initial_mint)?;
            storage::set_family(env, position.original, &family);
        }
        position.check_collateral(position.collateral_balance, position.price)?;
        storage::set_position(env, id, &position);
        HubStorage::set_state(env, &state);
        PositionOpened {
            owner: owner.clone(),
            position: id,
            original: position.original,
            collateral: position.collateral.clone(),
        }
        .publish(env);
        Self::emit_update(env, id, &position);

        Self::pull(env, &position.collateral, &caller, initial_collateral);
        if initial_mint > 0 {
            Self::ledger(env, &state).mint_with_reserve(
                &env.current_contract_address(),
                &owner,
                &initial_mint,
                &position.reserve_ppm,
            );
        }
        Ok(id)
    }

    fn challenge(
        env: &Env,
        challenger: Address,
        position: u64,
        amount: i128,
        expected_price: i128,
    ) -> Result<u32, Error> {
        challenger.require_auth();
        if amount <= 0 {
            return Err(Error::ChallengeTooSmall);
        }
        let now = Self::now(env);
        let mut state = HubStorage::get_state(env);
        let mut record = storage::get_position(env, position)?;
        record.require_open()?;
        record.require_alive(now)?;
        if amount < record.minimum_collateral && amount < record.collateral_balance {
            return Err(Error::ChallengeTooSmall);
        }
        let liq_price = record.virtual_price_at(now)?;
        if liq_price < expected_price {
            return Err(Error::UnexpectedPrice);
        }

        let index = state.challenge_count;
        let Some(next) = index.checked_add(1) else {
            return Err(Error::ArithmeticError);
        };
        state.challenge_count = next;
        record.challenged_amount = checked_add(record.challenged_amount, amount)?;
        storage::set_challenge(
            env,
            index,
            &Challenge {
                challenger: Some(challenger.clone()),
                position,
                start: now,
                size: amount,
                liq_price,
            },
        );
        storage::push_position_challenge(env, position, index);
        storage::set_position(env, position, &record);
        HubStorage::set_state(env, &state);
        ChallengeStarted {
            challenger: challenger.clone(),
            position,
            size: amount,
            index,
        }
        .publish(env);

        Self::pull(env, &record.collateral, &challenger, amount);
        Ok(index)
    }

    fn bid(
        env: &Env,
        bidder: Address,
        index: u32,
        size: i128,
        postpone_collateral_return: bool,
    ) -> Result<(), Error> {
        bidder.require_auth();
        if size <= 0 {
            return Err(Error::ValueNotPositive);
        }
        let state = HubStorage::get_state(env);
        let challenge = storage::get_challenge(env, index)?;
        let Some(challenger) = challenge.challenger.clone() else {
            return Err(Error::InvalidChallenge);
        };
        let position = storage::get_position(env, challenge.position)?;
        let size = size.min(challenge.size);
        let remainder = challenge.size - size;
        if remainder > 0 && remainder < position.minimum_collateral {
            return Err(Error::LeaveNoDust);
        }

        if Self::now(env) <= challenge.start.saturating_add(position.challenge_period) {
            Self::avert(env, &state, index, challenge, position, bidder, challenger, size)
        } else {
            Self::succeed(
                env,
                &state,
                index,
                challenge,
                position,
                bidder,
                challenger,
                size,
                postpone_collateral_return,
            )
        }
    }

    fn return_postponed_collateral(
        env: &Env,
        owner: Address,
        collateral: Address,
        target: Address,
    ) -> Result<i128, Error> {
        owner.require_auth();
        let amount = storage::get_pending_return(env, &collateral, &owner);
        if amount == 0 {
            return Ok(0);
        }
        storage::set_pending_return(env, &collateral, &owner, 0);
        Self::push(env, &collateral, &target, amount);
        Ok(amount)
    }

    fn buy_expired_collateral(
        env: &Env,
        buyer: Address,
        position: u64,
        up_to: i128,
    ) -> Result<i128, Error> {
        buyer.require_auth();
        if up_to <= 0 {
            return Err(Error::ValueNotPositive);
        }
        let now = Self::now(env);
        let state = HubStorage::get_state(env);
        let mut record = storage::get_position(env, position)?;
        record.require_open()?;
        if !record.is_expired(now) {
            return Err(Error::Alive);
        }
        record.require_unchallenged()?;

        let max = record.collateral_balance;
        let amount = up_to.min(max);
        let price = Self::forced_sale_price(&state.config, &record, now)?;
        let remainder = max - amount;
        if remainder > 0 && value_of(remainder, price)? < state.config.min_remainder_value {
            return Err(Error::LeaveNoDust);
        }
        let cost = value_of(amount, price)?;

        record.accrue(now)?;
        let (principal, interest) = record.retire_share(amount)?;
        record.close_if_drained();
        if principal > 0 {
            let mut family = storage::get_family(env, record.original)?;
            family.remove_minted(principal);
            storage::set_family(env, record.original, &family);
        }
        storage::set_position(env, position, &record);
        ForcedSale {
            position,
            amount,
            price_per_unit: price,
        }
        .publish(env);
        Self::emit_update(env, position, &record);

        Self::pull(env, &state.ledger, &buyer, cost);
        Self::settle(
            env,
            &state,
            &record.owner,
            cost,
            principal,
            interest,
            record.reserve_ppm,
            false,
        )?;
        Self::push(env, &record.collateral, &buyer, amount);
        Ok(amount)
    }

    fn price(env: &Env, index: u32) -> Result<i128, Error> {
        let challenge = storage::get_challenge(env, index)?;
        let position = storage::get_position(env, challenge.position)?;
        math::auction_price(
            Self::now(env),
            challenge.start,
            position.challenge_period,
            challenge.liq_price,
        )
    }

    fn expired_purchase_price(env: &Env, position: u64) -> Result<i128, Error> {
        let record = storage::get_position(env, position)?;
        Self::forced_sale_price(&HubStorage::get_state(env).config, &record, Self::now(env))
    }

    fn get_challenge(env: &Env, index: u32) -> Result<Challenge, Error> {
        storage::get_challenge(env, index)
    }

    fn challenges_of(env: &Env, position: u64) -> Vec<u32> {
        storage::challenges_of(env, position)
    }

    fn pending_return(env: &Env, collateral: Address, owner: Address) -> i128 {
        storage::get_pending_return(env, &collateral, &owner)
    }

    fn config(env: &Env) -> HubConfig {
        HubStorage::get_state(env).config
    }

    fn position_count(env: &Env) -> u64 {
        HubStorage::get_state(env).position_count
    }

    fn challenge_count(env: &Env) -> u32 {
        HubStorage::get_state(env).challenge_count
    }
}
