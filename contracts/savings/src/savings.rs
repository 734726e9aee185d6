use soroban_sdk::{
    Address, BytesN, Env, Symbol, contract, contractimpl, contracttype, log, symbol_short,
    token::TokenClient,
};

use crate::{
    Error,
    index_types::{InterestCollected, RateChanged, RateProposed, Saved, Withdrawn},
    interfaces::StableLedgerClient,
    leadrate::IsLeadrate,
    storage::{Account, DataKey},
};

const SECONDS_PER_YEAR: u64 = 31_536_000; // 365 days
const PPM: u32 = 1_000_000;
/// Waiting period between proposing and applying a rate change
const RATE_CHANGE_DELAY: u64 = 7 * 24 * 60 * 60;
/// Fresh deposits only start earning after this period
const INTEREST_DELAY: u64 = 3 * 24 * 60 * 60;

const ADMIN_KEY: Symbol = symbol_short!("ADMIN");

// Instance storage
const STORAGE: Symbol = symbol_short!("STORAGE");

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SavingsStorage {
    /// Stable unit ledger that pays the interest
    ledger: Address,
    current_rate_ppm: u32,
    next_rate_ppm: u32,
    next_change: u64,
    /// Accumulator value at `anchor_time`
    anchor_ticks: u64,
    /// Time of the last applied rate change
    anchor_time: u64,
}

impl SavingsStorage {
    fn get_state(env: &Env) -> SavingsStorage {
        env.storage()
            .instance()
            .get(&STORAGE)
            .unwrap_or_else(|| panic!("contract not initialized"))
    }

    fn set_state(env: &Env, storage: &SavingsStorage) {
        env.storage().instance().set(&STORAGE, storage);
    }

    fn get_account(env: &Env, owner: &Address) -> Account {
        env.storage()
            .persistent()
            .get(&DataKey::Account(owner.clone()))
            .unwrap_or_default()
    }

    fn set_account(env: &Env, owner: &Address, account: &Account) {
        let key = DataKey::Account(owner.clone());
        env.storage().persistent().set(&key, account);
        let ttl = env.storage().max_ttl();
        env.storage().persistent().extend_ttl(&key, ttl, ttl);
    }
}

#[contract]
pub struct SavingsContract;

#[contractimpl]
impl SavingsContract {
    pub fn __constructor(
        env: &Env,
        admin: Address,
        ledger: Address,
        rate_ppm: u32,
    ) -> Result<(), Error> {
        if rate_ppm > PPM {
            return Err(Error::InvalidRate);
        }
        Self::set_admin(env, &admin);
        SavingsStorage::set_state(
            env,
            &SavingsStorage {
                ledger,
                current_rate_ppm: rate_ppm,
                next_rate_ppm: rate_ppm,
                next_change: env.ledger().timestamp(),
                anchor_ticks: 0,
                anchor_time: env.ledger().timestamp(),
            },
        );
        Ok(())
    }

    /// Upgrade the contract to new wasm. Admin-only.
    pub fn upgrade(env: &Env, new_wasm_hash: BytesN<32>) {
        Self::require_admin(env);
        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }

    fn admin(env: &Env) -> Option<Address> {
        env.storage().instance().get(&ADMIN_KEY)
    }

    fn set_admin(env: &Env, admin: &Address) {
        if env.storage().instance().has(&ADMIN_KEY) {
            panic!("admin already set");
        }
        env.storage().instance().set(&ADMIN_KEY, admin);
    }

    fn require_admin(env: &Env) -> Address {
        let Some(admin) = Self::admin(env) else {
            panic!("admin not set");
        };
        admin.require_auth();
        admin
    }

    pub fn ledger(env: &Env) -> Address {
        SavingsStorage::get_state(env).ledger
    }

    pub fn account(env: &Env, owner: Address) -> Account {
        SavingsStorage::get_account(env, &owner)
    }

    /// Interest the account would receive if it were refreshed now.
    pub fn accrued_interest(env: &Env, owner: Address) -> Result<i128, Error> {
        let account = SavingsStorage::get_account(env, &owner);
        Self::calculate_interest(env, &account, Self::current_ticks(env))
    }

    /// Deposit `amount` stable units. Interest on the deposit starts after a delay.
    pub fn save(env: &Env, owner: Address, amount: i128) -> Result<(), Error> {
        owner.require_auth();
        if amount <= 0 {
            return Err(Error::ValueNotPositive);
        }
        let state = SavingsStorage::get_state(env);
        let now = env.ledger().timestamp();
        if state.current_rate_ppm == 0
            || (state.next_rate_ppm == 0 && state.next_change <= now)
        {
            return Err(Error::ModuleDisabled);
        }

        let mut account = Self::refresh(env, &owner)?;
        let Some(delayed_ticks) = u64::from(state.current_rate_ppm)
            .checked_mul(INTEREST_DELAY)
            .and_then(|delay| delay.checked_add(Self::current_ticks(env)))
        else {
            return Err(Error::ArithmeticError);
        };
        let Some(new_saved) = account.saved.checked_add(amount) else {
            return Err(Error::ArithmeticError);
        };
        // weighted average of the existing and the delayed tick snapshot
        let weighted = account
            .saved
            .checked_mul(i128::from(account.ticks))
            .zip(amount.checked_mul(i128::from(delayed_ticks)))
            .and_then(|(a, b)| a.checked_add(b))
            .map(|sum| sum / new_saved);
        let Some(weighted) = weighted else {
            return Err(Error::ArithmeticError);
        };
        account.saved = new_saved;
        account.ticks = weighted as u64;
        SavingsStorage::set_account(env, &owner, &account);

        TokenClient::new(env, &state.ledger).transfer(
            &owner,
            env.current_contract_address(),
            &amount,
        );
        Saved {
            account: owner,
            amount,
        }
        .publish(env);
        Ok(())
    }

    /// Withdraw up to `amount` to `target`. Returns the amount actually withdrawn.
    pub fn withdraw(
        env: &Env,
        owner: Address,
        target: Address,
        amount: i128,
    ) -> Result<i128, Error> {
        owner.require_auth();
        if amount <= 0 {
            return Err(Error::ValueNotPositive);
        }
        let mut account = Self::refresh(env, &owner)?;
        let withdrawn = amount.min(account.saved);
        if withdrawn == 0 {
            return Ok(0);
        }
        account.saved -= withdrawn;
        SavingsStorage::set_account(env, &owner, &account);

        let ledger = SavingsStorage::get_state(env).ledger;
        TokenClient::new(env, &ledger).transfer(
            &env.current_contract_address(),
            &target,
            &withdrawn,
        );
        Withdrawn {
            account: owner,
            amount: withdrawn,
        }
        .publish(env);
        Ok(withdrawn)
    }

    /// Save or withdraw so that the account ends up holding `target_amount`.
    pub fn adjust(env: &Env, owner: Address, target_amount: i128) -> Result<(), Error> {
        let account = Self::refresh(env, &owner)?;
        if account.saved < target_amount {
            Self::save(env, owner, target_amount - account.saved)
        } else if account.saved > target_amount {
            Self::withdraw(env, owner.clone(), owner, account.saved - target_amount).map(|_| ())
        } else {
            Ok(())
        }
    }

    /// Credit accrued interest to the account and return the new balance.
    pub fn refresh_balance(env: &Env, owner: Address) -> Result<i128, Error> {
        Ok(Self::refresh(env, &owner)?.saved)
    }

    fn refresh(env: &Env, owner: &Address) -> Result<Account, Error> {
        let mut account = SavingsStorage::get_account(env, owner);
        let ticks = Self::current_ticks(env);
        if ticks <= account.ticks {
            return Ok(account);
        }
        let interest = Self::calculate_interest(env, &account, ticks)?;
        let Some(saved) = account.saved.checked_add(interest) else {
            return Err(Error::ArithmeticError);
        };
        account.saved = saved;
        account.ticks = ticks;
        SavingsStorage::set_account(env, owner, &account);

        if interest > 0 {
            let contract = env.current_contract_address();
            StableLedgerClient::new(env, &SavingsStorage::get_state(env).ledger)
                .distribute_profits(&contract, &contract, &interest);
            InterestCollected {
                account: owner.clone(),
                interest,
            }
            .publish(env);
        }
        Ok(account)
    }

    fn calculate_interest(env: &Env, account: &Account, ticks: u64) -> Result<i128, Error> {
        if ticks <= account.ticks || account.saved == 0 {
            return Ok(0);
        }
        let delta = i128::from(ticks - account.ticks);
        let Some(earned) = delta.checked_mul(account.saved) else {
            return Err(Error::ArithmeticError);
        };
        let interest = earned / i128::from(PPM) / i128::from(SECONDS_PER_YEAR);
        let equity =
            StableLedgerClient::new(env, &SavingsStorage::get_state(env).ledger).equity();
        if interest > equity {
            log!(env, "savings interest capped by equity", interest, equity);
            return Ok(equity.max(0));
        }
        Ok(interest)
    }
}

#[contractimpl]
impl IsLeadrate for SavingsContract {
    fn current_rate_ppm(env: &Env) -> u32 {
        SavingsStorage::get_state(env).current_rate_ppm
    }

    fn next_rate_ppm(env: &Env) -> u32 {
        SavingsStorage::get_state(env).next_rate_ppm
    }

    fn next_change(env: &Env) -> u64 {
        SavingsStorage::get_state(env).next_change
    }

    fn propose_change(env: &Env, new_rate_ppm: u32) -> Result<(), Error> {
        let admin = Self::require_admin(env);
        if new_rate_ppm > PPM {
            return Err(Error::InvalidRate);
        }
        let mut state = SavingsStorage::get_state(env);
        state.next_rate_ppm = new_rate_ppm;
        state.next_change = env.ledger().timestamp() + RATE_CHANGE_DELAY;
        SavingsStorage::set_state(env, &state);
        RateProposed {
            who: admin,
            next_rate_ppm: new_rate_ppm,
            next_change: state.next_change,
        }
        .publish(env);
        Ok(())
    }

    fn apply_change(env: &Env) -> Result<(), Error> {
        let mut state = SavingsStorage::get_state(env);
        if state.current_rate_ppm == state.next_rate_ppm {
            return Err(Error::NoPendingChange);
        }
        let now = env.ledger().timestamp();
        if now < state.next_change {
            return Err(Error::ChangeNotReady);
        }
        state.anchor_ticks = Self::ticks(env, now);
        state.anchor_time = now;
        state.current_rate_ppm = state.next_rate_ppm;
        SavingsStorage::set_state(env, &state);
        RateChanged {
            new_rate_ppm: state.current_rate_ppm,
        }
        .publish(env);
        Ok(())
    }

    fn current_ticks(env: &Env) -> u64 {
        Self::ticks(env, env.ledger().timestamp())
    }

    fn ticks(env: &Env, timestamp: u64) -> u64 {
        let state = SavingsStorage::get_state(env);
        let elapsed = timestamp.saturating_sub(state.anchor_time);
        state
            .anchor_ticks
            .saturating_add(elapsed.saturating_mul(u64::from(state.current_rate_ppm)))
    }
}
