use soroban_sdk::{
    self, Address, BytesN, Env, MuxedAddress, String, assert_with_error, contract, contractimpl,
    log, panic_with_error, token::TokenInterface,
};

use crate::{
    Error,
    index_types::{Burn, Loss, Mint, MinterUpdate, Profit, ProfitDistributed},
    minting::IsMinterLedger,
    storage::{ADMIN_KEY, AllowanceEntry, AllowanceKey, DataKey, StableTokenStorage},
};

const VERSION_STRING: &str = concat!(
    env!("CARGO_PKG_VERSION_MAJOR"),
    ".",
    env!("CARGO_PKG_VERSION_MINOR"),
    ".",
    env!("CARGO_PKG_VERSION_PATCH")
);

/// Parts per million
const PPM: i128 = 1_000_000;

fn assert_positive(env: &Env, value: i128) {
    assert_with_error!(env, value >= 0, Error::ValueNotPositive);
}

fn check_ppm(reserve_ppm: u32) -> Result<i128, Error> {
    let ppm = i128::from(reserve_ppm);
    if ppm > PPM {
        return Err(Error::InvalidReservePPM);
    }
    Ok(ppm)
}

#[contract]
pub struct StableTokenContract;

#[contractimpl]
impl StableTokenContract {
    pub fn __constructor(env: &Env, admin: Address, name: String, symbol: String, decimals: u32) {
        Self::set_admin(env, &admin);
        StableTokenStorage::set_state(
            env,
            &StableTokenStorage {
                name,
                symbol,
                decimals,
                minter_reserve_e6: 0,
            },
        );
    }

    /// Upgrade the contract to new wasm. Admin-only.
    pub fn upgrade(env: &Env, new_wasm_hash: BytesN<32>) {
        Self::require_admin(env);
        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }

    /// Report the version of this contract
    pub fn version(env: &Env) -> String {
        String::from_str(env, VERSION_STRING)
    }

    /// Get the admin address
    pub fn admin(env: &Env) -> Option<Address> {
        env.storage().instance().get(&ADMIN_KEY)
    }

    /// Set the admin address. Can only be called once.
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

    /// Register a minter. Admin-only.
    pub fn add_minter(env: &Env, minter: Address) -> Result<(), Error> {
        Self::require_admin(env);
        if Self::is_minter(env, minter.clone()) {
            return Err(Error::MinterAlreadyRegistered);
        }
        Self::set_and_extend_minter(env, &minter, true);
        Ok(())
    }

    /// Deregister a minter. Admin-only.
    pub fn remove_minter(env: &Env, minter: Address) -> Result<(), Error> {
        Self::require_admin(env);
        if !Self::is_minter(env, minter.clone()) {
            return Err(Error::NotMinter);
        }
        Self::set_and_extend_minter(env, &minter, false);
        Ok(())
    }

    fn set_and_extend_minter(env: &Env, minter: &Address, registered: bool) {
        let key = DataKey::Minter(minter.clone());
        if registered {
            let max_ttl = env.storage().max_ttl();
            env.storage().persistent().set(&key, &true);
            env.storage().persistent().extend_ttl(&key, max_ttl, max_ttl);
        } else {
            env.storage().persistent().remove(&key);
        }
        MinterUpdate {
            minter: minter.clone(),
            registered,
        }
        .publish(env);
    }

    fn require_minter(env: &Env, minter: &Address) -> Result<(), Error> {
        minter.require_auth();
        if !Self::is_minter(env, minter.clone()) {
            return Err(Error::NotMinter);
        }
        Ok(())
    }

    /// Increase the allowance that one address can spend on behalf of another address.
    pub fn increase_allowance(env: &Env, from: Address, spender: Address, amount: i128) {
        from.require_auth();
        assert_positive(env, amount);
        let current_allowance = Self::allowance(env.clone(), from.clone(), spender.clone());
        let Some(new_amount) = current_allowance.checked_add(amount) else {
            panic_with_error!(env, Error::ArithmeticError);
        };
        let current_ledger = env.ledger().sequence();
        Self::set_and_extend_allowance(env, from, spender, new_amount, current_ledger + 1000);
    }

    /// Decrease the allowance that one address can spend on behalf of another address.
    pub fn decrease_allowance(env: &Env, from: Address, spender: Address, amount: i128) {
        from.require_auth();
        assert_positive(env, amount);
        let current_allowance = Self::allowance(env.clone(), from.clone(), spender.clone());
        let new_amount = current_allowance.checked_sub(amount).unwrap_or(0);
        assert_positive(env, new_amount);
        let current_ledger = env.ledger().sequence();
        Self::set_and_extend_allowance(env, from, spender, new_amount, current_ledger + 1000);
    }

    fn set_and_extend_allowance(
        env: &Env,
        from: Address,
        spender: Address,
        amount: i128,
        live_until_ledger: u32,
    ) {
        assert_positive(env, amount);
        let current_ledger = env.ledger().sequence();
        assert_with_error!(
            env,
            live_until_ledger >= current_ledger,
            Error::InvalidLedgerSequence
        );
        let key = DataKey::Allowance(AllowanceKey(from, spender));
        let max_ttl = env.storage().max_ttl();
        env.storage().persistent().set(
            &key,
            &AllowanceEntry {
                amount,
                live_until_ledger,
            },
        );
        env.storage().persistent().extend_ttl(&key, max_ttl, max_ttl);
    }

    /// Internal form of decrease_allowance that does not require auth, keeping the expiry
    fn spend_allowance(env: &Env, from: Address, spender: Address, amount: i128) {
        let key = DataKey::Allowance(AllowanceKey(from.clone(), spender.clone()));
        let Some(allowance) = env.storage().persistent().get::<_, AllowanceEntry>(&key) else {
            panic_with_error!(env, Error::InsufficientAllowance);
        };
        let new_amount = allowance.amount.checked_sub(amount).unwrap_or(0);
        Self::set_and_extend_allowance(env, from, spender, new_amount, allowance.live_until_ledger);
    }

    fn write_balance(env: &Env, id: &Address, amount: i128) {
        let key = DataKey::Balance(id.clone());
        let ttl = env.storage().max_ttl();
        env.storage().persistent().set(&key, &amount);
        env.storage().persistent().extend_ttl(&key, ttl, ttl);
    }

    fn mint_internal(env: &Env, to: Address, amount: i128) {
        let balance = Self::balance(env.clone(), to.clone());
        let Some(new_balance) = balance.checked_add(amount) else {
            panic_with_error!(env, Error::ArithmeticError);
        };
        Self::write_balance(env, &to, new_balance);
        Mint { to, amount }.publish(env);
    }

    fn transfer_internal(env: &Env, from: Address, to: Address, amount: i128) {
        let Some(from_balance) = Self::balance(env.clone(), from.clone()).checked_sub(amount)
        else {
            panic_with_error!(env, Error::ArithmeticError);
        };
        assert_with_error!(env, from_balance >= 0, Error::InsufficientBalance);
        Self::write_balance(env, &from, from_balance);
        let Some(to_balance) = Self::balance(env.clone(), to.clone()).checked_add(amount) else {
            panic_with_error!(env, Error::ArithmeticError);
        };
        Self::write_balance(env, &to, to_balance);
    }

    fn burn_internal(env: &Env, from: Address, amount: i128) {
        let Some(new_balance) = Self::balance(env.clone(), from.clone()).checked_sub(amount)
        else {
            panic_with_error!(env, Error::ArithmeticError);
        };
        assert_with_error!(env, new_balance >= 0, Error::InsufficientBalance);
        Self::write_balance(env, &from, new_balance);
        Burn { from, amount }.publish(env);
    }

    /// Pay `amount` out of the reserve, minting whatever the reserve cannot cover.
    fn withdraw_from_reserve(env: &Env, recipient: &Address, amount: i128) {
        let reserve = env.current_contract_address();
        let reserve_left = Self::balance(env.clone(), reserve.clone());
        if reserve_left >= amount {
            Self::transfer_internal(env, reserve, recipient.clone(), amount);
        } else {
            if reserve_left > 0 {
                Self::transfer_internal(env, reserve, recipient.clone(), reserve_left);
            }
            log!(env, "reserve depleted, minting shortfall", amount - reserve_left);
            Self::mint_internal(env, recipient.clone(), amount - reserve_left);
        }
    }

    fn adjust_minter_reserve(env: &Env, delta_e6: i128) -> Result<(), Error> {
        let mut state = StableTokenStorage::get_state(env);
        let Some(updated) = state.minter_reserve_e6.checked_add(delta_e6) else {
            return Err(Error::ArithmeticError);
        };
        // Rounding in the reserve assignment can drive the counter slightly below zero
        state.minter_reserve_e6 = updated.max(0);
        StableTokenStorage::set_state(env, &state);
        Ok(())
    }
}

#[contractimpl]
impl TokenInterface for StableTokenContract {
    /// Return the allowance for `spender` to transfer from `from`.
    fn allowance(env: Env, from: Address, spender: Address) -> i128 {
        let allowance: Option<AllowanceEntry> = env
            .storage()
            .persistent()
            .get(&DataKey::Allowance(AllowanceKey(from, spender)));
        match allowance {
            Some(a) if env.ledger().sequence() <= a.live_until_ledger => a.amount,
            _ => 0,
        }
    }

    /// Set the allowance by `amount` for `spender` to transfer/burn from `from`
    fn approve(env: Env, from: Address, spender: Address, amount: i128, live_until_ledger: u32) {
        from.require_auth();
        Self::set_and_extend_allowance(&env, from, spender, amount, live_until_ledger);
    }

    /// Return the balance of `id`
    fn balance(env: Env, id: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Balance(id))
            .unwrap_or(0)
    }

    /// Transfer `amount` from `from` to `to`
    fn transfer(env: Env, from: Address, to: MuxedAddress, amount: i128) {
        from.require_auth();
        assert_with_error!(env, amount > 0, Error::ValueNotPositive);
        assert_with_error!(env, to.address() != from, Error::CannotTransferToSelf);
        let balance = Self::balance(env.clone(), from.clone());
        assert_with_error!(env, balance >= amount, Error::InsufficientBalance);
        Self::transfer_internal(&env, from, to.address(), amount);
    }

    /// Transfer `amount` from `from` to `to`, consuming the allowance of `spender`
    fn transfer_from(env: Env, spender: Address, from: Address, to: Address, amount: i128) {
        spender.require_auth();
        assert_with_error!(env, amount > 0, Error::ValueNotPositive);
        let allowance = Self::allowance(env.clone(), from.clone(), spender.clone());
        assert_with_error!(env, allowance >= amount, Error::InsufficientAllowance);
        assert_with_error!(
            env,
            Self::balance(env.clone(), from.clone()) >= amount,
            Error::InsufficientBalance
        );
        Self::transfer_internal(&env, from.clone(), to, amount);
        Self::spend_allowance(&env, from, spender, amount);
    }

    /// Burn `amount` from `from`
    fn burn(env: Env, from: Address, amount: i128) {
        from.require_auth();
        assert_with_error!(env, amount > 0, Error::ValueNotPositive);
        let balance = Self::balance(env.clone(), from.clone());
        assert_with_error!(env, balance >= amount, Error::InsufficientBalance);
        Self::burn_internal(&env, from, amount);
    }

    /// Burn `amount` from `from`, consuming the allowance of `spender`
    fn burn_from(env: Env, spender: Address, from: Address, amount: i128) {
        spender.require_auth();
        assert_with_error!(env, amount > 0, Error::ValueNotPositive);
        let allowance = Self::allowance(env.clone(), from.clone(), spender.clone());
        assert_with_error!(env, allowance >= amount, Error::InsufficientAllowance);
        let balance = Self::balance(env.clone(), from.clone());
        assert_with_error!(env, balance >= amount, Error::InsufficientBalance);
        Self::burn_internal(&env, from.clone(), amount);
        Self::spend_allowance(&env, from, spender, amount);
    }

    /// Return the number of decimals used to represent amounts of this token
    fn decimals(env: Env) -> u32 {
        StableTokenStorage::get_state(&env).decimals
    }

    /// Return the name for this token
    fn name(env: Env) -> String {
        StableTokenStorage::get_state(&env).name
    }

    /// Return the symbol for this token
    fn symbol(env: Env) -> String {
        StableTokenStorage::get_state(&env).symbol
    }
}

#[contractimpl]
impl IsMinterLedger for StableTokenContract {
    fn mint(env: &Env, minter: Address, to: Address, amount: i128) -> Result<(), Error> {
        Self::require_minter(env, &minter)?;
        assert_positive(env, amount);
        Self::mint_internal(env, to, amount);
        Ok(())
    }

    fn mint_with_reserve(
        env: &Env,
        minter: Address,
        to: Address,
        amount: i128,
        reserve_ppm: u32,
    ) -> Result<i128, Error> {
        Self::require_minter(env, &minter)?;
        assert_positive(env, amount);
        let ppm = check_ppm(reserve_ppm)?;
        let Some(reserve_e6) = amount.checked_mul(ppm) else {
            return Err(Error::ArithmeticError);
        };
        let Some(usable) = amount.checked_mul(PPM - ppm).map(|x| x / PPM) else {
            return Err(Error::ArithmeticError);
        };
        Self::adjust_minter_reserve(env, reserve_e6)?;
        if usable > 0 {
            Self::mint_internal(env, to, usable);
        }
        if amount > usable {
            Self::mint_internal(env, env.current_contract_address(), amount - usable);
        }
        Ok(usable)
    }

    fn burn_from_with_reserve(
        env: &Env,
        minter: Address,
        payer: Address,
        amount: i128,
        reserve_ppm: u32,
    ) -> Result<i128, Error> {
        Self::require_minter(env, &minter)?;
        assert_positive(env, amount);
        let ppm = check_ppm(reserve_ppm)?;
        let assigned = Self::calculate_assigned_reserve(env, amount, reserve_ppm)?;
        let charged = amount - assigned;
        if Self::balance(env.clone(), payer.clone()) < charged {
            return Err(Error::InsufficientBalance);
        }
        let Some(reserve_e6) = amount.checked_mul(ppm) else {
            return Err(Error::ArithmeticError);
        };
        Self::adjust_minter_reserve(env, -reserve_e6)?;
        if assigned > 0 {
            Self::burn_internal(env, env.current_contract_address(), assigned);
        }
        if charged > 0 {
            Self::burn_internal(env, payer, charged);
        }
        Ok(charged)
    }

    fn burn_without_reserve(
        env: &Env,
        minter: Address,
        amount: i128,
        reserve_ppm: u32,
    ) -> Result<(), Error> {
        Self::require_minter(env, &minter)?;
        assert_positive(env, amount);
        let ppm = check_ppm(reserve_ppm)?;
        if Self::balance(env.clone(), minter.clone()) < amount {
            return Err(Error::InsufficientBalance);
        }
        let Some(reserve_e6) = amount.checked_mul(ppm) else {
            return Err(Error::ArithmeticError);
        };
        Self::adjust_minter_reserve(env, -reserve_e6)?;
        if amount > 0 {
            Self::burn_internal(env, minter, amount);
        }
        Ok(())
    }

    fn collect_profits(
        env: &Env,
        minter: Address,
        source: Address,
        amount: i128,
    ) -> Result<(), Error> {
        Self::require_minter(env, &minter)?;
        assert_positive(env, amount);
        if amount == 0 {
            return Ok(());
        }
        if Self::balance(env.clone(), source.clone()) < amount {
            return Err(Error::InsufficientBalance);
        }
        Self::transfer_internal(env, source.clone(), env.current_contract_address(), amount);
        Profit {
            minter,
            from: source,
            amount,
        }
        .publish(env);
        Ok(())
    }

    fn cover_loss(
        env: &Env,
        minter: Address,
        recipient: Address,
        amount: i128,
    ) -> Result<(), Error> {
        Self::require_minter(env, &minter)?;
        assert_positive(env, amount);
        if amount == 0 {
            return Ok(());
        }
        Self::withdraw_from_reserve(env, &recipient, amount);
        Loss {
            minter,
            to: recipient,
            amount,
        }
        .publish(env);
        Ok(())
    }

    fn distribute_profits(
        env: &Env,
        minter: Address,
        recipient: Address,
        amount: i128,
    ) -> Result<(), Error> {
        Self::require_minter(env, &minter)?;
        assert_positive(env, amount);
        if amount == 0 {
            return Ok(());
        }
        Self::withdraw_from_reserve(env, &recipient, amount);
        ProfitDistributed {
            minter,
            to: recipient,
            amount,
        }
        .publish(env);
        Ok(())
    }

    fn reserve_balance(env: &Env) -> i128 {
        Self::balance(env.clone(), env.current_contract_address())
    }

    fn minter_reserve(env: &Env) -> i128 {
        StableTokenStorage::get_state(env).minter_reserve_e6 / PPM
    }

    fn equity(env: &Env) -> i128 {
        let balance = Self::reserve_balance(env);
        let minter_reserve = Self::minter_reserve(env);
        if balance <= minter_reserve {
            0
        } else {
            balance - minter_reserve
        }
    }

    fn calculate_assigned_reserve(
        env: &Env,
        amount: i128,
        reserve_ppm: u32,
    ) -> Result<i128, Error> {
        let ppm = check_ppm(reserve_ppm)?;
        let Some(theoretical) = amount.checked_mul(ppm).map(|x| x / PPM) else {
            return Err(Error::ArithmeticError);
        };
        let current_reserve = Self::reserve_balance(env);
        let minter_reserve = Self::minter_reserve(env);
        if current_reserve < minter_reserve {
            // Not enough reserve left, distribute the loss over all minters
            let Some(scaled) = theoretical.checked_mul(current_reserve) else {
                return Err(Error::ArithmeticError);
            };
            Ok(scaled / minter_reserve)
        } else {
            Ok(theoretical)
        }
    }

    fn calculate_freed_amount(
        env: &Env,
        amount_excluding_reserve: i128,
        reserve_ppm: u32,
    ) -> Result<i128, Error> {
        let ppm = check_ppm(reserve_ppm)?;
        let current_reserve = Self::reserve_balance(env);
        let minter_reserve = Self::minter_reserve(env);
        let adjusted_ppm = if current_reserve < minter_reserve {
            ppm * current_reserve / minter_reserve
        } else {
            ppm
        };
        let Some(scaled) = amount_excluding_reserve.checked_mul(PPM) else {
            return Err(Error::ArithmeticError);
        };
        scaled.checked_div(PPM - adjusted_ppm)
            .ok_or(Error::ArithmeticError)
    }

    fn is_minter(env: &Env, minter: Address) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::Minter(minter))
            .unwrap_or_default()
    }
}
