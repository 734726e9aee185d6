use soroban_sdk::{Address, Env, Symbol, contracttype, symbol_short};

pub(crate) const ADMIN_KEY: Symbol = symbol_short!("ADMIN");

// Instance storage
const STORAGE: Symbol = symbol_short!("STORAGE");

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RollerStorage {
    /// Minting hub holding the positions
    pub hub: Address,
    /// Stable unit ledger; the roller is one of its minters
    pub ledger: Address,
}

impl RollerStorage {
    pub fn get_state(env: &Env) -> RollerStorage {
        env.storage()
            .instance()
            .get(&STORAGE)
            .unwrap_or_else(|| panic!("contract not initialized"))
    }

    pub fn set_state(env: &Env, storage: &RollerStorage) {
        env.storage().instance().set(&STORAGE, storage);
    }
}

/// Position snapshot as returned by the hub's `position` call.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionView {
    pub id: u64,
    pub owner: Address,
    pub collateral: Address,
    pub original: u64,
    pub minimum_collateral: i128,
    pub limit: i128,
    pub reserve_ppm: u32,
    pub risk_premium_ppm: u32,
    pub fixed_annual_rate_ppm: u32,
    pub principal: i128,
    pub interest: i128,
    pub debt: i128,
    pub price: i128,
    pub virtual_price: i128,
    pub collateral_balance: i128,
    pub start: u64,
    pub cooldown: u64,
    pub expiration: u64,
    pub challenge_period: u64,
    pub challenged_amount: i128,
    pub closed: bool,
    pub available_for_minting: i128,
}
