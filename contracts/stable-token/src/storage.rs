use soroban_sdk::{Address, Env, String, Symbol, contracttype, symbol_short};

/// Owner and spender of an allowance
#[contracttype]
#[derive(Clone)]
pub struct AllowanceKey(pub Address, pub Address);

#[contracttype]
#[derive(Clone)]
pub struct AllowanceEntry {
    pub amount: i128,
    /// Last ledger on which the allowance can be spent
    pub live_until_ledger: u32,
}

// Persistent storage keys
#[contracttype]
pub enum DataKey {
    /// Mapping of account addresses to their token balances
    Balance(Address),
    /// Allowance granted by the first address to the second
    Allowance(AllowanceKey),
    /// Registered minters
    Minter(Address),
}

pub(crate) const ADMIN_KEY: Symbol = symbol_short!("ADMIN");

// Instance storage
const STORAGE: Symbol = symbol_short!("STORAGE");

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StableTokenStorage {
    /// Name of the token
    pub name: String,
    /// Symbol of the token
    pub symbol: String,
    /// Number of decimal places for token amounts
    pub decimals: u32,
    /// Reserve backing outstanding mints, scaled by 1e6
    pub minter_reserve_e6: i128,
}

impl StableTokenStorage {
    /// Get current state of the contract
    pub fn get_state(env: &Env) -> StableTokenStorage {
        env.storage()
            .instance()
            .get(&STORAGE)
            .unwrap_or_else(|| panic!("contract not initialized"))
    }

    pub fn set_state(env: &Env, storage: &StableTokenStorage) {
        env.storage().instance().set(&STORAGE, storage);
    }
}
