use soroban_sdk::{Address, Env, Symbol, Vec, contracttype, symbol_short};

use crate::Error;

pub(crate) const ADMIN_KEY: Symbol = symbol_short!("ADMIN");

// Instance storage
const STORAGE: Symbol = symbol_short!("STORAGE");

/// Tunable parameters of the hub. Durations are in seconds, values in stable units.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HubConfig {
    /// Fee collected as system profit when a new original position is opened
    pub opening_fee: i128,
    /// Share of a successful bid paid to the challenger, ppm
    pub challenger_reward_ppm: u32,
    /// Minimum value of `minimum_collateral` at the proposed liquidation price
    pub min_opening_value: i128,
    pub min_init_period: u64,
    pub min_challenge_period: u64,
    /// Cooldown after a price increase
    pub price_increase_cooldown: u64,
    /// Cooldown after a challenge was averted
    pub avert_cooldown: u64,
    /// Cooldown after a challenge succeeded
    pub success_cooldown: u64,
    /// Smallest remaining collateral value a forced sale may leave behind
    pub min_remainder_value: i128,
    /// Ceiling of the forced sale schedule, as a multiple of the liquidation price
    pub expired_price_factor: u32,
    /// Length of the forced sale decay tail, in challenge periods
    pub expired_tail_periods: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HubStorage {
    /// Stable unit ledger; the hub is one of its minters
    pub ledger: Address,
    /// Contract exposing the current lead rate
    pub rate_source: Address,
    /// Position roller allowed to act on behalf of owners
    pub roller: Option<Address>,
    pub config: HubConfig,
    pub position_count: u64,
    pub challenge_count: u32,
}

impl HubStorage {
    /// Get current state of the contract
    pub fn get_state(env: &Env) -> HubStorage {
        env.storage()
            .instance()
            .get(&STORAGE)
            .unwrap_or_else(|| panic!("contract not initialized"))
    }

    pub fn set_state(env: &Env, storage: &HubStorage) {
        env.storage().instance().set(&STORAGE, storage);
    }
}

/// Terms proposed when opening an original position.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionTerms {
    /// Collateral floor; a position holding less counts as holding nothing
    pub minimum_collateral: i128,
    pub initial_collateral: i128,
    /// Maximum principal across the original and all of its clones
    pub limit: i128,
    /// Seconds until minting is permitted
    pub init_period: u64,
    /// Seconds from start until expiration
    pub duration: u64,
    /// Length of each auction phase
    pub challenge_period: u64,
    pub risk_premium_ppm: u32,
    /// Stable units per collateral unit, scaled by 1e18
    pub liquidation_price: i128,
    pub reserve_ppm: u32,
}

/// A position record. Positions live in an arena keyed by id; clones point at their
/// original through `original`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Position {
    pub owner: Address,
    pub collateral: Address,
    /// Id of the original position; equal to the own id for originals
    pub original: u64,
    pub minimum_collateral: i128,
    pub reserve_ppm: u32,
    pub risk_premium_ppm: u32,
    /// Lead rate plus risk premium, captured at the last principal-changing call
    pub fixed_annual_rate_ppm: u32,
    pub principal: i128,
    /// Interest accrued up to `last_accrual`
    pub accrued_interest: i128,
    pub last_accrual: u64,
    pub price: i128,
    pub collateral_balance: i128,
    pub start: u64,
    pub cooldown: u64,
    pub expiration: u64,
    pub challenge_period: u64,
    /// Collateral under open challenges
    pub challenged_amount: i128,
    pub closed: bool,
}

/// Limit bookkeeping shared by an original and all of its clones.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Family {
    pub limit: i128,
    /// Sum of principal across the family
    pub total_minted: i128,
}

/// Challenge records are never removed; a resolved challenge has its challenger cleared
/// and its size reduced to zero.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Challenge {
    pub challenger: Option<Address>,
    pub position: u64,
    pub start: u64,
    /// Challenger collateral still locked in the challenge
    pub size: i128,
    /// Liquidation price observed when the challenge started
    pub liq_price: i128,
}

/// Read-only snapshot of a position with derived values evaluated at the current time.
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

#[contracttype]
#[derive(Clone)]
pub struct PendingKey(pub Address, pub Address);

// Persistent storage keys
#[contracttype]
pub enum DataKey {
    Position(u64),
    /// Keyed by the original's id
    Family(u64),
    Challenge(u32),
    /// Challenge indices opened against a position
    PositionChallenges(u64),
    /// Challenger collateral parked after a successful bid, by (collateral, owner)
    PendingReturn(PendingKey),
    /// Collateral assets ever accepted by the hub
    CollateralAsset(Address),
}

fn extend(env: &Env, key: &DataKey) {
    let ttl = env.storage().max_ttl();
    env.storage().persistent().extend_ttl(key, ttl, ttl);
}

pub fn get_position(env: &Env, id: u64) -> Result<Position, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Position(id))
        .ok_or(Error::InvalidPos)
}

pub fn set_position(env: &Env, id: u64, position: &Position) {
    let key = DataKey::Position(id);
    env.storage().persistent().set(&key, position);
    extend(env, &key);
}

pub fn get_family(env: &Env, original: u64) -> Result<Family, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Family(original))
        .ok_or(Error::InvalidPos)
}

pub fn set_family(env: &Env, original: u64, family: &Family) {
    let key = DataKey::Family(original);
    env.storage().persistent().set(&key, family);
    extend(env, &key);
}

pub fn get_challenge(env: &Env, index: u32) -> Result<Challenge, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Challenge(index))
        .ok_or(Error::InvalidChallenge)
}

pub fn set_challenge(env: &Env, index: u32, challenge: &Challenge) {
    let key = DataKey::Challenge(index);
    env.storage().persistent().set(&key, challenge);
    extend(env, &key);
}

pub fn challenges_of(env: &Env, position: u64) -> Vec<u32> {
    env.storage()
        .persistent()
        .get(&DataKey::PositionChallenges(position))
        .unwrap_or_else(|| Vec::new(env))
}

pub fn push_position_challenge(env: &Env, position: u64, index: u32) {
    let mut indices = challenges_of(env, position);
    indices.push_back(index);
    let key = DataKey::PositionChallenges(position);
    env.storage().persistent().set(&key, &indices);
    extend(env, &key);
}

pub fn get_pending_return(env: &Env, collateral: &Address, owner: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::PendingReturn(PendingKey(
            collateral.clone(),
            owner.clone(),
        )))
        .unwrap_or(0)
}

pub fn set_pending_return(env: &Env, collateral: &Address, owner: &Address, amount: i128) {
    let key = DataKey::PendingReturn(PendingKey(collateral.clone(), owner.clone()));
    if amount == 0 {
        env.storage().persistent().remove(&key);
    } else {
        env.storage().persistent().set(&key, &amount);
        extend(env, &key);
    }
}

pub fn is_collateral_asset(env: &Env, asset: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::CollateralAsset(asset.clone()))
}

pub fn register_collateral_asset(env: &Env, asset: &Address) {
    let key = DataKey::CollateralAsset(asset.clone());
    env.storage().persistent().set(&key, &true);
    extend(env, &key);
}
