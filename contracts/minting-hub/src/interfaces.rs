use soroban_sdk::{Address, Env, contractclient};

/// Minter primitives of the stable unit ledger. SEP-41 transfers go through
/// `soroban_sdk::token::TokenClient` on the same address.
#[allow(dead_code)]
#[contractclient(name = "StableLedgerClient")]
pub trait StableLedger {
    fn mint_with_reserve(
        env: Env,
        minter: Address,
        to: Address,
        amount: i128,
        reserve_ppm: u32,
    ) -> i128;
    fn burn_from_with_reserve(
        env: Env,
        minter: Address,
        payer: Address,
        amount: i128,
        reserve_ppm: u32,
    ) -> i128;
    fn burn_without_reserve(env: Env, minter: Address, amount: i128, reserve_ppm: u32);
    fn collect_profits(env: Env, minter: Address, source: Address, amount: i128);
    fn cover_loss(env: Env, minter: Address, recipient: Address, amount: i128);
    fn calculate_freed_amount(env: Env, amount_excluding_reserve: i128, reserve_ppm: u32) -> i128;
}

/// Source of the lead rate every position locks in on principal changes.
#[allow(dead_code)]
#[contractclient(name = "RateSourceClient")]
pub trait RateSource {
    fn current_rate_ppm(env: Env) -> u32;
}
