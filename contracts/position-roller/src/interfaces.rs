use soroban_sdk::{Address, Env, contractclient};

use crate::storage::PositionView;

/// The slice of the minting hub the roller drives. Calls are made with the roller as
/// `caller`, which the hub accepts in place of the owner for minting and withdrawals.
#[allow(dead_code)]
#[contractclient(name = "MintingHubClient")]
pub trait MintingHub {
    fn position(env: Env, position: u64) -> PositionView;
    fn repay(env: Env, caller: Address, position: u64, amount: i128) -> i128;
    fn withdraw_collateral(env: Env, caller: Address, position: u64, to: Address, amount: i128);
    fn add_collateral(env: Env, caller: Address, position: u64, amount: i128);
    fn mint(env: Env, caller: Address, position: u64, to: Address, amount: i128) -> i128;
    fn clone_position(
        env: Env,
        caller: Address,
        owner: Address,
        parent: u64,
        initial_collateral: i128,
        initial_mint: i128,
        expiration: u64,
    ) -> u64;
    fn mint_amount_for_usable(env: Env, position: u64, usable: i128) -> i128;
}

/// Flash minting on the stable unit ledger.
#[allow(dead_code)]
#[contractclient(name = "StableLedgerClient")]
pub trait StableLedger {
    fn mint(env: Env, minter: Address, to: Address, amount: i128);
}
