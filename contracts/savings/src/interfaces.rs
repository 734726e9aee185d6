use soroban_sdk::{Address, Env, contractclient};

/// Accounting primitives of the stable unit ledger used to pay out interest.
#[allow(dead_code)]
#[contractclient(name = "StableLedgerClient")]
pub trait StableLedger {
    fn distribute_profits(env: Env, minter: Address, recipient: Address, amount: i128);
    fn equity(env: Env) -> i128;
}
