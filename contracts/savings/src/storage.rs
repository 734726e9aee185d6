use soroban_sdk::{Address, contracttype};

/// A savings account. `ticks` is the accumulator value up to which interest has been
/// credited; it may lie in the future while a fresh deposit waits out the interest delay.
#[contracttype]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Account {
    pub saved: i128,
    pub ticks: u64,
}

#[contracttype]
pub enum DataKey {
    Account(Address),
}
