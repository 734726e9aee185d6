use soroban_sdk::Env;

use crate::Error;

/// Interface-only subcontract for the lead rate and its tick accumulator.
///
/// The accumulator grows by `current_rate_ppm` per second. Interest owed on an amount
/// between two tick readings `a` and `b` is `amount * (b - a) / (1_000_000 * 365 days)`.
pub trait IsLeadrate {
    /// Rate in parts per million per year that applies right now
    fn current_rate_ppm(env: &Env) -> u32;

    /// Rate that takes effect once `next_change` has passed and `apply_change` is called
    fn next_rate_ppm(env: &Env) -> u32;

    fn next_change(env: &Env) -> u64;

    /// Propose a new lead rate. It can be applied after a waiting period. Admin-only.
    fn propose_change(env: &Env, new_rate_ppm: u32) -> Result<(), Error>;

    /// Apply the pending rate change once its waiting period is over.
    fn apply_change(env: &Env) -> Result<(), Error>;

    /// Accumulator value at the current ledger timestamp
    fn current_ticks(env: &Env) -> u64;

    /// Accumulator value at `timestamp`, assuming the current rate stays in place
    fn ticks(env: &Env, timestamp: u64) -> u64;
}
