use soroban_sdk::{Address, Env};

use crate::Error;

/// Interface-only subcontract for the accounting primitives that registered minters
/// (the minting hub, the savings module, the position roller) use on the stable unit.
///
/// Every call requires the authorization of `minter`, and `minter` must have been
/// registered by the admin through `add_minter`.
///
/// The reserve is the balance this contract holds on its own address. The part of it
/// that backs outstanding mints is the minter reserve; anything above that is equity.
pub trait IsMinterLedger {
    /// Plain mint without reserve contribution. Used for flash mints that are burned
    /// again within the same invocation.
    fn mint(env: &Env, minter: Address, to: Address, amount: i128) -> Result<(), Error>;

    /// Mint `amount`, crediting `amount * (1e6 - reserve_ppm) / 1e6` to `to` and the
    /// remainder to the reserve. Returns the amount credited to `to`.
    fn mint_with_reserve(
        env: &Env,
        minter: Address,
        to: Address,
        amount: i128,
        reserve_ppm: u32,
    ) -> Result<i128, Error>;

    /// Burn `amount` that was originally minted with `reserve_ppm`. The reserve share
    /// assigned to it is burned out of the reserve, the rest out of `payer`.
    /// Returns the amount charged to `payer`.
    fn burn_from_with_reserve(
        env: &Env,
        minter: Address,
        payer: Address,
        amount: i128,
        reserve_ppm: u32,
    ) -> Result<i128, Error>;

    /// Burn `amount` out of the minter's own balance and release the matching minter
    /// reserve, which turns the reserve share into equity.
    fn burn_without_reserve(
        env: &Env,
        minter: Address,
        amount: i128,
        reserve_ppm: u32,
    ) -> Result<(), Error>;

    /// Move `amount` from `source` into the reserve as income.
    fn collect_profits(env: &Env, minter: Address, source: Address, amount: i128)
    -> Result<(), Error>;

    /// Pay `amount` out of the reserve to `recipient`, minting the part the reserve
    /// cannot cover.
    fn cover_loss(env: &Env, minter: Address, recipient: Address, amount: i128)
    -> Result<(), Error>;

    /// Pay accrued savings interest out of the reserve to `recipient`.
    fn distribute_profits(
        env: &Env,
        minter: Address,
        recipient: Address,
        amount: i128,
    ) -> Result<(), Error>;

    /// Stable units currently held by the reserve.
    fn reserve_balance(env: &Env) -> i128;

    /// Reserve backing outstanding mints.
    fn minter_reserve(env: &Env) -> i128;

    /// Reserve balance above the minter reserve, never negative.
    fn equity(env: &Env) -> i128;

    /// Share of the reserve assigned to `amount` minted at `reserve_ppm`, scaled down
    /// proportionally when the reserve has fallen below the minter reserve.
    fn calculate_assigned_reserve(env: &Env, amount: i128, reserve_ppm: u32)
    -> Result<i128, Error>;

    /// Gross burn amount that charges the payer `amount_excluding_reserve`.
    fn calculate_freed_amount(
        env: &Env,
        amount_excluding_reserve: i128,
        reserve_ppm: u32,
    ) -> Result<i128, Error>;

    fn is_minter(env: &Env, minter: Address) -> bool;
}
