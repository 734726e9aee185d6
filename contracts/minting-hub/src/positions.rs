use soroban_sdk::{Address, Env, String};

use crate::{Error, storage::PositionView};

/// Interface-only subcontract for the operations an owner (or anyone, where noted)
/// performs on a single position.
///
/// Every call is identified by a position id. `caller` must authorize the call; calls
/// reserved to the owner fail with `NotOwner` otherwise. The registered roller may
/// act in place of the owner for `mint` and `withdraw_collateral`.
pub trait IsPosition {
    /// Mint `amount` against the position. The reserve share goes to the system
    /// buffer, the rest to `to`. Re-locks the interest rate. Returns the amount
    /// credited to `to`.
    fn mint(env: &Env, caller: Address, position: u64, to: Address, amount: i128)
    -> Result<i128, Error>;

    /// Repay up to `amount`, interest first, then principal. The reserve share freed
    /// by the principal part is not charged to the caller. Anyone may repay.
    /// Returns the gross amount applied.
    fn repay(env: &Env, caller: Address, position: u64, amount: i128) -> Result<i128, Error>;

    /// Repay the entire debt as of this call.
    fn repay_full(env: &Env, caller: Address, position: u64) -> Result<i128, Error>;

    /// Change the liquidation price. Increases start a cooldown and are capped at twice
    /// the current price and at the level implied by the limit; decreases must keep
    /// the debt covered.
    fn adjust_price(env: &Env, caller: Address, position: u64, new_price: i128)
    -> Result<(), Error>;

    /// Raise the price without a cooldown by pointing at a healthy position on the same
    /// collateral that already carries at least `new_price`.
    fn adjust_price_with_reference(
        env: &Env,
        caller: Address,
        position: u64,
        new_price: i128,
        reference: u64,
    ) -> Result<(), Error>;

    /// Move the position to the given principal, collateral balance and price in one
    /// call: deposit, repay, reprice, mint, withdraw, in that order.
    fn adjust(
        env: &Env,
        caller: Address,
        position: u64,
        new_principal: i128,
        new_collateral: i128,
        new_price: i128,
    ) -> Result<(), Error>;

    /// Deposit additional collateral. Anyone may top up a position.
    fn add_collateral(env: &Env, caller: Address, position: u64, amount: i128)
    -> Result<(), Error>;

    /// Withdraw collateral to `to`, keeping the debt covered.
    fn withdraw_collateral(
        env: &Env,
        caller: Address,
        position: u64,
        to: Address,
        amount: i128,
    ) -> Result<(), Error>;

    /// Void a position before it starts and return its collateral to the owner.
    fn deny(env: &Env, caller: Address, position: u64, message: String) -> Result<(), Error>;

    fn transfer_ownership(
        env: &Env,
        caller: Address,
        position: u64,
        new_owner: Address,
    ) -> Result<(), Error>;

    /// Snapshot of the position with interest, debt and minting room as of now.
    fn position(env: &Env, position: u64) -> Result<PositionView, Error>;

    fn debt(env: &Env, position: u64) -> Result<i128, Error>;

    fn interest(env: &Env, position: u64) -> Result<i128, Error>;

    /// The stated price, or the price implied by the debt if that is higher
    fn virtual_price(env: &Env, position: u64) -> Result<i128, Error>;

    /// Principal that may still be minted against the shared limit
    fn available_for_minting(env: &Env, position: u64) -> Result<i128, Error>;

    /// Amount credited to the owner when minting `amount`
    fn usable_mint(env: &Env, position: u64, amount: i128) -> Result<i128, Error>;

    /// Gross mint needed for the owner to receive `usable`
    fn mint_amount_for_usable(env: &Env, position: u64, usable: i128) -> Result<i128, Error>;

    /// Gross amount to pass to `repay` so that the caller is charged `net`.
    ///
    /// The result is capped at the current debt. Repaying it a few seconds later charges
    /// slightly more than `net`, by the reserve share of the interest accrued meanwhile.
    fn repay_amount_for(env: &Env, position: u64, net: i128) -> Result<i128, Error>;
}
