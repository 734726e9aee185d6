use soroban_sdk::{Address, Env, Vec};

use crate::{
    Error,
    storage::{Challenge, HubConfig, PositionTerms},
};

/// Interface-only subcontract for opening positions and running challenges, auctions
/// and forced sales against them.
pub trait IsMintingHub {
    /// Open an original position on `collateral`, depositing `terms.initial_collateral`
    /// from `owner` and charging the opening fee. Returns the new position id.
    fn open_position(
        env: &Env,
        owner: Address,
        collateral: Address,
        terms: PositionTerms,
    ) -> Result<u64, Error>;

    /// Clone `parent` for `owner`. Collateral is taken from `caller`, the initial mint
    /// is credited to `owner`. Returns the new position id.
    fn clone_position(
        env: &Env,
        caller: Address,
        owner: Address,
        parent: u64,
        initial_collateral: i128,
        initial_mint: i128,
        expiration: u64,
    ) -> Result<u64, Error>;

    /// Challenge `position` by locking `amount` of its collateral. Fails with
    /// `UnexpectedPrice` when the observed liquidation price is below `expected_price`.
    /// Returns the challenge index.
    fn challenge(
        env: &Env,
        challenger: Address,
        position: u64,
        amount: i128,
        expected_price: i128,
    ) -> Result<u32, Error>;

    /// Resolve up to `size` of a challenge at the current auction price.
    ///
    /// During the first challenge period the bid averts the challenge: the bidder buys
    /// the challenger's collateral at the liquidation price, or takes it back for free
    /// when the bidder is the challenger. Afterwards the bid succeeds: the challenger's
    /// collateral is returned (or parked when `postpone_collateral_return` is set) and
    /// the bidder buys the same amount of the position's collateral at the decaying
    /// auction price.
    fn bid(
        env: &Env,
        bidder: Address,
        index: u32,
        size: i128,
        postpone_collateral_return: bool,
    ) -> Result<(), Error>;

    /// Claim challenger collateral parked by earlier bids. Returns the amount sent.
    fn return_postponed_collateral(
        env: &Env,
        owner: Address,
        collateral: Address,
        target: Address,
    ) -> Result<i128, Error>;

    /// Buy up to `up_to` collateral of an expired position at the forced sale price.
    /// Returns the amount bought.
    fn buy_expired_collateral(
        env: &Env,
        buyer: Address,
        position: u64,
        up_to: i128,
    ) -> Result<i128, Error>;

    /// Current auction price of a challenge
    fn price(env: &Env, index: u32) -> Result<i128, Error>;

    /// Current forced sale price of a position
    fn expired_purchase_price(env: &Env, position: u64) -> Result<i128, Error>;

    fn get_challenge(env: &Env, index: u32) -> Result<Challenge, Error>;

    /// Indices of every challenge ever opened against `position`
    fn challenges_of(env: &Env, position: u64) -> Vec<u32>;

    fn pending_return(env: &Env, collateral: Address, owner: Address) -> i128;

    fn config(env: &Env) -> HubConfig;

    fn position_count(env: &Env) -> u64;

    fn challenge_count(env: &Env) -> u32;
}
