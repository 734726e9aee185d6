use soroban_sdk::{Address, BytesN, Env, contract, contractimpl, log, token::TokenClient};

use crate::{
    Error,
    index_types::Roll,
    interfaces::{MintingHubClient, StableLedgerClient},
    storage::{ADMIN_KEY, PositionView, RollerStorage},
};

const ONE: i128 = 1_000_000_000_000_000_000;
/// Ledgers an approval to the hub stays live for; it is consumed in the same call.
const APPROVAL_LEDGERS: u32 = 100;

#[contract]
pub struct PositionRollerContract;

/// Amounts of a single roll, derived from the source and target snapshots.
struct RollPlan {
    /// Gross amount minted on the target
    mint: i128,
    /// Collateral put into the target
    deposit: i128,
    /// Collateral handed back to the owner
    returned: i128,
}

#[contractimpl]
impl PositionRollerContract {
    pub fn __constructor(env: &Env, admin: Address, hub: Address, ledger: Address) {
        Self::set_admin(env, &admin);
        RollerStorage::set_state(env, &RollerStorage { hub, ledger });
    }

    /// Upgrade the contract to new wasm. Admin-only.
    pub fn upgrade(env: &Env, new_wasm_hash: BytesN<32>) {
        Self::require_admin(env);
        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }

    pub fn hub(env: &Env) -> Address {
        RollerStorage::get_state(env).hub
    }

    /// Move all debt and collateral of `source` into `target`, keeping the target's
    /// expiration. Returns the id of the position now carrying the debt.
    pub fn roll_fully(env: &Env, owner: Address, source: u64, target: u64) -> Result<u64, Error> {
        let state = RollerStorage::get_state(env);
        let expiration = MintingHubClient::new(env, &state.hub)
            .position(&target)
            .expiration;
        Self::roll_fully_with_expiration(env, owner, source, target, expiration)
    }

    /// Move all debt and collateral of `source` into `target`.
    ///
    /// The source debt is repaid with a flash mint, its collateral withdrawn, and the
    /// debt re-minted on the target. If the owner also owns the target and keeps its
    /// expiration, the target itself takes the debt; otherwise a clone of the target
    /// is opened for the owner at `expiration`. Collateral the target does not need is
    /// returned to the owner, and if the target cannot back the whole debt the owner
    /// pays the difference.
    pub fn roll_fully_with_expiration(
        env: &Env,
        owner: Address,
        source: u64,
        target: u64,
        expiration: u64,
    ) -> Result<u64, Error> {
        owner.require_auth();
        let state = RollerStorage::get_state(env);
        let hub = MintingHubClient::new(env, &state.hub);
        let src = hub.position(&source);
        let tgt = hub.position(&target);
        Self::validate(&owner, &src, &tgt, expiration)?;

        let me = env.current_contract_address();
        let stable = TokenClient::new(env, &state.ledger);
        let collateral = TokenClient::new(env, &src.collateral);
        let debt = src.debt;
        let balance = src.collateral_balance;

        let spent = if debt > 0 {
            StableLedgerClient::new(env, &state.ledger).mint(&me, &me, &debt);
            let before = stable.balance(&me);
            hub.repay(&me, &source, &debt);
            before - stable.balance(&me)
        } else {
            0
        };
        if balance > 0 {
            hub.withdraw_collateral(&me, &source, &me, &balance);
        }

        let reuse = tgt.owner == owner && expiration == tgt.expiration;
        let plan = Self::plan(env, &hub, &tgt, reuse, spent, balance)?;
        if plan.deposit > 0 {
            let live_until = env.ledger().sequence() + APPROVAL_LEDGERS;
            collateral.approve(&me, &state.hub, &plan.deposit, &live_until);
        }
        let id = if reuse {
            if plan.deposit > 0 {
                hub.add_collateral(&me, &target, &plan.deposit);
            }
            if plan.mint > 0 {
                hub.mint(&me, &target, &owner, &plan.mint);
            }
            target
        } else {
            hub.clone_position(&me, &owner, &target, &plan.deposit, &plan.mint, &expiration)
        };

        Roll {
            source,
            target: id,
            collateral: plan.deposit,
            repaid: debt,
            minted: plan.mint,
        }
        .publish(env);

        if plan.returned > 0 {
            collateral.transfer(&me, &owner, &plan.returned);
        }
        // the owner received the new mint and now settles the flash loan
        if spent > 0 {
            stable.transfer(&owner, &me, &spent);
        }
        if debt > 0 {
            stable.burn(&me, &debt);
        }
        Ok(id)
    }
}

impl PositionRollerContract {
    fn admin(env: &Env) -> Option<Address> {
        env.storage().instance().get(&ADMIN_KEY)
    }

    fn set_admin(env: &Env, admin: &Address) {
        if env.storage().instance().has(&ADMIN_KEY) {
            panic!("admin already set");
        }
        env.storage().instance().set(&ADMIN_KEY, admin);
    }

    fn require_admin(env: &Env) {
        let Some(admin) = Self::admin(env) else {
            panic!("admin not set");
        };
        admin.require_auth();
    }

    fn validate(
        owner: &Address,
        src: &PositionView,
        tgt: &PositionView,
        expiration: u64,
    ) -> Result<(), Error> {
        if src.owner != *owner {
            return Err(Error::NotOwner);
        }
        if src.collateral != tgt.collateral {
            return Err(Error::CollateralMismatch);
        }
        let Some(bound) = src.price.checked_mul(2) else {
            return Err(Error::ArithmeticError);
        };
        if tgt.price > bound {
            return Err(Error::InvalidPriceReference);
        }
        if expiration > tgt.expiration {
            return Err(Error::InvalidExpiration);
        }
        if src.id == tgt.id || (src.debt == 0 && src.collateral_balance == 0) {
            return Err(Error::NothingToRoll);
        }
        Ok(())
    }

    /// Size the target mint to replace `spent`, limited by what the collateral can back
    /// at the target's price, and deposit only the collateral that mint requires.
    fn plan(
        env: &Env,
        hub: &MintingHubClient,
        tgt: &PositionView,
        reuse: bool,
        spent: i128,
        withdrawn: i128,
    ) -> Result<RollPlan, Error> {
        let (existing_debt, existing_collateral) = if reuse {
            (tgt.debt, tgt.collateral_balance)
        } else {
            (0, 0)
        };
        let Some(total) = existing_collateral.checked_add(withdrawn) else {
            return Err(Error::ArithmeticError);
        };
        let capacity = (value_of(total, tgt.price)? - existing_debt).max(0);
        let wanted = if spent > 0 {
            hub.mint_amount_for_usable(&tgt.id, &spent)
        } else {
            0
        };
        let mint = wanted.min(capacity);
        if mint < wanted {
            log!(env, "target cannot back the full debt", wanted - mint);
        }

        let Some(debt_after) = existing_debt.checked_add(mint) else {
            return Err(Error::ArithmeticError);
        };
        let required = ceil_div(debt_after, tgt.price)?.max(tgt.minimum_collateral);
        let deposit = (required - existing_collateral).clamp(0, withdrawn);
        Ok(RollPlan {
            mint,
            deposit,
            returned: withdrawn - deposit,
        })
    }
}

/// Stable units backed by `amount` collateral at `price`.
fn value_of(amount: i128, price: i128) -> Result<i128, Error> {
    let Some(value) = amount.checked_mul(price) else {
        return Err(Error::ArithmeticError);
    };
    Ok(value / ONE)
}

/// Collateral needed to back `debt` at `price`, rounded up.
fn ceil_div(debt: i128, price: i128) -> Result<i128, Error> {
    let Some(scaled) = debt.checked_mul(ONE) else {
        return Err(Error::ArithmeticError);
    };
    if price <= 0 {
        return Err(Error::ArithmeticError);
    }
    let Some(rounded) = scaled.checked_add(price - 1) else {
        return Err(Error::ArithmeticError);
    };
    Ok(rounded / price)
}

