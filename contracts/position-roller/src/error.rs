use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Only the owner of the source position may roll it
    NotOwner = 1,

    /// Source and target are backed by different collateral
    CollateralMismatch = 2,

    /// The target's price is too far above the source's
    InvalidPriceReference = 3,

    /// Requested expiration lies beyond the target's expiration
    InvalidExpiration = 4,

    /// Source has neither debt nor collateral, or is the target itself
    NothingToRoll = 5,

    /// Arithmetic overflow or underflow occurred
    ArithmeticError = 6,
}
