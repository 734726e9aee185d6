use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Insufficient balance
    InsufficientBalance = 1,

    /// Insufficient allowance; spender must call `approve` first
    InsufficientAllowance = 2,

    /// Value must be greater than or equal to 0
    ValueNotPositive = 3,

    /// live_until_ledger must be greater than or equal to the current ledger number
    InvalidLedgerSequence = 4,

    /// Arithmetic overflow or underflow occurred
    ArithmeticError = 5,

    /// Cannot transfer to self
    CannotTransferToSelf = 6,

    /// Caller is not a registered minter
    NotMinter = 7,

    /// Minter is already registered
    MinterAlreadyRegistered = 8,

    /// Reserve contribution must be within 0..=1_000_000 ppm
    InvalidReservePPM = 9,
}
