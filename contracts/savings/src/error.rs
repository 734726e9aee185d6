use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Saving is disabled while the lead rate is, or is about to become, zero
    ModuleDisabled = 1,

    /// No rate change has been proposed
    NoPendingChange = 2,

    /// The proposed rate change is still in its waiting period
    ChangeNotReady = 3,

    /// Rate must be within 0..=1_000_000 ppm
    InvalidRate = 4,

    /// Value must be greater than 0
    ValueNotPositive = 5,

    /// Arithmetic overflow or underflow occurred
    ArithmeticError = 6,
}
