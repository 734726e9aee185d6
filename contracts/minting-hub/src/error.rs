use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Position is in its cooldown window
    Hot = 1,

    /// Position has passed its expiration
    Expired = 2,

    /// Position has not expired yet
    Alive = 3,

    /// The denial window has closed
    TooLate = 4,

    /// Operation blocked by an open challenge
    Challenged = 5,

    /// Collateral does not cover the debt, or is below the required minimum
    InsufficientCollateral = 6,

    /// Minting would exceed the limit shared by the original and its clones
    LimitExceeded = 7,

    /// Price above the allowed cap
    PriceTooHigh = 8,

    /// Risk premium must be within 0..=1_000_000 ppm
    InvalidRiskPremium = 9,

    /// Reserve contribution must cover the challenger reward and be at most 1_000_000 ppm
    InvalidReservePPM = 10,

    /// Challenge is smaller than the position minimum and the position balance
    ChallengeTooSmall = 11,

    /// The observed liquidation price is below the price the caller expected
    UnexpectedPrice = 12,

    /// Reference position does not justify the requested price
    InvalidPriceReference = 13,

    /// No such position
    InvalidPos = 14,

    /// Collateral token has too many decimals
    InvalidCollateralDecimals = 15,

    /// Collateral token accepted a transfer it should have rejected
    IncompatibleCollateral = 16,

    /// Stable unit and collateral held by the hub cannot be rescued
    CannotRescueCollateral = 17,

    /// Operation would leave a remainder below the dust threshold
    LeaveNoDust = 18,

    /// Initialization period is shorter than the configured minimum
    InitPeriodTooShort = 19,

    /// Challenge period is shorter than the configured minimum
    ChallengeTimeTooShort = 20,

    /// Position is closed
    Closed = 21,

    /// Caller is not the position owner
    NotOwner = 22,

    /// Requested expiration is in the past or beyond the original's expiration
    InvalidExpiration = 23,

    /// No such challenge, or the challenge has been fully resolved
    InvalidChallenge = 24,

    /// A challenge cannot be averted in the ledger second it was started
    AvertTooEarly = 25,

    /// Value must be greater than 0
    ValueNotPositive = 26,

    /// Arithmetic overflow or underflow occurred
    ArithmeticError = 27,

    /// Init period, duration or challenge period runs past the largest timestamp
    PeriodTooLong = 28,
}
