use soroban_sdk::{Address, String, contractevent};

#[contractevent(topics = ["position_opened"])]
pub struct PositionOpened {
    #[topic]
    pub owner: Address,
    pub position: u64,
    pub original: u64,
    pub collateral: Address,
}

#[contractevent(topics = ["minting_update"])]
pub struct MintingUpdate {
    #[topic]
    pub position: u64,
    pub collateral: i128,
    pub price: i128,
    pub principal: i128,
}

#[contractevent(topics = ["challenge_started"])]
pub struct ChallengeStarted {
    #[topic]
    pub challenger: Address,
    #[topic]
    pub position: u64,
    pub size: i128,
    pub index: u32,
}

#[contractevent(topics = ["challenge_averted"])]
pub struct ChallengeAverted {
    #[topic]
    pub position: u64,
    pub index: u32,
    pub size: i128,
}

#[contractevent(topics = ["challenge_succeeded"])]
pub struct ChallengeSucceeded {
    #[topic]
    pub position: u64,
    pub index: u32,
    pub bid: i128,
    pub acquired_collateral: i128,
    pub challenge_size: i128,
}

#[contractevent(topics = ["postponed_return"])]
pub struct PostponedReturn {
    #[topic]
    pub collateral: Address,
    #[topic]
    pub beneficiary: Address,
    pub amount: i128,
}

#[contractevent(topics = ["position_denied"])]
pub struct PositionDenied {
    #[topic]
    pub position: u64,
    pub sender: Address,
    pub message: String,
}

#[contractevent(topics = ["forced_sale"])]
pub struct ForcedSale {
    #[topic]
    pub position: u64,
    pub amount: i128,
    pub price_per_unit: i128,
}

#[contractevent(topics = ["ownership"])]
pub struct OwnershipTransferred {
    #[topic]
    pub position: u64,
    pub previous_owner: Address,
    pub new_owner: Address,
}
