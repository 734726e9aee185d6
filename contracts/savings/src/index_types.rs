use soroban_sdk::{Address, contractevent};

#[contractevent(topics = ["rate_proposed"])]
pub struct RateProposed {
    #[topic]
    pub who: Address,
    pub next_rate_ppm: u32,
    pub next_change: u64,
}

#[contractevent(topics = ["rate_changed"], data_format = "single-value")]
pub struct RateChanged {
    pub new_rate_ppm: u32,
}

#[contractevent(topics = ["saved"])]
pub struct Saved {
    #[topic]
    pub account: Address,
    pub amount: i128,
}

#[contractevent(topics = ["interest_collected"])]
pub struct InterestCollected {
    #[topic]
    pub account: Address,
    pub interest: i128,
}

#[contractevent(topics = ["withdrawn"])]
pub struct Withdrawn {
    #[topic]
    pub account: Address,
    pub amount: i128,
}
