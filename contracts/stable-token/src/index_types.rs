use soroban_sdk::{Address, contractevent};

#[contractevent(topics = ["mint"], data_format = "single-value")]
pub struct Mint {
    #[topic]
    pub to: Address,
    pub amount: i128,
}

#[contractevent(topics = ["burn"], data_format = "single-value")]
pub struct Burn {
    #[topic]
    pub from: Address,
    pub amount: i128,
}

#[contractevent(topics = ["minter"])]
pub struct MinterUpdate {
    #[topic]
    pub minter: Address,
    pub registered: bool,
}

/// Stable units moved into the reserve as system income.
#[contractevent(topics = ["profit"])]
pub struct Profit {
    #[topic]
    pub minter: Address,
    pub from: Address,
    pub amount: i128,
}

/// A loss covered out of the reserve, minting whatever the reserve could not pay.
#[contractevent(topics = ["loss"])]
pub struct Loss {
    #[topic]
    pub minter: Address,
    pub to: Address,
    pub amount: i128,
}

#[contractevent(topics = ["distribute"])]
pub struct ProfitDistributed {
    #[topic]
    pub minter: Address,
    pub to: Address,
    pub amount: i128,
}
