use soroban_sdk::contractevent;

#[contractevent(topics = ["roll"])]
pub struct Roll {
    #[topic]
    pub source: u64,
    #[topic]
    pub target: u64,
    pub collateral: i128,
    pub repaid: i128,
    pub minted: i128,
}
