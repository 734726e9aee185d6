#![no_std]

mod error;
mod factory;
mod hub;
mod index_types;
mod interfaces;
mod math;
pub mod minting_hub;
mod position;
mod positions;
mod storage;

pub use error::Error;
pub use hub::IsMintingHub;
pub use minting_hub::{MintingHubContract, MintingHubContractClient};
pub use positions::IsPosition;
pub use storage::{Challenge, HubConfig, PositionTerms, PositionView};

mod test_challenge;
