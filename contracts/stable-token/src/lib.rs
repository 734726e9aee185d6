#![no_std]

mod error;
mod index_types;
mod minting;
mod storage;
pub mod token;

pub use error::Error;
pub use minting::IsMinterLedger;
pub use token::{StableTokenContract, StableTokenContractClient};

mod test;
