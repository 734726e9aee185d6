#![no_std]

mod error;
mod index_types;
mod interfaces;
pub mod roller;
mod storage;

pub use error::Error;
pub use roller::{PositionRollerContract, PositionRollerContractClient};

mod test;
