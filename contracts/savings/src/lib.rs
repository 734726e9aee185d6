#![no_std]

mod error;
mod index_types;
mod interfaces;
mod leadrate;
pub mod savings;
mod storage;

pub use error::Error;
pub use leadrate::IsLeadrate;
pub use savings::{SavingsContract, SavingsContractClient};
pub use storage::Account;

mod test;
