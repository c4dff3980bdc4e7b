pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod mining;
pub mod storage;
pub mod transaction;
pub mod wallet;
