//! Wallet ledger for the Kambit exchange dashboard.
pub mod config;
pub mod wallet;
