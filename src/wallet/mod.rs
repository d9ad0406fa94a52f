//! Wallet module for balances, linked bank accounts, persistence and the flows
//! that mutate them.
mod activity;
mod balance;
mod bank_account;
mod flow;
mod format;
mod giftcard;
mod ledger;
mod persistence;
mod rates;
mod request;
mod session;
mod transaction;
mod types;

pub use activity::*;
pub use balance::*;
pub use bank_account::*;
pub use flow::*;
pub use format::*;
pub use giftcard::*;
pub use ledger::*;
pub use persistence::*;
pub use rates::*;
pub use request::*;
pub use session::*;
pub use transaction::*;
pub use types::*;
