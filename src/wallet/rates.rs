//! Exchange-rate lookup.
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::wallet::types::{Asset, Money};

/// Source of exchange rates between two assets.
pub trait RateSource: Send + Sync {
    /// Units of `to` received for one unit of `from`.
    fn rate(&self, from: Asset, to: Asset) -> Option<Decimal>;

    /// Converts `amount` of `from` into `to`. `None` when no rate exists or
    /// the result does not fit in a `Decimal`.
    fn convert(&self, amount: Money, from: Asset, to: Asset) -> Option<Money> {
        self.rate(from, to).and_then(|rate| amount.checked_mul(rate))
    }
}

/// Fixed rate table used by the dashboard while no market feed is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticRates;

// Rows are `from`, columns follow `Asset::ALL`: NGN, USDT, BTC, ETH, SOL.
const TABLE: [[&str; 5]; 5] = [
    ["1", "0.00058", "0.000000009", "0.00000022", "0.0000041"],
    ["1710.50", "1", "0.000015", "0.00038", "0.0068"],
    ["110450200", "64500", "1", "21.5", "425"],
    ["4520300", "2650", "0.046", "1", "18.2"],
    ["245150", "145", "0.0022", "0.054", "1"],
];

fn index(asset: Asset) -> usize {
    match asset {
        Asset::Ngn => 0,
        Asset::Usdt => 1,
        Asset::Btc => 2,
        Asset::Eth => 3,
        Asset::Sol => 4,
    }
}

impl RateSource for StaticRates {
    fn rate(&self, from: Asset, to: Asset) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        Decimal::from_str(TABLE[index(from)][index(to)]).ok()
    }
}
