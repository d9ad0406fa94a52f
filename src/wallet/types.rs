//! Types used throughout the wallet ledger.
use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places kept for every stored balance.
/// Balances are rounded to this scale after every arithmetic operation.
pub const LEDGER_SCALE: u32 = 8;

/// Money type, representing an exact decimal quantity of an asset.
pub type Money = Decimal;

/// Bank account ID type, unique within a registry.
pub type BankAccountId = u64;

/// Transaction ID type, unique within a transaction log.
pub type TransactionId = u64;

/// Rounds a quantity to the ledger scale, half away from zero.
pub fn round_ledger(value: Money) -> Money {
    value.round_dp_with_strategy(LEDGER_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// The fixed set of assets tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Ngn,
    Usdt,
    Btc,
    Eth,
    Sol,
}

impl Asset {
    /// Every known asset, in display order.
    pub const ALL: [Asset; 5] = [Asset::Ngn, Asset::Usdt, Asset::Btc, Asset::Eth, Asset::Sol];

    /// The asset code as it appears in storage and on screen.
    pub fn code(self) -> &'static str {
        match self {
            Asset::Ngn => "NGN",
            Asset::Usdt => "USDT",
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
            Asset::Sol => "SOL",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Asset::Ngn => "₦",
            Asset::Usdt => "₮",
            Asset::Btc => "₿",
            Asset::Eth => "Ξ",
            Asset::Sol => "◎",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Asset::Ngn => "Nigerian Naira",
            Asset::Usdt => "Tether",
            Asset::Btc => "Bitcoin",
            Asset::Eth => "Ethereum",
            Asset::Sol => "Solana",
        }
    }

    /// Maximum number of fractional digits a user may enter for this asset.
    pub fn input_precision(self) -> u32 {
        match self {
            Asset::Ngn | Asset::Usdt => 2,
            Asset::Btc | Asset::Eth => 8,
            Asset::Sol => 4,
        }
    }

    /// Whether this is the fiat settlement currency.
    pub fn is_fiat(self) -> bool {
        self == Asset::Ngn
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unknown asset code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown asset code: {0}")]
pub struct UnknownAsset(pub String);

impl FromStr for Asset {
    type Err = UnknownAsset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Asset::ALL
            .into_iter()
            .find(|asset| asset.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAsset(s.to_owned()))
    }
}
