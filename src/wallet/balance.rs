//! Balance store holding one quantity per known asset.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::wallet::{
    rates::RateSource,
    types::{Asset, Money, round_ledger},
};

/// Current balances for every known asset.
///
/// Stored as a map of asset code to number. Unknown codes found in storage are
/// dropped and missing codes read as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Money>", into = "BTreeMap<String, Money>")]
pub struct Balances {
    amounts: BTreeMap<Asset, Money>,
}

impl Default for Balances {
    fn default() -> Self {
        Balances {
            amounts: Asset::ALL.into_iter().map(|a| (a, Money::ZERO)).collect(),
        }
    }
}

impl From<BTreeMap<String, Money>> for Balances {
    fn from(raw: BTreeMap<String, Money>) -> Self {
        let mut balances = Balances::default();
        for (code, amount) in raw {
            match code.parse::<Asset>() {
                Ok(asset) => {
                    balances.amounts.insert(asset, round_ledger(amount));
                }
                Err(err) => debug!("ignoring stored balance: {err}"),
            }
        }
        balances
    }
}

impl From<Balances> for BTreeMap<String, Money> {
    fn from(balances: Balances) -> Self {
        balances
            .amounts
            .into_iter()
            .map(|(asset, amount)| (asset.code().to_owned(), amount))
            .collect()
    }
}

impl Balances {
    /// Returns the balance of the given asset.
    pub fn get(&self, asset: Asset) -> Money {
        self.amounts.get(&asset).copied().unwrap_or_default()
    }

    /// Iterates balances in asset order.
    pub fn iter(&self) -> impl Iterator<Item = (Asset, Money)> + '_ {
        self.amounts.iter().map(|(asset, amount)| (*asset, *amount))
    }

    /// Total worth of every balance in `target`. Assets without a rate, or
    /// whose value does not fit, are left out.
    pub fn value_in(&self, target: Asset, rates: &impl RateSource) -> Money {
        self.iter()
            .filter_map(|(asset, amount)| rates.convert(amount, asset, target))
            .fold(Money::ZERO, |total, value| total.checked_add(value).unwrap_or(total))
    }

    /// Credits the asset. Returns `false` without touching the balance when the
    /// amount is not positive or the sum does not fit.
    pub fn credit(&mut self, asset: Asset, amount: Money) -> bool {
        if amount <= Money::ZERO {
            return false;
        }
        let balance = self.amounts.entry(asset).or_default();
        match balance.checked_add(amount) {
            Some(sum) => {
                *balance = round_ledger(sum);
                true
            }
            None => false,
        }
    }

    /// Debits the asset if the balance covers the amount.
    pub fn debit(&mut self, asset: Asset, amount: Money) -> Result<(), BalanceError> {
        if amount <= Money::ZERO {
            return Err(BalanceError::InvalidAmount);
        }
        let balance = self.amounts.entry(asset).or_default();
        if *balance >= amount {
            *balance = round_ledger(*balance - amount);
            Ok(())
        } else {
            Err(BalanceError::InsufficientFunds(asset))
        }
    }
}

/// Errors that can occur while mutating balances.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("Insufficient {0} balance")]
    InsufficientFunds(Asset),
    #[error("Amount must be positive")]
    InvalidAmount,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::wallet::rates::StaticRates;

    #[test]
    fn test_default_is_zero() {
        let balances = Balances::default();
        for asset in Asset::ALL {
            assert_eq!(balances.get(asset), Money::ZERO);
        }
    }

    #[test]
    fn test_credit() {
        let mut balances = Balances::default();
        assert!(balances.credit(Asset::Btc, dec!(0.123456789)));
        assert_eq!(balances.get(Asset::Btc), dec!(0.12345679));
    }

    #[test]
    fn test_credit_non_positive() {
        let mut balances = Balances::default();
        assert!(!balances.credit(Asset::Ngn, dec!(0)));
        assert!(!balances.credit(Asset::Ngn, dec!(-5)));
        assert_eq!(balances.get(Asset::Ngn), Money::ZERO);
    }

    #[test]
    fn test_credit_overflow_is_refused() {
        let mut balances = Balances::default();
        assert!(balances.credit(Asset::Ngn, Money::MAX));
        assert!(!balances.credit(Asset::Ngn, Money::MAX));
        assert!(!balances.credit(Asset::Ngn, dec!(1)));
        assert_eq!(balances.get(Asset::Ngn), Money::MAX);
    }

    #[test]
    fn test_value_in_naira() {
        let mut balances = Balances::default();
        balances.credit(Asset::Ngn, dec!(1000));
        balances.credit(Asset::Usdt, dec!(2));
        balances.credit(Asset::Sol, dec!(1));
        assert_eq!(balances.value_in(Asset::Ngn, &StaticRates), dec!(249571));

        balances.credit(Asset::Btc, Money::MAX);
        assert_eq!(balances.value_in(Asset::Ngn, &StaticRates), dec!(249571));
    }

    #[test]
    fn test_debit() {
        let mut balances = Balances::default();
        balances.credit(Asset::Usdt, dec!(50.00));
        assert!(balances.debit(Asset::Usdt, dec!(20.00)).is_ok());
        assert_eq!(balances.get(Asset::Usdt), dec!(30.00));
    }

    #[test]
    fn test_debit_insufficient_funds() {
        let mut balances = Balances::default();
        balances.credit(Asset::Ngn, dec!(100.00));
        assert_eq!(
            balances.debit(Asset::Ngn, dec!(150.00)),
            Err(BalanceError::InsufficientFunds(Asset::Ngn))
        );
        assert_eq!(balances.get(Asset::Ngn), dec!(100.00));
    }

    #[test]
    fn test_debit_exact_balance() {
        let mut balances = Balances::default();
        balances.credit(Asset::Sol, dec!(1.5));
        assert!(balances.debit(Asset::Sol, dec!(1.5)).is_ok());
        assert_eq!(balances.get(Asset::Sol), Money::ZERO);
    }

    #[test]
    fn test_no_drift() {
        let mut balances = Balances::default();
        for _ in 0..10 {
            balances.credit(Asset::Eth, dec!(0.1));
        }
        assert_eq!(balances.get(Asset::Eth), dec!(1));
    }

    #[test]
    fn test_stored_map_filters_unknown_codes() {
        let balances: Balances =
            serde_json::from_str(r#"{"NGN": 2500.5, "DOGE": 3, "BTC": 0.00012}"#).unwrap();
        assert_eq!(balances.get(Asset::Ngn), dec!(2500.5));
        assert_eq!(balances.get(Asset::Btc), dec!(0.00012));
        assert_eq!(balances.get(Asset::Usdt), Money::ZERO);
        assert_eq!(balances.iter().count(), Asset::ALL.len());
    }
}
