//! Parsing and formatting of user-entered amounts.
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::wallet::types::{Asset, Money};

/// Rejections for amounts typed into a form field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountInputError {
    #[error("Amount has more than one decimal point")]
    MultipleDecimalPoints,
    #[error("{asset} amounts allow at most {precision} decimal places")]
    TooManyDecimals { asset: Asset, precision: u32 },
}

/// Parses an amount that may contain thousands separators, e.g. `"1,234.50"`.
pub fn parse_formatted_number(value: &str) -> Option<Money> {
    let clean: String = value.chars().filter(|c| *c != ',').collect();
    let clean = clean.trim();
    if clean.is_empty() {
        return None;
    }
    Decimal::from_str(clean).ok()
}

/// Checks a raw field value against the asset's input precision and returns it
/// with everything but digits and the decimal point removed.
pub fn validate_amount_input(raw: &str, asset: Asset) -> Result<String, AmountInputError> {
    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = clean.split('.');
    let _whole = parts.next();
    let fraction = parts.next();
    if parts.next().is_some() {
        return Err(AmountInputError::MultipleDecimalPoints);
    }
    let precision = asset.input_precision();
    if fraction.is_some_and(|f| f.len() > precision as usize) {
        return Err(AmountInputError::TooManyDecimals { asset, precision });
    }
    Ok(clean)
}

/// Formats a value while it is being typed: separators are inserted into the
/// whole part and the fraction is kept exactly as entered.
pub fn format_number_with_commas(value: &str) -> String {
    let clean: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    match clean.split_once('.') {
        Some((whole, fraction)) => {
            // Anything after a second point is dropped, as in a split on '.'.
            let fraction = fraction.split('.').next().unwrap_or_default();
            format!("{}.{}", group_thousands(whole), fraction)
        }
        None => group_thousands(&clean),
    }
}

/// Formats with exactly `decimals` fractional digits and thousands separators.
pub fn format_number(value: Money, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", decimals as usize, rounded.abs());
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{sign}{}.{fraction}", group_thousands(whole)),
        None => format!("{sign}{}", group_thousands(whole)),
    }
}

/// Formats an amount of an asset with its symbol and input precision.
pub fn format_amount(asset: Asset, value: Money) -> String {
    format!("{}{}", asset.symbol(), format_number(value, asset.input_precision()))
}

/// Currency display with two decimals, switching to compact notation
/// (`K`, `M`, `B`, `T`) above 999,999.
pub fn format_currency(asset: Asset, value: Money) -> String {
    if value <= Decimal::from(999_999) {
        return format!("{}{}", asset.symbol(), format_number(value, 2));
    }
    let units = [
        (Decimal::from(1_000_000_000_000u64), "T"),
        (Decimal::from(1_000_000_000u64), "B"),
        (Decimal::from(1_000_000u64), "M"),
    ];
    let (scale, suffix) = units
        .into_iter()
        .find(|(scale, _)| value >= *scale)
        .unwrap_or((Decimal::from(1_000), "K"));
    format!("{}{}{suffix}", asset.symbol(), format_number(value / scale, 2))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
