//! Gift card brands and their Naira rates.
use rust_decimal::Decimal;

use crate::wallet::types::Money;

/// A tradable gift card brand. Rates are Naira per card dollar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GiftCardBrand {
    pub id: &'static str,
    pub name: &'static str,
    sell_rate: u32,
    buy_rate: u32,
}

impl GiftCardBrand {
    /// Naira paid to the user per dollar of card sold.
    pub fn sell_rate(&self) -> Money {
        Decimal::from(self.sell_rate)
    }

    /// Naira charged to the user per dollar of card bought.
    pub fn buy_rate(&self) -> Money {
        Decimal::from(self.buy_rate)
    }
}

pub const GIFTCARD_BRANDS: [GiftCardBrand; 5] = [
    GiftCardBrand { id: "apple", name: "Apple / iTunes", sell_rate: 820, buy_rate: 950 },
    GiftCardBrand { id: "amazon", name: "Amazon", sell_rate: 750, buy_rate: 880 },
    GiftCardBrand { id: "steam", name: "Steam", sell_rate: 850, buy_rate: 980 },
    GiftCardBrand { id: "google", name: "Google Play", sell_rate: 780, buy_rate: 910 },
    GiftCardBrand { id: "sephora", name: "Sephora", sell_rate: 810, buy_rate: 940 },
];

/// Looks a brand up by id, ignoring case.
pub fn find_brand(id: &str) -> Option<&'static GiftCardBrand> {
    GIFTCARD_BRANDS
        .iter()
        .find(|brand| brand.id.eq_ignore_ascii_case(id.trim()))
}
