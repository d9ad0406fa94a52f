//! Flow requests as they arrive in a CSV batch.
use serde::{Deserialize, de};

use crate::wallet::{
    bank_account::NewBankAccount,
    flow::{Destination, FlowError, FlowRequest, TradeSide},
    format::{parse_formatted_number, validate_amount_input},
    types::{Asset, BankAccountId, Money},
};

/// Enum representing which form raised the request.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Fund,
    Send,
    Withdraw,
    Buy,
    Sell,
    GiftcardBuy,
    GiftcardSell,
    Utility,
    AddBank,
    RemoveBank,
}

/// Custom deserializer for amounts typed with thousands separators.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<Money>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_formatted_number(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid amount: {raw}"))),
    }
}

/// One CSV row. Columns a flow doesn't use are left empty.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Request {
    flow: FlowKind,

    #[serde(default)]
    asset: Option<Asset>,

    #[serde(default, deserialize_with = "deserialize_amount")]
    amount: Option<Money>,

    /// Id of an already linked bank account.
    #[serde(default)]
    bank_id: Option<BankAccountId>,

    /// Details of a bank account to link as part of the request.
    #[serde(default)]
    bank_name: Option<String>,
    #[serde(default)]
    account_number: Option<String>,
    #[serde(default)]
    account_name: Option<String>,

    #[serde(default)]
    recipient: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    card_code: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    beneficiary: Option<String>,
}

impl Request {
    pub fn get_flow(&self) -> FlowKind {
        self.flow
    }

    fn asset(&self) -> Result<Asset, FlowError> {
        self.asset
            .ok_or_else(|| FlowError::InvalidRequest("asset is required".to_owned()))
    }

    /// The amount, holding no more decimal places than `asset` accepts.
    fn amount_in(&self, asset: Asset) -> Result<Money, FlowError> {
        let amount = self.amount.ok_or(FlowError::InvalidAmount)?;
        validate_amount_input(&amount.to_string(), asset)?;
        Ok(amount)
    }

    fn new_bank_account(&self) -> Option<NewBankAccount> {
        if self.bank_name.is_none() && self.account_number.is_none() {
            return None;
        }
        let account = NewBankAccount::new(
            self.bank_name.clone().unwrap_or_default(),
            self.account_number.clone().unwrap_or_default(),
        );
        Some(match &self.account_name {
            Some(name) => account.with_account_name(name.clone()),
            None => account,
        })
    }

    /// An existing account id wins over new account details.
    fn destination(&self) -> Option<Destination> {
        self.bank_id
            .map(Destination::Existing)
            .or_else(|| self.new_bank_account().map(Destination::New))
    }

    fn gift_card(&self, side: TradeSide) -> Result<FlowRequest, FlowError> {
        Ok(FlowRequest::GiftCard {
            side,
            brand: self
                .brand
                .clone()
                .ok_or_else(|| FlowError::InvalidRequest("brand is required".to_owned()))?,
            // Card values are in dollars.
            amount: self.amount_in(Asset::Usdt)?,
            card_code: self.card_code.clone(),
        })
    }
}

impl TryFrom<Request> for FlowRequest {
    type Error = FlowError;

    fn try_from(request: Request) -> Result<Self, Self::Error> {
        let flow = match request.flow {
            FlowKind::Fund => {
                let asset = request.asset()?;
                FlowRequest::Fund {
                    asset,
                    amount: request.amount_in(asset)?,
                }
            }
            FlowKind::Send => {
                let asset = request.asset()?;
                FlowRequest::Send {
                    asset,
                    amount: request.amount_in(asset)?,
                    recipient: request.recipient.clone().unwrap_or_default(),
                }
            }
            FlowKind::Withdraw => {
                let asset = request.asset()?;
                FlowRequest::Withdraw {
                    asset,
                    amount: request.amount_in(asset)?,
                    destination: request.destination(),
                }
            }
            // Buys are entered in Naira, sells in units of the asset.
            FlowKind::Buy => FlowRequest::Trade {
                side: TradeSide::Buy,
                asset: request.asset()?,
                amount: request.amount_in(Asset::Ngn)?,
                payout: request.destination(),
            },
            FlowKind::Sell => {
                let asset = request.asset()?;
                FlowRequest::Trade {
                    side: TradeSide::Sell,
                    asset,
                    amount: request.amount_in(asset)?,
                    payout: request.destination(),
                }
            }
            FlowKind::GiftcardBuy => request.gift_card(TradeSide::Buy)?,
            FlowKind::GiftcardSell => request.gift_card(TradeSide::Sell)?,
            FlowKind::Utility => FlowRequest::Utility {
                provider: request.provider.clone().unwrap_or_default(),
                beneficiary: request.beneficiary.clone().unwrap_or_default(),
                amount: request.amount_in(Asset::Ngn)?,
            },
            FlowKind::AddBank => FlowRequest::LinkBankAccount(
                request
                    .new_bank_account()
                    .ok_or(FlowError::InvalidBankDetails)?,
            ),
            FlowKind::RemoveBank => FlowRequest::UnlinkBankAccount(
                request
                    .bank_id
                    .ok_or_else(|| FlowError::InvalidRequest("bank_id is required".to_owned()))?,
            ),
        };
        Ok(flow)
    }
}

#[cfg(test)]
mod tests {
    use csv::{ReaderBuilder, Trim};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::wallet::format::AmountInputError;

    fn parse(data: &str) -> Vec<Request> {
        ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(data.as_bytes())
            .deserialize()
            .map(Result::unwrap)
            .collect()
    }

    const HEADER: &str = "flow,asset,amount,bank_id,bank_name,account_number,account_name,\
                          recipient,brand,card_code,provider,beneficiary\n";

    #[test]
    fn test_fund_row() {
        let rows = parse(&format!("{HEADER}fund,NGN,\"1,500.25\",,,,,,,,,\n"));
        let flow = FlowRequest::try_from(rows[0].clone()).unwrap();
        assert_eq!(
            flow,
            FlowRequest::Fund {
                asset: Asset::Ngn,
                amount: dec!(1500.25)
            }
        );
    }

    #[test]
    fn test_withdraw_row_with_new_account() {
        let rows = parse(&format!(
            "{HEADER}withdraw,USDT,20,,GTBank,0123456789,Ada Obi,,,,,\n"
        ));
        let flow = FlowRequest::try_from(rows[0].clone()).unwrap();
        let FlowRequest::Withdraw {
            destination: Some(Destination::New(account)),
            ..
        } = flow
        else {
            panic!("expected a withdrawal to a new account");
        };
        assert_eq!(account.bank_name, "GTBank");
        assert_eq!(account.account_name.as_deref(), Some("Ada Obi"));
    }

    #[test]
    fn test_withdraw_row_prefers_existing_account() {
        let rows = parse(&format!("{HEADER}withdraw,NGN,20,17,GTBank,0123456789,,,,,,\n"));
        let flow = FlowRequest::try_from(rows[0].clone()).unwrap();
        assert!(matches!(
            flow,
            FlowRequest::Withdraw {
                destination: Some(Destination::Existing(17)),
                ..
            }
        ));
    }

    #[test]
    fn test_missing_amount() {
        let rows = parse(&format!("{HEADER}fund,BTC,,,,,,,,,,\n"));
        assert_eq!(
            FlowRequest::try_from(rows[0].clone()),
            Err(FlowError::InvalidAmount)
        );
    }

    #[test]
    fn test_amount_precision_follows_asset() {
        let rows = parse(&format!(
            "{HEADER}fund,NGN,0.00000001,,,,,,,,,\n\
             sell,BTC,0.00000001,,,,,,,,,\n\
             buy,BTC,\"5,000.125\",,,,,,,,,\n\
             send,SOL,1.2345,,,,,sol1example,,,,\n"
        ));
        assert_eq!(
            FlowRequest::try_from(rows[0].clone()),
            Err(FlowError::AmountInput(AmountInputError::TooManyDecimals {
                asset: Asset::Ngn,
                precision: 2,
            }))
        );
        assert!(matches!(
            FlowRequest::try_from(rows[1].clone()).unwrap(),
            FlowRequest::Trade {
                side: TradeSide::Sell,
                amount,
                ..
            } if amount == dec!(0.00000001)
        ));
        assert!(matches!(
            FlowRequest::try_from(rows[2].clone()),
            Err(FlowError::AmountInput(AmountInputError::TooManyDecimals {
                asset: Asset::Ngn,
                ..
            }))
        ));
        assert!(FlowRequest::try_from(rows[3].clone()).is_ok());
    }

    #[test]
    fn test_giftcard_and_remove_rows() {
        let rows = parse(&format!(
            "{HEADER}giftcard_sell,,100,,,,,,steam,STM-42,,\nremove_bank,,,12,,,,,,,,\n"
        ));
        assert_eq!(rows[0].get_flow(), FlowKind::GiftcardSell);
        assert!(matches!(
            FlowRequest::try_from(rows[0].clone()).unwrap(),
            FlowRequest::GiftCard {
                side: TradeSide::Sell,
                ..
            }
        ));
        assert_eq!(
            FlowRequest::try_from(rows[1].clone()).unwrap(),
            FlowRequest::UnlinkBankAccount(12)
        );
    }
}
