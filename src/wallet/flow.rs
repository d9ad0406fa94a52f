//! Caller-side flows: validate a request, wait out the simulated settlement
//! delay, then apply the matching ledger mutations.
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::wallet::{
    bank_account::NewBankAccount,
    format::AmountInputError,
    giftcard::find_brand,
    balance::BalanceError,
    ledger::{Ledger, LedgerError, Mutation},
    persistence::SnapshotStore,
    rates::{RateSource, StaticRates},
    transaction::{NewTransaction, TransactionKind},
    types::{Asset, BankAccountId, Money, TransactionId, round_ledger},
};

/// Smallest utility payment accepted, in Naira.
pub const UTILITY_MINIMUM: Money = Decimal::ONE_HUNDRED;

/// Account type given to accounts linked from a form.
const DEFAULT_ACCOUNT_TYPE: &str = "Savings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Where a payout goes: a linked account, or one to link on the spot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Existing(BankAccountId),
    New(NewBankAccount),
}

/// A request raised by one of the dashboard forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowRequest {
    Fund {
        asset: Asset,
        amount: Money,
    },
    Send {
        asset: Asset,
        amount: Money,
        recipient: String,
    },
    Withdraw {
        asset: Asset,
        amount: Money,
        destination: Option<Destination>,
    },
    /// `amount` is Naira when buying and units of `asset` when selling.
    Trade {
        side: TradeSide,
        asset: Asset,
        amount: Money,
        payout: Option<Destination>,
    },
    /// `amount` is the card value in dollars.
    GiftCard {
        side: TradeSide,
        brand: String,
        amount: Money,
        card_code: Option<String>,
    },
    Utility {
        provider: String,
        beneficiary: String,
        amount: Money,
    },
    LinkBankAccount(NewBankAccount),
    UnlinkBankAccount(BankAccountId),
}

/// What a completed flow produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    Transaction(TransactionId),
    BankAccountLinked(BankAccountId),
    BankAccountRemoved(BankAccountId),
}

/// Errors reported back to the form that raised the request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Enter a valid amount")]
    InvalidAmount,
    #[error("Insufficient {0} balance")]
    InsufficientBalance(Asset),
    #[error("Please select a bank account")]
    NoDestination,
    #[error("Please provide valid bank details")]
    InvalidBankDetails,
    #[error("Bank account {0} is not linked")]
    UnknownBankAccount(BankAccountId),
    #[error("Please provide the card codes")]
    MissingCardCode,
    #[error("Unknown gift card brand: {0}")]
    UnknownBrand(String),
    #[error("Minimum payment is ₦{0}")]
    BelowMinimum(Money),
    #[error("Please fill all fields: {0} is missing")]
    MissingField(&'static str),
    #[error("{0} cannot be traded against itself")]
    UnsupportedAsset(Asset),
    #[error("No rate available from {from} to {to}")]
    RateUnavailable { from: Asset, to: Asset },
    #[error(transparent)]
    AmountInput(#[from] AmountInputError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Runs flows against a ledger.
pub struct FlowRunner<R = StaticRates> {
    settlement_delay: Duration,
    rates: R,
}

impl FlowRunner<StaticRates> {
    pub fn with_static_rates(settlement_delay: Duration) -> Self {
        FlowRunner::new(settlement_delay, StaticRates)
    }
}

impl<R: RateSource> FlowRunner<R> {
    pub fn new(settlement_delay: Duration, rates: R) -> Self {
        FlowRunner {
            settlement_delay,
            rates,
        }
    }

    pub fn rates(&self) -> &R {
        &self.rates
    }

    /// Validates and applies one request.
    pub async fn execute<S: SnapshotStore>(
        &self,
        ledger: &mut Ledger<S>,
        request: FlowRequest,
    ) -> Result<Receipt, FlowError> {
        match request {
            FlowRequest::Fund { asset, amount } => self.fund(ledger, asset, amount).await,
            FlowRequest::Send {
                asset,
                amount,
                recipient,
            } => self.send(ledger, asset, amount, recipient).await,
            FlowRequest::Withdraw {
                asset,
                amount,
                destination,
            } => self.withdraw(ledger, asset, amount, destination).await,
            FlowRequest::Trade {
                side: TradeSide::Buy,
                asset,
                amount,
                ..
            } => self.buy(ledger, asset, amount).await,
            FlowRequest::Trade {
                side: TradeSide::Sell,
                asset,
                amount,
                payout,
            } => self.sell(ledger, asset, amount, payout).await,
            FlowRequest::GiftCard {
                side,
                brand,
                amount,
                card_code,
            } => self.gift_card(ledger, side, &brand, amount, card_code).await,
            FlowRequest::Utility {
                provider,
                beneficiary,
                amount,
            } => self.utility(ledger, provider, beneficiary, amount).await,
            FlowRequest::LinkBankAccount(account) => {
                if !account.has_valid_details() {
                    return Err(FlowError::InvalidBankDetails);
                }
                Ok(Receipt::BankAccountLinked(
                    ledger.add_bank_account(with_default_type(account)),
                ))
            }
            FlowRequest::UnlinkBankAccount(id) => {
                ledger.remove_bank_account(id);
                Ok(Receipt::BankAccountRemoved(id))
            }
        }
    }

    async fn fund<S: SnapshotStore>(
        &self,
        ledger: &mut Ledger<S>,
        asset: Asset,
        amount: Money,
    ) -> Result<Receipt, FlowError> {
        ensure_positive(amount)?;
        ensure_room(ledger, asset, amount)?;
        self.settle().await;
        credit(ledger, asset, amount)?;
        info!(%asset, %amount, "deposit confirmed");
        let id = ledger.record(NewTransaction::completed(TransactionKind::Fund, asset, amount));
        Ok(Receipt::Transaction(id))
    }

    async fn send<S: SnapshotStore>(
        &self,
        ledger: &mut Ledger<S>,
        asset: Asset,
        amount: Money,
        recipient: String,
    ) -> Result<Receipt, FlowError> {
        ensure_positive(amount)?;
        ensure_covered(ledger, asset, amount)?;
        if recipient.trim().is_empty() {
            return Err(FlowError::MissingField("recipient"));
        }
        self.settle().await;
        debit(ledger, asset, amount)?;
        let id = ledger.record(
            NewTransaction::completed(TransactionKind::Send, asset, amount)
                .with_description(recipient),
        );
        Ok(Receipt::Transaction(id))
    }

    async fn withdraw<S: SnapshotStore>(
        &self,
        ledger: &mut Ledger<S>,
        asset: Asset,
        amount: Money,
        destination: Option<Destination>,
    ) -> Result<Receipt, FlowError> {
        ensure_positive(amount)?;
        ensure_covered(ledger, asset, amount)?;
        let destination = destination.ok_or(FlowError::NoDestination)?;
        let bank_id = resolve_destination(ledger, destination, NewBankAccount::has_valid_details)?;
        self.settle().await;
        debit(ledger, asset, amount)?;
        let description = ledger
            .bank_account(bank_id)
            .map(|bank| format!("{} {}", bank.bank_name, bank.account_number))
            .unwrap_or_default();
        let id = ledger.record(
            NewTransaction::completed(TransactionKind::Withdrawal, asset, amount)
                .with_description(description),
        );
        Ok(Receipt::Transaction(id))
    }

    /// Spends Naira for `asset`. Both legs commit together or not at all.
    async fn buy<S: SnapshotStore>(
        &self,
        ledger: &mut Ledger<S>,
        asset: Asset,
        naira: Money,
    ) -> Result<Receipt, FlowError> {
        ensure_positive(naira)?;
        let rate = self.naira_rate(asset)?;
        ensure_covered(ledger, Asset::Ngn, naira)?;
        let received = naira
            .checked_div(rate)
            .map(round_ledger)
            .filter(|received| *received > Money::ZERO)
            .ok_or(FlowError::InvalidAmount)?;
        self.settle().await;
        ledger
            .commit(&[
                Mutation::Debit {
                    asset: Asset::Ngn,
                    amount: naira,
                },
                Mutation::Credit {
                    asset,
                    amount: received,
                },
            ])
            .map_err(|LedgerError::StepFailed { source, .. }| match source {
                BalanceError::InsufficientFunds(asset) => FlowError::InsufficientBalance(asset),
                BalanceError::InvalidAmount => FlowError::InvalidAmount,
            })?;
        info!(%asset, %naira, %received, "buy settled");
        let id = ledger.record(
            NewTransaction::completed(TransactionKind::TradeBuy, asset, received)
                .with_description(format!("Paid ₦{naira}")),
        );
        Ok(Receipt::Transaction(id))
    }

    /// Sells `asset` delivered from an external wallet; Naira is credited.
    async fn sell<S: SnapshotStore>(
        &self,
        ledger: &mut Ledger<S>,
        asset: Asset,
        amount: Money,
        payout: Option<Destination>,
    ) -> Result<Receipt, FlowError> {
        ensure_positive(amount)?;
        self.naira_rate(asset)?;
        let naira = self
            .rates
            .convert(amount, asset, Asset::Ngn)
            .ok_or(FlowError::InvalidAmount)?;
        ensure_room(ledger, Asset::Ngn, naira)?;
        if let Some(payout) = payout {
            resolve_destination(ledger, payout, |account| {
                !account.bank_name.trim().is_empty() && !account.account_number.trim().is_empty()
            })?;
        }
        self.settle().await;
        credit(ledger, Asset::Ngn, naira)?;
        info!(%asset, %amount, %naira, "sell settled");
        let id = ledger.record(
            NewTransaction::completed(TransactionKind::TradeSell, Asset::Ngn, naira)
                .with_description(format!("Sold {amount} {asset}")),
        );
        Ok(Receipt::Transaction(id))
    }

    async fn gift_card<S: SnapshotStore>(
        &self,
        ledger: &mut Ledger<S>,
        side: TradeSide,
        brand: &str,
        amount: Money,
        card_code: Option<String>,
    ) -> Result<Receipt, FlowError> {
        let brand = find_brand(brand).ok_or_else(|| FlowError::UnknownBrand(brand.to_owned()))?;
        ensure_positive(amount)?;
        match side {
            TradeSide::Buy => {
                let total = checked_product(amount, brand.buy_rate())?;
                ensure_covered(ledger, Asset::Ngn, total)?;
                self.settle().await;
                debit(ledger, Asset::Ngn, total)?;
                let id = ledger.record(
                    NewTransaction::completed(TransactionKind::GiftcardBuy, Asset::Ngn, total)
                        .with_description(brand.name),
                );
                Ok(Receipt::Transaction(id))
            }
            TradeSide::Sell => {
                if card_code.as_deref().is_none_or(|code| code.trim().is_empty()) {
                    return Err(FlowError::MissingCardCode);
                }
                let total = checked_product(amount, brand.sell_rate())?;
                ensure_room(ledger, Asset::Ngn, total)?;
                self.settle().await;
                credit(ledger, Asset::Ngn, total)?;
                // Credited straight away; the codes themselves await review.
                let id = ledger.record(
                    NewTransaction::pending(TransactionKind::GiftcardSell, Asset::Ngn, total)
                        .with_description(brand.name),
                );
                Ok(Receipt::Transaction(id))
            }
        }
    }

    async fn utility<S: SnapshotStore>(
        &self,
        ledger: &mut Ledger<S>,
        provider: String,
        beneficiary: String,
        amount: Money,
    ) -> Result<Receipt, FlowError> {
        if amount < UTILITY_MINIMUM {
            return Err(FlowError::BelowMinimum(UTILITY_MINIMUM));
        }
        ensure_covered(ledger, Asset::Ngn, amount)?;
        if provider.trim().is_empty() {
            return Err(FlowError::MissingField("provider"));
        }
        if beneficiary.trim().is_empty() {
            return Err(FlowError::MissingField("beneficiary"));
        }
        self.settle().await;
        debit(ledger, Asset::Ngn, amount)?;
        let id = ledger.record(
            NewTransaction::completed(TransactionKind::Utility, Asset::Ngn, amount)
                .with_description(format!("{provider} {beneficiary}")),
        );
        Ok(Receipt::Transaction(id))
    }

    fn naira_rate(&self, asset: Asset) -> Result<Money, FlowError> {
        if asset.is_fiat() {
            return Err(FlowError::UnsupportedAsset(asset));
        }
        self.rates
            .rate(asset, Asset::Ngn)
            .filter(|rate| *rate > Money::ZERO)
            .ok_or(FlowError::RateUnavailable {
                from: asset,
                to: Asset::Ngn,
            })
    }

    async fn settle(&self) {
        if !self.settlement_delay.is_zero() {
            tokio::time::sleep(self.settlement_delay).await;
        }
    }
}

fn ensure_positive(amount: Money) -> Result<(), FlowError> {
    if amount > Money::ZERO {
        Ok(())
    } else {
        Err(FlowError::InvalidAmount)
    }
}

fn ensure_covered<S: SnapshotStore>(
    ledger: &Ledger<S>,
    asset: Asset,
    amount: Money,
) -> Result<(), FlowError> {
    if amount > ledger.balance(asset) {
        Err(FlowError::InsufficientBalance(asset))
    } else {
        Ok(())
    }
}

fn checked_product(amount: Money, rate: Money) -> Result<Money, FlowError> {
    amount.checked_mul(rate).ok_or(FlowError::InvalidAmount)
}

/// Rejects a credit the balance could not hold.
fn ensure_room<S: SnapshotStore>(
    ledger: &Ledger<S>,
    asset: Asset,
    amount: Money,
) -> Result<(), FlowError> {
    match ledger.balance(asset).checked_add(amount) {
        Some(_) => Ok(()),
        None => Err(FlowError::InvalidAmount),
    }
}

fn credit<S: SnapshotStore>(
    ledger: &mut Ledger<S>,
    asset: Asset,
    amount: Money,
) -> Result<(), FlowError> {
    if ledger.credit(asset, amount) {
        Ok(())
    } else {
        Err(FlowError::InvalidAmount)
    }
}

/// The ledger re-checks the balance; it may have moved during the delay.
fn debit<S: SnapshotStore>(
    ledger: &mut Ledger<S>,
    asset: Asset,
    amount: Money,
) -> Result<(), FlowError> {
    if ledger.debit(asset, amount) {
        Ok(())
    } else {
        Err(FlowError::InsufficientBalance(asset))
    }
}

fn with_default_type(mut account: NewBankAccount) -> NewBankAccount {
    if account.account_type.is_none() {
        account.account_type = Some(DEFAULT_ACCOUNT_TYPE.to_owned());
    }
    account
}

/// Returns the id of an existing account, or links a new one if `valid`
/// accepts its details.
fn resolve_destination<S: SnapshotStore>(
    ledger: &mut Ledger<S>,
    destination: Destination,
    valid: impl Fn(&NewBankAccount) -> bool,
) -> Result<BankAccountId, FlowError> {
    match destination {
        Destination::Existing(id) if ledger.bank_account(id).is_some() => Ok(id),
        Destination::Existing(id) => Err(FlowError::UnknownBankAccount(id)),
        Destination::New(account) if valid(&account) => {
            Ok(ledger.add_bank_account(with_default_type(account)))
        }
        Destination::New(_) => Err(FlowError::InvalidBankDetails),
    }
}
