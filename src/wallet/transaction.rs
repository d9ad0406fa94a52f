//! Informational activity log. Records never feed back into balances.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wallet::types::{Asset, Money, TransactionId};

/// Enum representing what kind of activity a record describes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Fund,
    Send,
    Withdrawal,
    TradeBuy,
    TradeSell,
    GiftcardBuy,
    GiftcardSell,
    Utility,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
}

/// Represents one entry of the activity log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// The unique identifier for this record.
    id: TransactionId,

    /// The kind of activity (e.g., Fund, Withdrawal, etc.)
    #[serde(rename = "type")]
    kind: TransactionKind,

    /// The asset whose balance moved.
    asset: Asset,

    /// The amount that moved, in units of `asset`.
    amount: Money,

    status: TransactionStatus,

    created_at: DateTime<Utc>,

    /// Free-form detail such as a recipient or a gift card brand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl TransactionRecord {
    pub fn get_id(&self) -> TransactionId {
        self.id
    }

    pub fn get_kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn get_asset(&self) -> Asset {
        self.asset
    }

    pub fn get_amount(&self) -> Money {
        self.amount
    }

    pub fn get_status(&self) -> TransactionStatus {
        self.status
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Details of an activity about to be logged. The log assigns id and time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub asset: Asset,
    pub amount: Money,
    pub status: TransactionStatus,
    pub description: Option<String>,
}

impl NewTransaction {
    pub fn completed(kind: TransactionKind, asset: Asset, amount: Money) -> Self {
        NewTransaction {
            kind,
            asset,
            amount,
            status: TransactionStatus::Completed,
            description: None,
        }
    }

    pub fn pending(kind: TransactionKind, asset: Asset, amount: Money) -> Self {
        NewTransaction {
            status: TransactionStatus::Pending,
            ..NewTransaction::completed(kind, asset, amount)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Append-only list of records, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionLog {
    records: Vec<TransactionRecord>,
}

impl TransactionLog {
    pub fn as_slice(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record stamped with the current time.
    pub fn append(&mut self, new: NewTransaction) -> TransactionId {
        let id = match self.records.iter().map(|r| r.id).max() {
            None => 1,
            Some(max) => max.checked_add(1).unwrap_or_else(|| {
                (1..)
                    .find(|id| self.records.iter().all(|r| r.id != *id))
                    .unwrap_or_default()
            }),
        };
        self.records.push(TransactionRecord {
            id,
            kind: new.kind,
            asset: new.asset,
            amount: new.amount,
            status: new.status,
            created_at: Utc::now(),
            description: new.description,
        });
        id
    }

    /// The most recent `count` records, newest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter().rev().take(count)
    }
}
