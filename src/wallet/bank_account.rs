//! Registry of linked bank accounts used as settlement destinations.
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::wallet::types::BankAccountId;

/// Minimum number of characters accepted for an account number.
pub const MIN_ACCOUNT_NUMBER_LEN: usize = 10;

/// A linked external bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: BankAccountId,
    pub bank_name: String,
    pub account_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

/// A bank account about to be linked. The registry assigns the id when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBankAccount {
    #[serde(default)]
    pub id: Option<BankAccountId>,
    pub bank_name: String,
    pub account_number: String,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
}

impl NewBankAccount {
    pub fn new(bank_name: impl Into<String>, account_number: impl Into<String>) -> Self {
        NewBankAccount {
            bank_name: bank_name.into(),
            account_number: account_number.into(),
            ..Default::default()
        }
    }

    pub fn with_account_type(mut self, account_type: impl Into<String>) -> Self {
        self.account_type = Some(account_type.into());
        self
    }

    pub fn with_account_name(mut self, account_name: impl Into<String>) -> Self {
        self.account_name = Some(account_name.into());
        self
    }

    /// Checks the details a linking form requires: a bank name and an account
    /// number of at least [`MIN_ACCOUNT_NUMBER_LEN`] digits.
    pub fn has_valid_details(&self) -> bool {
        let number = self.account_number.trim();
        !self.bank_name.trim().is_empty()
            && number.len() >= MIN_ACCOUNT_NUMBER_LEN
            && number.chars().all(|c| c.is_ascii_digit())
    }
}

/// The list of linked bank accounts, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<BankAccount>", into = "Vec<BankAccount>")]
pub struct BankAccounts {
    accounts: Vec<BankAccount>,
    /// Highest id handed out so far, so ids keep increasing within a millisecond.
    last_id: BankAccountId,
}

impl PartialEq for BankAccounts {
    fn eq(&self, other: &Self) -> bool {
        self.accounts == other.accounts
    }
}

impl Eq for BankAccounts {}

impl From<Vec<BankAccount>> for BankAccounts {
    fn from(accounts: Vec<BankAccount>) -> Self {
        let last_id = accounts.iter().map(|a| a.id).max().unwrap_or_default();
        BankAccounts { accounts, last_id }
    }
}

impl From<BankAccounts> for Vec<BankAccount> {
    fn from(registry: BankAccounts) -> Self {
        registry.accounts
    }
}

impl BankAccounts {
    pub fn as_slice(&self) -> &[BankAccount] {
        &self.accounts
    }

    pub fn get(&self, id: BankAccountId) -> Option<&BankAccount> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: BankAccountId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Appends the account and returns its id. A caller-supplied id is kept
    /// unless another account already uses it. Duplicate account numbers are
    /// allowed.
    pub fn add(&mut self, new: NewBankAccount) -> BankAccountId {
        let id = match new.id {
            Some(id) if !self.contains(id) => id,
            _ => self.next_id(),
        };
        self.last_id = self.last_id.max(id);
        self.accounts.push(BankAccount {
            id,
            bank_name: new.bank_name,
            account_number: new.account_number,
            account_type: new.account_type,
            account_name: new.account_name,
        });
        id
    }

    /// Removes the account with the given id. Returns whether one was removed.
    pub fn remove(&mut self, id: BankAccountId) -> bool {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.id != id);
        self.accounts.len() != before
    }

    /// Millisecond timestamp, bumped past the last issued id when needed.
    /// Once ids run out at the top of the range, the lowest free id is used.
    fn next_id(&self) -> BankAccountId {
        let now = BankAccountId::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        match self.last_id.checked_add(1) {
            Some(next) => now.max(next),
            None => (1..).find(|id| !self.contains(*id)).unwrap_or_default(),
        }
    }
}
