//! The wallet ledger: balances, linked bank accounts and the activity log,
//! kept in sync with a [`SnapshotStore`].
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::wallet::{
    balance::{BalanceError, Balances},
    bank_account::{BankAccount, NewBankAccount},
    persistence::{Snapshot, SnapshotStore},
    transaction::{NewTransaction, TransactionRecord},
    types::{Asset, BankAccountId, Money, TransactionId},
};

/// One leg of an atomic batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Credit { asset: Asset, amount: Money },
    Debit { asset: Asset, amount: Money },
}

/// Errors from [`Ledger::commit`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Step {step} of the batch failed: {source}")]
    StepFailed { step: usize, source: BalanceError },
}

/// Single owner of the wallet state for a session.
pub struct Ledger<S> {
    store: S,
    state: Snapshot,
    initialized: bool,
}

impl<S: SnapshotStore> Ledger<S> {
    /// Creates a ledger holding default state. Nothing is written to the store
    /// until [`Ledger::initialize`] has loaded it.
    pub fn new(store: S) -> Self {
        Ledger {
            store,
            state: Snapshot::default(),
            initialized: false,
        }
    }

    /// Creates a ledger and loads the persisted snapshot.
    pub fn open(store: S) -> Self {
        let mut ledger = Ledger::new(store);
        ledger.initialize();
        ledger
    }

    /// Replaces the in-memory state with the persisted snapshot and enables
    /// writes.
    pub fn initialize(&mut self) {
        self.state = self.store.load();
        self.initialized = true;
        info!(
            bank_accounts = self.state.bank_accounts.len(),
            transactions = self.state.transactions.len(),
            "wallet ledger loaded"
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn balances(&self) -> &Balances {
        &self.state.balances
    }

    pub fn balance(&self, asset: Asset) -> Money {
        self.state.balances.get(asset)
    }

    pub fn bank_accounts(&self) -> &[BankAccount] {
        self.state.bank_accounts.as_slice()
    }

    pub fn bank_account(&self, id: BankAccountId) -> Option<&BankAccount> {
        self.state.bank_accounts.get(id)
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        self.state.transactions.as_slice()
    }

    /// A copy of the full state.
    pub fn snapshot(&self) -> Snapshot {
        self.state.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Adds `amount` to the asset. Non-positive amounts, and amounts the
    /// balance cannot hold, are ignored and `false` is returned.
    pub fn credit(&mut self, asset: Asset, amount: Money) -> bool {
        if self.state.balances.credit(asset, amount) {
            debug!(%asset, %amount, "credited");
            self.persist();
            true
        } else {
            debug!(%asset, %amount, "credit refused");
            false
        }
    }

    /// Subtracts `amount` from the asset if the balance covers it.
    /// Returns `false` and leaves the balance untouched otherwise.
    pub fn debit(&mut self, asset: Asset, amount: Money) -> bool {
        match self.state.balances.debit(asset, amount) {
            Ok(()) => {
                debug!(%asset, %amount, "debited");
                self.persist();
                true
            }
            Err(err) => {
                debug!(%asset, %amount, "debit refused: {err}");
                false
            }
        }
    }

    /// Applies every mutation or none of them.
    pub fn commit(&mut self, mutations: &[Mutation]) -> Result<(), LedgerError> {
        let mut draft = self.state.balances.clone();
        for (step, mutation) in mutations.iter().enumerate() {
            match *mutation {
                Mutation::Credit { asset, amount } => {
                    if !draft.credit(asset, amount) {
                        return Err(LedgerError::StepFailed {
                            step,
                            source: BalanceError::InvalidAmount,
                        });
                    }
                }
                Mutation::Debit { asset, amount } => draft
                    .debit(asset, amount)
                    .map_err(|source| LedgerError::StepFailed { step, source })?,
            }
        }
        self.state.balances = draft;
        self.persist();
        Ok(())
    }

    /// Links a bank account and returns its id.
    pub fn add_bank_account(&mut self, account: NewBankAccount) -> BankAccountId {
        let id = self.state.bank_accounts.add(account);
        info!(id, "bank account linked");
        self.persist();
        id
    }

    /// Unlinks a bank account. Unknown ids are ignored.
    pub fn remove_bank_account(&mut self, id: BankAccountId) {
        if self.state.bank_accounts.remove(id) {
            info!(id, "bank account removed");
            self.persist();
        }
    }

    /// Appends an informational record to the activity log.
    pub fn record(&mut self, transaction: NewTransaction) -> TransactionId {
        let id = self.state.transactions.append(transaction);
        self.persist();
        id
    }

    fn persist(&mut self) {
        if !self.initialized {
            debug!("ledger not initialized, skipping write");
            return;
        }
        if let Err(err) = self.store.save(&self.state) {
            warn!("failed to persist wallet state: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::wallet::persistence::{
        ACCOUNTS_KEY, BALANCES_KEY, KeyValueStore, MemoryBackend, StorageBackend,
    };
    use crate::wallet::transaction::TransactionKind;

    fn ledger() -> Ledger<KeyValueStore<MemoryBackend>> {
        Ledger::open(KeyValueStore::new(MemoryBackend::new()))
    }

    #[test]
    fn test_insufficient_funds() {
        let mut ledger = ledger();
        ledger.credit(Asset::Ngn, dec!(100.00));
        assert!(!ledger.debit(Asset::Ngn, dec!(150.00)));
        assert_eq!(ledger.balance(Asset::Ngn), dec!(100.00));
    }

    #[test]
    fn test_successful_debit() {
        let mut ledger = ledger();
        ledger.credit(Asset::Usdt, dec!(50.00));
        assert!(ledger.debit(Asset::Usdt, dec!(20.00)));
        assert_eq!(ledger.balance(Asset::Usdt), dec!(30.00));
    }

    #[test]
    fn test_credit_precision() {
        let mut ledger = ledger();
        ledger.credit(Asset::Btc, dec!(0.123456789));
        assert_eq!(ledger.balance(Asset::Btc), dec!(0.12345679));
    }

    #[test]
    fn test_debit_sequence_never_negative() {
        let mut ledger = ledger();
        ledger.credit(Asset::Sol, dec!(3.3));
        let amounts = [
            dec!(1.1),
            dec!(2.5),
            dec!(1.1),
            dec!(0.0000001),
            dec!(1.1),
            dec!(0.5),
        ];
        for amount in amounts {
            let before = ledger.balance(Asset::Sol);
            if ledger.debit(Asset::Sol, amount) {
                assert!(ledger.balance(Asset::Sol) >= Money::ZERO);
            } else {
                assert_eq!(ledger.balance(Asset::Sol), before);
            }
        }
        assert_eq!(ledger.balance(Asset::Sol), dec!(0.5999999));
    }

    #[test]
    fn test_read_is_idempotent() {
        let mut ledger = ledger();
        ledger.credit(Asset::Eth, dec!(2));
        ledger.add_bank_account(NewBankAccount::new("GTBank", "0123456789"));
        assert_eq!(ledger.snapshot(), ledger.snapshot());
        assert_eq!(ledger.bank_accounts(), ledger.bank_accounts());
    }

    #[test]
    fn test_bank_account_lifecycle() {
        let mut ledger = ledger();
        let before = ledger.snapshot().bank_accounts;
        let id = ledger.add_bank_account(NewBankAccount::new("GTBank", "0123456789"));
        assert!(ledger.bank_account(id).is_some());
        ledger.remove_bank_account(id);
        assert_eq!(ledger.snapshot().bank_accounts, before);
    }

    #[test]
    fn test_reload_round_trip() {
        let mut ledger = ledger();
        ledger.credit(Asset::Ngn, dec!(5000));
        ledger.credit(Asset::Btc, dec!(0.00042));
        assert!(ledger.debit(Asset::Ngn, dec!(1234.56)));
        ledger.add_bank_account(
            NewBankAccount::new("Zenith Bank", "9876543210").with_account_name("Ada Obi"),
        );
        let state = ledger.snapshot();

        let reloaded = Ledger::open(KeyValueStore::new(ledger.store().backend().clone()));
        assert_eq!(reloaded.snapshot(), state);
    }

    #[test]
    fn test_reload_keeps_every_digit() {
        let mut ledger = ledger();
        ledger.credit(Asset::Ngn, dec!(1234567890.12345678));
        ledger.record(NewTransaction::completed(
            TransactionKind::TradeSell,
            Asset::Ngn,
            dec!(1234567890.12345678),
        ));
        let state = ledger.snapshot();

        let reloaded = Ledger::open(KeyValueStore::new(ledger.store().backend().clone()));
        assert_eq!(reloaded.balance(Asset::Ngn), dec!(1234567890.12345678));
        assert_eq!(reloaded.transactions()[0].get_amount(), dec!(1234567890.12345678));
        assert_eq!(reloaded.snapshot(), state);
    }

    #[test]
    fn test_credit_overflow_leaves_state() {
        let mut ledger = ledger();
        assert!(ledger.credit(Asset::Ngn, Money::MAX));
        let before = ledger.snapshot();
        assert!(!ledger.credit(Asset::Ngn, Money::MAX));
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_corrupt_balances_keep_accounts() {
        let mut ledger = ledger();
        ledger.credit(Asset::Ngn, dec!(700));
        ledger.add_bank_account(NewBankAccount::new("GTBank", "0123456789"));
        let accounts = ledger.bank_accounts().to_vec();

        let mut backend = ledger.store().backend().clone();
        backend.insert_raw(BALANCES_KEY, "{\"NGN\": 70");
        let reloaded = Ledger::open(KeyValueStore::new(backend));
        assert_eq!(reloaded.balances(), &Balances::default());
        assert_eq!(reloaded.bank_accounts(), accounts.as_slice());
    }

    #[test]
    fn test_no_writes_before_initialize() {
        let stored = r#"[{"id":1,"bankName":"GTBank","accountNumber":"0123456789"}]"#;
        let mut backend = MemoryBackend::new();
        backend.set(ACCOUNTS_KEY, stored.to_owned()).unwrap();
        let mut ledger = Ledger::new(KeyValueStore::new(backend));
        ledger.credit(Asset::Ngn, dec!(10));
        assert!(!ledger.is_initialized());
        assert!(ledger.store().backend().raw(BALANCES_KEY).is_none());

        ledger.initialize();
        assert_eq!(ledger.bank_accounts().len(), 1);
        assert_eq!(ledger.balance(Asset::Ngn), Money::ZERO);
    }

    #[test]
    fn test_failed_write_keeps_memory_state() {
        let mut ledger = Ledger::open(KeyValueStore::new(MemoryBackend::with_quota(8)));
        ledger.credit(Asset::Usdt, dec!(75));
        assert_eq!(ledger.balance(Asset::Usdt), dec!(75));
        assert!(ledger.store().backend().raw(BALANCES_KEY).is_none());
    }

    #[test]
    fn test_commit_is_atomic() {
        let mut ledger = ledger();
        ledger.credit(Asset::Ngn, dec!(1000));
        let before = ledger.snapshot();
        let result = ledger.commit(&[
            Mutation::Credit { asset: Asset::Usdt, amount: dec!(1) },
            Mutation::Debit { asset: Asset::Ngn, amount: dec!(2000) },
        ]);
        assert_eq!(
            result,
            Err(LedgerError::StepFailed {
                step: 1,
                source: BalanceError::InsufficientFunds(Asset::Ngn),
            })
        );
        assert_eq!(ledger.snapshot(), before);

        ledger
            .commit(&[
                Mutation::Debit { asset: Asset::Ngn, amount: dec!(1000) },
                Mutation::Credit { asset: Asset::Usdt, amount: dec!(0.58) },
            ])
            .unwrap();
        assert_eq!(ledger.balance(Asset::Ngn), Money::ZERO);
        assert_eq!(ledger.balance(Asset::Usdt), dec!(0.58));
    }
}
