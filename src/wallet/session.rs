//! The `Session` module owns the ledger for one user session and processes
//! flow requests one at a time.
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::wallet::{
    flow::{FlowError, FlowRequest, FlowRunner, Receipt},
    ledger::Ledger,
    persistence::SnapshotStore,
    rates::{RateSource, StaticRates},
};

/// Represents a user session: the single ledger plus the queue feeding it.
pub struct Session<S, R = StaticRates> {
    /// The only ledger instance for this session.
    ledger: Ledger<S>,
    /// Runs the flows that mutate the ledger.
    runner: FlowRunner<R>,
    /// A channel receiver for incoming flow requests.
    receiver: mpsc::Receiver<FlowRequest>,
}

impl<S: SnapshotStore, R: RateSource> Session<S, R> {
    /// Creates a session around an already constructed ledger.
    pub fn new(
        ledger: Ledger<S>,
        runner: FlowRunner<R>,
        receiver: mpsc::Receiver<FlowRequest>,
    ) -> Self {
        Session {
            ledger,
            runner,
            receiver,
        }
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger<S> {
        self.ledger
    }

    /// Processes a single request to completion.
    pub async fn process(&mut self, request: FlowRequest) -> Result<Receipt, FlowError> {
        self.runner.execute(&mut self.ledger, request).await
    }

    /// Runs the session loop until every sender is dropped. Requests are
    /// handled strictly in arrival order; a failed request does not stop the
    /// loop.
    pub async fn run(&mut self) {
        while let Some(request) = self.receiver.recv().await {
            match self.process(request).await {
                Ok(receipt) => info!(?receipt, "request processed"),
                Err(e) => warn!("Error processing request: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use crate::wallet::{
        Asset, Destination, FlowRequest, FlowRunner, KeyValueStore, Ledger, MemoryBackend,
        NewBankAccount,
    };

    #[tokio::test]
    async fn test_requests_apply_in_order() {
        let (sender, receiver) = tokio::sync::mpsc::channel(100);
        let ledger = Ledger::open(KeyValueStore::new(MemoryBackend::new()));
        let mut session = super::Session::new(
            ledger,
            FlowRunner::with_static_rates(Duration::ZERO),
            receiver,
        );
        assert!(session.ledger().transactions().is_empty());

        sender
            .send(FlowRequest::Fund {
                asset: Asset::Ngn,
                amount: dec!(1000),
            })
            .await
            .unwrap();
        sender
            .send(FlowRequest::Withdraw {
                asset: Asset::Ngn,
                amount: dec!(5000),
                destination: Some(Destination::New(NewBankAccount::new(
                    "GTBank",
                    "0123456789",
                ))),
            })
            .await
            .unwrap();
        sender
            .send(FlowRequest::Withdraw {
                asset: Asset::Ngn,
                amount: dec!(250),
                destination: Some(Destination::New(NewBankAccount::new(
                    "GTBank",
                    "0123456789",
                ))),
            })
            .await
            .unwrap();
        drop(sender); // Close the sender to end the session loop
        session.run().await;

        let ledger = session.into_ledger();
        assert_eq!(ledger.balance(Asset::Ngn), dec!(750));
        assert_eq!(ledger.transactions().len(), 2);
        assert_eq!(ledger.bank_accounts().len(), 1);
    }
}
