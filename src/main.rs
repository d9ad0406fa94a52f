use anyhow::Context;
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use kambit_wallet::{
    config::Config,
    wallet::{
        Asset, DirectoryBackend, FlowRequest, FlowRunner, KeyValueStore, Ledger, Request, Session,
        StaticRates, format_amount, format_currency,
    },
};

/// One line of the balance report written to stdout.
#[derive(Serialize)]
struct BalanceRow {
    asset: &'static str,
    balance: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().collect::<Vec<_>>();
    if args.len() != 2 {
        eprintln!("Usage: {} <requests_csv_file>", args[0]);
        std::process::exit(1);
    }
    let input_file = &args[1];

    let config = Config::from_env();
    info!(data_dir = %config.data_dir.display(), "opening wallet");

    let store = KeyValueStore::new(DirectoryBackend::new(config.data_dir.clone()));
    let ledger = Ledger::open(store);
    let (sender, receiver) = mpsc::channel(config.channel_size);
    let mut session = Session::new(
        ledger,
        FlowRunner::with_static_rates(config.settlement_delay),
        receiver,
    );

    let handle = tokio::spawn(async move {
        session.run().await;
        session
    });

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(input_file)
        .with_context(|| format!("failed to read {input_file}"))?;

    for (line, row) in reader.deserialize::<Request>().enumerate() {
        let request = match row {
            Ok(request) => request,
            Err(err) => {
                warn!(line = line + 1, "skipping malformed row: {err}");
                continue;
            }
        };
        match FlowRequest::try_from(request) {
            Ok(flow) => {
                if let Err(err) = sender.send(flow).await {
                    warn!("Error sending request: {err}");
                }
            }
            Err(err) => warn!(line = line + 1, "skipping request: {err}"),
        }
    }

    drop(sender); // Close the sender to signal no more requests will be sent
    let session = handle
        .await
        .context("failed to join the session task")?;

    let mut writer = csv::Writer::from_writer(std::io::stdout());
    let balances = session.ledger().balances();
    for (asset, balance) in balances.iter() {
        writer.serialize(BalanceRow {
            asset: asset.code(),
            balance: format_amount(asset, balance),
        })?;
    }
    writer.flush()?;
    let total = balances.value_in(Asset::Ngn, &StaticRates);
    info!(total = %format_currency(Asset::Ngn, total), "portfolio value");
    Ok(())
}
