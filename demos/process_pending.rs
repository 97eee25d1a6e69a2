//! Seed a few invoices and run one processing batch.
//!
//! Settings come from `.env`, `fatura.toml` and `ZATCA_*` variables. Without
//! `ZATCA_ENDPOINT` the batch runs in simulation mode.
//!
//! ```sh
//! RUST_LOG=fatura=debug cargo run --example process_pending --features all
//! ```

use std::sync::Arc;

use chrono::Utc;
use fatura::config::Settings;
use fatura::core::*;
use fatura::process::{InMemoryStore, InvoiceStore, Processor};
use fatura::submit::{OfflineSubmitter, Submitter, ZatcaClient};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ZatcaError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::load()?;
    tracing::info!(?settings, "settings loaded");

    let seller = settings.seller().unwrap_or_else(|| Seller {
        name: "مؤسسة النخيل للتجارة".into(),
        address: "شارع التحلية، جدة".into(),
        vat_number: "310122393500003".into(),
    });

    let store = Arc::new(InMemoryStore::new());
    for (n, (item, qty, price)) in [
        ("Arabic coffee 500g", 2, dec!(40)),
        ("Sukkari dates 1kg", 3, dec!(20)),
        ("Cardamom 250g", 1, dec!(35.50)),
    ]
    .into_iter()
    .enumerate()
    {
        let invoice = InvoiceBuilder::new(format!("DEMO-{:04}", n + 1), Utc::now())
            .seller(seller.clone())
            .buyer(Buyer {
                id: String::new(),
                name: "Walk-in".into(),
            })
            .tax_rate(settings.tax_rate)
            .seller_share(settings.seller_share)
            .add_item(ItemBuilder::new(item, qty, price).tax_rate(settings.tax_rate).build()?)
            .build()?;
        store.insert(invoice).await?;
    }

    match settings.client_config()? {
        Some(config) => {
            let client = ZatcaClient::new(config)?;
            let health = client.health_check().await;
            tracing::info!(status = ?health.status, message = %health.message, "health check");
            run(&settings, store, client).await
        }
        None => {
            tracing::info!(status = ?OfflineSubmitter.health_check().status, "no endpoint configured");
            run(&settings, store, OfflineSubmitter).await
        }
    }
}

async fn run<C: Submitter>(
    settings: &Settings,
    store: Arc<InMemoryStore>,
    submitter: C,
) -> Result<(), ZatcaError> {
    let processor =
        Processor::with_options(store.clone(), Arc::new(submitter), settings.processor_options());
    let summary = processor
        .process_pending(settings.batch_limit, settings.simulate)
        .await?;
    println!(
        "processed {} invoices: {} done, {} failed",
        summary.processed, summary.success, summary.failed
    );

    for (status, count) in store.status_counts().await? {
        println!("  {status}: {count}");
    }
    Ok(())
}
