//! Artefact Deposit
//!
//! Deposits the artefacts of one resource and prints the outcome report as
//! JSON. Usage: `artefact-deposit <resource-id>`

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use aws_config::{BehaviorVersion, Region};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artefact_deposit::auth::FileTokenProvider;
use artefact_deposit::lookup::LookupClient;
use artefact_deposit::record::{JsonFileRecordStore, StructuralValidator};
use artefact_deposit::store::{build_http_client, GraphClient};
use artefact_deposit::{Config, Depositor};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "artefact_deposit=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every artefact was deposited or already present
async fn run() -> anyhow::Result<bool> {
    dotenvy::dotenv().ok();

    let Some(resource_id) = std::env::args().nth(1) else {
        bail!("usage: artefact-deposit <resource-id>");
    };

    let config = Config::from_env().context("Failed to load configuration from environment")?;
    tracing::info!("Starting artefact deposit v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Drive: {}", config.store.drive_id);
    tracing::info!("Records: {}", config.records.dir.display());

    let http = build_http_client(&config.http).context("Failed to build HTTP client")?;
    let credentials = Arc::new(FileTokenProvider::new(&config.auth.token_path));
    let store = Arc::new(GraphClient::new(http.clone(), config.store.clone(), credentials));

    // Lookup credentials follow the standard AWS chain: environment, profile, SSO, instance role
    let aws = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.lookup.region.clone()))
        .load()
        .await;
    let aws_credentials = aws
        .credentials_provider()
        .context("No AWS credentials provider available for the lookup endpoint")?;
    let registrar = Arc::new(LookupClient::new(http, &config.lookup, aws_credentials)?);

    let records = Arc::new(JsonFileRecordStore::new(&config.records.dir));
    let validator = Arc::new(StructuralValidator::new(config.deposit.download_prefix()));

    let depositor = Depositor::new(store, registrar, records, validator, config.deposit.clone());
    let report = depositor
        .deposit_resource(&resource_id)
        .await
        .with_context(|| format!("Deposit of '{}' failed", resource_id))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_success())
}
