use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, warn};

use ledgerbank_banking::BankingService;
use ledgerbank_directory::{IdentityDirectory, InMemoryDirectory, PostgresDirectory};
use ledgerbank_ledger::{InMemoryLedger, LedgerGateway, PostgresLedger};

use crate::config::AppConfig;

pub type SharedLedger = Arc<dyn LedgerGateway>;
pub type SharedDirectory = Arc<dyn IdentityDirectory>;

/// The service handed to every handler.
pub type AppServices = BankingService<SharedLedger, SharedDirectory>;

/// Select the gateways named by `config` and start the banking service.
///
/// With `DATABASE_URL` set, the directory and the ledger share one Postgres
/// pool so a restart keeps every identity and the account it links to.
/// Failing to reach the database is fatal. A degraded master-account bootstrap
/// is not: it is logged and the service starts anyway.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let (ledger, directory): (SharedLedger, SharedDirectory) = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("connecting to postgres")?;

            let directory = PostgresDirectory::new(pool.clone());
            directory
                .ensure_schema()
                .await
                .context("preparing identity directory schema")?;

            let ledger = PostgresLedger::new(pool, config.ledger_partition);
            ledger
                .ensure_schema()
                .await
                .context("preparing ledger schema")?;

            info!(partition = config.ledger_partition, "gateways: postgres");
            (Arc::new(ledger), Arc::new(directory))
        }
        None => {
            info!(partition = config.ledger_partition, "gateways: in-memory");
            (
                Arc::new(InMemoryLedger::new(config.ledger_partition)),
                Arc::new(InMemoryDirectory::new()),
            )
        }
    };

    Ok(start(ledger, directory, config).await)
}

/// Start the service over caller-supplied gateways.
pub async fn start(
    ledger: SharedLedger,
    directory: SharedDirectory,
    config: &AppConfig,
) -> AppServices {
    let services = BankingService::start(ledger, directory, config.banking_options()).await;
    if services.bootstrap_report().is_degraded() {
        warn!("master account bootstrap incomplete; money movement may fail");
    }
    services
}
