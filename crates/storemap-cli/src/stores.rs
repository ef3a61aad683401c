//! Store command handlers for the CLI.
//!
//! Sync and delete go through [`StoreSync`] so the CLI, the server, and the
//! scheduler share one code path; listing reads the repository directly.

use clap::Subcommand;
use storemap_core::{AppConfig, ChainScope, StoreKey};
use storemap_db::{PgStoreRepository, PoolConfig, StoreRecord};
use storemap_sources::{GeocoderClient, InventoryClient};
use storemap_sync::{DeleteCriteria, StoreSync, SyncPacing};

type CliSync = StoreSync<PgStoreRepository, GeocoderClient, InventoryClient>;

/// Sub-commands available under `stores`.
#[derive(Debug, Subcommand)]
pub enum StoresCommands {
    /// Backfill missing coordinates and reconcile against the remote listing
    Sync {
        /// Limit the run to one chain (defaults to all chains)
        #[arg(long)]
        chain: Option<String>,
        /// Only geocode stores without coordinates; skip the remote listing
        #[arg(long)]
        backfill_only: bool,
    },
    /// Print mirrored stores
    List {
        /// Filter by chain
        #[arg(long)]
        chain: Option<String>,
        /// Only stores that have no coordinates yet
        #[arg(long)]
        missing: bool,
    },
    /// Delete stores by chain or by explicit keys
    Delete {
        /// Delete every store of this chain
        #[arg(long, required_unless_present = "keys", conflicts_with = "keys")]
        chain: Option<String>,
        /// Store key as `chain:code`; repeat for several stores
        #[arg(long = "key", value_parser = parse_store_key)]
        keys: Vec<StoreKey>,
    },
}

pub(crate) fn parse_store_key(raw: &str) -> Result<StoreKey, String> {
    StoreKey::parse(raw).ok_or_else(|| format!("expected `chain:code`, got '{raw}'"))
}

fn scope_from(chain: Option<&str>) -> ChainScope {
    chain.map_or(ChainScope::All, ChainScope::parse)
}

/// Resolve `--chain` / `--key` into delete criteria. `--chain all` is
/// rejected rather than wiping the whole mirror.
fn delete_criteria(chain: Option<&str>, keys: Vec<StoreKey>) -> anyhow::Result<DeleteCriteria> {
    match chain.map(ChainScope::parse) {
        Some(ChainScope::Chain(code)) => Ok(DeleteCriteria::Chain(code)),
        Some(ChainScope::All) => Err(anyhow::anyhow!(
            "refusing to delete every store; name a single chain"
        )),
        None => Ok(DeleteCriteria::Keys(keys)),
    }
}

async fn build_sync(config: &AppConfig) -> anyhow::Result<CliSync> {
    let repo =
        PgStoreRepository::connect(&config.database_url, PoolConfig::from_app_config(config))
            .await?;
    let geocoder = GeocoderClient::from_app_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build geocoder client: {e}"))?;
    let inventory = InventoryClient::from_app_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build inventory client: {e}"))?;

    Ok(StoreSync::new(
        repo,
        geocoder,
        inventory,
        SyncPacing::from_app_config(config),
    ))
}

/// Dispatch a `stores` sub-command.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the operation fails.
pub(crate) async fn run(config: &AppConfig, command: StoresCommands) -> anyhow::Result<()> {
    let store_sync = build_sync(config).await?;

    let result = match command {
        StoresCommands::Sync {
            chain,
            backfill_only,
        } => run_sync(&store_sync, &scope_from(chain.as_deref()), backfill_only).await,
        StoresCommands::List { chain, missing } => {
            run_list(store_sync.repository(), chain.as_deref(), missing).await
        }
        StoresCommands::Delete { chain, keys } => match delete_criteria(chain.as_deref(), keys) {
            Ok(criteria) => run_delete(&store_sync, &criteria).await,
            Err(e) => Err(e),
        },
    };

    store_sync.repository().close().await;
    result
}

async fn run_sync(
    store_sync: &CliSync,
    scope: &ChainScope,
    backfill_only: bool,
) -> anyhow::Result<()> {
    if backfill_only {
        let report = store_sync.backfill(scope).await?;
        println!(
            "backfill {scope}: {} attempted, {} updated ({} found, {} no match, {} failed)",
            report.attempted,
            report.updated,
            report.geocoding.found,
            report.geocoding.no_match,
            report.geocoding.failed
        );
        return Ok(());
    }

    let snapshot = store_sync.get_stores(scope, true).await?;
    println!(
        "sync {scope}: {} stores ({} geocoded, {} missing coordinates)",
        snapshot.stats.total, snapshot.stats.geocoded, snapshot.stats.missing_coordinates
    );
    println!(
        "  backfill: {} attempted, {} updated",
        snapshot.backfill.attempted, snapshot.backfill.updated
    );
    if let Some(reconcile) = snapshot.reconcile {
        println!(
            "  reconcile: {} added, {} removed, {} updated, {} update failures",
            reconcile.added, reconcile.removed, reconcile.updated, reconcile.update_failures
        );
        println!(
            "  geocoding: {} found, {} no match, {} failed",
            reconcile.geocoding.found, reconcile.geocoding.no_match, reconcile.geocoding.failed
        );
    }
    Ok(())
}

fn fmt_coordinate(record: &StoreRecord) -> String {
    record.coordinate().map_or_else(
        || "-".to_string(),
        |c| format!("{:.5},{:.5}", c.lat, c.lon),
    )
}

async fn run_list(
    repo: &PgStoreRepository,
    chain: Option<&str>,
    missing: bool,
) -> anyhow::Result<()> {
    let records = if missing {
        repo.list_missing_coordinates(chain).await?
    } else {
        repo.list_all(chain).await?
    };

    if records.is_empty() {
        println!(
            "no stores found{}",
            chain.map(|c| format!(" for chain {c}")).unwrap_or_default()
        );
        return Ok(());
    }

    let header = format!(
        "{:<12}{:<10}{:<28}{:<18}COORDINATES",
        "CHAIN", "CODE", "ADDRESS", "CITY"
    );
    println!("{header}");
    for record in &records {
        println!(
            "{:<12}{:<10}{:<28}{:<18}{}",
            record.chain_code,
            record.code,
            truncate(&record.address, 26),
            truncate(&record.city, 16),
            fmt_coordinate(record)
        );
    }
    println!("{} store(s)", records.len());
    Ok(())
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        format!("{}...", value.chars().take(max - 3).collect::<String>())
    } else {
        value.to_string()
    }
}

async fn run_delete(store_sync: &CliSync, criteria: &DeleteCriteria) -> anyhow::Result<()> {
    let deleted = store_sync.delete_stores(criteria).await?;
    println!("deleted {deleted} store(s)");
    Ok(())
}

/// Print the chain codes served by the remote inventory API.
///
/// # Errors
///
/// Returns an error if the token is missing or the request fails.
pub(crate) async fn run_chains(config: &AppConfig) -> anyhow::Result<()> {
    let client = InventoryClient::from_app_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build inventory client: {e}"))?;
    let chains = client.list_chains().await?;

    for chain in &chains {
        println!("{chain}");
    }
    println!("{} chain(s)", chains.len());
    Ok(())
}
