//! Fetching the remote store listing.

use storemap_core::{ChainScope, Store};

use crate::error::SyncError;
use crate::pacing::Pacer;
use crate::ports::StoreSource;

/// The stores the remote API reported, plus the chains whose listing failed.
///
/// Callers must not treat a failed chain as "has no stores": its local
/// records have to be kept out of any removal diff.
#[derive(Debug, Clone, Default)]
pub struct RemoteListing {
    pub stores: Vec<Store>,
    pub failed_chains: Vec<String>,
}

/// Fetches the listing for `scope`.
///
/// For [`ChainScope::All`] the chain list is fetched first and every chain is
/// then fetched under `pacer`. A failure on one chain is logged and recorded
/// in [`RemoteListing::failed_chains`]; the others still contribute.
///
/// # Errors
///
/// Returns [`SyncError::Configuration`] when no credential is configured and
/// [`SyncError::Upstream`] when the chain list (or, for a single-chain scope,
/// that chain's stores) cannot be fetched.
pub async fn fetch_remote_listing<S: StoreSource>(
    source: &S,
    scope: &ChainScope,
    pacer: &Pacer,
) -> Result<RemoteListing, SyncError> {
    match scope {
        ChainScope::Chain(chain_code) => {
            let stores = source.list_stores_for_chain(chain_code).await?;
            tracing::info!(chain = %chain_code, stores = stores.len(), "fetched remote stores");
            Ok(RemoteListing {
                stores,
                failed_chains: Vec::new(),
            })
        }
        ChainScope::All => {
            let chains = source.list_chains().await?;
            tracing::info!(chains = chains.len(), "fetched remote chain list");

            let results = pacer
                .run(chains, |chain_code| async move {
                    let result = source.list_stores_for_chain(&chain_code).await;
                    (chain_code, result)
                })
                .await;

            let mut listing = RemoteListing::default();
            for (chain_code, result) in results {
                match result {
                    Ok(stores) => {
                        tracing::debug!(
                            chain = %chain_code,
                            stores = stores.len(),
                            "fetched remote stores"
                        );
                        listing.stores.extend(stores);
                    }
                    Err(e) => {
                        tracing::warn!(
                            chain = %chain_code,
                            error = %e,
                            "failed to fetch chain stores, skipping"
                        );
                        listing.failed_chains.push(chain_code);
                    }
                }
            }

            tracing::info!(
                stores = listing.stores.len(),
                failed_chains = listing.failed_chains.len(),
                "fetched remote listing"
            );
            Ok(listing)
        }
    }
}
