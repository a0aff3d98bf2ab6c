//! Client for the two Lens API queries the reconciliation flow needs: `hasTxHashBeenIndexed`
//! and `publication`.

mod error;
mod provider;
mod queries;
mod types;

pub use error::LensClientError;
pub use provider::{LensProvider, DEFAULT_REQUEST_TIMEOUT};
pub use types::*;

use async_trait::async_trait;
use lp_optimistic::Publication;

/// Abstraction over the remote Lens API.
///
/// Implemented by [`LensProvider`] over HTTP. Tests use the generated `MockLensApi`, available
/// with the `testing` feature.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LensApi: Send + Sync {
    /// Asks the indexer whether the transaction has been processed, and if so whether its metadata
    /// passed validation.
    async fn has_tx_hash_been_indexed(
        &self,
        request: &HasTxHashBeenIndexedRequest,
    ) -> Result<IndexingResult, LensClientError>;

    /// Fetches a publication. `Ok(None)` means the API knows no publication for this request.
    async fn publication(&self, query: &PublicationQuery) -> Result<Option<Publication>, LensClientError>;
}
