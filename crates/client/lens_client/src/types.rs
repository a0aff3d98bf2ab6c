use lp_optimistic::{OptimisticTransaction, ProfileId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasTxHashBeenIndexedRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
}

impl From<&OptimisticTransaction> for HasTxHashBeenIndexedRequest {
    fn from(txn: &OptimisticTransaction) -> Self {
        Self { tx_hash: txn.tx_hash.clone(), tx_id: txn.tx_id.clone() }
    }
}

/// Metadata validation outcome reported by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationMetadataStatusType {
    NotFound,
    Pending,
    MetadataValidationFailed,
    Success,
    /// A status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl PublicationMetadataStatusType {
    /// The publication was mined but its metadata will never become a valid publication.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::MetadataValidationFailed | Self::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMetadataStatus {
    pub status: PublicationMetadataStatusType,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionIndexedResult {
    pub indexed: bool,
    /// Hash as confirmed by the indexer. May differ in form from the optimistic one.
    pub tx_hash: String,
    #[serde(default)]
    pub metadata_status: Option<PublicationMetadataStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionError {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Answer of the `hasTxHashBeenIndexed` query, discriminated by its GraphQL `__typename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum IndexingResult {
    TransactionIndexedResult(TransactionIndexedResult),
    TransactionError(TransactionError),
}

impl IndexingResult {
    pub fn pending(tx_hash: impl Into<String>) -> Self {
        Self::TransactionIndexedResult(TransactionIndexedResult {
            indexed: false,
            tx_hash: tx_hash.into(),
            metadata_status: None,
        })
    }

    pub fn indexed(tx_hash: impl Into<String>, status: Option<PublicationMetadataStatusType>) -> Self {
        Self::TransactionIndexedResult(TransactionIndexedResult {
            indexed: true,
            tx_hash: tx_hash.into(),
            metadata_status: status.map(|status| PublicationMetadataStatus { status, reason: None }),
        })
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::TransactionError(TransactionError { reason: Some(reason.into()) })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationRequest {
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRequest {
    pub profile_id: ProfileId,
}

/// Variables of the `publication` query. Without a viewer, `reactionRequest` and `profileId` are
/// sent as explicit nulls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationQuery {
    pub request: PublicationRequest,
    pub reaction_request: Option<ReactionRequest>,
    pub profile_id: Option<ProfileId>,
}

impl PublicationQuery {
    pub fn by_tx_hash(tx_hash: impl Into<String>, viewer: Option<&ProfileId>) -> Self {
        Self {
            request: PublicationRequest { tx_hash: tx_hash.into() },
            reaction_request: viewer.map(|profile_id| ReactionRequest { profile_id: profile_id.clone() }),
            profile_id: viewer.cloned(),
        }
    }
}
