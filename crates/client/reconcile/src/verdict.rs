use lc_lens_client::{IndexingResult, PublicationMetadataStatusType, TransactionIndexedResult};

/// What a single `hasTxHashBeenIndexed` answer means for a pending item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollVerdict {
    /// Not indexed yet, poll again.
    StillPending,
    /// Indexed with valid metadata. Carries the hash confirmed by the indexer, which is the one to
    /// fetch the publication with.
    Indexed { tx_hash: String },
    /// Indexed, but the metadata failed validation or could not be found.
    Invalid { status: PublicationMetadataStatusType },
    /// The transaction failed.
    Failed { reason: Option<String> },
}

impl PollVerdict {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::StillPending)
    }
}

impl From<IndexingResult> for PollVerdict {
    fn from(result: IndexingResult) -> Self {
        match result {
            IndexingResult::TransactionError(error) => Self::Failed { reason: error.reason },
            IndexingResult::TransactionIndexedResult(TransactionIndexedResult { indexed: false, .. }) => {
                Self::StillPending
            }
            IndexingResult::TransactionIndexedResult(TransactionIndexedResult {
                indexed: true,
                tx_hash,
                metadata_status,
            }) => match metadata_status.map(|m| m.status) {
                Some(status) if status.is_invalid() => Self::Invalid { status },
                _ => Self::Indexed { tx_hash },
            },
        }
    }
}
