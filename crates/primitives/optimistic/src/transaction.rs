use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TxnKeyError {
    #[error("An optimistic transaction needs a transaction hash or a transaction id")]
    MissingKey,
    #[error("Empty {0} is not a valid transaction key")]
    EmptyKey(&'static str),
}

/// Media or link attached to a pending post. Same JSON shape the web client persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub item: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

impl Attachment {
    pub fn new(item: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self { item: item.into(), mime_type: mime_type.into(), alt_tag: None, cover: None }
    }
}

/// A locally submitted post which has not been confirmed by the protocol indexer yet.
///
/// The transaction hash is only known once the transaction was broadcast; before that, the item is
/// tracked by the relayer-issued `tx_id`. Both may be set at the same time, in which case the hash
/// wins when looking the item up (see [`OptimisticTransaction::effective_key`]).
///
/// Once enqueued, an optimistic transaction is never mutated: it only ever leaves the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimisticTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl OptimisticTransaction {
    pub fn new(
        tx_hash: Option<String>,
        tx_id: Option<String>,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Result<Self, TxnKeyError> {
        let txn = Self { tx_hash, tx_id, content: content.into(), attachments };
        txn.check_keys()?;
        Ok(txn)
    }

    pub fn with_hash(tx_hash: impl Into<String>, content: impl Into<String>) -> Self {
        Self { tx_hash: Some(tx_hash.into()), tx_id: None, content: content.into(), attachments: vec![] }
    }

    pub fn with_id(tx_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { tx_hash: None, tx_id: Some(tx_id.into()), content: content.into(), attachments: vec![] }
    }

    /// Checks that at least one non-empty key is present.
    pub fn check_keys(&self) -> Result<(), TxnKeyError> {
        if self.tx_hash.as_deref() == Some("") {
            return Err(TxnKeyError::EmptyKey("txHash"));
        }
        if self.tx_id.as_deref() == Some("") {
            return Err(TxnKeyError::EmptyKey("txId"));
        }
        if self.tx_hash.is_none() && self.tx_id.is_none() {
            return Err(TxnKeyError::MissingKey);
        }
        Ok(())
    }

    /// The key this item is identified by: the transaction hash if known, else the transaction id.
    pub fn effective_key(&self) -> Option<&str> {
        self.tx_hash.as_deref().or(self.tx_id.as_deref())
    }

    pub fn has_hash(&self, key: &str) -> bool {
        self.tx_hash.as_deref() == Some(key)
    }

    pub fn has_id(&self, key: &str) -> bool {
        self.tx_id.as_deref() == Some(key)
    }

    /// Both keys of the item, hash first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tx_hash.as_deref().into_iter().chain(self.tx_id.as_deref())
    }

    /// Whether two items would collide in the queue: any key of one is a key of the other,
    /// whichever field it is stored in.
    pub fn collides_with(&self, other: &Self) -> bool {
        self.keys().any(|key| other.has_hash(key) || other.has_id(key))
    }
}
