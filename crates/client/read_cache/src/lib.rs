//! Shared read cache holding every publication the client knows about.
//!
//! Reconciled publications are merged into the `publications` collection so that later reads
//! include them without another round-trip to the API.

use lp_optimistic::{Publication, PublicationId};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
}

/// Upserts `incoming` into `publications`: a publication with the same id is replaced in place,
/// otherwise `incoming` is put first, the collection being ordered newest first.
pub fn merge_publication(publications: &mut Vec<Publication>, incoming: Publication) -> MergeOutcome {
    match publications.iter_mut().find(|known| known.id == incoming.id) {
        Some(known) => {
            *known = incoming;
            MergeOutcome::Replaced
        }
        None => {
            publications.insert(0, incoming);
            MergeOutcome::Inserted
        }
    }
}

#[derive(Debug, Default)]
pub struct PublicationCache {
    publications: RwLock<Vec<Publication>>,
}

impl PublicationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// All known publications, newest first.
    pub async fn publications(&self) -> Vec<Publication> {
        self.publications.read().await.clone()
    }

    pub async fn get(&self, id: &PublicationId) -> Option<Publication> {
        self.publications.read().await.iter().find(|p| &p.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.publications.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.publications.read().await.is_empty()
    }

    pub async fn merge(&self, publication: Publication) -> MergeOutcome {
        let mut publications = self.publications.write().await;
        let id = publication.id.clone();
        let outcome = merge_publication(&mut publications, publication);
        tracing::debug!(publication_id = %id, ?outcome, "Merged publication into read cache");
        outcome
    }

    /// Same as [`PublicationCache::merge`] unless `token` is cancelled, checked under the write lock.
    pub async fn merge_live(&self, publication: Publication, token: &CancellationToken) -> Option<MergeOutcome> {
        let mut publications = self.publications.write().await;
        if token.is_cancelled() {
            return None;
        }
        Some(merge_publication(&mut publications, publication))
    }

    /// Runs `f` on the `publications` collection under the write lock.
    pub async fn modify<R>(&self, f: impl FnOnce(&mut Vec<Publication>) -> R) -> R {
        f(&mut *self.publications.write().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lp_optimistic::{ProfileRef, PublicationKind, PublicationMetadata};

    fn publication(id: &str, content: &str) -> Publication {
        Publication {
            kind: PublicationKind::Post,
            id: PublicationId::from(id),
            profile: ProfileRef { id: "0x01".into(), handle: None },
            metadata: PublicationMetadata { content: Some(content.into()), media: vec![] },
            created_at: "2023-06-01T10:00:00.000Z".into(),
            reaction: None,
            mirrors: vec![],
        }
    }

    #[test]
    fn merge_prepends_new_publications() {
        let mut publications = vec![publication("0x01-0x01", "old")];

        assert_eq!(merge_publication(&mut publications, publication("0x01-0x02", "new")), MergeOutcome::Inserted);

        let ids: Vec<_> = publications.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(ids, ["0x01-0x02", "0x01-0x01"]);
    }

    #[test]
    fn merge_replaces_in_place() {
        let mut publications = vec![publication("0x01-0x02", "a"), publication("0x01-0x01", "b")];

        assert_eq!(merge_publication(&mut publications, publication("0x01-0x01", "b2")), MergeOutcome::Replaced);

        assert_eq!(publications.len(), 2);
        assert_eq!(publications[1].metadata.content.as_deref(), Some("b2"));
    }

    #[tokio::test]
    async fn merge_live_respects_cancellation() {
        let cache = PublicationCache::new();
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(cache.merge_live(publication("0x01-0x01", "a"), &token).await, None);
        assert!(cache.is_empty().await);

        assert_eq!(
            cache.merge_live(publication("0x01-0x01", "a"), &CancellationToken::new()).await,
            Some(MergeOutcome::Inserted)
        );
        assert!(cache.get(&PublicationId::from("0x01-0x01")).await.is_some());
    }

    #[tokio::test]
    async fn modify_scopes_to_collection() {
        let cache = PublicationCache::new();
        cache.merge(publication("0x01-0x01", "a")).await;

        let removed = cache.modify(|publications| publications.drain(..).count()).await;

        assert_eq!(removed, 1);
        assert_eq!(cache.len().await, 0);
    }
}
