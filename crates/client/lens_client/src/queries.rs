pub(crate) const HAS_TX_HASH_BEEN_INDEXED: &str = r#"
query HasTxHashBeenIndexed($request: HasTxHashBeenIndexedRequest!) {
  hasTxHashBeenIndexed(request: $request) {
    __typename
    ... on TransactionIndexedResult {
      indexed
      txHash
      metadataStatus {
        status
        reason
      }
    }
    ... on TransactionError {
      reason
    }
  }
}"#;

pub(crate) const PUBLICATION: &str = r#"query Publication(
  $request: PublicationQueryRequest!
  $reactionRequest: ReactionFieldResolverRequest
  $profileId: ProfileId
) {
  publication(request: $request) {
    __typename
    ... on Post {
      id
      profile {
        id
        handle
      }
      metadata {
        content
        media {
          original {
            url
            mimeType
          }
        }
      }
      createdAt
      reaction(request: $reactionRequest)
      mirrors(by: $profileId)
    }
    ... on Comment {
      id
      profile {
        id
        handle
      }
      metadata {
        content
        media {
          original {
            url
            mimeType
          }
        }
      }
      createdAt
      reaction(request: $reactionRequest)
      mirrors(by: $profileId)
    }
    ... on Mirror {
      id
      profile {
        id
        handle
      }
      metadata {
        content
        media {
          original {
            url
            mimeType
          }
        }
      }
      createdAt
      reaction(request: $reactionRequest)
      mirrors(by: $profileId)
    }
  }
}"#;
