use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationId(pub String);

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PublicationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicationKind {
    Post,
    Comment,
    Mirror,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactionType {
    Upvote,
    Downvote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRef {
    pub id: ProfileId,
    #[serde(default)]
    pub handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSet {
    pub original: Media,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMetadata {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaSet>,
}

/// Canonical server-side representation of a post, comment or mirror.
///
/// `reaction` and `mirrors` are only populated when the publication was fetched on behalf of a
/// viewer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    #[serde(rename = "__typename")]
    pub kind: PublicationKind,
    pub id: PublicationId,
    pub profile: ProfileRef,
    #[serde(default)]
    pub metadata: PublicationMetadata,
    pub created_at: String,
    #[serde(default)]
    pub reaction: Option<ReactionType>,
    /// Mirrors of this publication made by the viewer.
    #[serde(default)]
    pub mirrors: Vec<PublicationId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_graphql_post() {
        let json = r#"{
            "__typename": "Post",
            "id": "0x01-0x02",
            "profile": { "id": "0x01", "handle": "yoginth.lens" },
            "metadata": {
                "content": "gm",
                "media": [{ "original": { "url": "ipfs://Qm", "mimeType": "image/png" } }]
            },
            "createdAt": "2023-06-01T10:00:00.000Z",
            "reaction": "UPVOTE"
        }"#;
        let publication: Publication = serde_json::from_str(json).unwrap();
        assert_eq!(publication.kind, PublicationKind::Post);
        assert_eq!(publication.id, PublicationId::from("0x01-0x02"));
        assert_eq!(publication.profile.handle.as_deref(), Some("yoginth.lens"));
        assert_eq!(publication.metadata.media[0].original.mime_type.as_deref(), Some("image/png"));
        assert_eq!(publication.reaction, Some(ReactionType::Upvote));
    }
}
