use lazy_static::lazy_static;
use lp_optimistic::{Attachment, OptimisticTransaction, ProfileId};
use regex::Regex;
use serde::Serialize;
use url::Url;

lazy_static! {
    static ref URL_REGEX: Regex = Regex::new(r#"https?://[^\s<>"'`]+"#).expect("Invalid url regex");
}

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\''];

/// First `http(s)` URL of a post body, used as the link preview of posts without attachments.
pub fn first_url(content: &str) -> Option<Url> {
    URL_REGEX.find_iter(content).find_map(|m| Url::parse(trim_trailing_punctuation(m.as_str())).ok())
}

/// Strips sentence punctuation glued to the end of a URL. A closing paren is only stripped when it
/// has no opening match inside the URL.
fn trim_trailing_punctuation(mut url: &str) -> &str {
    while let Some(last) = url.chars().next_back() {
        if !TRAILING_PUNCTUATION.contains(&last) {
            break;
        }
        if last == ')' && url.matches('(').count() >= url.matches(')').count() {
            break;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
    url
}

/// What is shown under the body of a pending post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum Embed {
    Attachments(Vec<Attachment>),
    LinkPreview(Url),
    None,
}

/// View model of a pending post, rendered with an "indexing" indicator until it leaves the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedPublicationView {
    pub key: String,
    pub author: Option<ProfileId>,
    pub content: String,
    pub embed: Embed,
    pub indexing: bool,
}

impl QueuedPublicationView {
    pub fn new(txn: &OptimisticTransaction, viewer: Option<&ProfileId>) -> Option<Self> {
        let embed = if !txn.attachments.is_empty() {
            Embed::Attachments(txn.attachments.clone())
        } else {
            first_url(&txn.content).map(Embed::LinkPreview).unwrap_or(Embed::None)
        };
        Some(Self {
            key: txn.effective_key()?.to_owned(),
            author: viewer.cloned(),
            content: txn.content.clone(),
            embed,
            indexing: true,
        })
    }
}
