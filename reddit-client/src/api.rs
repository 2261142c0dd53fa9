use crate::retry::{with_backoff, RetryConfig};
use prospect_core::{CoreError, SourceApiError, SourceItem, SourceKind};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const REDDIT_API_BASE: &str = "https://www.reddit.com";

/// Practical ceiling of the bulk info endpoint.
pub const MAX_CHUNK_SIZE: usize = 100;

const DELETED_AUTHOR: &str = "[deleted]";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub author: String,
    pub subreddit: String,
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub removed_by_category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub body: String,
    pub author: String,
    pub subreddit: String,
    pub permalink: String,
    pub created_utc: f64,
}

/// Anonymous Reddit client. The bulk info endpoint and the latest-item
/// listings require no authentication.
#[derive(Debug)]
pub struct RedditClient {
    http_client: Client,
    user_agent: String,
    chunk_size: usize,
    retry: RetryConfig,
}

impl RedditClient {
    pub fn new(user_agent: String) -> Self {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            user_agent,
            chunk_size: MAX_CHUNK_SIZE,
            retry: RetryConfig::bootstrap(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CoreError> {
        let url = format!("{}{}", REDDIT_API_BASE, path);
        debug!("Requesting {}", path);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::SourceApi(SourceApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::SourceApi(SourceApiError::Unavailable {
                status_code: status.as_u16(),
            }));
        }

        response.json::<T>().await.map_err(|e| {
            CoreError::SourceApi(SourceApiError::InvalidResponse {
                details: e.to_string(),
            })
        })
    }

    /// Resolve candidate ids against the bulk info endpoint, chunked at the
    /// endpoint's ceiling. Ids missing from a response simply don't exist
    /// (or aren't visible) — that is the normal case, not an error. A failed
    /// chunk is logged and skipped; it never aborts the caller's cycle.
    pub async fn fetch_candidates(&self, kind: SourceKind, ids: &[String]) -> Vec<SourceItem> {
        let mut items = Vec::new();
        for chunk in ids.chunks(self.chunk_size) {
            match self.fetch_info_chunk(kind, chunk).await {
                Ok(mut chunk_items) => {
                    debug!(
                        "Bulk lookup resolved {}/{} candidate {}",
                        chunk_items.len(),
                        chunk.len(),
                        kind
                    );
                    items.append(&mut chunk_items);
                }
                Err(e) => {
                    warn!(
                        "Bulk lookup chunk failed, skipping {} candidate {}: {}",
                        chunk.len(),
                        kind,
                        e
                    );
                }
            }
        }

        if !ids.is_empty() && items.is_empty() {
            warn!(
                "All {} candidate {} resolved to nothing; possible upstream blocking",
                ids.len(),
                kind
            );
        }
        items
    }

    async fn fetch_info_chunk(
        &self,
        kind: SourceKind,
        ids: &[String],
    ) -> Result<Vec<SourceItem>, CoreError> {
        let query = [
            ("id", composite_id_list(kind, ids)),
            ("raw_json", "1".to_string()),
        ];
        match kind {
            SourceKind::Post => {
                let listing: RedditListing<RedditPostData> =
                    self.get_json("/api/info.json", &query).await?;
                Ok(listing
                    .data
                    .children
                    .into_iter()
                    .filter(|child| child.kind == kind.prefix())
                    .map(|child| child.data.into())
                    .collect())
            }
            SourceKind::Comment => {
                let listing: RedditListing<RedditCommentData> =
                    self.get_json("/api/info.json", &query).await?;
                Ok(listing
                    .data
                    .children
                    .into_iter()
                    .filter(|child| child.kind == kind.prefix())
                    .map(|child| child.data.into())
                    .collect())
            }
        }
    }

    /// Newest id currently visible for a stream. Only used to seed a fresh
    /// cursor, so the lookup is retried with backoff.
    pub async fn latest_id(&self, kind: SourceKind) -> Result<Option<String>, CoreError> {
        let id = with_backoff("latest item lookup", &self.retry, || {
            self.latest_once(kind)
        })
        .await?;
        if let Some(ref id) = id {
            info!("Latest visible {} id: {}", kind, id);
        }
        Ok(id)
    }

    async fn latest_once(&self, kind: SourceKind) -> Result<Option<String>, CoreError> {
        let query = [("limit", "1".to_string()), ("raw_json", "1".to_string())];
        match kind {
            SourceKind::Post => {
                let listing: RedditListing<RedditPostData> =
                    self.get_json("/r/all/new.json", &query).await?;
                Ok(listing.data.children.first().map(|child| child.data.id.clone()))
            }
            SourceKind::Comment => {
                let listing: RedditListing<RedditCommentData> =
                    self.get_json("/r/all/comments.json", &query).await?;
                Ok(listing.data.children.first().map(|child| child.data.id.clone()))
            }
        }
    }
}

fn composite_id_list(kind: SourceKind, ids: &[String]) -> String {
    ids.iter()
        .map(|id| kind.qualify(id))
        .collect::<Vec<_>>()
        .join(",")
}

fn absolute_permalink(permalink: &str) -> String {
    if permalink.starts_with("http") {
        permalink.to_string()
    } else {
        format!("{}{}", REDDIT_API_BASE, permalink)
    }
}

impl From<RedditPostData> for SourceItem {
    fn from(data: RedditPostData) -> Self {
        let removed_or_deleted = data.author == DELETED_AUTHOR
            || data.removed_by_category.is_some()
            || matches!(data.selftext.as_str(), "[removed]" | "[deleted]");
        Self {
            id: data.id,
            kind: SourceKind::Post,
            created_at: data.created_utc as i64,
            author: data.author,
            title: Some(data.title),
            body: data.selftext,
            subreddit: data.subreddit,
            permalink: absolute_permalink(&data.permalink),
            removed_or_deleted,
        }
    }
}

impl From<RedditCommentData> for SourceItem {
    fn from(data: RedditCommentData) -> Self {
        let removed_or_deleted = data.author == DELETED_AUTHOR
            || matches!(data.body.as_str(), "[removed]" | "[deleted]");
        Self {
            id: data.id,
            kind: SourceKind::Comment,
            created_at: data.created_utc as i64,
            author: data.author,
            title: None,
            body: data.body,
            subreddit: data.subreddit,
            permalink: absolute_permalink(&data.permalink),
            removed_or_deleted,
        }
    }
}
