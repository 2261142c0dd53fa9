//! The discovery cycle: load cursor, compile the matcher, probe the next
//! id block, fetch, filter, match, dedup, persist, advance.
//!
//! Collaborators arrive through explicit trait seams so tests can substitute
//! doubles. One cycle is a single sequential pipeline; overlap prevention is
//! the scheduler's responsibility.

use crate::matcher::{build_strategy, MatcherKind};
use async_trait::async_trait;
use chrono::Utc;
use database::Database;
use num_bigint::BigUint;
use prospect_core::{
    truncate_preview, AppConfig, BlockedAuthor, CoreError, KeywordEntry, NewMatch, SourceItem,
    SourceKind, SyncCursor,
};
use reddit_client::{ordinal, range, RedditClient};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read side of the upstream source.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Resolve candidate ids. Failed chunks are skipped inside the fetcher;
    /// whatever came back is what the cycle works with.
    async fn fetch_candidates(&self, kind: SourceKind, ids: &[String]) -> Vec<SourceItem>;

    /// Newest visible id for a stream; used only to seed a fresh cursor.
    async fn latest_id(&self, kind: SourceKind) -> Result<Option<String>, CoreError>;
}

#[async_trait]
impl ItemSource for RedditClient {
    async fn fetch_candidates(&self, kind: SourceKind, ids: &[String]) -> Vec<SourceItem> {
        RedditClient::fetch_candidates(self, kind, ids).await
    }

    async fn latest_id(&self, kind: SourceKind) -> Result<Option<String>, CoreError> {
        RedditClient::latest_id(self, kind).await
    }
}

/// Persistence consumed and produced by a cycle.
#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    async fn keywords(&self) -> Result<Vec<KeywordEntry>, CoreError>;
    async fn blocked_authors(&self) -> Result<Vec<BlockedAuthor>, CoreError>;
    async fn existing_match_keys(&self) -> Result<HashSet<(i64, String)>, CoreError>;
    async fn insert_matches(&self, matches: &[NewMatch]) -> Result<u64, CoreError>;
    async fn sync_cursor(&self) -> Result<Option<SyncCursor>, CoreError>;
    async fn save_sync_cursor(&self, cursor: &SyncCursor) -> Result<(), CoreError>;
}

#[async_trait]
impl DiscoveryStore for Database {
    async fn keywords(&self) -> Result<Vec<KeywordEntry>, CoreError> {
        self.get_keywords().await
    }

    async fn blocked_authors(&self) -> Result<Vec<BlockedAuthor>, CoreError> {
        self.get_blocked_authors().await
    }

    async fn existing_match_keys(&self) -> Result<HashSet<(i64, String)>, CoreError> {
        Database::existing_match_keys(self).await
    }

    async fn insert_matches(&self, matches: &[NewMatch]) -> Result<u64, CoreError> {
        Database::insert_matches(self, matches).await
    }

    async fn sync_cursor(&self) -> Result<Option<SyncCursor>, CoreError> {
        self.get_sync_cursor().await
    }

    async fn save_sync_cursor(&self, cursor: &SyncCursor) -> Result<(), CoreError> {
        Database::save_sync_cursor(self, cursor).await
    }
}

#[derive(Debug, Clone)]
pub struct CycleOptions {
    /// Items at least this old are dropped; age must be strictly below the
    /// window to survive.
    pub retention: Duration,
    /// Candidate ids probed per stream.
    pub range_size: usize,
    pub matcher: MatcherKind,
    pub bootstrap_post_id: Option<String>,
    pub bootstrap_comment_id: Option<String>,
}

impl CycleOptions {
    /// The long-running background crawl: wide retention window.
    pub fn background(config: &AppConfig) -> Self {
        Self {
            retention: config.crawl_retention(),
            range_size: config.range_size,
            matcher: MatcherKind::Automaton,
            bootstrap_post_id: config.bootstrap_post_id.clone(),
            bootstrap_comment_id: config.bootstrap_comment_id.clone(),
        }
    }

    /// Interactive, on-demand search: same pipeline, narrower window.
    pub fn interactive(config: &AppConfig) -> Self {
        Self {
            retention: config.search_retention(),
            ..Self::background(config)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub candidates_processed: usize,
    pub new_matches: usize,
    /// Set for degenerate outcomes ("no keywords configured", "nothing new
    /// since last cycle").
    pub message: Option<String>,
}

/// Global and per-product author blocks, compared case-insensitively.
#[derive(Debug, Default)]
pub struct Blocklist {
    global: HashSet<String>,
    per_product: HashMap<i64, HashSet<String>>,
}

impl Blocklist {
    pub fn new(entries: Vec<BlockedAuthor>) -> Self {
        let mut blocklist = Self::default();
        for entry in entries {
            let username = entry.username.to_lowercase();
            match entry.product_id {
                None => {
                    blocklist.global.insert(username);
                }
                Some(product_id) => {
                    blocklist
                        .per_product
                        .entry(product_id)
                        .or_default()
                        .insert(username);
                }
            }
        }
        blocklist
    }

    pub fn is_blocked(&self, product_id: i64, author: &str) -> bool {
        let author = author.to_lowercase();
        self.global.contains(&author)
            || self
                .per_product
                .get(&product_id)
                .map_or(false, |set| set.contains(&author))
    }
}

/// One full discovery cycle. Any unhandled error aborts before the cursor
/// advance, so the next trigger retries the same ground; the unique match
/// key makes the replayed Persist a no-op.
pub async fn run_discovery_cycle<S, D>(
    source: &S,
    store: &D,
    options: &CycleOptions,
) -> Result<CycleSummary, CoreError>
where
    S: ItemSource,
    D: DiscoveryStore,
{
    let now = Utc::now().timestamp();

    let cursor = match store.sync_cursor().await? {
        Some(cursor) => cursor,
        None => {
            let cursor = bootstrap_cursor(source, options, now).await?;
            store.save_sync_cursor(&cursor).await?;
            info!("Bootstrapped sync cursor at post {}", cursor.last_post_id);
            cursor
        }
    };

    let keywords = store.keywords().await?;
    if keywords.is_empty() {
        info!("No keywords configured; skipping fetch");
        return Ok(CycleSummary {
            candidates_processed: 0,
            new_matches: 0,
            message: Some("no keywords configured".to_string()),
        });
    }

    let strategy = build_strategy(options.matcher, &keywords);
    debug!("Compiled matcher over {} keyword associations", keywords.len());

    let blocklist = Blocklist::new(store.blocked_authors().await?);
    let mut existing = store.existing_match_keys().await?;

    let mut candidates_processed = 0;
    let mut pending: Vec<NewMatch> = Vec::new();
    let mut next_cursor = cursor.clone();
    let mut advanced = false;

    let streams = [
        (SourceKind::Post, Some(cursor.last_post_id.clone())),
        (SourceKind::Comment, cursor.last_comment_id.clone()),
    ];

    for (kind, position) in streams {
        let Some(last_id) = position else {
            debug!("No cursor position for {}; stream skipped", kind);
            continue;
        };

        let candidate_ids = range::next_sequential(&last_id, options.range_size)?;
        let items = source.fetch_candidates(kind, &candidate_ids).await;
        candidates_processed += items.len();

        // Advance only to ids actually observed in responses, never to the
        // theoretical top of the generated range.
        if let Some(max_id) = max_observed_id(&items)? {
            if ordinal::to_ordinal(&max_id)? > ordinal::to_ordinal(&last_id)? {
                debug!("Observed {} up to id {}", kind, max_id);
                match kind {
                    SourceKind::Post => next_cursor.last_post_id = max_id,
                    SourceKind::Comment => next_cursor.last_comment_id = Some(max_id),
                }
                advanced = true;
            }
        }

        for item in &items {
            if !retained(item, now, options.retention) {
                continue;
            }

            for matched in strategy.scan(&item.searchable_text()) {
                if blocklist.is_blocked(matched.product_id, &item.author) {
                    debug!(
                        "Author {} blocked for product {}; match dropped",
                        item.author, matched.product_id
                    );
                    continue;
                }

                let key = (matched.product_id, item.external_id());
                if existing.contains(&key) {
                    continue;
                }
                existing.insert(key);

                pending.push(NewMatch {
                    product_id: matched.product_id,
                    external_id: item.external_id(),
                    title: item.title.clone(),
                    body_preview: truncate_preview(&item.body),
                    subreddit: item.subreddit.clone(),
                    url: item.permalink.clone(),
                    created_at: item.created_at,
                    discovered_at: now,
                    matched_keyword: matched.keyword,
                });
            }
        }
    }

    let new_matches = if pending.is_empty() {
        0
    } else {
        store.insert_matches(&pending).await? as usize
    };

    if advanced {
        next_cursor.updated_at = now;
        store.save_sync_cursor(&next_cursor).await?;
    }

    let message = if candidates_processed == 0 {
        Some("nothing new since last cycle".to_string())
    } else {
        None
    };
    info!(
        "Discovery cycle complete: {} candidates processed, {} new matches",
        candidates_processed, new_matches
    );

    Ok(CycleSummary {
        candidates_processed,
        new_matches,
        message,
    })
}

async fn bootstrap_cursor<S: ItemSource>(
    source: &S,
    options: &CycleOptions,
    now: i64,
) -> Result<SyncCursor, CoreError> {
    let last_post_id = match &options.bootstrap_post_id {
        Some(id) => {
            info!("Seeding post cursor from configured id {}", id);
            id.clone()
        }
        None => source
            .latest_id(SourceKind::Post)
            .await?
            .ok_or_else(|| CoreError::BootstrapMissing {
                stream: SourceKind::Post.to_string(),
            })?,
    };

    let last_comment_id = match &options.bootstrap_comment_id {
        Some(id) => {
            info!("Seeding comment cursor from configured id {}", id);
            Some(id.clone())
        }
        None => match source.latest_id(SourceKind::Comment).await {
            Ok(id) => {
                if id.is_none() {
                    warn!("No visible comments to seed from; comment stream stays dormant");
                }
                id
            }
            Err(e) => {
                warn!("Comment cursor seed lookup failed; comment stream stays dormant: {}", e);
                None
            }
        },
    };

    Ok(SyncCursor {
        last_post_id,
        last_comment_id,
        updated_at: now,
    })
}

fn retained(item: &SourceItem, now: i64, retention: Duration) -> bool {
    if item.removed_or_deleted {
        return false;
    }
    let age = now - item.created_at;
    age < retention.as_secs() as i64
}

fn max_observed_id(items: &[SourceItem]) -> Result<Option<String>, CoreError> {
    let mut best: Option<(BigUint, String)> = None;
    for item in items {
        let candidate = ordinal::to_ordinal(&item.id)?;
        if best
            .as_ref()
            .map_or(true, |(current, _)| candidate > *current)
        {
            best = Some((candidate, item.id.clone()));
        }
    }
    Ok(best.map(|(_, id)| id))
}
