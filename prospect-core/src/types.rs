use serde::{Deserialize, Serialize};

/// Which of Reddit's content streams an item belongs to. The variants map to
/// the type discriminators used in composite ids (`t3_...`, `t1_...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Post,
    Comment,
}

impl SourceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            SourceKind::Post => "t3",
            SourceKind::Comment => "t1",
        }
    }

    /// Qualify a bare base-36 id with the content-type discriminator.
    pub fn qualify(&self, id: &str) -> String {
        format!("{}_{}", self.prefix(), id)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Post => write!(f, "posts"),
            SourceKind::Comment => write!(f, "comments"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceItem {
    pub id: String,
    pub kind: SourceKind,
    pub created_at: i64,
    pub author: String,
    pub title: Option<String>,
    pub body: String,
    pub subreddit: String,
    /// Absolute link to the item.
    pub permalink: String,
    pub removed_or_deleted: bool,
}

impl SourceItem {
    pub fn external_id(&self) -> String {
        self.kind.qualify(&self.id)
    }

    /// The text a keyword scan runs over: title plus body for posts, body
    /// alone for comments.
    pub fn searchable_text(&self) -> String {
        match &self.title {
            Some(title) => format!("{}\n{}", title, self.body),
            None => self.body.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordEntry {
    pub keyword: String,
    pub product_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub keyword: String,
    pub product_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Active,
    Dismissed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Active => "active",
            MatchStatus::Dismissed => "dismissed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "dismissed" => MatchStatus::Dismissed,
            _ => MatchStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredMatch {
    pub id: i64,
    pub product_id: i64,
    /// Composite, type-prefixed id, so post and comment id spaces cannot
    /// collide under the (product_id, external_id) unique key.
    pub external_id: String,
    pub title: Option<String>,
    pub body_preview: String,
    pub subreddit: String,
    pub url: String,
    pub created_at: i64,
    pub discovered_at: i64,
    pub status: MatchStatus,
    pub is_new: bool,
    pub matched_keyword: String,
}

/// Insert-shaped match row; `status` and `is_new` take their defaults at
/// persistence time (`active`, true).
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub product_id: i64,
    pub external_id: String,
    pub title: Option<String>,
    pub body_preview: String,
    pub subreddit: String,
    pub url: String,
    pub created_at: i64,
    pub discovered_at: i64,
    pub matched_keyword: String,
}

#[derive(Debug, Clone)]
pub struct BlockedAuthor {
    /// None blocks the author for every product.
    pub product_id: Option<i64>,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCursor {
    pub last_post_id: String,
    pub last_comment_id: Option<String>,
    pub updated_at: i64,
}

pub const BODY_PREVIEW_CHARS: usize = 200;

/// Hard cut at 200 characters; no word-boundary trimming.
pub fn truncate_preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_id_qualification() {
        assert_eq!(SourceKind::Post.qualify("1abcz"), "t3_1abcz");
        assert_eq!(SourceKind::Comment.qualify("k9x"), "t1_k9x");
    }

    #[test]
    fn test_searchable_text_uses_title_for_posts_only() {
        let mut item = SourceItem {
            id: "1abcz".to_string(),
            kind: SourceKind::Post,
            created_at: 1_700_000_000,
            author: "someone".to_string(),
            title: Some("Looking for a tool".to_string()),
            body: "any recommendations?".to_string(),
            subreddit: "startups".to_string(),
            permalink: "https://www.reddit.com/r/startups/comments/1abcz/".to_string(),
            removed_or_deleted: false,
        };
        assert_eq!(item.searchable_text(), "Looking for a tool\nany recommendations?");

        item.kind = SourceKind::Comment;
        item.title = None;
        assert_eq!(item.searchable_text(), "any recommendations?");
    }

    #[test]
    fn test_preview_truncation_is_a_hard_cut() {
        let short = "brief body";
        assert_eq!(truncate_preview(short), short);

        let long = "word ".repeat(60);
        let preview = truncate_preview(&long);
        assert_eq!(preview.chars().count(), BODY_PREVIEW_CHARS);
        assert!(long.starts_with(&preview));
    }

    #[test]
    fn test_preview_truncation_respects_char_boundaries() {
        let text = "é".repeat(300);
        let preview = truncate_preview(&text);
        assert_eq!(preview.chars().count(), BODY_PREVIEW_CHARS);
    }

    #[test]
    fn test_match_status_round_trip() {
        assert_eq!(MatchStatus::parse("active"), MatchStatus::Active);
        assert_eq!(MatchStatus::parse("dismissed"), MatchStatus::Dismissed);
        assert_eq!(MatchStatus::parse(MatchStatus::Active.as_str()), MatchStatus::Active);
    }
}
