use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post lifecycle tag. Transitions are caller-driven; the only automated
/// side effect is setting `publishedAt` when a post becomes published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    Draft,
    Published,
    Scheduled,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "DRAFT",
            PostStatus::Published => "PUBLISHED",
            PostStatus::Scheduled => "SCHEDULED",
            PostStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(PostStatus::Draft),
            "PUBLISHED" => Ok(PostStatus::Published),
            "SCHEDULED" => Ok(PostStatus::Scheduled),
            "ARCHIVED" => Ok(PostStatus::Archived),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostAnalytics {
    pub total_views: i64,
    pub unique_visitors: i64,
    pub likes: i64,
    pub shares: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub views: i64,
    pub category_id: i64,
    pub author_id: i64,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: AuthorRef,
    pub category: CategoryRef,
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<PostAnalytics>,
}

/// Insert payload for the repository. Tags are `(name, slug)` pairs; the
/// slug is the connect-or-create key.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub status: PostStatus,
    pub category_id: i64,
    pub author_id: i64,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
    pub tags: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("published".parse::<PostStatus>(), Ok(PostStatus::Published));
        assert_eq!("DRAFT".parse::<PostStatus>(), Ok(PostStatus::Draft));
        assert_eq!("Scheduled".parse::<PostStatus>(), Ok(PostStatus::Scheduled));
        assert!("deleted".parse::<PostStatus>().is_err());
    }

    #[test]
    fn status_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&PostStatus::Archived).unwrap(),
            "\"ARCHIVED\""
        );
    }
}
