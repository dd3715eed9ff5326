use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of catalog content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Video,
    Podcast,
    Image,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Article => "article",
            ContentType::Video => "video",
            ContentType::Podcast => "podcast",
            ContentType::Image => "image",
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "article" => Ok(ContentType::Article),
            "video" => Ok(ContentType::Video),
            "podcast" => Ok(ContentType::Podcast),
            "image" => Ok(ContentType::Image),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog content item.
///
/// `popularity` is a non-negative counter driven by interaction volume; only
/// the interaction recorder's increment step ever mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub tags: Vec<String>,
    pub popularity: i64,
    pub created_at: DateTime<Utc>,
}

/// One page of a content listing, with the unpaginated total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPage {
    pub items: Vec<Content>,
    pub total: u64,
}
