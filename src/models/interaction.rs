use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of user-content interaction event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    View,
    Like,
    Share,
    Comment,
    Save,
    Rating,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::View => "view",
            InteractionType::Like => "like",
            InteractionType::Share => "share",
            InteractionType::Comment => "comment",
            InteractionType::Save => "save",
            InteractionType::Rating => "rating",
        }
    }
}

impl std::str::FromStr for InteractionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(InteractionType::View),
            "like" => Ok(InteractionType::Like),
            "share" => Ok(InteractionType::Share),
            "comment" => Ok(InteractionType::Comment),
            "save" => Ok(InteractionType::Save),
            "rating" => Ok(InteractionType::Rating),
            other => Err(format!("unknown interaction type: {}", other)),
        }
    }
}

/// A recorded user-content interaction event.
///
/// Immutable once persisted: the core never updates or deletes interactions,
/// and a user may interact with the same content any number of times. The
/// payload fields are type-conditional (`duration_secs` for views, `comment`
/// for comments, `rating` for ratings).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_id: Uuid,
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

/// Payload for recording a new interaction, before the recorder assigns an
/// id and timestamp. Doubles as the request body of `POST /api/interactions`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewInteraction {
    pub user_id: Uuid,
    pub content_id: Uuid,
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    #[serde(rename = "duration", default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
}

impl NewInteraction {
    /// Boundary check of the type-conditional payload rules. The recorder
    /// itself assumes these already hold.
    pub fn validate(&self) -> Result<(), String> {
        match self.interaction_type {
            InteractionType::View if self.duration_secs.is_none() => {
                return Err("duration is required for view interactions".to_string());
            }
            InteractionType::Comment
                if self.comment.as_deref().map_or(true, |c| c.trim().is_empty()) =>
            {
                return Err("comment text is required for comment interactions".to_string());
            }
            InteractionType::Rating if self.rating.is_none() => {
                return Err("rating is required for rating interactions".to_string());
            }
            _ => {}
        }

        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err("rating must be between 1 and 5".to_string());
            }
        }

        Ok(())
    }
}
