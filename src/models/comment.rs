//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation status, derived from the approval and flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Flagged,
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Flagged => write!(f, "flagged"),
        }
    }
}

impl std::str::FromStr for CommentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "flagged" => Ok(Self::Flagged),
            _ => Err(format!("Invalid comment status: {}", s)),
        }
    }
}

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub author_id: i64,
    /// `None` for site-wide comments
    pub media_id: Option<i64>,
    pub content: String,
    pub is_approved: bool,
    pub is_flagged: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Flagged wins over approved
    pub fn status(&self) -> CommentStatus {
        if self.is_flagged {
            CommentStatus::Flagged
        } else if self.is_approved {
            CommentStatus::Approved
        } else {
            CommentStatus::Pending
        }
    }
}

/// Comment with author details for display
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub status: CommentStatus,
    pub author_username: String,
    pub author_avatar: String,
}

impl CommentWithAuthor {
    pub fn new(comment: Comment, username: String, email: &str, avatar: Option<String>) -> Self {
        Self {
            status: comment.status(),
            comment,
            author_username: username,
            author_avatar: avatar.unwrap_or_else(|| gravatar_url(email)),
        }
    }
}

/// Gravatar URL for an email address
pub fn gravatar_url(email: &str) -> String {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return "https://www.gravatar.com/avatar/?d=mp&s=80".to_string();
    }
    let hash = format!("{:x}", md5::compute(email));
    format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    #[serde(default)]
    pub media_id: Option<i64>,
    pub content: String,
}
