use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BlogError, PostField};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(PostId);
id_newtype!(UserId);

/// Number of characters of post content shown in the home feed.
pub const PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub author: Option<Author>,
}

impl Post {
    /// Content cut to [`PREVIEW_CHARS`] characters, with an ellipsis when
    /// anything was dropped.
    pub fn preview(&self) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }

    pub fn author_name(&self) -> Option<&str> {
        self.author.as_ref().map(|author| author.username.as_str())
    }
}

/// Title and content after trimming, guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFields {
    pub title: String,
    pub content: String,
}

pub fn validate_post_fields(title: &str, content: &str) -> Result<PostFields, BlogError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BlogError::Validation {
            field: PostField::Title,
        });
    }
    let content = content.trim();
    if content.is_empty() {
        return Err(BlogError::Validation {
            field: PostField::Content,
        });
    }
    Ok(PostFields {
        title: title.to_string(),
        content: content.to_string(),
    })
}

/// Splits a comma separated tag string, trimming entries and dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverse of [`parse_tags`]; `None` when there is nothing to store.
pub fn join_tags(tags: &[String]) -> Option<String> {
    let cleaned: Vec<&str> = tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(","))
    }
}
