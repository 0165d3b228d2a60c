use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PostId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    NotFound,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostField {
    Title,
    Content,
}

impl fmt::Display for PostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostField::Title => f.write_str("title"),
            PostField::Content => f.write_str("content"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("{field} must not be empty")]
    Validation { field: PostField },
    #[error("post {0} not found")]
    NotFound(PostId),
    #[error("{context}: {message}")]
    Storage {
        context: &'static str,
        message: String,
    },
}

pub type BlogResult<T> = Result<T, BlogError>;

impl BlogError {
    pub fn storage(context: &'static str, err: impl fmt::Display) -> Self {
        Self::Storage {
            context,
            message: err.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            BlogError::Validation { .. } => ErrorCode::Validation,
            BlogError::NotFound(_) => ErrorCode::NotFound,
            BlogError::Storage { .. } => ErrorCode::Storage,
        }
    }
}

/// Attaches a short description of the failed operation to a backend error,
/// turning it into [`BlogError::Storage`].
pub trait StorageResultExt<T> {
    fn storage_context(self, context: &'static str) -> BlogResult<T>;
}

impl<T, E: fmt::Display> StorageResultExt<T> for Result<T, E> {
    fn storage_context(self, context: &'static str) -> BlogResult<T> {
        self.map_err(|err| BlogError::storage(context, err))
    }
}
