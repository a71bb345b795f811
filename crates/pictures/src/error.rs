use std::path::PathBuf;

use photomatrix_project::ProjectError;
use photomatrix_toolexec::ToolError;
use thiserror::Error;

use crate::role::PictureRole;

/// Errors raised by [`crate::PictureCollection`] operations.
/// （照片集合操作的錯誤。）
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("row {index} is out of range (collection holds {len})")]
    InvalidIndex { index: usize, len: usize },
    #[error("rows {start}..{start}+{count} are out of bounds (collection holds {len})")]
    OutOfBounds {
        start: usize,
        count: usize,
        len: usize,
    },
    #[error("row {0} is an empty slot")]
    EmptySlot(usize),
    #[error("picture `{0}` is already in the collection")]
    DuplicatePath(String),
    #[error("role `{0}` is read-only")]
    ReadOnlyRole(PictureRole),
    #[error("role `{role}` expects {expected}")]
    RoleMismatch {
        role: PictureRole,
        expected: &'static str,
    },
    #[error("unknown picture status `{0}`")]
    InvalidStatus(String),
    #[error(transparent)]
    Persist(#[from] ProjectError),
}

/// Errors raised while reading picture metadata.
/// （讀取照片中繼資料時的錯誤。）
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("metadata for {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("metadata for {0} has no entry")]
    Empty(PathBuf),
}
