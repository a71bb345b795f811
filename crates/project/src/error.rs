use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the workspace/scene hierarchy and its persistence.
/// 工作區/場景階層與其儲存流程的錯誤。
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("directory {0} already exists")]
    AlreadyExists(PathBuf),
    #[error("{0} does not exist")]
    NotFound(PathBuf),
    #[error("path `{0}` is already in use")]
    DuplicatePath(String),
    #[error("path {0} is not absolute")]
    NotAbsolute(PathBuf),
    #[error("name must not be empty")]
    EmptyName,
    #[error("`{0}` does not sanitize to a usable directory name")]
    InvalidName(String),
    #[error("scene `{0}` is not part of this workspace")]
    UnknownScene(String),
    #[error("workspace {0} is not open")]
    UnknownWorkspace(PathBuf),
    #[error("there is no current scene")]
    NoCurrentScene,
    #[error("there is no current workspace")]
    NoCurrentWorkspace,
    #[error("inconsistent project data: {0}")]
    Inconsistent(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid project payload in {path}: {source}")]
    Payload {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to convert project data: {0}")]
    Value(#[from] serde_json::Error),
}

impl ProjectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
