use std::io;
use std::path::PathBuf;

use photomatrix_toolexec::ToolError;
use thiserror::Error;

/// 相機指令失敗或輸出無法解析。 / The device tool failed or produced output we cannot read.
#[derive(Debug, Error)]
pub enum DeviceCommandError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("unexpected output from `{command}`: {detail}")]
    Unparsable { command: String, detail: String },
    #[error("file `{0}` is not on the camera")]
    UnknownFile(String),
    #[error("`{0}` is not a plain file name")]
    UnsafeFileName(String),
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to start the watcher thread: {0}")]
    Thread(#[source] io::Error),
    #[error("watcher event channel closed")]
    ChannelClosed,
}

impl DeviceCommandError {
    pub(crate) fn unparsable(command: &str, detail: impl Into<String>) -> Self {
        Self::Unparsable {
            command: command.to_string(),
            detail: detail.into(),
        }
    }
}
