use std::path::Path;

use crate::DeviceCommandError;

/// 偵測到的相機。 / A camera reported by auto-detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub model: String,
    pub port: String,
}

/// 儲存空間資訊（KB）。 / Storage figures in kilobytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageInfo {
    pub total_kb: u64,
    pub free_kb: u64,
}

impl StorageInfo {
    /// 已使用空間，作為內容變化的指紋。 / Occupied space; the cheap fingerprint for content changes.
    pub fn occupied_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.free_kb)
    }
}

/// 相機命令列工具的同步介面。 / Synchronous interface to the camera command-line tool.
///
/// Implementations are shared between the watcher thread and foreground
/// callers; the watcher serializes every call, so they need not lock
/// internally. `fetch` and `fetch_all` report the tool's exit code as is.
pub trait DeviceTool: Send + Sync {
    fn detect(&self) -> Result<Vec<DeviceDescriptor>, DeviceCommandError>;

    /// 自由格式摘要，含 `Model: ` 行。 / Free-form summary containing a `Model: ` line.
    fn summary(&self) -> Result<String, DeviceCommandError>;

    fn storage_info(&self) -> Result<StorageInfo, DeviceCommandError>;

    /// 依相機編號順序列出檔名。 / Filenames in the camera's listing order.
    fn list_files(&self) -> Result<Vec<String>, DeviceCommandError>;

    /// 以 1 起算的編號查詢檔名。 / Filename currently at the 1-based `index`.
    fn show_info(&self, index: usize) -> Result<String, DeviceCommandError>;

    fn fetch(
        &self,
        index: usize,
        destination: &Path,
        thumbnail: bool,
    ) -> Result<i32, DeviceCommandError>;

    fn fetch_all(
        &self,
        destination_pattern: &Path,
        thumbnail: bool,
        overwrite: bool,
    ) -> Result<i32, DeviceCommandError>;
}
