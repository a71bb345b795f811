use std::ffi::OsString;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::sanitize::checked_file_name;
use crate::ProjectError;

/// Writes `value` as pretty JSON at `path`, atomically.
/// 以 JSON 格式原子性地寫入 `path`。
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ProjectError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| ProjectError::Payload {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &json).map_err(|err| ProjectError::io(path, err))
}

// Writes `.<name>.tmp` next to `path`, then renames it over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut staging_name = OsString::from(".");
    staging_name.push(path.file_name().unwrap_or(path.as_os_str()));
    staging_name.push(".tmp");
    let staging = path.with_file_name(staging_name);
    fs::write(&staging, data)?;
    fs::rename(&staging, path).inspect_err(|_| {
        let _ = fs::remove_file(&staging);
    })
}

/// Reads JSON from `path`; a missing file is [`ProjectError::NotFound`].
/// 自 `path` 讀取 JSON；檔案不存在時回傳 [`ProjectError::NotFound`]。
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ProjectError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ProjectError::NotFound(path.to_path_buf()))
        }
        Err(err) => return Err(ProjectError::io(path, err)),
    };
    serde_json::from_slice(&contents).map_err(|source| ProjectError::Payload {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves `<dir>/<file_name>` for a load, enforcing an absolute directory.
/// 解析載入用的 `<dir>/<file_name>`，目錄必須為絕對路徑。
pub fn resolve_file(dir: &Path, file_name: &str) -> Result<PathBuf, ProjectError> {
    if !dir.is_absolute() {
        return Err(ProjectError::NotAbsolute(dir.to_path_buf()));
    }
    Ok(dir.join(checked_file_name(file_name)?))
}

/// Entities that persist themselves as one JSON file.
/// 以單一 JSON 檔儲存自身的實體。
///
/// `to_value`/`from_value` produce and consume the nested mapping; `save`
/// writes it into [`Persisted::storage_dir`], and `load` reads it back from an
/// explicitly supplied directory.
pub trait Persisted: Serialize + DeserializeOwned + Sized {
    /// Directory that `save` writes into.
    /// `save` 寫入的目錄。
    fn storage_dir(&self) -> PathBuf;

    /// Checks invariants that the type system cannot express.
    /// 檢查型別系統無法表達的不變條件。
    fn validate(&self) -> Result<(), ProjectError>;

    fn to_value(&self) -> Result<Value, ProjectError> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_value(value: Value) -> Result<Self, ProjectError> {
        let entity: Self = serde_json::from_value(value)?;
        entity.validate()?;
        Ok(entity)
    }

    /// Saves into `storage_dir()/<sanitized file_name>` and returns the path.
    /// 儲存至 `storage_dir()/<清理後檔名>` 並回傳路徑。
    fn save(&self, file_name: &str) -> Result<PathBuf, ProjectError> {
        let path = self.storage_dir().join(checked_file_name(file_name)?);
        save_json(&path, &self.to_value()?)?;
        log::debug!("saved {}", path.display());
        Ok(path)
    }

    /// Loads from `base_path/<sanitized file_name>`.
    /// 自 `base_path/<清理後檔名>` 載入。
    fn load(base_path: &Path, file_name: &str) -> Result<Self, ProjectError> {
        let path = resolve_file(base_path, file_name)?;
        let value: Value = load_json(&path)?;
        let entity: Self = serde_json::from_value(value).map_err(|source| {
            ProjectError::Payload {
                path: path.clone(),
                source,
            }
        })?;
        entity.validate()?;
        Ok(entity)
    }
}
