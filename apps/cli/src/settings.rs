use photomatrix_project::{save_json, ProjectError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SETTINGS_VERSION: u32 = 1;
const MIN_POLL_INTERVAL_MS: u64 = 100;
const MAX_POLL_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to save settings: {0}")]
    Save(#[from] ProjectError),
    #[error("unknown setting `{0}`")]
    UnknownKey(String),
    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub metadata: MetadataSettings,
    /// 圖示等資源目錄；未設定時為 `<root>/.photomatrix/resources`。 / Icon resources; `<root>/.photomatrix/resources` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources_path: Option<PathBuf>,
    #[serde(default = "default_workspace_file")]
    pub workspace_file: String,
    #[serde(default = "default_pictures_file")]
    pub pictures_file: String,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_workspace_file() -> String {
    "workspace.json".to_string()
}

fn default_pictures_file() -> String {
    "pictures.json".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            device: DeviceSettings::default(),
            metadata: MetadataSettings::default(),
            resources_path: None,
            workspace_file: default_workspace_file(),
            pictures_file: default_pictures_file(),
        }
    }
}

impl Settings {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = SETTINGS_VERSION;
        }
        self.device.sanitize();
        self.metadata.sanitize();
        if self.workspace_file.trim().is_empty() {
            self.workspace_file = default_workspace_file();
        }
        if self.pictures_file.trim().is_empty() {
            self.pictures_file = default_pictures_file();
        }
    }

    /// 依根目錄解析資源路徑。 / Resources directory resolved against the root.
    pub fn resources_path(&self, root: &Path) -> PathBuf {
        match &self.resources_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => root.join(path),
            None => root.join(crate::context::STATE_DIR).join("resources"),
        }
    }

    /// 以點分隔的鍵設定單一值。 / Sets one value addressed by a dotted key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let flag = || value.parse::<bool>().map_err(|_| invalid());
        match key {
            "device.program" => self.device.program = value.to_string(),
            "device.poll_interval_ms" => {
                self.device.poll_interval_ms = value.parse().map_err(|_| invalid())?
            }
            "device.watch_camera" => self.device.watch_camera = flag()?,
            "device.watch_files" => self.device.watch_files = flag()?,
            "metadata.program" => self.metadata.program = value.to_string(),
            "metadata.enabled" => self.metadata.enabled = flag()?,
            "resources_path" => {
                self.resources_path = (!value.is_empty()).then(|| PathBuf::from(value))
            }
            "workspace_file" => self.workspace_file = value.to_string(),
            "pictures_file" => self.pictures_file = value.to_string(),
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(default = "default_device_program")]
    pub program: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_true")]
    pub watch_camera: bool,
    #[serde(default = "default_true")]
    pub watch_files: bool,
}

fn default_true() -> bool {
    true
}

fn default_device_program() -> String {
    photomatrix_device::gphoto::DEFAULT_PROGRAM.to_string()
}

fn default_poll_interval() -> u64 {
    500
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            program: default_device_program(),
            poll_interval_ms: default_poll_interval(),
            watch_camera: true,
            watch_files: true,
        }
    }
}

impl DeviceSettings {
    fn sanitize(&mut self) {
        if self.program.trim().is_empty() {
            self.program = default_device_program();
        }
        self.poll_interval_ms = self
            .poll_interval_ms
            .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSettings {
    #[serde(default = "default_metadata_program")]
    pub program: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_metadata_program() -> String {
    photomatrix_pictures::metadata::DEFAULT_PROGRAM.to_string()
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            program: default_metadata_program(),
            enabled: true,
        }
    }
}

impl MetadataSettings {
    fn sanitize(&mut self) {
        if self.program.trim().is_empty() {
            self.program = default_metadata_program();
        }
    }
}

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    data: Settings,
}

impl SettingsStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = Settings::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: Settings =
            serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.data
    }

    pub fn update<F>(&mut self, op: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut Settings) -> Result<(), SettingsError>,
    {
        op(&mut self.data)?;
        self.data.sanitize();
        self.save()
    }

    /// 以暫存檔加改名寫入。 / Written through a temporary file and a rename.
    pub fn save(&self) -> Result<(), SettingsError> {
        save_json(&self.path, &self.data)?;
        Ok(())
    }
}
