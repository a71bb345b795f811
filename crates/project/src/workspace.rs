use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::directory::DirectorySpace;
use crate::persist::Persisted;
use crate::sanitize::checked_segment;
use crate::scene::Scene;
use crate::ProjectError;

/// Subdirectory holding the saved workspace metadata.
pub const CONFIGS_DIR: &str = "Configs";

/// A project directory holding scenes and a current-scene pointer.
/// 包含多個場景與目前場景指標的專案目錄。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(flatten)]
    space: DirectorySpace,
    #[serde(default)]
    scenes: BTreeMap<String, Scene>,
    #[serde(default)]
    current_scene: Option<String>,
}

impl Workspace {
    /// Builds the in-memory workspace; call [`Workspace::create`] to
    /// materialize it.
    /// 建立記憶體中的工作區；呼叫 [`Workspace::create`] 才會寫入磁碟。
    pub fn new(
        name: &str,
        base_path: impl Into<PathBuf>,
        relative_path: Option<&str>,
    ) -> Result<Self, ProjectError> {
        let mut space = DirectorySpace::new(name, base_path, relative_path)?;
        space.declare_subdir(CONFIGS_DIR, "saved workspace metadata")?;
        Ok(Self {
            space,
            scenes: BTreeMap::new(),
            current_scene: None,
        })
    }

    pub fn space(&self) -> &DirectorySpace {
        &self.space
    }

    pub fn name(&self) -> &str {
        self.space.name()
    }

    pub fn relative_path(&self) -> &str {
        self.space.relative_path()
    }

    pub fn base_path(&self) -> &Path {
        self.space.base_path()
    }

    pub fn full_path(&self) -> PathBuf {
        self.space.full_path()
    }

    pub fn configs_dir(&self) -> PathBuf {
        self.full_path().join(CONFIGS_DIR)
    }

    pub fn exists(&self) -> bool {
        self.space.exists()
    }

    pub fn create(&self) -> Result<(), ProjectError> {
        self.space.create()
    }

    /// Scenes keyed by their relative path.
    /// 以相對路徑為鍵的場景集合。
    pub fn scenes(&self) -> &BTreeMap<String, Scene> {
        &self.scenes
    }

    /// Looks a scene up by key, falling back to the sanitized form of `key`.
    /// 依鍵值尋找場景；找不到時改用清理後的鍵值。
    pub fn scene(&self, key: &str) -> Option<&Scene> {
        self.resolve_key(key).and_then(|key| self.scenes.get(&key))
    }

    pub fn current_scene_key(&self) -> Option<&str> {
        self.current_scene.as_deref()
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.current_scene
            .as_ref()
            .and_then(|key| self.scenes.get(key))
    }

    /// Moves the current-scene pointer; `None` clears it.
    /// 設定目前場景；傳入 `None` 代表清除。
    pub fn set_current_scene(&mut self, key: Option<&str>) -> Result<(), ProjectError> {
        self.current_scene = match key {
            Some(key) => Some(
                self.resolve_key(key)
                    .ok_or_else(|| ProjectError::UnknownScene(key.to_string()))?,
            ),
            None => None,
        };
        Ok(())
    }

    /// Creates a scene on disk and makes it current.
    /// 建立場景目錄並設為目前場景。
    ///
    /// The name defaults to `scene_<n>` where `n` is one more than the current
    /// scene count; the path defaults to the sanitized name.
    pub fn new_scene(
        &mut self,
        name: Option<&str>,
        path: Option<&str>,
    ) -> Result<&Scene, ProjectError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("scene_{}", self.scenes.len() + 1),
        };
        let scene = Scene::new(&name, self.full_path(), path)?;
        let key = scene.relative_path().to_string();
        match self.scenes.entry(key.clone()) {
            Entry::Occupied(_) => Err(ProjectError::DuplicatePath(key)),
            Entry::Vacant(slot) => {
                scene.create()?;
                log::info!("workspace `{}`: new scene `{key}`", self.space.name());
                self.current_scene = Some(key);
                Ok(slot.insert(scene))
            }
        }
    }

    /// Deletes a scene's directory tree and forgets it.
    /// 刪除場景目錄並自工作區移除。
    pub fn delete_scene(&mut self, key: &str) -> Result<(), ProjectError> {
        let key = self
            .resolve_key(key)
            .ok_or_else(|| ProjectError::UnknownScene(key.to_string()))?;
        if let Some(scene) = self.scenes.get(&key) {
            scene.delete()?;
        }
        self.scenes.remove(&key);
        if self.current_scene.as_deref() == Some(key.as_str()) {
            self.current_scene = None;
        }
        log::info!("workspace `{}`: deleted scene `{key}`", self.space.name());
        Ok(())
    }

    /// Deletes every scene, then the workspace directory itself.
    /// 先刪除所有場景，再刪除工作區目錄。
    ///
    /// Stops at the first failure. Scenes deleted before it are already gone
    /// from disk and from the map; nothing is restored.
    pub fn delete(&mut self) -> Result<(), ProjectError> {
        let keys: Vec<String> = self.scenes.keys().cloned().collect();
        for key in keys {
            self.delete_scene(&key)?;
        }
        self.space.delete()
    }

    fn resolve_key(&self, key: &str) -> Option<String> {
        if self.scenes.contains_key(key) {
            return Some(key.to_string());
        }
        checked_segment(key)
            .ok()
            .filter(|sanitized| self.scenes.contains_key(sanitized))
    }
}

impl Persisted for Workspace {
    fn storage_dir(&self) -> PathBuf {
        self.configs_dir()
    }

    fn validate(&self) -> Result<(), ProjectError> {
        self.space.validate()?;
        if let Some(current) = &self.current_scene {
            if !self.scenes.contains_key(current) {
                return Err(ProjectError::Inconsistent(format!(
                    "current scene `{current}` is not a scene of `{}`",
                    self.name()
                )));
            }
        }
        let full_path = self.full_path();
        for (key, scene) in &self.scenes {
            scene.validate()?;
            if key != scene.relative_path() {
                return Err(ProjectError::Inconsistent(format!(
                    "scene key `{key}` does not match its path `{}`",
                    scene.relative_path()
                )));
            }
            if scene.base_path() != full_path {
                return Err(ProjectError::Inconsistent(format!(
                    "scene `{key}` lives outside workspace {}",
                    full_path.display()
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} scene{}",
            self.name(),
            self.full_path().display(),
            self.scenes.len(),
            if self.scenes.len() == 1 { "" } else { "s" }
        )?;
        if let Some(current) = &self.current_scene {
            write!(f, ", current `{current}`")?;
        }
        f.write_str(")")
    }
}
