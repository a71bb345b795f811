use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::persist::{load_json, resolve_file, save_json, Persisted};
use crate::scene::Scene;
use crate::serde_path;
use crate::workspace::Workspace;
use crate::ProjectError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    workspaces: Vec<Workspace>,
    #[serde(
        default,
        with = "serde_path::option",
        skip_serializing_if = "Option::is_none"
    )]
    current_workspace: Option<PathBuf>,
}

/// Every open workspace, keyed by absolute directory, plus the current one.
/// 所有已開啟的工作區（以絕對路徑為鍵）與目前工作區。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProjectStore {
    workspaces: BTreeMap<PathBuf, Workspace>,
    current: Option<PathBuf>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a workspace on disk, registers it and makes it current.
    /// 建立工作區目錄、登錄並設為目前工作區。
    pub fn new_workspace(
        &mut self,
        name: &str,
        base_path: impl Into<PathBuf>,
        relative_path: Option<&str>,
    ) -> Result<&Workspace, ProjectError> {
        let workspace = Workspace::new(name, base_path, relative_path)?;
        let key = workspace.full_path();
        self.ensure_unused(&key)?;
        workspace.create()?;
        log::info!("new workspace `{name}` at {}", key.display());
        Ok(self.register(key, workspace))
    }

    /// Loads `<dir>/<file_name>`, registers the workspace and makes it current.
    /// 載入 `<dir>/<file_name>` 並設為目前工作區。
    pub fn open_workspace(
        &mut self,
        dir: &Path,
        file_name: &str,
    ) -> Result<&Workspace, ProjectError> {
        let workspace = Workspace::load(dir, file_name)?;
        let key = workspace.full_path();
        self.ensure_unused(&key)?;
        log::info!("opened workspace `{}` from {}", workspace.name(), dir.display());
        Ok(self.register(key, workspace))
    }

    /// Forgets a workspace without touching the disk.
    /// 關閉工作區（不刪除磁碟內容）。
    pub fn close_workspace(&mut self, path: &Path) -> Result<Workspace, ProjectError> {
        let workspace = self
            .workspaces
            .remove(path)
            .ok_or_else(|| ProjectError::UnknownWorkspace(path.to_path_buf()))?;
        if self.current.as_deref() == Some(path) {
            self.current = None;
        }
        log::info!("closed workspace `{}`", workspace.name());
        Ok(workspace)
    }

    /// Saves one workspace (the current one when `path` is `None`) into its
    /// `Configs` directory.
    /// 儲存指定工作區（未指定時為目前工作區）。
    pub fn save_workspace(
        &self,
        path: Option<&Path>,
        file_name: &str,
    ) -> Result<PathBuf, ProjectError> {
        let workspace = match path {
            Some(path) => self
                .workspaces
                .get(path)
                .ok_or_else(|| ProjectError::UnknownWorkspace(path.to_path_buf()))?,
            None => self
                .current_workspace()
                .ok_or(ProjectError::NoCurrentWorkspace)?,
        };
        workspace.save(file_name)
    }

    /// Deletes a workspace from disk and forgets it.
    /// 刪除工作區目錄並移除登錄。
    ///
    /// On failure the workspace stays registered, minus the scenes that were
    /// already deleted.
    pub fn delete_workspace(&mut self, path: &Path) -> Result<(), ProjectError> {
        let workspace = self
            .workspaces
            .get_mut(path)
            .ok_or_else(|| ProjectError::UnknownWorkspace(path.to_path_buf()))?;
        workspace.delete()?;
        self.workspaces.remove(path);
        if self.current.as_deref() == Some(path) {
            self.current = None;
        }
        Ok(())
    }

    pub fn workspace(&self, path: &Path) -> Option<&Workspace> {
        self.workspaces.get(path)
    }

    pub fn workspaces(&self) -> impl Iterator<Item = &Workspace> {
        self.workspaces.values()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }

    pub fn current_workspace_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn current_workspace(&self) -> Option<&Workspace> {
        self.current
            .as_ref()
            .and_then(|path| self.workspaces.get(path))
    }

    pub fn current_workspace_mut(&mut self) -> Option<&mut Workspace> {
        match &self.current {
            Some(path) => self.workspaces.get_mut(path),
            None => None,
        }
    }

    pub fn set_current_workspace(&mut self, path: Option<&Path>) -> Result<(), ProjectError> {
        if let Some(path) = path {
            if !self.workspaces.contains_key(path) {
                return Err(ProjectError::UnknownWorkspace(path.to_path_buf()));
            }
        }
        self.current = path.map(Path::to_path_buf);
        Ok(())
    }

    /// [`Workspace::new_scene`] on the current workspace.
    pub fn new_scene(
        &mut self,
        name: Option<&str>,
        path: Option<&str>,
    ) -> Result<&Scene, ProjectError> {
        self.current_workspace_mut()
            .ok_or(ProjectError::NoCurrentWorkspace)?
            .new_scene(name, path)
    }

    pub fn delete_scene(&mut self, key: &str) -> Result<(), ProjectError> {
        self.current_workspace_mut()
            .ok_or(ProjectError::NoCurrentWorkspace)?
            .delete_scene(key)
    }

    pub fn set_current_scene(&mut self, key: Option<&str>) -> Result<(), ProjectError> {
        self.current_workspace_mut()
            .ok_or(ProjectError::NoCurrentWorkspace)?
            .set_current_scene(key)
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.current_workspace().and_then(Workspace::current_scene)
    }

    pub fn to_value(&self) -> Result<Value, ProjectError> {
        let file = ProjectFile {
            workspaces: self.workspaces.values().cloned().collect(),
            current_workspace: self.current.clone(),
        };
        Ok(serde_json::to_value(file)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ProjectError> {
        let file: ProjectFile = serde_json::from_value(value)?;
        Self::from_file(file)
    }

    /// Saves the whole session into `<dir>/<file_name>`.
    /// 將整個工作階段儲存至 `<dir>/<file_name>`。
    pub fn save_to(&self, dir: &Path, file_name: &str) -> Result<PathBuf, ProjectError> {
        let path = resolve_file(dir, file_name)?;
        save_json(&path, &self.to_value()?)?;
        Ok(path)
    }

    /// Restores a session written by [`ProjectStore::save_to`].
    /// 還原由 [`ProjectStore::save_to`] 寫入的工作階段。
    pub fn load_from(dir: &Path, file_name: &str) -> Result<Self, ProjectError> {
        let path = resolve_file(dir, file_name)?;
        let file: ProjectFile = load_json(&path)?;
        Self::from_file(file)
    }

    fn from_file(file: ProjectFile) -> Result<Self, ProjectError> {
        let mut store = Self::default();
        for workspace in file.workspaces {
            workspace.validate()?;
            let key = workspace.full_path();
            store.ensure_unused(&key)?;
            store.workspaces.insert(key, workspace);
        }
        if let Some(current) = &file.current_workspace {
            if !store.workspaces.contains_key(current) {
                return Err(ProjectError::Inconsistent(format!(
                    "current workspace {} is not open",
                    current.display()
                )));
            }
        }
        store.current = file.current_workspace;
        Ok(store)
    }

    fn ensure_unused(&self, key: &Path) -> Result<(), ProjectError> {
        if self.workspaces.contains_key(key) {
            return Err(ProjectError::DuplicatePath(key.display().to_string()));
        }
        Ok(())
    }

    fn register(&mut self, key: PathBuf, workspace: Workspace) -> &Workspace {
        self.current = Some(key.clone());
        self.workspaces.entry(key).or_insert(workspace)
    }
}
