use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use photomatrix_pictures::{ExifToolReader, MetadataReader, NullMetadataReader, PictureCollection};
use photomatrix_project::{ProjectStore, Scene};

use crate::settings::{Settings, SettingsStore};

pub const STATE_DIR: &str = ".photomatrix";
pub const PROJECT_FILE: &str = "project.json";
pub const SETTINGS_FILE: &str = "settings.json";

struct ScenePictures {
    scene_dir: PathBuf,
    collection: PictureCollection,
}

/// 單一指令所需的應用程式狀態。 / Application state for one command run.
///
/// Everything is loaded from `<root>/.photomatrix` and written back by
/// [`AppContext::persist`]. The picture collection of the current scene is
/// loaded on first use.
pub struct AppContext {
    root: PathBuf,
    settings: SettingsStore,
    store: ProjectStore,
    pictures: Option<ScenePictures>,
}

impl AppContext {
    pub fn load(root: PathBuf) -> Result<Self> {
        let state_dir = root.join(STATE_DIR);
        let settings_path = state_dir.join(SETTINGS_FILE);
        let settings = SettingsStore::load(&settings_path)
            .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;
        let store = if state_dir.join(PROJECT_FILE).exists() {
            ProjectStore::load_from(&state_dir, PROJECT_FILE)
                .with_context(|| format!("failed to load project from {}", state_dir.display()))?
        } else {
            ProjectStore::new()
        };
        Ok(Self {
            root,
            settings,
            store,
            pictures: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        self.settings.settings()
    }

    pub fn settings_store_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProjectStore {
        &mut self.store
    }

    /// 相對路徑以根目錄為基準。 / Relative paths are taken from the root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn current_scene(&self) -> Result<&Scene> {
        let workspace = self
            .store
            .current_workspace()
            .ok_or_else(|| anyhow!("no current workspace; run `workspace new` or `workspace use`"))?;
        workspace
            .current_scene()
            .ok_or_else(|| anyhow!("workspace `{}` has no current scene", workspace.name()))
    }

    /// `exiftool`, unless metadata is disabled in settings or skipped.
    pub fn metadata_reader(&self, skip: bool) -> Box<dyn MetadataReader> {
        let metadata = &self.settings().metadata;
        if skip || !metadata.enabled {
            Box::new(NullMetadataReader)
        } else {
            Box::new(ExifToolReader::new(metadata.program.clone()))
        }
    }

    /// 目前場景的照片集合。 / Picture collection of the current scene.
    pub fn pictures(&mut self) -> Result<&mut PictureCollection> {
        let scene_dir = self.current_scene()?.full_path();
        let loaded = matches!(&self.pictures, Some(pictures) if pictures.scene_dir == scene_dir);
        if !loaded {
            let file_name = self.settings().pictures_file.clone();
            let collection = if scene_dir.join(&file_name).exists() {
                PictureCollection::load(&scene_dir, &file_name).with_context(|| {
                    format!("failed to load pictures from {}", scene_dir.display())
                })?
            } else {
                PictureCollection::new(self.settings().resources_path(&self.root))
            };
            self.pictures = Some(ScenePictures {
                scene_dir,
                collection,
            });
        }
        self.pictures
            .as_mut()
            .map(|pictures| &mut pictures.collection)
            .ok_or_else(|| anyhow!("picture collection is not loaded"))
    }

    /// Writes the project session, every open workspace's config and the
    /// loaded picture collection.
    /// 寫回專案工作階段、各工作區設定與已載入的照片集合。
    pub fn persist(&self) -> Result<()> {
        let state_dir = self.root.join(STATE_DIR);
        self.store
            .save_to(&state_dir, PROJECT_FILE)
            .with_context(|| format!("failed to save project to {}", state_dir.display()))?;

        let settings = self.settings();
        for workspace in self.store.workspaces() {
            if !workspace.exists() {
                log::warn!("workspace {} is missing on disk", workspace.full_path().display());
                continue;
            }
            let path = workspace.full_path();
            self.store
                .save_workspace(Some(&path), &settings.workspace_file)
                .with_context(|| format!("failed to save workspace {}", path.display()))?;
        }

        if let Some(pictures) = &self.pictures {
            if pictures.scene_dir.is_dir() {
                pictures
                    .collection
                    .save(&pictures.scene_dir, &settings.pictures_file)
                    .with_context(|| {
                        format!("failed to save pictures to {}", pictures.scene_dir.display())
                    })?;
            }
        }
        Ok(())
    }
}
