use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::directory::DirectorySpace;
use crate::persist::Persisted;
use crate::ProjectError;

pub const RECONSTRUCTION_OUTPUT: &str = "reconstruction_output";
pub const RECONSTRUCTION_TEMP: &str = "reconstruction_temp";
pub const RECONSTRUCTION_PICTURES: &str = "reconstruction_pictures";
pub const PICTURES_SET: &str = "pictures_set";
pub const THUMBNAILS: &str = "thumbnails";

const SCENE_SUBDIRS: [(&str, &str); 5] = [
    (RECONSTRUCTION_OUTPUT, "reconstruction output"),
    (RECONSTRUCTION_TEMP, "reconstruction scratch space"),
    (RECONSTRUCTION_PICTURES, "pictures handed to the reconstruction"),
    (PICTURES_SET, "pictures downloaded from the camera"),
    (THUMBNAILS, "thumbnails downloaded from the camera"),
];

/// One capture session inside a workspace.
/// 工作區中的一個拍攝場景。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(flatten)]
    space: DirectorySpace,
}

impl Scene {
    /// Creates the in-memory scene with its fixed subdirectories declared.
    /// 建立場景並宣告固定的子目錄（尚未寫入磁碟）。
    pub fn new(
        name: &str,
        base_path: impl Into<PathBuf>,
        relative_path: Option<&str>,
    ) -> Result<Self, ProjectError> {
        let mut space = DirectorySpace::new(name, base_path, relative_path)?;
        for (key, description) in SCENE_SUBDIRS {
            space.declare_subdir(key, description)?;
        }
        Ok(Self { space })
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

    pub fn exists(&self) -> bool {
        self.space.exists()
    }

    pub fn create(&self) -> Result<(), ProjectError> {
        self.space.create()
    }

    pub fn delete(&self) -> Result<(), ProjectError> {
        self.space.delete()
    }

    pub fn reconstruction_output_dir(&self) -> PathBuf {
        self.full_path().join(RECONSTRUCTION_OUTPUT)
    }

    pub fn reconstruction_temp_dir(&self) -> PathBuf {
        self.full_path().join(RECONSTRUCTION_TEMP)
    }

    pub fn reconstruction_pictures_dir(&self) -> PathBuf {
        self.full_path().join(RECONSTRUCTION_PICTURES)
    }

    /// Where camera downloads land.
    /// 相機下載檔案的存放位置。
    pub fn pictures_dir(&self) -> PathBuf {
        self.full_path().join(PICTURES_SET)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.full_path().join(THUMBNAILS)
    }
}

impl Persisted for Scene {
    fn storage_dir(&self) -> PathBuf {
        self.full_path()
    }

    fn validate(&self) -> Result<(), ProjectError> {
        self.space.validate()?;
        for (key, _) in SCENE_SUBDIRS {
            if !self.space.subdirectories().contains_key(key) {
                return Err(ProjectError::Inconsistent(format!(
                    "scene `{}` does not declare `{key}`",
                    self.name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_materializes_every_subdirectory() {
        let temp = tempdir().unwrap();
        let scene = Scene::new("S1", temp.path(), None).unwrap();
        scene.create().unwrap();
        for dir in [
            scene.reconstruction_output_dir(),
            scene.reconstruction_temp_dir(),
            scene.reconstruction_pictures_dir(),
            scene.pictures_dir(),
            scene.thumbnails_dir(),
        ] {
            assert!(dir.is_dir(), "{} missing", dir.display());
        }
    }

    #[test]
    fn save_then_load_restores_the_scene() {
        let temp = tempdir().unwrap();
        let scene = Scene::new("Façade nord", temp.path(), None).unwrap();
        scene.create().unwrap();
        let saved = scene.save("scene.json").unwrap();
        assert_eq!(saved, scene.full_path().join("scene.json"));

        let loaded = Scene::load(&scene.full_path(), "scene.json").unwrap();
        assert_eq!(loaded, scene);
        assert_eq!(loaded.relative_path(), "Facade_nord");
    }

    #[test]
    fn load_rejects_scene_without_required_subdirectories() {
        let scene = Scene::new("S1", "/tmp/proj", None).unwrap();
        let mut value = scene.to_value().unwrap();
        value["subdirectories"]
            .as_object_mut()
            .unwrap()
            .remove(THUMBNAILS);
        assert!(matches!(
            Scene::from_value(value),
            Err(ProjectError::Inconsistent(_))
        ));
    }

    #[test]
    fn load_preconditions() {
        assert!(matches!(
            Scene::load(Path::new("proj"), "scene.json"),
            Err(ProjectError::NotAbsolute(_))
        ));
        let temp = tempdir().unwrap();
        assert!(matches!(
            Scene::load(temp.path(), "scene.json"),
            Err(ProjectError::NotFound(_))
        ));
    }
}
