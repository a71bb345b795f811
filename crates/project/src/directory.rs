use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sanitize::checked_segment;
use crate::serde_path;
use crate::ProjectError;

/// A named directory below an absolute base path, plus the subdirectories it
/// declares.
/// 位於絕對基底路徑下的具名目錄，以及其宣告的子目錄。
///
/// Constructing a space touches nothing on disk; [`DirectorySpace::create`]
/// materializes it and [`DirectorySpace::delete`] removes the whole subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySpace {
    name: String,
    #[serde(with = "serde_path")]
    base_path: PathBuf,
    relative_path: String,
    #[serde(default)]
    subdirectories: BTreeMap<String, String>,
}

impl DirectorySpace {
    /// Builds a space named `name` under `base_path`. The relative path is the
    /// sanitized `relative_path`, or the sanitized name when omitted.
    /// 建立位於 `base_path` 下的目錄空間；未提供相對路徑時以清理後的名稱代替。
    pub fn new(
        name: &str,
        base_path: impl Into<PathBuf>,
        relative_path: Option<&str>,
    ) -> Result<Self, ProjectError> {
        if name.trim().is_empty() {
            return Err(ProjectError::EmptyName);
        }
        let base_path = base_path.into();
        if !base_path.is_absolute() {
            return Err(ProjectError::NotAbsolute(base_path));
        }
        let relative_path = checked_segment(relative_path.unwrap_or(name))?;
        Ok(Self {
            name: name.to_string(),
            base_path,
            relative_path,
            subdirectories: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Declared subdirectories, keyed by sanitized relative path.
    /// 已宣告的子目錄（以清理後的相對路徑為鍵）。
    pub fn subdirectories(&self) -> &BTreeMap<String, String> {
        &self.subdirectories
    }

    pub fn full_path(&self) -> PathBuf {
        self.base_path.join(&self.relative_path)
    }

    pub fn exists(&self) -> bool {
        self.full_path().is_dir()
    }

    /// Declares a subdirectory that `create` will materialize. Returns its key.
    /// 宣告一個由 `create` 建立的子目錄，回傳其鍵值。
    pub fn declare_subdir(
        &mut self,
        path: &str,
        description: impl Into<String>,
    ) -> Result<String, ProjectError> {
        let key = checked_segment(path)?;
        self.subdirectories.insert(key.clone(), description.into());
        Ok(key)
    }

    /// Absolute path of a declared subdirectory.
    /// 已宣告子目錄的絕對路徑。
    pub fn subdir_path(&self, key: &str) -> Option<PathBuf> {
        self.subdirectories
            .contains_key(key)
            .then(|| self.full_path().join(key))
    }

    /// Creates the directory and every declared subdirectory.
    /// 建立目錄與所有宣告的子目錄。
    ///
    /// Fails with [`ProjectError::AlreadyExists`] when anything is already at
    /// the target. If a subdirectory cannot be created the fresh directory is
    /// removed again, so a retry starts from a clean state.
    pub fn create(&self) -> Result<(), ProjectError> {
        let full_path = self.full_path();
        if full_path.exists() {
            return Err(ProjectError::AlreadyExists(full_path));
        }
        fs::create_dir_all(&full_path).map_err(|err| ProjectError::io(&full_path, err))?;
        for key in self.subdirectories.keys() {
            let path = full_path.join(key);
            if let Err(err) = fs::create_dir_all(&path) {
                if let Err(cleanup) = fs::remove_dir_all(&full_path) {
                    log::warn!(
                        "could not roll back {} after failed create: {cleanup}",
                        full_path.display()
                    );
                }
                return Err(ProjectError::io(path, err));
            }
        }
        log::info!("created {}", full_path.display());
        Ok(())
    }

    /// Removes the directory and everything below it.
    /// 遞迴刪除目錄及其內容。
    pub fn delete(&self) -> Result<(), ProjectError> {
        let full_path = self.full_path();
        if !full_path.exists() {
            return Err(ProjectError::NotFound(full_path));
        }
        fs::remove_dir_all(&full_path).map_err(|err| ProjectError::io(&full_path, err))?;
        log::info!("deleted {}", full_path.display());
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), ProjectError> {
        if self.name.trim().is_empty() {
            return Err(ProjectError::EmptyName);
        }
        if !self.base_path.is_absolute() {
            return Err(ProjectError::NotAbsolute(self.base_path.clone()));
        }
        if checked_segment(&self.relative_path)? != self.relative_path {
            return Err(ProjectError::Inconsistent(format!(
                "relative path `{}` is not sanitized",
                self.relative_path
            )));
        }
        for key in self.subdirectories.keys() {
            if checked_segment(key)? != *key {
                return Err(ProjectError::Inconsistent(format!(
                    "subdirectory `{key}` is not sanitized"
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
    fn relative_path_defaults_to_sanitized_name() {
        let space = DirectorySpace::new("My Scene", "/tmp/proj", None).unwrap();
        assert_eq!(space.relative_path(), "My_Scene");
        assert_eq!(space.full_path(), PathBuf::from("/tmp/proj/My_Scene"));

        let space = DirectorySpace::new("My Scene", "/tmp/proj", Some("custom dir")).unwrap();
        assert_eq!(space.relative_path(), "custom_dir");
    }

    #[test]
    fn rejects_bad_construction_input() {
        assert!(matches!(
            DirectorySpace::new("  ", "/tmp", None),
            Err(ProjectError::EmptyName)
        ));
        assert!(matches!(
            DirectorySpace::new("W", "relative/base", None),
            Err(ProjectError::NotAbsolute(_))
        ));
        assert!(matches!(
            DirectorySpace::new("***", "/tmp", None),
            Err(ProjectError::InvalidName(_))
        ));
    }

    #[test]
    fn create_twice_fails_and_delete_requires_existence() {
        let temp = tempdir().unwrap();
        let mut space = DirectorySpace::new("W", temp.path(), None).unwrap();
        space.declare_subdir("Configs", "workspace metadata").unwrap();

        assert!(matches!(space.delete(), Err(ProjectError::NotFound(_))));
        space.create().unwrap();
        assert!(space.exists());
        assert!(space.subdir_path("Configs").unwrap().is_dir());
        assert!(matches!(space.create(), Err(ProjectError::AlreadyExists(_))));

        space.delete().unwrap();
        assert!(!space.exists());
        assert!(matches!(space.delete(), Err(ProjectError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn failed_subdirectory_rolls_back_root() {
        let temp = tempdir().unwrap();
        let mut space = DirectorySpace::new("W", temp.path(), None).unwrap();
        space.declare_subdir("Configs", "ok").unwrap();
        // Longer than NAME_MAX, so mkdir fails after the root exists.
        space.declare_subdir(&"x".repeat(300), "too long").unwrap();

        let err = space.create().unwrap_err();
        assert!(matches!(err, ProjectError::Io { .. }));
        assert!(!space.full_path().exists());
    }

    #[test]
    fn unknown_subdir_has_no_path() {
        let space = DirectorySpace::new("W", "/tmp", None).unwrap();
        assert!(space.subdir_path("Configs").is_none());
    }

    #[test]
    fn serde_roundtrip_keeps_every_attribute() {
        let mut space = DirectorySpace::new("Première", "/tmp/proj", Some("first")).unwrap();
        space.declare_subdir("thumbnails", "thumbnails").unwrap();
        let value = serde_json::to_value(&space).unwrap();
        let restored: DirectorySpace = serde_json::from_value(value).unwrap();
        assert_eq!(restored, space);
        restored.validate().unwrap();
    }
}
