use std::path::Path;

use photomatrix_toolexec::ToolCommand;

use crate::parse;
use crate::tool::{DeviceDescriptor, DeviceTool, StorageInfo};
use crate::DeviceCommandError;

pub const DEFAULT_PROGRAM: &str = "gphoto2";

/// 透過 `gphoto2` 命令列操作相機。 / Talks to the camera through the `gphoto2` command line.
#[derive(Debug, Clone)]
pub struct Gphoto2Tool {
    program: String,
}

impl Default for Gphoto2Tool {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl Gphoto2Tool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> ToolCommand {
        ToolCommand::new(&self.program)
    }

    fn query(&self, command: ToolCommand) -> Result<String, DeviceCommandError> {
        let output = command.run_checked()?;
        Ok(output.stdout_text().into_owned())
    }

    fn exit_code(&self, command: ToolCommand) -> Result<i32, DeviceCommandError> {
        let output = command.run()?;
        if !output.success() {
            log::debug!("`{command}` failed: {}", output.stderr_text().trim());
        }
        Ok(output.code())
    }
}

impl DeviceTool for Gphoto2Tool {
    fn detect(&self) -> Result<Vec<DeviceDescriptor>, DeviceCommandError> {
        parse::parse_auto_detect(&self.query(self.command().arg("--auto-detect"))?)
    }

    fn summary(&self) -> Result<String, DeviceCommandError> {
        self.query(self.command().arg("--summary"))
    }

    fn storage_info(&self) -> Result<StorageInfo, DeviceCommandError> {
        parse::parse_storage_info(&self.query(self.command().arg("--storage-info"))?)
    }

    fn list_files(&self) -> Result<Vec<String>, DeviceCommandError> {
        parse::parse_file_list(&self.query(self.command().arg("--list-files"))?)
    }

    fn show_info(&self, index: usize) -> Result<String, DeviceCommandError> {
        let command = self.command().args(["--show-info".to_string(), index.to_string()]);
        parse::parse_show_info(&self.query(command)?)
    }

    fn fetch(
        &self,
        index: usize,
        destination: &Path,
        thumbnail: bool,
    ) -> Result<i32, DeviceCommandError> {
        let action = if thumbnail {
            "--get-thumbnail"
        } else {
            "--get-file"
        };
        let command = self.command().args([
            action.to_string(),
            index.to_string(),
            "--filename".to_string(),
            destination.to_string_lossy().into_owned(),
        ]);
        self.exit_code(command)
    }

    fn fetch_all(
        &self,
        destination_pattern: &Path,
        thumbnail: bool,
        overwrite: bool,
    ) -> Result<i32, DeviceCommandError> {
        let action = if thumbnail {
            "--get-all-thumbnails"
        } else {
            "--get-all-files"
        };
        let mut command = self.command().args([
            action.to_string(),
            "--filename".to_string(),
            destination_pattern.to_string_lossy().into_owned(),
        ]);
        if overwrite {
            command = command.arg("--force-overwrite");
        }
        self.exit_code(command)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn script(dir: &Path, body: &str) -> String {
        let path = dir.join("fake-gphoto2");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn queries_parse_tool_output() {
        let temp = tempdir().unwrap();
        let program = script(
            temp.path(),
            r#"case "$1" in
  --summary) printf 'Camera summary:\nModel: D5100\n' ;;
  --list-files) printf '#1 a.jpg rd 1 KB\n#2 b.jpg rd 1 KB\n' ;;
  --show-info) printf "Information on file 'b.jpg' (folder '/'):\n" ;;
  *) exit 1 ;;
esac"#,
        );
        let tool = Gphoto2Tool::new(program);
        assert!(tool.summary().unwrap().contains("Model: D5100"));
        assert_eq!(tool.list_files().unwrap(), vec!["a.jpg", "b.jpg"]);
        assert_eq!(tool.show_info(2).unwrap(), "b.jpg");
        assert!(matches!(
            tool.storage_info(),
            Err(DeviceCommandError::Tool(_))
        ));
    }

    #[test]
    fn fetch_returns_raw_exit_code() {
        let temp = tempdir().unwrap();
        let program = script(
            temp.path(),
            r#"if [ "$1" = "--get-file" ]; then touch "$4"; exit 0; fi
exit 7"#,
        );
        let tool = Gphoto2Tool::new(program);
        let destination = temp.path().join("a.jpg");
        assert_eq!(tool.fetch(1, &destination, false).unwrap(), 0);
        assert!(destination.exists());
        assert_eq!(tool.fetch(1, &destination, true).unwrap(), 7);
        assert_eq!(
            tool.fetch_all(&temp.path().join("%f.%C"), false, true).unwrap(),
            7
        );
    }
}
