use std::collections::BTreeMap;
use std::path::Path;

use photomatrix_toolexec::ToolCommand;
use serde_json::Value;

use crate::MetadataError;

pub const GPS_LATITUDE: &str = "EXIF:GPSLatitude";
pub const GPS_LONGITUDE: &str = "EXIF:GPSLongitude";
pub const DATE_TIME_ORIGINAL: &str = "EXIF:DateTimeOriginal";

pub const DEFAULT_PROGRAM: &str = "exiftool";

/// Source of EXIF tags for a picture file. Missing tags are simply absent
/// from the returned map.
/// （照片 EXIF 標籤的來源；缺少的標籤不會出現在結果中。）
pub trait MetadataReader {
    fn tags(&self, keys: &[&str], path: &Path) -> Result<BTreeMap<String, String>, MetadataError>;
}

/// Reads tags with `exiftool -j -G -n`.
#[derive(Debug, Clone)]
pub struct ExifToolReader {
    program: String,
}

impl Default for ExifToolReader {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl ExifToolReader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MetadataReader for ExifToolReader {
    fn tags(&self, keys: &[&str], path: &Path) -> Result<BTreeMap<String, String>, MetadataError> {
        let command = ToolCommand::new(&self.program)
            .args(["-j", "-G", "-n"])
            .args(keys.iter().map(|key| format!("-{key}")))
            .arg(path.to_string_lossy().into_owned());
        let output = command.run_checked()?;
        flatten_first_object(&output.stdout, keys, path)
    }
}

/// Always answers with no tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetadataReader;

impl MetadataReader for NullMetadataReader {
    fn tags(&self, _keys: &[&str], _path: &Path) -> Result<BTreeMap<String, String>, MetadataError> {
        Ok(BTreeMap::new())
    }
}

fn flatten_first_object(
    json: &[u8],
    keys: &[&str],
    path: &Path,
) -> Result<BTreeMap<String, String>, MetadataError> {
    let parsed: Vec<BTreeMap<String, Value>> =
        serde_json::from_slice(json).map_err(|source| MetadataError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let first = parsed
        .into_iter()
        .next()
        .ok_or_else(|| MetadataError::Empty(path.to_path_buf()))?;
    Ok(first
        .into_iter()
        .filter(|(key, _)| keys.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key, text))
        })
        .collect())
}
