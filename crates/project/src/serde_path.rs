//! Serde adapters that store paths as strings.
//!
//! UTF-8 paths are written verbatim; anything else is written as `b64:` plus
//! the base64 of the platform bytes so a workspace living under a non-UTF-8
//! directory still round-trips.
//! 路徑以字串儲存；非 UTF-8 路徑改以 `b64:` 前綴加 base64 保存。

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

const B64_PREFIX: &str = "b64:";

pub fn serialize<S>(path: &Path, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&encode(path))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    decode(&text).map_err(serde::de::Error::custom)
}

/// Same encoding for `Option<PathBuf>` fields.
pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(path) => serializer.serialize_some(&encode(path)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|text| decode(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Encodes a path into its persisted string form.
pub fn encode(path: &Path) -> String {
    match path.to_str() {
        Some(text) => text.to_string(),
        None => format!("{B64_PREFIX}{}", BASE64.encode(raw_bytes(path))),
    }
}

/// Decodes the persisted string form back into a path.
pub fn decode(text: &str) -> Result<PathBuf, String> {
    match text.strip_prefix(B64_PREFIX) {
        Some(payload) => {
            let bytes = BASE64
                .decode(payload.as_bytes())
                .map_err(|err| format!("invalid base64 path `{text}`: {err}"))?;
            from_raw_bytes(bytes)
        }
        None => Ok(PathBuf::from(text)),
    }
}

#[cfg(unix)]
fn raw_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn from_raw_bytes(bytes: Vec<u8>) -> Result<PathBuf, String> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    Ok(PathBuf::from(OsString::from_vec(bytes)))
}

#[cfg(windows)]
fn raw_bytes(path: &Path) -> Vec<u8> {
    use std::os::windows::ffi::OsStrExt;
    path.as_os_str()
        .encode_wide()
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

#[cfg(windows)]
fn from_raw_bytes(bytes: Vec<u8>) -> Result<PathBuf, String> {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    if bytes.len() % 2 != 0 {
        return Err("encoded wide path has an odd byte length".to_string());
    }
    let wide: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(PathBuf::from(OsString::from_wide(&wide)))
}
