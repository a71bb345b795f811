use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::state::PictureState;

/// Coordinate value meaning "no geotag".
pub const UNKNOWN_COORDINATE: &str = "0.0";

/// One picture tracked by the collection. Its identity is the path.
/// （集合中的一張照片，以路徑作為識別。）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PictureRecord", into = "PictureRecord")]
pub struct Picture {
    path: String,
    name: String,
    latitude: String,
    longitude: String,
    date: Option<String>,
    status: PictureState,
    previous_status: Option<PictureState>,
}

#[derive(Serialize, Deserialize)]
struct PictureRecord {
    path: String,
    #[serde(default = "unknown_coordinate")]
    latitude: String,
    #[serde(default = "unknown_coordinate")]
    longitude: String,
    #[serde(default)]
    date: Option<String>,
    status: PictureState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_status: Option<PictureState>,
}

fn unknown_coordinate() -> String {
    UNKNOWN_COORDINATE.to_string()
}

impl From<PictureRecord> for Picture {
    fn from(record: PictureRecord) -> Self {
        let mut picture = Picture::new(
            record.path,
            record.latitude,
            record.longitude,
            record.date,
            record.status,
        );
        picture.previous_status = record.previous_status;
        picture
    }
}

impl From<Picture> for PictureRecord {
    fn from(picture: Picture) -> Self {
        Self {
            path: picture.path,
            latitude: picture.latitude,
            longitude: picture.longitude,
            date: picture.date,
            status: picture.status,
            previous_status: picture.previous_status,
        }
    }
}

fn derive_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

impl Picture {
    pub fn new(
        path: impl Into<String>,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
        date: Option<String>,
        status: PictureState,
    ) -> Self {
        let path = path.into();
        Self {
            name: derive_name(&path),
            path,
            latitude: latitude.into(),
            longitude: longitude.into(),
            date,
            status,
            previous_status: None,
        }
    }

    /// A picture with no geotag and no date.
    pub fn untagged(path: impl Into<String>, status: PictureState) -> Self {
        Self::new(path, UNKNOWN_COORDINATE, UNKNOWN_COORDINATE, None, status)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Replaces the path; the name follows.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.name = derive_name(&self.path);
    }

    /// Base name of the path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latitude(&self) -> &str {
        &self.latitude
    }

    pub fn set_latitude(&mut self, latitude: impl Into<String>) {
        self.latitude = latitude.into();
    }

    pub fn longitude(&self) -> &str {
        &self.longitude
    }

    pub fn set_longitude(&mut self, longitude: impl Into<String>) {
        self.longitude = longitude.into();
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn set_date(&mut self, date: Option<String>) {
        self.date = date;
    }

    pub fn status(&self) -> PictureState {
        self.status
    }

    pub fn previous_status(&self) -> Option<PictureState> {
        self.previous_status
    }

    /// Direct status write, no transition rules applied.
    pub fn set_status(&mut self, status: PictureState) {
        self.status = status;
    }

    /// Parsed coordinates, or `None` while either one is unknown.
    /// （解析後的座標；任一值未知時回傳 `None`。）
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let parse = |value: &str| {
            if value.trim() == UNKNOWN_COORDINATE {
                None
            } else {
                value.trim().parse::<f64>().ok()
            }
        };
        Some((parse(&self.latitude)?, parse(&self.longitude)?))
    }

    /// `<resources>/Icons/<code>.png`
    pub fn icon(&self, resources_path: &Path) -> PathBuf {
        resources_path
            .join("Icons")
            .join(self.status.icon_file_name())
    }

    /// Moves to the discarded state, remembering the current one. Returns
    /// `false` when the picture was already discarded.
    pub fn discard(&mut self) -> bool {
        if self.status.is_discarded() {
            return false;
        }
        self.previous_status = Some(self.status);
        self.status = self.status.discarded();
        true
    }

    /// Restores the state held before `discard`. Returns `false` when the
    /// picture is not discarded.
    pub fn renew(&mut self) -> bool {
        if !self.status.is_discarded() {
            return false;
        }
        self.status = self
            .previous_status
            .take()
            .unwrap_or_else(|| self.status.default_renewal());
        true
    }
}
