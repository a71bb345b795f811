use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::picture::Picture;
use crate::state::PictureState;
use crate::CollectionError;

/// Addressable attributes of a picture row.
/// （照片列可存取的屬性。）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PictureRole {
    Path,
    Name,
    Date,
    Status,
    Icon,
    Latitude,
    Longitude,
    /// The whole picture.
    Item,
}

/// Typed value read from, or written through, a [`PictureRole`].
#[derive(Debug, Clone, PartialEq)]
pub enum RoleValue {
    Text(String),
    OptionalText(Option<String>),
    Status(PictureState),
    Path(PathBuf),
    Item(Option<Picture>),
}

impl PictureRole {
    pub const ALL: [PictureRole; 8] = [
        PictureRole::Path,
        PictureRole::Name,
        PictureRole::Date,
        PictureRole::Status,
        PictureRole::Icon,
        PictureRole::Latitude,
        PictureRole::Longitude,
        PictureRole::Item,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PictureRole::Path => "path",
            PictureRole::Name => "name",
            PictureRole::Date => "date",
            PictureRole::Status => "status",
            PictureRole::Icon => "icon",
            PictureRole::Latitude => "latitude",
            PictureRole::Longitude => "longitude",
            PictureRole::Item => "item",
        }
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, PictureRole::Name | PictureRole::Icon)
    }

    /// Reads this role from a picture.
    /// （自照片讀取此屬性。）
    pub fn read(self, picture: &Picture, resources_path: &Path) -> RoleValue {
        match self {
            PictureRole::Path => RoleValue::Text(picture.path().to_string()),
            PictureRole::Name => RoleValue::Text(picture.name().to_string()),
            PictureRole::Date => RoleValue::OptionalText(picture.date().map(str::to_string)),
            PictureRole::Status => RoleValue::Status(picture.status()),
            PictureRole::Icon => RoleValue::Path(picture.icon(resources_path)),
            PictureRole::Latitude => RoleValue::Text(picture.latitude().to_string()),
            PictureRole::Longitude => RoleValue::Text(picture.longitude().to_string()),
            PictureRole::Item => RoleValue::Item(Some(picture.clone())),
        }
    }

    /// Writes a field role into a picture. `Item` replaces the whole slot and
    /// is handled by the collection.
    /// （寫入照片的欄位屬性；`Item` 由集合處理。）
    pub fn write(self, picture: &mut Picture, value: RoleValue) -> Result<(), CollectionError> {
        match (self, value) {
            (PictureRole::Name | PictureRole::Icon, _) => Err(CollectionError::ReadOnlyRole(self)),
            (PictureRole::Path, RoleValue::Text(path)) => {
                picture.set_path(path);
                Ok(())
            }
            (PictureRole::Date, RoleValue::OptionalText(date)) => {
                picture.set_date(date);
                Ok(())
            }
            (PictureRole::Date, RoleValue::Text(date)) => {
                picture.set_date(Some(date));
                Ok(())
            }
            (PictureRole::Status, RoleValue::Status(status)) => {
                picture.set_status(status);
                Ok(())
            }
            (PictureRole::Latitude, RoleValue::Text(latitude)) => {
                picture.set_latitude(latitude);
                Ok(())
            }
            (PictureRole::Longitude, RoleValue::Text(longitude)) => {
                picture.set_longitude(longitude);
                Ok(())
            }
            (role, _) => Err(CollectionError::RoleMismatch {
                role,
                expected: role.expected(),
            }),
        }
    }

    fn expected(self) -> &'static str {
        match self {
            PictureRole::Date => "text or no value",
            PictureRole::Status => "a status",
            PictureRole::Icon => "a path",
            PictureRole::Item => "a picture or an empty slot",
            _ => "text",
        }
    }
}

impl fmt::Display for PictureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PictureRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PictureRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown role `{value}`"))
    }
}
