use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CollectionError;

/// Lifecycle of a picture. Persisted as its integer code.
/// （照片的生命週期狀態，以整數代碼儲存。）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PictureState {
    New = 0,
    Reconstruction = 1,
    Rejected = 2,
    Processed = 3,
    Thumbnail = 4,
    ThumbnailDiscarded = 5,
    Discarded = 6,
}

impl PictureState {
    pub const ALL: [PictureState; 7] = [
        PictureState::New,
        PictureState::Reconstruction,
        PictureState::Rejected,
        PictureState::Processed,
        PictureState::Thumbnail,
        PictureState::ThumbnailDiscarded,
        PictureState::Discarded,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// File name of the status icon, `<code>.png`.
    pub fn icon_file_name(self) -> String {
        format!("{}.png", self.code())
    }

    /// State a discard moves to: thumbnails keep their thumbnail flavour.
    /// （丟棄後的狀態：縮圖維持縮圖類別。）
    pub fn discarded(self) -> PictureState {
        match self {
            PictureState::Thumbnail | PictureState::ThumbnailDiscarded => {
                PictureState::ThumbnailDiscarded
            }
            _ => PictureState::Discarded,
        }
    }

    pub fn is_discarded(self) -> bool {
        matches!(
            self,
            PictureState::Discarded | PictureState::ThumbnailDiscarded
        )
    }

    /// State a renew falls back to when no prior state was remembered.
    /// （無記錄先前狀態時，恢復所使用的預設狀態。）
    pub fn default_renewal(self) -> PictureState {
        match self {
            PictureState::Discarded => PictureState::New,
            PictureState::ThumbnailDiscarded => PictureState::Thumbnail,
            other => other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PictureState::New => "new",
            PictureState::Reconstruction => "reconstruction",
            PictureState::Rejected => "rejected",
            PictureState::Processed => "processed",
            PictureState::Thumbnail => "thumbnail",
            PictureState::ThumbnailDiscarded => "thumbnail-discarded",
            PictureState::Discarded => "discarded",
        }
    }
}

impl TryFrom<u8> for PictureState {
    type Error = CollectionError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        PictureState::ALL
            .get(usize::from(code))
            .copied()
            .ok_or(CollectionError::InvalidStatus(code.to_string()))
    }
}

impl From<PictureState> for u8 {
    fn from(state: PictureState) -> Self {
        state.code()
    }
}

impl fmt::Display for PictureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts either the label (`thumbnail-discarded`, `thumbnail_discarded`) or
/// the integer code.
impl FromStr for PictureState {
    type Err = CollectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        if let Ok(code) = normalized.parse::<u8>() {
            return PictureState::try_from(code);
        }
        PictureState::ALL
            .into_iter()
            .find(|state| state.label() == normalized)
            .ok_or_else(|| CollectionError::InvalidStatus(value.to_string()))
    }
}

/// Status predicate used by the presentation view.
/// （呈現層檢視所用的狀態篩選。）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(PictureState),
    /// Everything except the two discarded states.
    Active,
}

impl StatusFilter {
    pub fn matches(self, state: PictureState) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => state == wanted,
            StatusFilter::Active => !state.is_discarded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_declaration_order() {
        for (code, state) in PictureState::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(state.code()), code);
            assert_eq!(PictureState::try_from(code as u8).unwrap(), state);
        }
        assert!(PictureState::try_from(7).is_err());
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&PictureState::Thumbnail).unwrap(), "4");
        let state: PictureState = serde_json::from_str("6").unwrap();
        assert_eq!(state, PictureState::Discarded);
        assert!(serde_json::from_str::<PictureState>("9").is_err());
    }

    #[test]
    fn discard_and_renewal_defaults() {
        assert_eq!(PictureState::Thumbnail.discarded(), PictureState::ThumbnailDiscarded);
        assert_eq!(PictureState::Processed.discarded(), PictureState::Discarded);
        assert_eq!(PictureState::Discarded.default_renewal(), PictureState::New);
        assert_eq!(
            PictureState::ThumbnailDiscarded.default_renewal(),
            PictureState::Thumbnail
        );
        assert_eq!(PictureState::Rejected.default_renewal(), PictureState::Rejected);
    }

    #[test]
    fn parses_labels_and_codes() {
        assert_eq!("new".parse::<PictureState>().unwrap(), PictureState::New);
        assert_eq!(
            "THUMBNAIL_DISCARDED".parse::<PictureState>().unwrap(),
            PictureState::ThumbnailDiscarded
        );
        assert_eq!("3".parse::<PictureState>().unwrap(), PictureState::Processed);
        assert!("lost".parse::<PictureState>().is_err());
    }

    #[test]
    fn filters() {
        assert!(StatusFilter::All.matches(PictureState::Discarded));
        assert!(StatusFilter::Only(PictureState::New).matches(PictureState::New));
        assert!(!StatusFilter::Only(PictureState::New).matches(PictureState::Thumbnail));
        assert!(!StatusFilter::Active.matches(PictureState::ThumbnailDiscarded));
    }
}
