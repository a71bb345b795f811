//! Picture collection of a scene: lifecycle states, role access, filtered
//! views, and EXIF-based population.
//! （場景照片集合：狀態流程、屬性存取、篩選檢視與 EXIF 匯入。）

mod error;

pub mod collection;
pub mod metadata;
pub mod picture;
pub mod role;
pub mod state;

pub use collection::{CollectionEvent, FilteredView, PictureCollection};
pub use error::{CollectionError, MetadataError};
pub use metadata::{ExifToolReader, MetadataReader, NullMetadataReader};
pub use picture::{Picture, UNKNOWN_COORDINATE};
pub use role::{PictureRole, RoleValue};
pub use state::{PictureState, StatusFilter};
