//! Directory-backed project hierarchy for photomatrix: workspaces containing
//! scenes, each a directory tree on disk with a JSON round-trip.
//! photomatrix 的專案階層：工作區包含場景，每個場景皆為磁碟上的目錄樹並可存成 JSON。

mod error;

pub mod directory;
pub mod persist;
pub mod sanitize;
pub mod scene;
pub mod serde_path;
pub mod store;
pub mod workspace;

pub use directory::DirectorySpace;
pub use error::ProjectError;
pub use persist::{load_json, save_json, Persisted};
pub use sanitize::{checked_file_name, checked_segment, sanitize_name};
pub use scene::Scene;
pub use store::ProjectStore;
pub use workspace::{Workspace, CONFIGS_DIR};
