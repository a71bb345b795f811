//! USB 相機存取與背景監看。 / Camera access over the device tool, plus the background watcher.
//!
//! [`DeviceTool`] is the synchronous seam to the camera; [`Gphoto2Tool`]
//! implements it on top of the `gphoto2` command line. [`DeviceWatcher`]
//! polls a tool on its own thread and publishes [`DeviceEvent`]s.

mod error;

pub mod gphoto;
pub mod parse;
pub mod tool;
pub mod watcher;

pub use error::DeviceCommandError;
pub use gphoto::Gphoto2Tool;
pub use tool::{DeviceDescriptor, DeviceTool, StorageInfo};
pub use watcher::{BatchDownload, DeviceEvent, DeviceWatcher, WatcherOptions};
