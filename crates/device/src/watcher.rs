use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::parse;
use crate::tool::{DeviceTool, StorageInfo};
use crate::DeviceCommandError;

/// 預設輪詢週期。 / Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 監看器送出的邊緣觸發事件。 / Edge-triggered notifications published by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    ConnectionChanged(bool),
    ContentChanged {
        added: BTreeSet<String>,
        removed: BTreeSet<String>,
    },
}

/// 監看器設定。 / Watcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherOptions {
    pub poll_interval: Duration,
    pub watch_camera: bool,
    pub watch_files: bool,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            watch_camera: false,
            watch_files: false,
        }
    }
}

/// 批次下載結果。 / Outcome of [`DeviceWatcher::download_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDownload {
    /// `0`, or the first non-zero exit code, which stopped the batch.
    pub code: i32,
    pub downloaded: Vec<PathBuf>,
    /// Destinations that already existed and were left alone.
    pub skipped: Vec<PathBuf>,
}

impl BatchDownload {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Default)]
struct WatchState {
    watching_camera: bool,
    watching_files: bool,
    // `None` until the first observation, which only sets the baseline.
    last_connection: Option<bool>,
    last_occupied_space: Option<u64>,
    known_files: Option<BTreeSet<String>>,
    file_index: HashMap<String, usize>,
}

struct Shared<T> {
    tool: T,
    device: Mutex<()>,
    state: Mutex<WatchState>,
    tick: Mutex<()>,
    events: Mutex<Sender<DeviceEvent>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn index_files(files: &[String]) -> HashMap<String, usize> {
    files
        .iter()
        .enumerate()
        .map(|(position, name)| (name.clone(), position + 1))
        .collect()
}

impl<T: DeviceTool> Shared<T> {
    fn state(&self) -> MutexGuard<'_, WatchState> {
        lock(&self.state)
    }

    fn with_device<R>(
        &self,
        call: impl FnOnce(&T) -> Result<R, DeviceCommandError>,
    ) -> Result<R, DeviceCommandError> {
        let _device = lock(&self.device);
        call(&self.tool)
    }

    fn emit(&self, event: DeviceEvent) {
        log::debug!("device event: {event:?}");
        // The receiver lives as long as the watcher, so a send cannot fail
        // while anyone is listening.
        let _ = lock(&self.events).send(event);
    }

    fn is_connected(&self) -> Result<bool, DeviceCommandError> {
        Ok(!self.with_device(|tool| tool.detect())?.is_empty())
    }

    fn list_files(&self) -> Result<Vec<String>, DeviceCommandError> {
        let files = self.with_device(|tool| tool.list_files())?;
        self.state().file_index = index_files(&files);
        Ok(files)
    }

    fn tick(&self) -> Result<(), DeviceCommandError> {
        let _tick = lock(&self.tick);
        let (watch_camera, watch_files) = {
            let state = self.state();
            (state.watching_camera, state.watching_files)
        };

        if watch_camera {
            let connected = self.is_connected()?;
            let previous = self.state().last_connection.replace(connected);
            log::debug!("poll: connected={connected} previous={previous:?}");
            if matches!(previous, Some(previous) if previous != connected) {
                self.emit(DeviceEvent::ConnectionChanged(connected));
            }
        }

        let connected = self.state().last_connection == Some(true);
        if watch_files && connected {
            if let Err(err) = self.check_content() {
                log::warn!("content check failed, retrying on the next tick: {err}");
            }
        }
        Ok(())
    }

    fn check_content(&self) -> Result<(), DeviceCommandError> {
        let occupied = self
            .with_device(|tool| tool.storage_info())?
            .occupied_kb();
        if self.state().last_occupied_space == Some(occupied) {
            log::debug!("poll: occupied space unchanged ({occupied} KB)");
            return Ok(());
        }

        let current: BTreeSet<String> = self.list_files()?.into_iter().collect();
        let previous = {
            let mut state = self.state();
            state.last_occupied_space = Some(occupied);
            state.known_files.replace(current.clone())
        };
        let Some(previous) = previous else {
            log::debug!("poll: content baseline holds {} files", current.len());
            return Ok(());
        };

        let added: BTreeSet<String> = current.difference(&previous).cloned().collect();
        let removed: BTreeSet<String> = previous.difference(&current).cloned().collect();
        if !added.is_empty() || !removed.is_empty() {
            self.emit(DeviceEvent::ContentChanged { added, removed });
        }
        Ok(())
    }
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// 在背景輪詢相機並發布連線與內容變化。 / Polls the camera in the background and publishes connection and content changes.
///
/// A single background thread runs [`DeviceWatcher::tick`] every poll
/// interval once [`DeviceWatcher::start`] is called. Foreground calls may run
/// concurrently with it: tool invocations are serialized on a device lock and
/// the watcher state lock is never held across one. There are no timeouts; a
/// hung tool blocks whichever side invoked it.
pub struct DeviceWatcher<T: DeviceTool> {
    shared: Arc<Shared<T>>,
    events: Receiver<DeviceEvent>,
    poll_interval: Duration,
    worker: Option<Worker>,
}

impl<T: DeviceTool> DeviceWatcher<T> {
    pub fn new(tool: T, options: WatcherOptions) -> Self {
        let (tx, rx) = mpsc::channel();
        let state = WatchState {
            watching_camera: options.watch_camera,
            watching_files: options.watch_files,
            ..WatchState::default()
        };
        Self {
            shared: Arc::new(Shared {
                tool,
                device: Mutex::new(()),
                state: Mutex::new(state),
                tick: Mutex::new(()),
                events: Mutex::new(tx),
            }),
            events: rx,
            poll_interval: options.poll_interval,
            worker: None,
        }
    }

    pub fn tool(&self) -> &T {
        &self.shared.tool
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// 執行一次輪詢。 / Runs one poll synchronously.
    ///
    /// A failed connectivity query is returned; a failed content query is
    /// logged and retried on the next tick.
    pub fn tick(&self) -> Result<(), DeviceCommandError> {
        self.shared.tick()
    }

    /// 停止背景輪詢並等待執行中的輪詢結束。 / Stops the background loop after the in-flight tick.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            drop(worker.stop);
            if worker.handle.join().is_err() {
                log::warn!("device watcher thread panicked");
            }
            log::debug!("device watcher stopped");
        }
    }

    pub fn set_watching_camera(&self, value: bool) {
        self.shared.state().watching_camera = value;
    }

    pub fn set_watching_files(&self, value: bool) {
        self.shared.state().watching_files = value;
    }

    pub fn is_watching_camera(&self) -> bool {
        self.shared.state().watching_camera
    }

    pub fn is_watching_files(&self) -> bool {
        self.shared.state().watching_files
    }

    /// 最近一次輪詢得知的連線狀態。 / Connection state seen by the latest poll (`false` before any).
    pub fn last_connection(&self) -> bool {
        self.shared.state().last_connection.unwrap_or(false)
    }

    pub fn try_next_event(&self) -> Option<DeviceEvent> {
        self.events.try_recv().ok()
    }

    /// 在期限內等待事件。 / Waits up to `timeout`; `Ok(None)` on timeout.
    pub fn recv_event_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<DeviceEvent>, DeviceCommandError> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(DeviceCommandError::ChannelClosed),
        }
    }

    pub fn drain_events(&self) -> Vec<DeviceEvent> {
        self.events.try_iter().collect()
    }

    pub fn is_connected(&self) -> Result<bool, DeviceCommandError> {
        self.shared.is_connected()
    }

    pub fn camera_model(&self) -> Result<String, DeviceCommandError> {
        let summary = self.shared.with_device(|tool| tool.summary())?;
        parse::parse_summary_model(&summary)
    }

    pub fn storage_info(&self) -> Result<StorageInfo, DeviceCommandError> {
        self.shared.with_device(|tool| tool.storage_info())
    }

    /// 列出相機檔案並重建檔案編號索引。 / Lists the camera files and rebuilds the addressing index.
    pub fn file_list(&self) -> Result<Vec<String>, DeviceCommandError> {
        self.shared.list_files()
    }

    pub fn query_filename(&self, index: usize) -> Result<String, DeviceCommandError> {
        self.shared.with_device(|tool| tool.show_info(index))
    }

    /// 重建檔案編號索引，回傳檔案數。 / Rebuilds the addressing index and returns the file count.
    pub fn refresh_file_index(&self) -> Result<usize, DeviceCommandError> {
        Ok(self.shared.list_files()?.len())
    }

    /// 下載單一檔案至 `destination_dir/filename`。 / Downloads one file into `destination_dir/filename`.
    ///
    /// An existing destination is kept (returning `0`) unless `overwrite` is
    /// set, in which case it is removed first. The cached index is checked
    /// against the camera and rebuilt when it no longer points at `filename`.
    pub fn download(
        &self,
        filename: &str,
        destination_dir: &Path,
        overwrite: bool,
        thumbnail: bool,
    ) -> Result<i32, DeviceCommandError> {
        let destination = destination_for(filename, destination_dir)?;
        if !prepare_destination(&destination, overwrite)? {
            return Ok(0);
        }
        let index = self.resolve_index(filename)?;
        self.shared
            .with_device(|tool| tool.fetch(index, &destination, thumbnail))
    }

    /// 依序下載多個檔案，遇到第一個失敗即停止。 / Downloads files in order, stopping at the first failure.
    ///
    /// The index is rebuilt once up front. Files already present are skipped
    /// when `overwrite` is false. Downloads finished before a failure stay on
    /// disk.
    pub fn download_batch<S: AsRef<str>>(
        &self,
        filenames: &[S],
        destination_dir: &Path,
        overwrite: bool,
        thumbnail: bool,
    ) -> Result<BatchDownload, DeviceCommandError> {
        ensure_directory(destination_dir)?;
        self.refresh_file_index()?;
        let mut outcome = BatchDownload::default();
        for filename in filenames {
            let filename = filename.as_ref();
            let destination = destination_for(filename, destination_dir)?;
            if !prepare_destination(&destination, overwrite)? {
                outcome.skipped.push(destination);
                continue;
            }
            let index = self
                .shared
                .state()
                .file_index
                .get(filename)
                .copied()
                .ok_or_else(|| DeviceCommandError::UnknownFile(filename.to_string()))?;
            let code = self
                .shared
                .with_device(|tool| tool.fetch(index, &destination, thumbnail))?;
            if code != 0 {
                log::warn!("download of `{filename}` failed with code {code}");
                outcome.code = code;
                return Ok(outcome);
            }
            outcome.downloaded.push(destination);
        }
        Ok(outcome)
    }

    /// 以單一相機指令下載所有檔案。 / Downloads everything with one bulk device command.
    pub fn download_all(
        &self,
        destination_dir: &Path,
        overwrite: bool,
        thumbnail: bool,
    ) -> Result<i32, DeviceCommandError> {
        ensure_directory(destination_dir)?;
        let pattern = destination_dir.join("%f.%C");
        self.shared
            .with_device(|tool| tool.fetch_all(&pattern, thumbnail, overwrite))
    }

    fn resolve_index(&self, filename: &str) -> Result<usize, DeviceCommandError> {
        let cached = self.shared.state().file_index.get(filename).copied();
        if let Some(index) = cached {
            match self.query_filename(index) {
                Ok(name) if name == filename => return Ok(index),
                Ok(name) => log::debug!("index {index} now names `{name}`, refreshing"),
                Err(err) => log::debug!("index {index} lookup failed ({err}), refreshing"),
            }
        }
        self.refresh_file_index()?;
        self.shared
            .state()
            .file_index
            .get(filename)
            .copied()
            .ok_or_else(|| DeviceCommandError::UnknownFile(filename.to_string()))
    }
}

impl<T: DeviceTool + 'static> DeviceWatcher<T> {
    /// 啟動背景輪詢執行緒（重複呼叫無作用）。 / Spawns the background poll loop; calling it again is a no-op.
    pub fn start(&mut self) -> Result<(), DeviceCommandError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let shared = Arc::clone(&self.shared);
        let interval = self.poll_interval;
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("photomatrix-device-watcher".into())
            .spawn(move || loop {
                if let Err(err) = shared.tick() {
                    log::warn!("device poll failed: {err}");
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(DeviceCommandError::Thread)?;
        log::debug!("device watcher started ({} ms period)", interval.as_millis());
        self.worker = Some(Worker {
            stop: stop_tx,
            handle,
        });
        Ok(())
    }
}

impl<T: DeviceTool> Drop for DeviceWatcher<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn ensure_directory(path: &Path) -> Result<(), DeviceCommandError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(DeviceCommandError::NotADirectory(path.to_path_buf()))
    }
}

fn destination_for(filename: &str, destination_dir: &Path) -> Result<PathBuf, DeviceCommandError> {
    ensure_directory(destination_dir)?;
    let plain = Path::new(filename)
        .file_name()
        .is_some_and(|name| name == filename);
    if !plain {
        return Err(DeviceCommandError::UnsafeFileName(filename.to_string()));
    }
    Ok(destination_dir.join(filename))
}

/// Returns `false` when the destination exists and must be kept.
fn prepare_destination(destination: &Path, overwrite: bool) -> Result<bool, DeviceCommandError> {
    if !destination.exists() {
        return Ok(true);
    }
    if !overwrite {
        return Ok(false);
    }
    fs::remove_file(destination).map_err(|source| DeviceCommandError::Io {
        path: destination.to_path_buf(),
        source,
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_one_based_in_listing_order() {
        let files = vec!["b.jpg".to_string(), "a.jpg".to_string()];
        let index = index_files(&files);
        assert_eq!(index["b.jpg"], 1);
        assert_eq!(index["a.jpg"], 2);
    }

    #[test]
    fn destination_must_be_a_plain_name() {
        let temp = tempfile::tempdir().unwrap();
        assert!(destination_for("a.jpg", temp.path()).is_ok());
        assert!(matches!(
            destination_for("../a.jpg", temp.path()),
            Err(DeviceCommandError::UnsafeFileName(_))
        ));
        assert!(matches!(
            destination_for("a.jpg", &temp.path().join("missing")),
            Err(DeviceCommandError::NotADirectory(_))
        ));
    }

    #[test]
    fn existing_destination_is_kept_or_removed() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.jpg");
        assert!(prepare_destination(&path, false).unwrap());
        fs::write(&path, b"old").unwrap();
        assert!(!prepare_destination(&path, false).unwrap());
        assert!(path.exists());
        assert!(prepare_destination(&path, true).unwrap());
        assert!(!path.exists());
    }
}
