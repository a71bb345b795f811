use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use photomatrix_device::{DeviceEvent, DeviceWatcher, Gphoto2Tool, WatcherOptions};
use photomatrix_pictures::PictureState;

use crate::context::AppContext;

#[derive(Subcommand)]
pub enum DeviceCommand {
    /// 顯示相機連線、型號與儲存空間。 / Show connection, model and storage of the camera.
    Status,
    /// 列出相機上的檔案。 / List the files on the camera.
    Files,
    /// 下載指定檔案。 / Download the named files.
    Download(DownloadArgs),
    /// 一次下載相機上的所有檔案。 / Download every file on the camera at once.
    DownloadAll(DownloadAllArgs),
    /// 監看相機連線與內容變化。 / Watch the camera for connection and content changes.
    Watch(WatchArgs),
}

#[derive(Args)]
pub struct DownloadArgs {
    /// 相機上的檔名。 / File names as listed by `device files`.
    #[arg(required = true)]
    files: Vec<String>,
    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Args)]
pub struct DownloadAllArgs {
    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Args)]
struct TargetArgs {
    /// 下載縮圖而非原始檔。 / Fetch thumbnails instead of full files.
    #[arg(long)]
    thumbnail: bool,
    /// 覆寫已存在的檔案。 / Replace files that already exist.
    #[arg(long)]
    overwrite: bool,
    /// 目的資料夾；預設為目前場景。 / Destination directory; defaults to the current scene.
    #[arg(long, value_name = "DIR")]
    dest: Option<PathBuf>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// 輪詢指定次數後結束。 / Stop after this many polls instead of running until interrupted.
    #[arg(long, value_name = "N")]
    ticks: Option<u32>,
    /// 自動下載並匯入新檔案。 / Download new files into the current scene and import them.
    #[arg(long)]
    import: bool,
}

pub fn execute(command: DeviceCommand, context: &mut AppContext) -> Result<()> {
    match command {
        DeviceCommand::Status => status(context),
        DeviceCommand::Files => files(context),
        DeviceCommand::Download(args) => download(args, context),
        DeviceCommand::DownloadAll(args) => download_all(args, context),
        DeviceCommand::Watch(args) => watch(args, context),
    }
}

fn watcher(context: &AppContext) -> DeviceWatcher<Gphoto2Tool> {
    let device = &context.settings().device;
    DeviceWatcher::new(
        Gphoto2Tool::new(device.program.clone()),
        WatcherOptions {
            poll_interval: Duration::from_millis(device.poll_interval_ms),
            watch_camera: device.watch_camera,
            watch_files: device.watch_files,
        },
    )
}

fn status(context: &AppContext) -> Result<()> {
    let watcher = watcher(context);
    let connected = watcher.is_connected().context("failed to detect the camera")?;
    println!("connected: {}", if connected { "yes" } else { "no" });
    if connected {
        println!("model: {}", watcher.camera_model()?);
        let storage = watcher.storage_info()?;
        println!(
            "storage: {} KB used of {} KB ({} KB free)",
            storage.occupied_kb(),
            storage.total_kb,
            storage.free_kb
        );
    }
    Ok(())
}

fn files(context: &AppContext) -> Result<()> {
    for name in watcher(context).file_list()? {
        println!("{name}");
    }
    Ok(())
}

fn destination(target: &TargetArgs, context: &AppContext) -> Result<PathBuf> {
    if let Some(dest) = &target.dest {
        return Ok(context.resolve(dest));
    }
    let scene = context.current_scene().context("pass --dest or select a scene")?;
    Ok(if target.thumbnail {
        scene.thumbnails_dir()
    } else {
        scene.pictures_dir()
    })
}

fn download(args: DownloadArgs, context: &AppContext) -> Result<()> {
    let dest = destination(&args.target, context)?;
    let outcome = watcher(context).download_batch(
        &args.files,
        &dest,
        args.target.overwrite,
        args.target.thumbnail,
    )?;
    for path in &outcome.downloaded {
        println!("downloaded {}", path.display());
    }
    for path in &outcome.skipped {
        println!("skipped {} (already exists)", path.display());
    }
    if !outcome.success() {
        bail!("download stopped: device tool exited with code {}", outcome.code);
    }
    Ok(())
}

fn download_all(args: DownloadAllArgs, context: &AppContext) -> Result<()> {
    let dest = destination(&args.target, context)?;
    let code = watcher(context).download_all(&dest, args.target.overwrite, args.target.thumbnail)?;
    if code != 0 {
        bail!("download stopped: device tool exited with code {code}");
    }
    println!("downloaded all files into {}", dest.display());
    Ok(())
}

fn watch(args: WatchArgs, context: &mut AppContext) -> Result<()> {
    let mut watcher = watcher(context);
    if !watcher.is_watching_camera() && !watcher.is_watching_files() {
        log::warn!("both device.watch_camera and device.watch_files are off; nothing will change");
    }
    let interval = Duration::from_millis(context.settings().device.poll_interval_ms);
    match args.ticks {
        Some(ticks) => {
            for tick in 0..ticks {
                if tick > 0 {
                    thread::sleep(interval);
                }
                if let Err(err) = watcher.tick() {
                    log::warn!("device poll failed: {err}");
                }
                for event in watcher.drain_events() {
                    handle_event(event, &watcher, args.import, context)?;
                }
            }
            Ok(())
        }
        None => {
            watcher.start()?;
            loop {
                if let Some(event) = watcher.recv_event_timeout(interval)? {
                    handle_event(event, &watcher, args.import, context)?;
                }
            }
        }
    }
}

fn handle_event(
    event: DeviceEvent,
    watcher: &DeviceWatcher<Gphoto2Tool>,
    import: bool,
    context: &mut AppContext,
) -> Result<()> {
    match event {
        DeviceEvent::ConnectionChanged(connected) => {
            println!("{}", if connected { "connected" } else { "disconnected" });
            Ok(())
        }
        DeviceEvent::ContentChanged { added, removed } => {
            for name in &added {
                println!("added {name}");
            }
            for name in &removed {
                println!("removed {name}");
            }
            if import && !added.is_empty() {
                let names: Vec<String> = added.into_iter().collect();
                if let Err(err) = import_added(&names, watcher, context) {
                    log::warn!("import of {} new file(s) failed: {err:#}", names.len());
                }
            }
            Ok(())
        }
    }
}

/// Downloads new camera files into the scene's `pictures_set`, adds them to
/// the collection and saves it. Failures are reported to the caller, which
/// keeps watching.
fn import_added(
    names: &[String],
    watcher: &DeviceWatcher<Gphoto2Tool>,
    context: &mut AppContext,
) -> Result<()> {
    let dest = context.current_scene()?.pictures_dir();
    let outcome = watcher.download_batch(names, &dest, false, false)?;
    if !outcome.success() {
        log::warn!("download stopped with code {}", outcome.code);
    }
    let files: Vec<PathBuf> = outcome
        .downloaded
        .into_iter()
        .chain(outcome.skipped)
        .collect();
    let reader = context.metadata_reader(false);
    let added = context
        .pictures()?
        .populate(&files, PictureState::New, reader.as_ref())?;
    context.persist()?;
    println!("imported {added} picture(s)");
    Ok(())
}
