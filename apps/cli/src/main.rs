mod context;
mod device;
mod logging;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use photomatrix_pictures::{CollectionError, PictureCollection, PictureState, StatusFilter};
use walkdir::WalkDir;

use crate::context::AppContext;
use crate::device::DeviceCommand;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "nef", "cr2", "arw", "dng", "orf", "rw2",
];

#[derive(Parser)]
#[command(
    name = "photomatrix",
    about = "Photogrammetry workspaces, scene pictures and camera intake",
    author,
    version
)]
struct Cli {
    /// 專案根目錄；預設為目前目錄。 / Project root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    root: Option<PathBuf>,
    /// 提高日誌詳細程度，可重複。 / Raise log verbosity; repeatable.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 管理工作區。 / Manage workspaces.
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
    /// 管理目前工作區的場景。 / Manage scenes of the current workspace.
    #[command(subcommand)]
    Scene(SceneCommand),
    /// 管理目前場景的照片。 / Manage pictures of the current scene.
    #[command(subcommand)]
    Pictures(PicturesCommand),
    /// 相機存取。 / Camera access.
    #[command(subcommand)]
    Device(DeviceCommand),
    /// 檢視或修改設定。 / Show or change settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand)]
enum WorkspaceCommand {
    /// 建立工作區並設為目前工作區。 / Create a workspace and make it current.
    New {
        name: String,
        /// 上層目錄；預設為根目錄。 / Parent directory; defaults to the root.
        #[arg(long, value_name = "PATH")]
        base: Option<PathBuf>,
        /// 相對於上層目錄的資料夾；預設為淨化後的名稱。 / Folder under the parent; defaults to the sanitized name.
        #[arg(long, value_name = "DIR")]
        path: Option<String>,
    },
    /// 自設定檔開啟工作區。 / Open a workspace from its config file.
    Open { file: PathBuf },
    /// 關閉工作區（保留磁碟內容）。 / Close a workspace, keeping it on disk.
    Close { path: PathBuf },
    /// 儲存工作區設定。 / Save a workspace config (the current one by default).
    Save { path: Option<PathBuf> },
    /// 刪除工作區與其所有場景。 / Delete a workspace and all of its scenes.
    Delete { path: PathBuf },
    /// 切換目前工作區。 / Switch the current workspace.
    Use { path: PathBuf },
    /// 列出已開啟的工作區。 / List open workspaces.
    List,
}

#[derive(Subcommand)]
enum SceneCommand {
    /// 建立場景並設為目前場景。 / Create a scene and make it current.
    New {
        name: Option<String>,
        #[arg(long, value_name = "DIR")]
        path: Option<String>,
    },
    /// 刪除場景目錄。 / Delete a scene directory.
    Delete { path: String },
    /// 切換目前場景。 / Switch the current scene.
    Use { path: String },
    /// 列出場景。 / List scenes.
    List,
}

#[derive(Subcommand)]
enum PicturesCommand {
    /// 匯入照片檔案或資料夾。 / Import picture files or folders.
    Import {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, value_name = "STATUS", value_parser = parse_status, default_value = "new")]
        status: PictureState,
        /// 不讀取 EXIF 資訊。 / Do not read EXIF tags.
        #[arg(long)]
        skip_metadata: bool,
    },
    /// 列出照片：檢視位置、來源列、狀態、座標、路徑。 / List pictures: view position, row, status, coordinates, path.
    List(StatusArg),
    /// 丟棄照片。 / Discard pictures.
    Discard(RowsArgs),
    /// 復原已丟棄的照片。 / Renew discarded pictures.
    Renew(RowsArgs),
    /// 自集合移除照片。 / Remove pictures from the collection.
    Delete(RowsArgs),
    /// 移動照片位置。 / Move a picture.
    Move {
        from: usize,
        to: usize,
        #[command(flatten)]
        filter: StatusArg,
    },
    /// 已知座標的中心點。 / Center of the known coordinates.
    Center,
}

#[derive(Args)]
struct StatusArg {
    /// 只看指定狀態；列號改為檢視位置。 / Restrict to one status; rows become view positions.
    #[arg(long, value_name = "STATUS", value_parser = parse_status)]
    status: Option<PictureState>,
}

#[derive(Args)]
struct RowsArgs {
    #[arg(required = true)]
    rows: Vec<usize>,
    #[command(flatten)]
    filter: StatusArg,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// 顯示目前設定。 / Print the effective settings as JSON.
    Show,
    /// 設定單一值，例如 `device.program`。 / Set one value, e.g. `device.program`.
    Set { key: String, value: String },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        root,
        verbose,
        command,
    } = Cli::parse();
    logging::init(verbose);
    let mut context = AppContext::load(resolve_root(root)?)?;
    match command {
        Commands::Workspace(subcommand) => execute_workspace_command(subcommand, &mut context),
        Commands::Scene(subcommand) => execute_scene_command(subcommand, &mut context),
        Commands::Pictures(subcommand) => execute_pictures_command(subcommand, &mut context),
        Commands::Device(subcommand) => device::execute(subcommand, &mut context),
        Commands::Settings(subcommand) => execute_settings_command(subcommand, &mut context),
    }
}

fn execute_workspace_command(command: WorkspaceCommand, context: &mut AppContext) -> Result<()> {
    match command {
        WorkspaceCommand::New { name, base, path } => {
            let base = match base {
                Some(base) => context.resolve(&base),
                None => context.root().to_path_buf(),
            };
            let workspace = context
                .store_mut()
                .new_workspace(&name, base, path.as_deref())
                .with_context(|| format!("failed to create workspace `{name}`"))?;
            println!("Created workspace {}", workspace.full_path().display());
        }
        WorkspaceCommand::Open { file } => {
            let file = context.resolve(&file);
            let (Some(dir), Some(file_name)) = (file.parent(), file.file_name()) else {
                bail!("'{}' is not a workspace file", file.display());
            };
            let workspace = context
                .store_mut()
                .open_workspace(dir, &file_name.to_string_lossy())
                .with_context(|| format!("failed to open {}", file.display()))?;
            println!("Opened workspace {}", workspace.full_path().display());
        }
        WorkspaceCommand::Close { path } => {
            let path = context.resolve(&path);
            let workspace = context.store_mut().close_workspace(&path)?;
            println!("Closed workspace {}", workspace.name());
        }
        WorkspaceCommand::Save { path } => {
            let path = path.map(|path| context.resolve(&path));
            let saved = context
                .store()
                .save_workspace(path.as_deref(), &context.settings().workspace_file)?;
            println!("Saved workspace to {}", saved.display());
        }
        WorkspaceCommand::Delete { path } => {
            let path = context.resolve(&path);
            context
                .store_mut()
                .delete_workspace(&path)
                .with_context(|| format!("failed to delete workspace {}", path.display()))?;
            println!("Deleted workspace {}", path.display());
        }
        WorkspaceCommand::Use { path } => {
            let path = context.resolve(&path);
            context.store_mut().set_current_workspace(Some(&path))?;
            println!("Current workspace: {}", path.display());
        }
        WorkspaceCommand::List => {
            let store = context.store();
            if store.is_empty() {
                println!("No open workspaces");
            }
            for workspace in store.workspaces() {
                let current = store.current_workspace_path() == Some(workspace.full_path().as_path());
                println!("{} {workspace}", if current { "*" } else { " " });
            }
            return Ok(());
        }
    }
    context.persist()
}

fn execute_scene_command(command: SceneCommand, context: &mut AppContext) -> Result<()> {
    match command {
        SceneCommand::New { name, path } => {
            let scene = context
                .store_mut()
                .new_scene(name.as_deref(), path.as_deref())
                .context("failed to create scene")?;
            println!(
                "Created scene {} at {}",
                scene.relative_path(),
                scene.full_path().display()
            );
        }
        SceneCommand::Delete { path } => {
            context
                .store_mut()
                .delete_scene(&path)
                .with_context(|| format!("failed to delete scene `{path}`"))?;
            println!("Deleted scene {path}");
        }
        SceneCommand::Use { path } => {
            context.store_mut().set_current_scene(Some(&path))?;
            println!("Current scene: {path}");
        }
        SceneCommand::List => {
            let Some(workspace) = context.store().current_workspace() else {
                bail!("no current workspace");
            };
            for (key, scene) in workspace.scenes() {
                let current = workspace.current_scene_key() == Some(key.as_str());
                println!(
                    "{} {key}\t{}\t{}",
                    if current { "*" } else { " " },
                    scene.name(),
                    scene.full_path().display()
                );
            }
            return Ok(());
        }
    }
    context.persist()
}

fn execute_pictures_command(command: PicturesCommand, context: &mut AppContext) -> Result<()> {
    match command {
        PicturesCommand::Import {
            paths,
            status,
            skip_metadata,
        } => {
            let paths: Vec<PathBuf> = paths.iter().map(|path| context.resolve(path)).collect();
            let files = collect_image_files(&paths)?;
            let reader = context.metadata_reader(skip_metadata);
            let added = context
                .pictures()?
                .populate(&files, status, reader.as_ref())?;
            println!("Imported {added} picture(s)");
        }
        PicturesCommand::List(StatusArg { status }) => {
            let pictures = context.pictures()?;
            pictures.set_filter(filter_for(status));
            for (position, row, picture) in pictures.view().iter() {
                println!(
                    "{position}\t{row}\t{}\t{},{}\t{}",
                    picture.status(),
                    picture.latitude(),
                    picture.longitude(),
                    picture.path()
                );
            }
            return Ok(());
        }
        PicturesCommand::Discard(args) => {
            let pictures = context.pictures()?;
            let rows = source_rows(pictures, &args)?;
            pictures.discard(&rows)?;
        }
        PicturesCommand::Renew(args) => {
            let pictures = context.pictures()?;
            let rows = source_rows(pictures, &args)?;
            pictures.renew(&rows)?;
        }
        PicturesCommand::Delete(args) => {
            let pictures = context.pictures()?;
            let rows = source_rows(pictures, &args)?;
            pictures.delete(&rows)?;
        }
        PicturesCommand::Move { from, to, filter } => {
            let pictures = context.pictures()?;
            match filter.status {
                Some(status) => {
                    pictures.set_filter(StatusFilter::Only(status));
                    pictures.move_in_view(from, to)?;
                }
                None => pictures.move_row(from, to)?,
            }
        }
        PicturesCommand::Center => {
            match context.pictures()?.compute_center() {
                Some((latitude, longitude)) => println!("{latitude:.6} {longitude:.6}"),
                None => println!("No geotagged pictures"),
            }
            return Ok(());
        }
    }
    context.persist()
}

fn execute_settings_command(command: SettingsCommand, context: &mut AppContext) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let settings = context.settings();
            let mut value = serde_json::to_value(settings)?;
            value["resources_path"] = serde_json::Value::String(
                settings
                    .resources_path(context.root())
                    .to_string_lossy()
                    .into_owned(),
            );
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        SettingsCommand::Set { key, value } => {
            let store = context.settings_store_mut();
            store
                .update(|settings| settings.set(&key, &value))
                .with_context(|| format!("failed to update {}", store.path().display()))?;
            println!("{key} = {value}");
        }
    }
    Ok(())
}

fn filter_for(status: Option<PictureState>) -> StatusFilter {
    status.map_or(StatusFilter::All, StatusFilter::Only)
}

/// Rows given on the command line are source rows, or view positions when
/// `--status` is set.
fn source_rows(pictures: &mut PictureCollection, args: &RowsArgs) -> Result<Vec<usize>> {
    match args.filter.status {
        Some(status) => {
            pictures.set_filter(StatusFilter::Only(status));
            Ok(pictures.source_rows(&args.rows)?)
        }
        None => Ok(args.rows.clone()),
    }
}

fn parse_status(value: &str) -> Result<PictureState, String> {
    value
        .parse()
        .map_err(|err: CollectionError| err.to_string())
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(path) => {
            if path.is_absolute() {
                Ok(path)
            } else {
                Ok(std::env::current_dir()
                    .context("determine current directory")?
                    .join(path))
            }
        }
        None => std::env::current_dir().context("determine current directory"),
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn collect_image_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            if is_image(path) {
                files.push(path.clone());
            } else {
                log::warn!("{} is not a picture, skipping", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && is_image(entry.path()) {
                            files.push(entry.path().to_path_buf());
                        }
                    }
                    Err(err) => {
                        log::warn!("{}: {}", path.display(), err);
                    }
                }
            }
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    Ok(files)
}
