use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::tempdir;

fn cli(root: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("photomatrix")?;
    cmd.arg("--root").arg(root).env_remove("RUST_LOG");
    Ok(cmd)
}

fn stdout_lines(root: &Path, args: &[&str]) -> Result<Vec<String>, Box<dyn Error>> {
    let output = cli(root)?.args(args).assert().success().get_output().clone();
    Ok(String::from_utf8(output.stdout)?
        .lines()
        .map(str::to_string)
        .collect())
}

#[test]
fn workspace_and_scene_lifecycle() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    let workspace_dir = root.path().join("My_Site");

    cli(root.path())?
        .args(["workspace", "new", "My Site"])
        .assert()
        .success()
        .stdout(contains("Created workspace"));
    assert!(workspace_dir.join("Configs").join("workspace.json").is_file());
    assert!(root.path().join(".photomatrix").join("project.json").is_file());

    cli(root.path())?
        .args(["scene", "new", "Facade A"])
        .assert()
        .success();
    for subdir in ["pictures_set", "thumbnails", "reconstruction_output"] {
        assert!(workspace_dir.join("Facade_A").join(subdir).is_dir());
    }
    cli(root.path())?
        .args(["scene", "list"])
        .assert()
        .success()
        .stdout(contains("* Facade_A"));

    cli(root.path())?
        .args(["workspace", "new", "My Site"])
        .assert()
        .failure()
        .stderr(contains("Error:"));

    cli(root.path())?
        .args(["workspace", "close", "My_Site"])
        .assert()
        .success();
    cli(root.path())?
        .args(["workspace", "list"])
        .assert()
        .success()
        .stdout(contains("No open workspaces"));
    assert!(workspace_dir.is_dir());

    cli(root.path())?
        .args(["workspace", "open", "My_Site/Configs/workspace.json"])
        .assert()
        .success();
    cli(root.path())?
        .args(["workspace", "list"])
        .assert()
        .success()
        .stdout(contains("* My Site").and(contains("1 scene")));
    cli(root.path())?
        .args(["scene", "list"])
        .assert()
        .success()
        .stdout(contains("* Facade_A"));

    cli(root.path())?
        .args(["scene", "delete", "Facade_A"])
        .assert()
        .success();
    assert!(!workspace_dir.join("Facade_A").exists());

    cli(root.path())?
        .args(["workspace", "delete", "My_Site"])
        .assert()
        .success();
    assert!(!workspace_dir.exists());
    Ok(())
}

#[test]
fn scene_commands_need_a_workspace() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    cli(root.path())?
        .args(["scene", "new", "S"])
        .assert()
        .failure()
        .stderr(contains("Error:"));
    cli(root.path())?
        .args(["pictures", "list"])
        .assert()
        .failure()
        .stderr(contains("no current workspace"));
    Ok(())
}

#[test]
fn pictures_import_and_edit() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    cli(root.path())?.args(["workspace", "new", "W"]).assert().success();
    cli(root.path())?.args(["scene", "new", "S"]).assert().success();

    let shots = root.path().join("shots");
    fs::create_dir_all(&shots)?;
    for name in ["a.jpg", "b.JPG", "notes.txt"] {
        fs::write(shots.join(name), b"x")?;
    }

    cli(root.path())?
        .args(["pictures", "import", "shots", "--skip-metadata"])
        .assert()
        .success()
        .stdout(contains("Imported 2 picture(s)"));
    assert!(root.path().join("W").join("S").join("pictures.json").is_file());

    let lines = stdout_lines(root.path(), &["pictures", "list"])?;
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("0\t0\tnew\t0.0,0.0\t"));
    assert!(lines[0].ends_with("a.jpg"));

    cli(root.path())?
        .args(["pictures", "discard", "0"])
        .assert()
        .success();
    cli(root.path())?
        .args(["pictures", "list", "--status", "discarded"])
        .assert()
        .success()
        .stdout(contains("a.jpg").and(contains("b.JPG").not()));
    cli(root.path())?
        .args(["pictures", "renew", "0", "--status", "discarded"])
        .assert()
        .success();
    cli(root.path())?
        .args(["pictures", "list", "--status", "discarded"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    cli(root.path())?
        .args(["pictures", "move", "0", "1"])
        .assert()
        .success();
    let lines = stdout_lines(root.path(), &["pictures", "list"])?;
    assert!(lines[0].ends_with("b.JPG"));

    cli(root.path())?
        .args(["pictures", "import", "shots", "--skip-metadata"])
        .assert()
        .success()
        .stdout(contains("Imported 0 picture(s)"));
    cli(root.path())?
        .args(["pictures", "discard", "7"])
        .assert()
        .failure()
        .stderr(contains("out of range"));

    cli(root.path())?
        .args(["pictures", "delete", "0", "1"])
        .assert()
        .success();
    assert!(stdout_lines(root.path(), &["pictures", "list"])?.is_empty());
    cli(root.path())?
        .args(["pictures", "center"])
        .assert()
        .success()
        .stdout(contains("No geotagged pictures"));
    Ok(())
}

#[test]
fn settings_defaults_and_updates() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    cli(root.path())?
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(
            contains("\"program\": \"gphoto2\"")
                .and(contains("\"poll_interval_ms\": 500"))
                .and(contains("\"pictures_file\": \"pictures.json\""))
                .and(contains("resources")),
        );

    cli(root.path())?
        .args(["settings", "set", "device.poll_interval_ms", "5"])
        .assert()
        .success();
    assert!(root.path().join(".photomatrix").join("settings.json").is_file());
    cli(root.path())?
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(contains("\"poll_interval_ms\": 100"));

    cli(root.path())?
        .args(["settings", "set", "color", "red"])
        .assert()
        .failure()
        .stderr(contains("failed to update"));
    Ok(())
}
