use std::collections::BTreeMap;
use std::path::Path;

use photomatrix_pictures::{
    CollectionError, CollectionEvent, MetadataError, MetadataReader, Picture, PictureCollection,
    PictureRole, PictureState, RoleValue, StatusFilter,
};
use tempfile::tempdir;

fn named(count: usize) -> Vec<String> {
    (0..count).map(|index| format!("/shots/{index:02}.jpg")).collect()
}

fn filled(paths: &[String]) -> PictureCollection {
    let mut collection = PictureCollection::new("/res");
    for path in paths {
        collection
            .add(Picture::untagged(path.clone(), PictureState::New), None)
            .unwrap();
    }
    collection
}

fn order(collection: &PictureCollection) -> Vec<String> {
    collection
        .pictures()
        .map(|picture| picture.path().to_string())
        .collect()
}

#[test]
fn edits_match_a_plain_vector() {
    let mut expected = named(8);
    let mut collection = filled(&expected);

    collection.move_row(1, 6).unwrap();
    let item = expected.remove(1);
    expected.insert(6, item);

    collection.remove_range(2, 3).unwrap();
    expected.drain(2..5);

    collection
        .add(Picture::untagged("/shots/new.jpg", PictureState::New), Some(0))
        .unwrap();
    expected.insert(0, "/shots/new.jpg".to_string());

    collection.move_row(4, 0).unwrap();
    let item = expected.remove(4);
    expected.insert(0, item);

    collection.delete(&[0, 2]).unwrap();
    expected.remove(2);
    expected.remove(0);

    assert_eq!(order(&collection), expected);
}

#[test]
fn moving_back_restores_order() {
    let paths = named(6);
    for from in 0..paths.len() {
        for to in 0..paths.len() {
            let mut collection = filled(&paths);
            collection.move_row(from, to).unwrap();
            assert_eq!(collection.get(to).unwrap().path(), paths[from]);
            collection.move_row(to, from).unwrap();
            assert_eq!(order(&collection), paths, "move {from} -> {to}");
        }
    }
}

#[test]
fn observers_see_each_change_once() {
    let mut collection = filled(&named(4));
    let events = collection.subscribe();
    let dropped = collection.subscribe();
    drop(dropped);

    collection.move_row(0, 3).unwrap();
    collection.discard(&[1]).unwrap();
    collection.discard(&[1]).unwrap();
    collection
        .set_data(1, PictureRole::Latitude, RoleValue::Text("12.0".into()))
        .unwrap();
    collection.remove_range(0, 2).unwrap();

    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![
            CollectionEvent::RowsMoved { from: 0, to: 3 },
            CollectionEvent::RowsChanged {
                first: 1,
                last: 1,
                roles: vec![PictureRole::Status, PictureRole::Icon],
            },
            CollectionEvent::RowsChanged {
                first: 1,
                last: 1,
                roles: vec![PictureRole::Latitude],
            },
            CollectionEvent::RowsRemoved { first: 0, last: 1 },
        ]
    );
}

#[test]
fn view_operations_address_filtered_rows() {
    let paths = named(6);
    let mut collection = filled(&paths);
    collection.set_status(4, PictureState::Processed).unwrap();
    collection.set_filter(StatusFilter::Active);

    let rows = collection.source_rows(&[1, 3]).unwrap();
    collection.discard(&rows).unwrap();
    assert_eq!(collection.view().source_rows(), [0, 2, 4, 5]);
    assert_eq!(collection.get(4).unwrap().status(), PictureState::Processed);

    collection.set_filter(StatusFilter::Only(PictureState::Discarded));
    let rows = collection.source_rows(&[0, 1]).unwrap();
    assert_eq!(rows, [1, 3]);
    collection.renew(&rows).unwrap();
    assert!(collection.view().is_empty());

    collection.set_filter(StatusFilter::All);
    let rows = collection.source_rows(&[5, 0]).unwrap();
    collection.delete(&rows).unwrap();
    assert_eq!(order(&collection), paths[1..5].to_vec());
    assert!(matches!(
        collection.source_rows(&[4]),
        Err(CollectionError::InvalidIndex { index: 4, len: 4 })
    ));
}

struct FailingReader;

impl MetadataReader for FailingReader {
    fn tags(&self, _keys: &[&str], path: &Path) -> Result<BTreeMap<String, String>, MetadataError> {
        Err(MetadataError::Empty(path.to_path_buf()))
    }
}

#[test]
fn populate_survives_unreadable_metadata() {
    let mut collection = PictureCollection::new("/res");
    let added = collection
        .populate(&["/shots/a.jpg", "/shots/b.jpg"], PictureState::New, &FailingReader)
        .unwrap();
    assert_eq!(added, 2);
    assert!(collection.pictures().all(|picture| picture.coordinates().is_none()));
    assert_eq!(collection.compute_center(), None);
}

#[cfg(unix)]
#[test]
fn populate_through_exiftool() {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use photomatrix_pictures::ExifToolReader;

    let temp = tempdir().unwrap();
    let script = temp.path().join("exiftool");
    fs::write(
        &script,
        "#!/bin/sh\n\
         printf '[{\"SourceFile\":\"x\",\"EXIF:GPSLatitude\":48.5,\"EXIF:GPSLongitude\":2.25,\
         \"EXIF:DateTimeOriginal\":\"2017:01:02 03:04:05\"}]'\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let reader = ExifToolReader::new(script.to_string_lossy());
    let mut collection = PictureCollection::new("/res");
    collection
        .populate(&[temp.path().join("x.jpg")], PictureState::Thumbnail, &reader)
        .unwrap();
    let picture = collection.get(0).unwrap();
    assert_eq!(picture.coordinates(), Some((48.5, 2.25)));
    assert_eq!(picture.date(), Some("2017:01:02 03:04:05"));
    assert_eq!(collection.compute_center(), Some((48.5, 2.25)));
}

#[test]
fn saves_and_loads_from_scene_directory() {
    let temp = tempdir().unwrap();
    let mut collection = PictureCollection::new(temp.path().join("res"));
    collection
        .add(
            Picture::new("/shots/a.jpg", "43.6", "1.45", None, PictureState::Processed),
            None,
        )
        .unwrap();
    collection
        .add(Picture::untagged("/shots/b.jpg", PictureState::Thumbnail), None)
        .unwrap();
    collection.discard(&[0, 1]).unwrap();

    let path = collection.save(temp.path(), "pictures.json").unwrap();
    assert!(path.ends_with("pictures.json"));

    let mut loaded = PictureCollection::load(temp.path(), "pictures.json").unwrap();
    assert_eq!(loaded.resources_path(), temp.path().join("res"));
    assert_eq!(order(&loaded), order(&collection));
    loaded.renew(&[0, 1]).unwrap();
    assert_eq!(loaded.get(0).unwrap().status(), PictureState::Processed);
    assert_eq!(loaded.get(1).unwrap().status(), PictureState::Thumbnail);

    assert!(PictureCollection::load(temp.path(), "missing.json").is_err());
    assert!(PictureCollection::load(Path::new("relative"), "pictures.json").is_err());
}

#[test]
fn loading_rejects_duplicate_paths() {
    let value = serde_json::json!({
        "resources_path": "/res",
        "pictures": [
            { "path": "/a.jpg", "status": 0 },
            { "path": "/a.jpg", "status": 4 }
        ]
    });
    assert!(matches!(
        PictureCollection::from_value(value),
        Err(CollectionError::DuplicatePath(_))
    ));
}
