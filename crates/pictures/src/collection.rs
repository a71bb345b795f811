use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use photomatrix_project::persist::{load_json, resolve_file, save_json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metadata::{MetadataReader, DATE_TIME_ORIGINAL, GPS_LATITUDE, GPS_LONGITUDE};
use crate::picture::{Picture, UNKNOWN_COORDINATE};
use crate::role::{PictureRole, RoleValue};
use crate::state::{PictureState, StatusFilter};
use crate::CollectionError;

/// Change notification for presentation observers. Row bounds are inclusive.
/// （給呈現層的變更通知；列範圍為閉區間。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    RowsInserted { first: usize, last: usize },
    RowsRemoved { first: usize, last: usize },
    RowsChanged {
        first: usize,
        last: usize,
        roles: Vec<PictureRole>,
    },
    RowsMoved { from: usize, to: usize },
}

#[derive(Serialize, Deserialize)]
struct CollectionFile {
    #[serde(with = "photomatrix_project::serde_path")]
    resources_path: PathBuf,
    #[serde(default)]
    pictures: Vec<Picture>,
}

/// Ordered pictures of one scene, with a status-filtered presentation view.
/// （單一場景的有序照片集合，附帶依狀態篩選的檢視。）
///
/// Slots may be transiently empty between [`PictureCollection::insert_placeholder`]
/// and the `Item` write that fills them. No two pictures share a path.
#[derive(Debug)]
pub struct PictureCollection {
    resources_path: PathBuf,
    slots: Vec<Option<Picture>>,
    filter: StatusFilter,
    subscribers: Vec<Sender<CollectionEvent>>,
}

impl PictureCollection {
    pub fn new(resources_path: impl Into<PathBuf>) -> Self {
        Self {
            resources_path: resources_path.into(),
            slots: Vec::new(),
            filter: StatusFilter::All,
            subscribers: Vec::new(),
        }
    }

    pub fn resources_path(&self) -> &Path {
        &self.resources_path
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Picture at `row`; `None` for an empty slot or an out-of-range row.
    pub fn get(&self, row: usize) -> Option<&Picture> {
        self.slots.get(row).and_then(Option::as_ref)
    }

    /// Present pictures in collection order.
    pub fn pictures(&self) -> impl Iterator<Item = &Picture> {
        self.slots.iter().flatten()
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.row_of(path).is_some()
    }

    /// Source row holding `path`. Linear scan.
    pub fn row_of(&self, path: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|picture| picture.path() == path))
    }

    /// Registers an observer; dropped receivers are pruned on the next event.
    /// （註冊觀察者；已丟棄的接收端會在下次事件時移除。）
    pub fn subscribe(&mut self) -> Receiver<CollectionEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: CollectionEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn check_row(&self, row: usize) -> Result<(), CollectionError> {
        if row < self.slots.len() {
            Ok(())
        } else {
            Err(CollectionError::InvalidIndex {
                index: row,
                len: self.slots.len(),
            })
        }
    }

    fn ensure_unique(&self, path: &str, except: Option<usize>) -> Result<(), CollectionError> {
        match self.row_of(path) {
            Some(row) if Some(row) != except => {
                Err(CollectionError::DuplicatePath(path.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn picture_mut(&mut self, row: usize) -> Result<&mut Picture, CollectionError> {
        self.check_row(row)?;
        self.slots[row]
            .as_mut()
            .ok_or(CollectionError::EmptySlot(row))
    }

    /// Reads one role of a row. `Ok(None)` for an empty slot.
    pub fn data(&self, row: usize, role: PictureRole) -> Result<Option<RoleValue>, CollectionError> {
        self.check_row(row)?;
        Ok(self.slots[row]
            .as_ref()
            .map(|picture| role.read(picture, &self.resources_path)))
    }

    /// Writes one role of a row. `Item` replaces the slot (and may empty it);
    /// the other roles need a picture in the slot.
    /// （寫入單一屬性；`Item` 會取代整個欄位。）
    pub fn set_data(
        &mut self,
        row: usize,
        role: PictureRole,
        value: RoleValue,
    ) -> Result<(), CollectionError> {
        self.check_row(row)?;
        let mut roles = vec![role];
        match (role, value) {
            (PictureRole::Item, RoleValue::Item(item)) => {
                if let Some(picture) = &item {
                    self.ensure_unique(picture.path(), Some(row))?;
                }
                self.slots[row] = item;
                roles = PictureRole::ALL.to_vec();
            }
            (PictureRole::Item, _) => {
                return Err(CollectionError::RoleMismatch {
                    role,
                    expected: "a picture or an empty slot",
                })
            }
            (PictureRole::Path, RoleValue::Text(path)) => {
                self.ensure_unique(&path, Some(row))?;
                role.write(self.picture_mut(row)?, RoleValue::Text(path))?;
                roles.push(PictureRole::Name);
            }
            (role, value) => {
                role.write(self.picture_mut(row)?, value)?;
                if role == PictureRole::Status {
                    roles.push(PictureRole::Icon);
                }
            }
        }
        self.emit(CollectionEvent::RowsChanged {
            first: row,
            last: row,
            roles,
        });
        Ok(())
    }

    /// Appends, or inserts at `index` (which may equal the length).
    /// （附加照片，或插入至 `index`。）
    pub fn add(&mut self, picture: Picture, index: Option<usize>) -> Result<usize, CollectionError> {
        let row = index.unwrap_or(self.slots.len());
        if row > self.slots.len() {
            return Err(CollectionError::InvalidIndex {
                index: row,
                len: self.slots.len(),
            });
        }
        self.ensure_unique(picture.path(), None)?;
        self.slots.insert(row, Some(picture));
        self.emit(CollectionEvent::RowsInserted {
            first: row,
            last: row,
        });
        Ok(row)
    }

    /// Inserts an empty slot at `row`.
    pub fn insert_placeholder(&mut self, row: usize) -> Result<(), CollectionError> {
        if row > self.slots.len() {
            return Err(CollectionError::InvalidIndex {
                index: row,
                len: self.slots.len(),
            });
        }
        self.slots.insert(row, None);
        self.emit(CollectionEvent::RowsInserted {
            first: row,
            last: row,
        });
        Ok(())
    }

    /// Removes `count` contiguous rows starting at `start`, highest first.
    /// （自 `start` 起移除 `count` 個連續列，由最後一列開始。）
    pub fn remove_range(&mut self, start: usize, count: usize) -> Result<(), CollectionError> {
        let len = self.slots.len();
        if count < 1 || start >= len || count > len - start {
            return Err(CollectionError::OutOfBounds { start, count, len });
        }
        for row in (start..start + count).rev() {
            self.slots.remove(row);
        }
        self.emit(CollectionEvent::RowsRemoved {
            first: start,
            last: start + count - 1,
        });
        Ok(())
    }

    /// Moves the row at `from` so that it ends up at `to`: after the picture
    /// at `to` when moving down, before it when moving up.
    /// （移動列：向下時放在目標之後，向上時放在目標之前。）
    pub fn move_row(&mut self, from: usize, to: usize) -> Result<(), CollectionError> {
        self.check_row(from)?;
        self.check_row(to)?;
        if from == to {
            return Ok(());
        }
        let slot = self.slots.remove(from);
        self.slots.insert(to, slot);
        self.emit(CollectionEvent::RowsMoved { from, to });
        Ok(())
    }

    /// Direct status write; no transition rule is checked.
    pub fn set_status(&mut self, row: usize, status: PictureState) -> Result<(), CollectionError> {
        self.set_data(row, PictureRole::Status, RoleValue::Status(status))
    }

    /// Discards each source row in order, stopping at the first failure.
    /// Rows already discarded are left untouched.
    /// （依序丟棄各列，遇錯即停；已完成的變更不回復。）
    pub fn discard(&mut self, rows: &[usize]) -> Result<(), CollectionError> {
        for &row in rows {
            if self.picture_mut(row)?.discard() {
                self.emit_status_change(row);
            }
        }
        Ok(())
    }

    /// Inverse of [`PictureCollection::discard`]; rows that are not discarded
    /// are left untouched.
    pub fn renew(&mut self, rows: &[usize]) -> Result<(), CollectionError> {
        for &row in rows {
            if self.picture_mut(row)?.renew() {
                self.emit_status_change(row);
            }
        }
        Ok(())
    }

    fn emit_status_change(&mut self, row: usize) {
        self.emit(CollectionEvent::RowsChanged {
            first: row,
            last: row,
            roles: vec![PictureRole::Status, PictureRole::Icon],
        });
    }

    /// Removes rows given as positions in the collection before the call.
    /// Each later position is shifted down by the number of smaller rows
    /// already removed. Stops at the first failure.
    /// （依呼叫前的位置刪除多列，後續位置會依已刪除的較小列數調整。）
    pub fn delete(&mut self, rows: &[usize]) -> Result<(), CollectionError> {
        let mut processed: Vec<usize> = Vec::with_capacity(rows.len());
        for &row in rows {
            if processed.contains(&row) {
                continue;
            }
            let shift = processed.iter().filter(|&&done| done < row).count();
            self.remove_range(row - shift, 1)?;
            processed.push(row);
        }
        Ok(())
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
    }

    /// View over the rows matching the stored filter.
    pub fn view(&self) -> FilteredView<'_> {
        let filter = self.filter;
        self.filtered_view(|picture| filter.matches(picture.status()))
    }

    /// View over the rows whose picture matches `predicate`, in collection
    /// order. Empty slots never match.
    /// （符合條件的列之唯讀檢視，保持集合順序。）
    pub fn filtered_view(&self, predicate: impl Fn(&Picture) -> bool) -> FilteredView<'_> {
        let rows = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(row, slot)| {
                slot.as_ref()
                    .filter(|picture| predicate(picture))
                    .map(|_| row)
            })
            .collect();
        FilteredView {
            collection: self,
            rows,
        }
    }

    /// Maps positions of the current view to source rows.
    pub fn source_rows(&self, view_rows: &[usize]) -> Result<Vec<usize>, CollectionError> {
        let view = self.view();
        view_rows
            .iter()
            .map(|&position| {
                view.source_row(position)
                    .ok_or(CollectionError::InvalidIndex {
                        index: position,
                        len: view.len(),
                    })
            })
            .collect()
    }

    /// Moves within the current view. Both view positions are translated to
    /// source rows by looking up the path shown at each of them.
    /// （在檢視中移動：以路徑反查兩端在來源集合中的列。）
    pub fn move_in_view(&mut self, from: usize, to: usize) -> Result<(), CollectionError> {
        let view = self.view();
        let len = view.len();
        let from_path = view
            .get(from)
            .map(|picture| picture.path().to_string())
            .ok_or(CollectionError::InvalidIndex { index: from, len })?;
        let to_path = view
            .get(to)
            .map(|picture| picture.path().to_string())
            .ok_or(CollectionError::InvalidIndex { index: to, len })?;
        if from == to {
            return Ok(());
        }
        let source_from = self
            .row_of(&from_path)
            .ok_or(CollectionError::InvalidIndex { index: from, len })?;
        let source_to = self
            .row_of(&to_path)
            .ok_or(CollectionError::InvalidIndex { index: to, len })?;
        self.move_row(source_from, source_to)
    }

    /// Moves several view rows so they land together starting at `start_to`.
    /// Positions are processed in ascending order with running offsets for
    /// rows already moved down or up.
    /// （將多個檢視列移至 `start_to` 起的連續位置。）
    pub fn move_selection(
        &mut self,
        view_rows: &[usize],
        start_to: usize,
    ) -> Result<(), CollectionError> {
        let mut rows = view_rows.to_vec();
        rows.sort_unstable();
        rows.dedup();
        let len = self.view().len();
        if len == 0 {
            return match rows.first() {
                Some(&index) => Err(CollectionError::InvalidIndex { index, len }),
                None => Ok(()),
            };
        }
        let (mut offset_down, mut offset_up) = (0, 0);
        for row in rows {
            let from = row.saturating_sub(offset_down);
            let to = (start_to + offset_up).min(len - 1);
            self.move_in_view(from, to)?;
            if from < to {
                offset_down += 1;
            }
            if from > to {
                offset_up += 1;
            }
        }
        Ok(())
    }

    /// Average of the known coordinates, or `None` when no picture is tagged.
    /// （已知座標的平均值；沒有任何地理標記時回傳 `None`。）
    pub fn compute_center(&self) -> Option<(f64, f64)> {
        let known: Vec<(f64, f64)> = self.pictures().filter_map(Picture::coordinates).collect();
        if known.is_empty() {
            return None;
        }
        let count = known.len() as f64;
        let (latitude, longitude) = known
            .iter()
            .fold((0.0, 0.0), |(lat, lon), (a, b)| (lat + a, lon + b));
        Some((latitude / count, longitude / count))
    }

    /// Appends a picture per path with the given status, reading geotags and
    /// the capture date through `reader`. Paths already present are skipped.
    /// Returns how many pictures were added.
    /// （依路徑加入照片並讀取地理標記與拍攝日期；已存在的路徑會略過。）
    pub fn populate<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        status: PictureState,
        reader: &dyn MetadataReader,
    ) -> Result<usize, CollectionError> {
        let keys = [GPS_LATITUDE, GPS_LONGITUDE, DATE_TIME_ORIGINAL];
        let mut added = 0;
        for path in paths {
            let path = path.as_ref();
            let text = path.to_string_lossy().into_owned();
            if self.contains_path(&text) {
                log::warn!("skipping {text}: already in the collection");
                continue;
            }
            let mut tags = reader.tags(&keys, path).unwrap_or_else(|err| {
                log::warn!("no metadata for {text}: {err}");
                Default::default()
            });
            let (latitude, longitude) =
                match (tags.remove(GPS_LATITUDE), tags.remove(GPS_LONGITUDE)) {
                    (Some(latitude), Some(longitude)) => (latitude, longitude),
                    (latitude, longitude) => {
                        if latitude.is_some() || longitude.is_some() {
                            log::warn!("ignoring incomplete geotag of {text}");
                        }
                        (
                            UNKNOWN_COORDINATE.to_string(),
                            UNKNOWN_COORDINATE.to_string(),
                        )
                    }
                };
            let date = tags.remove(DATE_TIME_ORIGINAL);
            self.add(Picture::new(text, latitude, longitude, date, status), None)?;
            added += 1;
        }
        Ok(added)
    }

    /// Empty slots are transient and are not persisted.
    pub fn to_value(&self) -> Result<Value, CollectionError> {
        let file = CollectionFile {
            resources_path: self.resources_path.clone(),
            pictures: self.pictures().cloned().collect(),
        };
        Ok(serde_json::to_value(file).map_err(photomatrix_project::ProjectError::from)?)
    }

    pub fn from_value(value: Value) -> Result<Self, CollectionError> {
        let file: CollectionFile =
            serde_json::from_value(value).map_err(photomatrix_project::ProjectError::from)?;
        Self::from_file(file)
    }

    /// Writes `<dir>/<file_name>` atomically.
    pub fn save(&self, dir: &Path, file_name: &str) -> Result<PathBuf, CollectionError> {
        let path = resolve_file(dir, file_name)?;
        save_json(&path, &self.to_value()?)?;
        Ok(path)
    }

    pub fn load(dir: &Path, file_name: &str) -> Result<Self, CollectionError> {
        let path = resolve_file(dir, file_name)?;
        let file: CollectionFile = load_json(&path)?;
        Self::from_file(file)
    }

    fn from_file(file: CollectionFile) -> Result<Self, CollectionError> {
        let mut seen = HashSet::new();
        for picture in &file.pictures {
            if !seen.insert(picture.path()) {
                return Err(CollectionError::DuplicatePath(picture.path().to_string()));
            }
        }
        let mut collection = Self::new(file.resources_path);
        collection.slots = file.pictures.into_iter().map(Some).collect();
        Ok(collection)
    }
}

/// Read-only, ordered subset of a collection's rows.
/// （集合列的唯讀有序子集。）
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    collection: &'a PictureCollection,
    rows: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn source_row(&self, position: usize) -> Option<usize> {
        self.rows.get(position).copied()
    }

    pub fn source_rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn get(&self, position: usize) -> Option<&'a Picture> {
        self.source_row(position)
            .and_then(|row| self.collection.get(row))
    }

    /// `(view position, source row, picture)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &'a Picture)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(position, &row)| {
                self.collection
                    .get(row)
                    .map(|picture| (position, row, picture))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn collection(paths: &[&str]) -> PictureCollection {
        let mut collection = PictureCollection::new("/res");
        for path in paths {
            collection
                .add(Picture::untagged(*path, PictureState::New), None)
                .unwrap();
        }
        collection
    }

    fn paths(collection: &PictureCollection) -> Vec<&str> {
        collection.pictures().map(Picture::path).collect()
    }

    #[test]
    fn add_appends_or_inserts() {
        let mut pictures = collection(&["a", "b"]);
        let events = pictures.subscribe();
        assert_eq!(
            pictures
                .add(Picture::untagged("c", PictureState::New), Some(1))
                .unwrap(),
            1
        );
        assert_eq!(paths(&pictures), ["a", "c", "b"]);
        assert_eq!(
            events.try_recv().unwrap(),
            CollectionEvent::RowsInserted { first: 1, last: 1 }
        );
        assert!(matches!(
            pictures.add(Picture::untagged("d", PictureState::New), Some(9)),
            Err(CollectionError::InvalidIndex { index: 9, len: 3 })
        ));
        assert!(matches!(
            pictures.add(Picture::untagged("a", PictureState::New), None),
            Err(CollectionError::DuplicatePath(_))
        ));
    }

    #[test]
    fn remove_range_checks_bounds_and_emits_once() {
        let mut pictures = collection(&["a", "b", "c", "d"]);
        let events = pictures.subscribe();
        assert!(pictures.remove_range(1, 0).is_err());
        assert!(pictures.remove_range(3, 2).is_err());
        pictures.remove_range(1, 2).unwrap();
        assert_eq!(paths(&pictures), ["a", "d"]);
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![CollectionEvent::RowsRemoved { first: 1, last: 2 }]
        );
    }

    #[test]
    fn move_row_places_after_or_before_target() {
        let mut pictures = collection(&["a", "b", "c", "d"]);
        pictures.move_row(0, 2).unwrap();
        assert_eq!(paths(&pictures), ["b", "c", "a", "d"]);
        pictures.move_row(3, 0).unwrap();
        assert_eq!(paths(&pictures), ["d", "b", "c", "a"]);
        pictures.move_row(1, 1).unwrap();
        assert_eq!(paths(&pictures), ["d", "b", "c", "a"]);
        assert!(pictures.move_row(0, 4).is_err());
    }

    #[test]
    fn placeholder_is_filled_through_item_role() {
        let mut pictures = collection(&["a", "b"]);
        pictures.insert_placeholder(1).unwrap();
        assert_eq!(pictures.len(), 3);
        assert!(pictures.get(1).is_none());
        assert_eq!(pictures.data(1, PictureRole::Path).unwrap(), None);
        assert!(matches!(
            pictures.set_status(1, PictureState::New),
            Err(CollectionError::EmptySlot(1))
        ));
        assert_eq!(pictures.view().len(), 2);

        pictures
            .set_data(
                1,
                PictureRole::Item,
                RoleValue::Item(Some(Picture::untagged("x", PictureState::Thumbnail))),
            )
            .unwrap();
        assert_eq!(paths(&pictures), ["a", "x", "b"]);
        assert!(matches!(
            pictures.set_data(
                1,
                PictureRole::Item,
                RoleValue::Item(Some(Picture::untagged("a", PictureState::New)))
            ),
            Err(CollectionError::DuplicatePath(_))
        ));
    }

    #[test]
    fn discard_and_renew_follow_the_lifecycle() {
        let mut pictures = PictureCollection::new("/res");
        pictures
            .add(Picture::untagged("thumb", PictureState::Thumbnail), None)
            .unwrap();
        pictures
            .add(Picture::untagged("done", PictureState::Processed), None)
            .unwrap();

        pictures.discard(&[0, 1]).unwrap();
        assert_eq!(pictures.get(0).unwrap().status(), PictureState::ThumbnailDiscarded);
        assert_eq!(pictures.get(1).unwrap().status(), PictureState::Discarded);

        pictures.discard(&[1]).unwrap();
        pictures.renew(&[0, 1]).unwrap();
        assert_eq!(pictures.get(0).unwrap().status(), PictureState::Thumbnail);
        assert_eq!(pictures.get(1).unwrap().status(), PictureState::Processed);
    }

    #[test]
    fn discard_is_fail_fast_without_rollback() {
        let mut pictures = collection(&["a", "b"]);
        let err = pictures.discard(&[0, 5, 1]).unwrap_err();
        assert!(matches!(err, CollectionError::InvalidIndex { index: 5, .. }));
        assert_eq!(pictures.get(0).unwrap().status(), PictureState::Discarded);
        assert_eq!(pictures.get(1).unwrap().status(), PictureState::New);
    }

    #[test]
    fn delete_adjusts_for_removed_rows() {
        let mut pictures = collection(&["a", "b", "c", "d", "e"]);
        pictures.delete(&[1, 3, 0]).unwrap();
        assert_eq!(paths(&pictures), ["c", "e"]);

        let mut pictures = collection(&["a", "b", "c"]);
        pictures.delete(&[2, 2, 0]).unwrap();
        assert_eq!(paths(&pictures), ["b"]);
    }

    #[test]
    fn view_follows_filter_and_moves_by_identity() {
        let mut pictures = collection(&["a", "b", "c", "d", "e"]);
        pictures.discard(&[1, 3]).unwrap();
        pictures.set_filter(StatusFilter::Only(PictureState::New));
        assert_eq!(pictures.view().source_rows(), [0, 2, 4]);

        // Move "a" (view 0) after "e" (view 2).
        pictures.move_in_view(0, 2).unwrap();
        assert_eq!(paths(&pictures), ["b", "c", "d", "e", "a"]);
        let shown: Vec<&str> = pictures.view().iter().map(|(_, _, p)| p.path()).collect();
        assert_eq!(shown, ["c", "e", "a"]);

        // Move "a" (view 2) before "c" (view 0).
        pictures.move_in_view(2, 0).unwrap();
        assert_eq!(paths(&pictures), ["b", "a", "c", "d", "e"]);
        assert!(pictures.move_in_view(0, 3).is_err());
    }

    #[test]
    fn move_selection_keeps_selected_rows_together() {
        let mut pictures = collection(&["a", "b", "c", "d", "e"]);
        pictures.move_selection(&[3, 0], 4).unwrap();
        assert_eq!(paths(&pictures), ["b", "c", "e", "a", "d"]);

        let mut pictures = collection(&["a", "b", "c", "d", "e"]);
        pictures.move_selection(&[4, 2], 0).unwrap();
        assert_eq!(paths(&pictures), ["c", "e", "a", "b", "d"]);
    }

    #[test]
    fn center_ignores_untagged_pictures() {
        let mut pictures = PictureCollection::new("/res");
        assert_eq!(pictures.compute_center(), None);
        pictures
            .add(Picture::new("a", "10.0", "20.0", None, PictureState::New), None)
            .unwrap();
        pictures
            .add(Picture::new("b", "20.0", "40.0", None, PictureState::New), None)
            .unwrap();
        pictures
            .add(Picture::untagged("c", PictureState::New), None)
            .unwrap();
        assert_eq!(pictures.compute_center(), Some((15.0, 30.0)));
    }

    struct MapReader(BTreeMap<String, BTreeMap<String, String>>);

    impl MetadataReader for MapReader {
        fn tags(
            &self,
            _keys: &[&str],
            path: &Path,
        ) -> Result<BTreeMap<String, String>, crate::MetadataError> {
            let key = path.to_string_lossy().into_owned();
            Ok(self.0.get(&key).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn populate_reads_tags_and_skips_known_paths() {
        let mut tags = BTreeMap::new();
        tags.insert(
            "/s/a.jpg".to_string(),
            BTreeMap::from([
                (GPS_LATITUDE.to_string(), "43.6".to_string()),
                (GPS_LONGITUDE.to_string(), "1.45".to_string()),
                (DATE_TIME_ORIGINAL.to_string(), "2016:05:10 14:40:18".to_string()),
            ]),
        );
        tags.insert(
            "/s/b.jpg".to_string(),
            BTreeMap::from([(GPS_LONGITUDE.to_string(), "1.45".to_string())]),
        );
        tags.insert(
            "/s/c.jpg".to_string(),
            BTreeMap::from([(GPS_LATITUDE.to_string(), "43.6".to_string())]),
        );
        let reader = MapReader(tags);

        let mut pictures = PictureCollection::new("/res");
        let added = pictures
            .populate(
                &["/s/a.jpg", "/s/b.jpg", "/s/c.jpg", "/s/a.jpg"],
                PictureState::Thumbnail,
                &reader,
            )
            .unwrap();
        assert_eq!(added, 3);

        let a = pictures.get(0).unwrap();
        assert_eq!(a.coordinates(), Some((43.6, 1.45)));
        assert_eq!(a.date(), Some("2016:05:10 14:40:18"));
        assert_eq!(a.status(), PictureState::Thumbnail);
        let b = pictures.get(1).unwrap();
        assert_eq!((b.latitude(), b.longitude()), ("0.0", "0.0"));
        let c = pictures.get(2).unwrap();
        assert_eq!((c.latitude(), c.longitude()), ("0.0", "0.0"));
        assert_eq!(c.coordinates(), None);
    }

    #[test]
    fn value_roundtrip_drops_placeholders() {
        let mut pictures = collection(&["/s/a.jpg", "/s/b.jpg"]);
        pictures.discard(&[1]).unwrap();
        pictures.insert_placeholder(0).unwrap();

        let value = pictures.to_value().unwrap();
        assert_eq!(value["resources_path"], "/res");
        let restored = PictureCollection::from_value(value).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(paths(&restored), ["/s/a.jpg", "/s/b.jpg"]);
        assert_eq!(
            restored.get(1).unwrap().previous_status(),
            Some(PictureState::New)
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_resources_path_survives_roundtrip() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let resources = Path::new(OsStr::from_bytes(b"/res/\xFFicons"));
        let pictures = PictureCollection::new(resources);
        let value = pictures.to_value().unwrap();
        assert!(value["resources_path"].as_str().unwrap().starts_with("b64:"));
        let restored = PictureCollection::from_value(value).unwrap();
        assert_eq!(restored.resources_path(), resources);
    }
}
