use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use smol_str::SmolStr;
use tracing::{trace, warn};
use walltext_core::{Pose, Result, WallTextError};
use walltext_placement_models::{
    BackendKind, FileRecord, PlacementId, PlacementRecord, PlacementStore,
};

use super::check_map_name;

/// One `<map>.json` file per map inside the maps directory.
///
/// No uniqueness here: the same pose can be saved twice, and removal only looks at the pose, not
/// at the group.
pub struct JsonPlacementStore {
    maps_path: PathBuf,
    /// serializes the read-modify-write cycles of insert and remove
    write_lock: Mutex<()>,
}

impl JsonPlacementStore {
    pub fn new(maps_path: impl Into<PathBuf>) -> Self {
        Self {
            maps_path: maps_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn maps_path(&self) -> &Path {
        &self.maps_path
    }

    fn map_file(&self, map_name: &str) -> PathBuf {
        self.maps_path.join(format!("{map_name}.json"))
    }

    fn read_map(&self, map_name: &str) -> Result<Vec<FileRecord>> {
        check_map_name(map_name)?;
        let path = self.map_file(map_name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(WallTextError::PersistenceUnavailable {
                    reason: format!("failed to read {path:?}: {e}"),
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| WallTextError::malformed(path.display().to_string(), e))
    }

    fn write_map(&self, map_name: &str, records: &[FileRecord]) -> Result<()> {
        let unavailable = |e: std::io::Error| WallTextError::PersistenceUnavailable {
            reason: e.to_string(),
        };
        std::fs::create_dir_all(&self.maps_path).map_err(unavailable)?;
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| WallTextError::Storage(e.to_string()))?;
        // write next to the target then rename, a crash never leaves half a file behind
        let target = self.map_file(map_name);
        let temporary = self.maps_path.join(format!(".{map_name}.json.tmp"));
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temporary)
            .map_err(unavailable)?
            .write_all(json.as_bytes())
            .map_err(unavailable)?;
        std::fs::rename(&temporary, &target).map_err(unavailable)?;
        trace!(?target, nb = records.len(), "map file written");
        Ok(())
    }
}

impl PlacementStore for JsonPlacementStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Json
    }

    fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    fn insert(&self, map_name: &str, group_number: i32, pose: &Pose) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| WallTextError::Storage("json store lock poisoned".to_owned()))?;
        // a corrupt file is reported, never overwritten
        let mut records = self.read_map(map_name)?;
        records.push(FileRecord::new(group_number, pose));
        self.write_map(map_name, &records)
    }

    fn remove(&self, map_name: &str, _group_number: i32, pose: &Pose) -> Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| WallTextError::Storage("json store lock poisoned".to_owned()))?;
        let mut records = self.read_map(map_name)?;
        let location = pose.location_text();
        let angle = pose.angle_text();
        let found = records.iter().position(|record| match record.pose() {
            Ok(stored) => stored.location_text() == location && stored.angle_text() == angle,
            Err(_) => false,
        });
        match found {
            Some(index) => {
                records.remove(index);
                self.write_map(map_name, &records)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_for_map(&self, map_name: &str) -> Result<Vec<PlacementRecord>> {
        let records = self.read_map(map_name)?;
        let mut placements = Vec::with_capacity(records.len());
        for (ordinal, record) in records.iter().enumerate() {
            match record.pose() {
                Ok(pose) => placements.push(PlacementRecord {
                    id: PlacementId(ordinal as u64),
                    map_name: SmolStr::new(map_name),
                    group_number: record.group_number,
                    pose,
                }),
                Err(e) => {
                    warn!(map_name, ordinal, %e, "skipping malformed placement");
                }
            }
        }
        PlacementRecord::sort_for_listing(&mut placements);
        Ok(placements)
    }

    fn update(&self, _id: PlacementId, _pose: &Pose) -> Result<()> {
        Err(WallTextError::UnsupportedByBackend {
            backend: BackendKind::Json.name(),
            operation: "update",
        })
    }
}
