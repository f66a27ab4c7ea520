use std::{path::PathBuf, time::Duration};

use rusqlite::{params, Connection, ErrorCode};
use smol_str::SmolStr;
use tracing::{debug, warn};
use walltext_core::{Pose, Result, WallTextError};
use walltext_placement_models::{BackendKind, PlacementId, PlacementRecord, PlacementStore};

use super::check_map_name;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Relational backend on top of sqlite.
///
/// `(map_name, group_number, location, angle)` is unique, so inserting the same placement twice
/// keeps one row. A connection is opened per operation: operations run on worker threads and
/// none of them is frequent enough to justify a pool.
pub struct SqlPlacementStore {
    path: PathBuf,
    table_name: String,
}

fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Anything that means "the database cannot be reached" versus "this statement failed".
fn classify(e: rusqlite::Error) -> WallTextError {
    match e.sqlite_error_code() {
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::SystemIoFailure
            | ErrorCode::NotADatabase
            | ErrorCode::PermissionDenied
            | ErrorCode::ReadOnly,
        ) => WallTextError::PersistenceUnavailable {
            reason: e.to_string(),
        },
        _ => WallTextError::Storage(e.to_string()),
    }
}

impl SqlPlacementStore {
    /// Table name ends up verbatim in the statements, so only plain identifiers are accepted.
    pub fn new(path: impl Into<PathBuf>, table_name: &str) -> Result<Self> {
        if !is_valid_table_name(table_name) {
            return Err(WallTextError::Storage(format!(
                "invalid table name {table_name:?}"
            )));
        }
        Ok(Self {
            path: path.into(),
            table_name: table_name.to_owned(),
        })
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(classify)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(classify)?;
        Ok(conn)
    }
}

impl PlacementStore for SqlPlacementStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn ensure_schema(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                WallTextError::PersistenceUnavailable {
                    reason: format!("cannot create {parent:?}: {e}"),
                }
            })?;
        }
        let conn = self.connect()?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    map_name TEXT NOT NULL,
                    group_number INTEGER NOT NULL,
                    location TEXT NOT NULL,
                    angle TEXT NOT NULL,
                    UNIQUE (map_name, group_number, location, angle)
                )",
                self.table_name
            ),
            [],
        )
        .map_err(classify)?;
        debug!(path = ?self.path, table = %self.table_name, "schema ready");
        Ok(())
    }

    fn insert(&self, map_name: &str, group_number: i32, pose: &Pose) -> Result<()> {
        check_map_name(map_name)?;
        let conn = self.connect()?;
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (map_name, group_number, location, angle)
                 VALUES (?1, ?2, ?3, ?4)",
                self.table_name
            ),
            params![map_name, group_number, pose.location_text(), pose.angle_text()],
        )
        .map_err(classify)?;
        Ok(())
    }

    fn remove(&self, map_name: &str, group_number: i32, pose: &Pose) -> Result<bool> {
        check_map_name(map_name)?;
        let conn = self.connect()?;
        let deleted = conn
            .execute(
                &format!(
                    "DELETE FROM {table} WHERE id = (
                        SELECT id FROM {table}
                        WHERE map_name = ?1 AND group_number = ?2 AND location = ?3 AND angle = ?4
                        ORDER BY id LIMIT 1
                    )",
                    table = self.table_name
                ),
                params![map_name, group_number, pose.location_text(), pose.angle_text()],
            )
            .map_err(classify)?;
        Ok(deleted > 0)
    }

    fn list_for_map(&self, map_name: &str) -> Result<Vec<PlacementRecord>> {
        check_map_name(map_name)?;
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, group_number, location, angle FROM {}
                 WHERE map_name = ?1 ORDER BY group_number, id",
                self.table_name
            ))
            .map_err(classify)?;
        let rows = stmt
            .query_map([map_name], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(classify)?;

        let mut placements = Vec::new();
        for row in rows {
            let (id, group_number, location, angle) = row.map_err(classify)?;
            match Pose::parse(&location, &angle) {
                Ok(pose) => placements.push(PlacementRecord {
                    id: PlacementId(id as u64),
                    map_name: SmolStr::new(map_name),
                    group_number,
                    pose,
                }),
                Err(e) => {
                    warn!(map_name, id, %e, "skipping malformed placement row");
                }
            }
        }
        Ok(placements)
    }

    fn update(&self, id: PlacementId, pose: &Pose) -> Result<()> {
        let conn = self.connect()?;
        let updated = conn
            .execute(
                &format!(
                    "UPDATE {} SET location = ?1, angle = ?2 WHERE id = ?3",
                    self.table_name
                ),
                params![pose.location_text(), pose.angle_text(), id.0 as i64],
            )
            .map_err(classify)?;
        if updated == 0 {
            return Err(WallTextError::NotFound(format!(
                "placement {id} was not found"
            )));
        }
        Ok(())
    }
}
