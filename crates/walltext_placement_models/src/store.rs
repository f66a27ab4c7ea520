use walltext_core::{Pose, Result};

use crate::record::{PlacementId, PlacementRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Json,
    Relational,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Json => "json",
            BackendKind::Relational => "relational",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Durable CRUD over placements.
///
/// Implementations are called from background workers only, never from the tick,
/// hence the `Send + Sync` bound.
pub trait PlacementStore: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Idempotent.
    fn ensure_schema(&self) -> Result<()>;

    /// Inserting a placement that already exists is a success.
    fn insert(&self, map_name: &str, group_number: i32, pose: &Pose) -> Result<()>;

    /// Deletes at most one matching placement. Returns whether something was deleted.
    fn remove(&self, map_name: &str, group_number: i32, pose: &Pose) -> Result<bool>;

    /// Every placement of a map, ordered by group then id.
    fn list_for_map(&self, map_name: &str) -> Result<Vec<PlacementRecord>>;

    fn update(&self, id: PlacementId, pose: &Pose) -> Result<()>;
}
