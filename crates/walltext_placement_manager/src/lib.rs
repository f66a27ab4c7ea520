//! Durable side of the placements: the two interchangeable backends and the migration from the
//! json files into the relational backend.

mod import;
mod store;

pub use import::{parse_legacy_file, run_import, scan_legacy_dir, ImportJob, LegacyScan};
pub use store::json::JsonPlacementStore;
pub use store::sql::SqlPlacementStore;

pub const MAPS_DIRECTORY_NAME: &str = "maps";
pub const DEFAULT_TABLE_NAME: &str = "wall_text";
