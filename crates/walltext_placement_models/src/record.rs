use smol_str::SmolStr;
use walltext_core::Pose;

/// Backend assigned identity.
/// Relational backend: the table id. Json backend: position of the entry inside the map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlacementId(pub u64);

impl std::fmt::Display for PlacementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The durable unit of a single spawned marker.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRecord {
    pub id: PlacementId,
    pub map_name: SmolStr,
    pub group_number: i32,
    pub pose: Pose,
}

impl PlacementRecord {
    /// Listing order of every backend: group first, then identity.
    /// The sort is stable so that menu indices stay valid between two reads.
    pub fn sort_for_listing(records: &mut [PlacementRecord]) {
        records.sort_by_key(|r| (r.group_number, r.id));
    }
}
