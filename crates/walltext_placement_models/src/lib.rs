pub mod legacy;
pub mod record;
pub mod store;
pub mod style;

pub use legacy::{FileRecord, ImportEntry};
pub use record::{PlacementId, PlacementRecord};
pub use store::{BackendKind, PlacementStore};
pub use style::{GroupStyle, GroupStyles};
