//! Interactive repositioning of stored placements, one session per operator.

mod manager;
mod session;

pub use manager::EditManager;
pub use session::{AdjustKind, EditAction, EditSession, EditSlot, Menu, Screen};

pub const DEFAULT_STEP: f32 = 5.0;
