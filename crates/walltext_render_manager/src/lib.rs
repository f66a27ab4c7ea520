//! Tick side of the placements: turns stored records into live world text and keeps both in step.

mod composer;
mod sync;

pub use composer::{compose_lines, split_color_tag, BACKGROUND_PADDING};
pub use sync::{NearestMatch, PlacementSync};
