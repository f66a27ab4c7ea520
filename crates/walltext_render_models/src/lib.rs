pub mod color;
pub mod line;
pub mod memory;
pub mod service;

pub use color::Color;
pub use line::{Background, Justify, TextLine};
pub use memory::MemoryWorld;
pub use service::{RenderHandle, TextPlacement, WorldTextService};
