use walltext_core::{Pose, Result};

use crate::line::TextLine;

/// Opaque identity of a spawned text entity, given out by the rendering service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderHandle(pub u64);

impl std::fmt::Display for RenderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How the service orients a spawned text. Placements are always upright on a wall.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TextPlacement {
    #[default]
    Wall,
}

/// The host's world text service.
///
/// Only the tick thread may call it. Every method fails with
/// [`walltext_core::WallTextError::RenderingServiceUnavailable`] when the service went away.
pub trait WorldTextService {
    fn spawn(
        &mut self,
        placement: TextPlacement,
        lines: &[TextLine],
        pose: &Pose,
    ) -> Result<RenderHandle>;

    /// Replaces the lines of a live entity.
    fn update(&mut self, handle: RenderHandle, lines: &[TextLine]) -> Result<()>;

    fn teleport(&mut self, handle: RenderHandle, pose: &Pose) -> Result<()>;

    fn remove(&mut self, handle: RenderHandle) -> Result<()>;

    /// `None` once the entity is gone.
    fn resolve_pose(&self, handle: RenderHandle) -> Option<Pose>;
}
