//! World text service kept in memory. Used by the console host and by tests.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::trace;
use walltext_core::{Pose, Result, WallTextError};

use crate::{
    line::TextLine,
    service::{RenderHandle, TextPlacement, WorldTextService},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedText {
    pub placement: TextPlacement,
    pub lines: Vec<TextLine>,
    pub pose: Pose,
}

#[derive(Debug, Default)]
struct WorldState {
    next_handle: u64,
    entities: BTreeMap<RenderHandle, SpawnedText>,
    unavailable: bool,
    teleport_fails: bool,
}

/// Clones share the same world, so a test can keep one to look at what got spawned.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    state: Arc<Mutex<WorldState>>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn available_state(&self) -> Result<MutexGuard<'_, WorldState>> {
        let state = self.state();
        if state.unavailable {
            return Err(WallTextError::RenderingServiceUnavailable);
        }
        Ok(state)
    }

    /// Simulates the service going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.state().unavailable = !available;
    }

    pub fn set_teleport_fails(&self, fails: bool) {
        self.state().teleport_fails = fails;
    }

    pub fn len(&self) -> usize {
        self.state().entities.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entity(&self, handle: RenderHandle) -> Option<SpawnedText> {
        self.state().entities.get(&handle).cloned()
    }

    pub fn entities(&self) -> Vec<(RenderHandle, SpawnedText)> {
        self.state()
            .entities
            .iter()
            .map(|(handle, text)| (*handle, text.clone()))
            .collect()
    }
}

impl WorldTextService for MemoryWorld {
    fn spawn(
        &mut self,
        placement: TextPlacement,
        lines: &[TextLine],
        pose: &Pose,
    ) -> Result<RenderHandle> {
        let mut state = self.available_state()?;
        state.next_handle += 1;
        let handle = RenderHandle(state.next_handle);
        state.entities.insert(
            handle,
            SpawnedText {
                placement,
                lines: lines.to_vec(),
                pose: *pose,
            },
        );
        trace!(%handle, nb_lines = lines.len(), "spawned");
        Ok(handle)
    }

    fn update(&mut self, handle: RenderHandle, lines: &[TextLine]) -> Result<()> {
        let mut state = self.available_state()?;
        let entity = state
            .entities
            .get_mut(&handle)
            .ok_or_else(|| WallTextError::Rendering(format!("no entity {handle}")))?;
        entity.lines = lines.to_vec();
        Ok(())
    }

    fn teleport(&mut self, handle: RenderHandle, pose: &Pose) -> Result<()> {
        let mut state = self.available_state()?;
        if state.teleport_fails {
            return Err(WallTextError::Rendering(format!("cannot teleport {handle}")));
        }
        let entity = state
            .entities
            .get_mut(&handle)
            .ok_or_else(|| WallTextError::Rendering(format!("no entity {handle}")))?;
        entity.pose = *pose;
        Ok(())
    }

    fn remove(&mut self, handle: RenderHandle) -> Result<()> {
        let mut state = self.available_state()?;
        state
            .entities
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| WallTextError::Rendering(format!("no entity {handle}")))
    }

    fn resolve_pose(&self, handle: RenderHandle) -> Option<Pose> {
        let state = self.state();
        if state.unavailable {
            return None;
        }
        state.entities.get(&handle).map(|e| e.pose)
    }
}
