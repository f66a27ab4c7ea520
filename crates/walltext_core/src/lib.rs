/*
each manager must have
1. a tick side struct, the only one allowed to talk to the rendering service
2. background work that never touches live state and hands its result back through the tick scheduler
3. a public api for the command layer to access

*/

pub mod error;
pub mod pose;
pub mod task;

pub use error::{Result, WallTextError};
pub use pose::Pose;
