use miette::Diagnostic;
use thiserror::Error;

/// Failures shared by every component. None of them is fatal to the host:
/// bulk operations log and skip, operator commands turn them into a reply.
#[derive(Error, Diagnostic, Debug)]
pub enum WallTextError {
    #[error("placement storage is unavailable: {reason}")]
    #[diagnostic(
        code(walltext::persistence_unavailable),
        help("check the [database] section of walltext.toml")
    )]
    PersistenceUnavailable { reason: String },

    #[error("placement storage failed: {0}")]
    #[diagnostic(code(walltext::storage))]
    Storage(String),

    #[error("the world text rendering service is not available")]
    #[diagnostic(code(walltext::rendering_service_unavailable))]
    RenderingServiceUnavailable,

    #[error("world text rendering failed: {0}")]
    #[diagnostic(code(walltext::rendering))]
    Rendering(String),

    #[error("malformed placement record in {origin}: {reason}")]
    #[diagnostic(code(walltext::malformed_record))]
    MalformedRecord { origin: String, reason: String },

    #[error("{0}")]
    #[diagnostic(code(walltext::not_found))]
    NotFound(String),

    #[error("the {backend} backend does not support {operation}")]
    #[diagnostic(
        code(walltext::unsupported_by_backend),
        help("set `enable_database = true` to use the relational backend")
    )]
    UnsupportedByBackend {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("group {0} was not found in the config")]
    #[diagnostic(code(walltext::unknown_group))]
    UnknownGroup(i32),
}

pub type Result<T, E = WallTextError> = std::result::Result<T, E>;

impl WallTextError {
    pub fn malformed(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedRecord {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }
}
