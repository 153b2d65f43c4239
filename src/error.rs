use std::io;

/// Errors reported by fallible constructors.
///
/// Per-draw calls never return errors; degraded lookups (unknown uniform,
/// missing glyph) are logged and turn into no-ops instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend context or window could not be created. Unrecoverable.
    #[error("initialization failed: {0}")]
    FatalInit(String),

    /// A GPU resource could not be created. `log` carries the backend
    /// diagnostic (compiler/linker output, framebuffer status).
    #[error("failed to create {kind}: {log}")]
    ResourceCreation { kind: &'static str, log: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid pixel data: {0}")]
    InvalidPixels(String),

    #[error("audio device unavailable: {0}")]
    AudioDevice(String),

    #[error("failed to decode sound: {0}")]
    AudioDecode(String),
}

impl Error {
    pub(crate) fn resource(kind: &'static str, log: impl Into<String>) -> Self {
        Error::ResourceCreation {
            kind,
            log: log.into(),
        }
    }
}
