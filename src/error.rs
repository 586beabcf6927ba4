//! Hard failures surfaced to callers. Everything else is a [`Diagnostic`].
//!
//! [`Diagnostic`]: crate::model::Diagnostic

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Input is neither an existing path nor a loaded definition.
    #[error("cannot resolve '{0}' as a path or a loaded definition")]
    PathResolution(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
