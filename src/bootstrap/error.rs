use std::path::PathBuf;

use crate::pki::PkiError;

/// Errors that abort a bootstrap run.
///
/// An already existing artifact is never an error; it is skipped and logged.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key material generation failed: {0}")]
    Pki(#[from] PkiError),

    #[error("Invalid template: {0}")]
    Template(String),
}

impl BootstrapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
