//! Fehlertypen fuer den Verzeichnis-Client

use thiserror::Error;

/// Fehler beim Zugriff auf das Public-Key-Verzeichnis
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Fehler des darunterliegenden Persistenz-Dienstes
    #[error("Backend-Fehler: {0}")]
    Backend(String),

    #[error("Ungueltige Antwort: {0}")]
    UngueltigeAntwort(String),
}

impl DirectoryError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
