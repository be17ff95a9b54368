//! Fehlertypen fuer den Key Store und den Schluessel-Lifecycle

use blindpig_crypto::CryptoError;
use thiserror::Error;

/// Fehler im Key-Store-Subsystem
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// Fehler der darunterliegenden Persistenz (z.B. Quota erschoepft).
    /// Wird nie verschluckt – der Aufrufer sieht das Ergebnis.
    #[error("Speicher-Fehler: {0}")]
    Speicher(String),

    /// Kein lokaler Schluessel konnte den Envelope entschluesseln
    #[error("Kein passender Schluessel ({versucht} versucht)")]
    KeinPassenderSchluessel { versucht: usize },

    #[error("Keine Schluessel zum Export vorhanden")]
    KeineSchluesselZumExport,

    /// Entschluesseltes Backup ist strukturell ungueltig
    #[error("Ungueltiges Backup-Format: {0}")]
    UngueltigesBackupFormat(String),

    #[error("Ungueltige Backup-Version: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeBackupVersion { erwartet: u32, erhalten: u32 },

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl KeyStoreError {
    /// Erstellt einen Speicher-Fehler aus einer beliebigen Nachricht
    pub fn speicher(msg: impl Into<String>) -> Self {
        Self::Speicher(msg.into())
    }
}

pub type KeyStoreResult<T> = Result<T, KeyStoreError>;
