//! Fehlertypen fuer das Envelope-Krypto-Subsystem

use thiserror::Error;

/// Fehler bei Verschluesselung und Entschluesselung
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    /// Auth-Tag ungueltig: falscher Schluessel, Korruption oder Manipulation.
    /// Die Ursachen sind absichtlich nicht unterscheidbar (kein Orakel).
    #[error("Entschluesselung fehlgeschlagen")]
    Entschluesselung,

    /// Laengen- oder Kodierungs-Invariante vor der Entschluesselung verletzt
    #[error("Ungueltiger Ciphertext: {0}")]
    UngueltigerCiphertext(String),

    /// Entschluesselte Bytes sind keine gueltigen strukturierten Daten
    #[error("Ungueltiger Payload: {0}")]
    UngueltigerPayload(String),

    #[error("Algorithmus-Mismatch: erwartet {erwartet}, erhalten {erhalten}")]
    AlgorithmusMismatch { erwartet: String, erhalten: String },

    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },

    #[error("Key Derivation fehlgeschlagen: {0}")]
    KeyDerivation(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
