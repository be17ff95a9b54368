//! Selbstbeschreibendes Envelope-Format
//!
//! ## Format
//! ```text
//! ciphertext = base64( [nonce(24)] [sealed + auth_tag(16)] )
//! metadata   = { v, alg, ts, kid }
//! ```
//!
//! Die Metadaten tragen genug Information, damit der Empfaenger die
//! Entschluesselungs-Strategie waehlen kann. Version und Algorithmus
//! werden beim Entschluesseln geprueft, bevor Krypto-Operationen laufen.

use blindpig_core::{KeyAlgorithm, KeyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};

/// Aktuelle Envelope-Version
pub const ENVELOPE_VERSION: u32 = 1;

/// Nonce-Laenge fuer XChaCha20-Poly1305 (24 Bytes)
pub const NONCE_LEN: usize = 24;

/// Laenge des Poly1305 Auth-Tags (16 Bytes)
pub const TAG_LEN: usize = 16;

/// Metadaten eines verschluesselten Envelopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    /// Format-Version
    pub v: u32,
    /// Verwendeter Algorithmus
    pub alg: KeyAlgorithm,
    /// Verschluesselungs-Zeitpunkt
    pub ts: DateTime<Utc>,
    /// Envelope-Kennung (frisch pro Verschluesselung)
    pub kid: KeyId,
}

impl EnvelopeMetadata {
    /// Erstellt frische Metadaten fuer einen neuen Envelope
    pub fn new(alg: KeyAlgorithm) -> Self {
        Self {
            v: ENVELOPE_VERSION,
            alg,
            ts: Utc::now(),
            kid: KeyId::new(),
        }
    }
}

/// Verschluesselter Envelope (Wire-Format)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// base64(nonce || ciphertext)
    pub ciphertext: String,
    /// Selbstbeschreibende Metadaten
    pub metadata: EnvelopeMetadata,
}

impl EncryptedEnvelope {
    /// Prueft Version und Algorithmus bevor entschluesselt wird.
    ///
    /// Unbekannte Versionen und Algorithmus-Mismatch schlagen fehl, ohne
    /// dass eine Krypto-Operation versucht wird.
    pub fn check_header(&self, expected_alg: KeyAlgorithm) -> CryptoResult<()> {
        if self.metadata.v != ENVELOPE_VERSION {
            return Err(CryptoError::UngueltigerCiphertext(format!(
                "nicht unterstuetzte Envelope-Version {}",
                self.metadata.v
            )));
        }
        if self.metadata.alg != expected_alg {
            return Err(CryptoError::AlgorithmusMismatch {
                erwartet: expected_alg.to_string(),
                erhalten: self.metadata.alg.to_string(),
            });
        }
        Ok(())
    }
}

/// Kodiert Bytes als Base64 (Standard-Alphabet)
pub fn b64_encode(bytes: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
}

/// Dekodiert Base64; Fehler gelten als ungueltiger Ciphertext
pub fn b64_decode(encoded: &str) -> CryptoResult<Vec<u8>> {
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
        .map_err(|e| CryptoError::UngueltigerCiphertext(e.to_string()))
}

/// Zerlegt base64(nonce || ciphertext) in Nonce und Ciphertext.
///
/// Laengen-Verletzungen sind `UngueltigerCiphertext`, nie
/// `Entschluesselung` – die Unterscheidung ist Teil der Fehler-Taxonomie.
pub fn split_nonce_ciphertext(encoded: &str) -> CryptoResult<([u8; NONCE_LEN], Vec<u8>)> {
    let raw = b64_decode(encoded)?;
    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::UngueltigerCiphertext(format!(
            "zu kurz: {} Bytes (minimal {})",
            raw.len(),
            NONCE_LEN + TAG_LEN
        )));
    }
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&raw[..NONCE_LEN]);
    Ok((nonce, raw[NONCE_LEN..].to_vec()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
