//! Verschluesselte Reaktionen
//!
//! Reaktionen (`{emoji, user_id, timestamp}`) werden als JSON serialisiert
//! und ueber die Secretbox-Konstruktion mit dem Channel-Schluessel
//! verschluesselt. Entschluesselte Bytes, die kein gueltiges JSON sind,
//! ergeben `UngueltigerPayload` – nicht `Entschluesselung`.

use blindpig_core::{SecretBytes, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};
use crate::symmetric::{decrypt_symmetric, encrypt_symmetric};

/// Strukturierter Reaktions-Payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionPayload {
    /// Das Reaktions-Emoji
    pub emoji: String,
    /// Reagierender Benutzer
    pub user_id: UserId,
    /// Zeitpunkt der Reaktion
    pub timestamp: DateTime<Utc>,
}

/// Verschluesselt eine Reaktion mit dem geteilten Channel-Schluessel
pub fn encrypt_reaction(
    payload: &ReactionPayload,
    shared_key: &SecretBytes,
) -> CryptoResult<String> {
    let json = serde_json::to_string(payload)
        .map_err(|e| CryptoError::UngueltigerPayload(e.to_string()))?;
    encrypt_symmetric(&json, shared_key)
}

/// Entschluesselt eine Reaktion und deserialisiert den Payload
pub fn decrypt_reaction(
    encoded: &str,
    shared_key: &SecretBytes,
) -> CryptoResult<ReactionPayload> {
    let json = decrypt_symmetric(encoded, shared_key)?;
    serde_json::from_str(&json).map_err(|e| CryptoError::UngueltigerPayload(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
