//! Gemeinsame Typen fuer das Key-Management
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Geheimes
//! Schluessel-Material liegt ausschliesslich in `SecretBytes` und wird
//! beim Drop genullt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Laenge eines X25519-Schluessels in Bytes
pub const KEY_LEN: usize = 32;

/// Eindeutige Benutzer-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Erstellt eine neue zufaellige UserId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Eindeutige Schluessel-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(pub Uuid);

impl KeyId {
    /// Erstellt eine neue zufaellige KeyId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for KeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Eindeutige Geraete-ID
///
/// Wird einmal pro Installation erzeugt und nie rotiert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub Uuid);

impl DeviceId {
    /// Erstellt eine neue zufaellige DeviceId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "device:{}", self.0)
    }
}

/// Unterstuetzte Verschluesselungs-Algorithmen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum KeyAlgorithm {
    /// Authentifizierte Public-Key-Verschluesselung (Box-Konstruktion)
    #[default]
    #[serde(rename = "x25519-xchacha20-poly1305")]
    X25519XChaCha20Poly1305,
    /// Symmetrische Secretbox-Verschluesselung
    #[serde(rename = "xchacha20-poly1305")]
    XChaCha20Poly1305,
}

impl KeyAlgorithm {
    /// Gibt den Wire-Bezeichner des Algorithmus zurueck
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X25519XChaCha20Poly1305 => "x25519-xchacha20-poly1305",
            Self::XChaCha20Poly1305 => "xchacha20-poly1305",
        }
    }
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadaten zu jedem gespeicherten Schluessel
///
/// Unveraenderlich nach Erstellung; dient Provenienz- und
/// Ablauf-Entscheidungen (z.B. Rotation nach Alter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    /// Eindeutige Schluessel-ID
    pub key_id: KeyId,
    /// Erstellungszeitpunkt
    pub created_at: DateTime<Utc>,
    /// Verwendeter Algorithmus
    pub algorithm: KeyAlgorithm,
    /// Geraete-ID des erzeugenden Geraets (falls bekannt)
    pub device_id: Option<DeviceId>,
}

impl KeyMetadata {
    /// Erstellt frische Metadaten mit neuer KeyId und aktuellem Zeitstempel
    pub fn new(algorithm: KeyAlgorithm, device_id: Option<DeviceId>) -> Self {
        Self {
            key_id: KeyId::new(),
            created_at: Utc::now(),
            algorithm,
            device_id,
        }
    }
}

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl PartialEq for SecretBytes {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretBytes {}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ein asymmetrisches Schluessel-Paar (X25519)
///
/// Der private Schluessel verlaesst das Geraet nie im Klartext –
/// nur als Teil eines passwortgeschuetzten Backups.
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Oeffentlicher Schluessel (32 Bytes)
    pub public_key: [u8; KEY_LEN],
    /// Privater Schluessel (32 Bytes)
    pub secret_key: SecretBytes,
    /// Metadaten (KeyId, Erstellungszeit, Algorithmus, Geraet)
    pub metadata: KeyMetadata,
}

/// Symmetrischer Schluessel fuer einen Server oder Channel
///
/// Mehrere Teilnehmer halten unabhaengige lokale Kopien; die Lebensdauer
/// ist an den Channel gebunden, nicht an ein einzelnes Geraet.
#[derive(Debug, Clone)]
pub struct SharedKey {
    /// Der eigentliche Schluessel (32 Bytes)
    pub key: SecretBytes,
    /// Metadaten
    pub metadata: KeyMetadata,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_id_anzeige_ist_uuid() {
        let id = KeyId::new();
        assert_eq!(id.to_string(), id.inner().to_string());
    }

    #[test]
    fn secret_bytes_redacted_debug() {
        let secret = SecretBytes::new(vec![1, 2, 3]);
        let debug = format!("{secret:?}");
        assert!(debug.contains("REDACTED"));
        assert!(debug.contains("3 bytes"));
    }

    #[test]
    fn algorithmus_wire_bezeichner() {
        assert_eq!(
            KeyAlgorithm::X25519XChaCha20Poly1305.as_str(),
            "x25519-xchacha20-poly1305"
        );
        assert_eq!(
            KeyAlgorithm::XChaCha20Poly1305.as_str(),
            "xchacha20-poly1305"
        );
    }

    #[test]
    fn algorithmus_serde_roundtrip() {
        let json = serde_json::to_string(&KeyAlgorithm::X25519XChaCha20Poly1305).unwrap();
        assert_eq!(json, "\"x25519-xchacha20-poly1305\"");
        let decoded: KeyAlgorithm = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, KeyAlgorithm::X25519XChaCha20Poly1305);
    }

    #[test]
    fn metadata_serde_roundtrip() {
        let meta = KeyMetadata::new(KeyAlgorithm::default(), Some(DeviceId::new()));
        let json = serde_json::to_string(&meta).unwrap();
        let decoded: KeyMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn metadata_ohne_geraet() {
        let meta = KeyMetadata::new(KeyAlgorithm::XChaCha20Poly1305, None);
        assert!(meta.device_id.is_none());
        assert_eq!(meta.algorithm, KeyAlgorithm::XChaCha20Poly1305);
    }
}
