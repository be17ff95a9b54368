//! Versionierte Datensatz-Formate fuer den lokalen Speicher
//!
//! Jeder gespeicherte Datensatz traegt `version: 1`. Ein fehlendes
//! Versions-Feld signalisiert das Legacy-Format (nur publicKey/secretKey),
//! das beim Lesen transparent migriert wird.

use std::collections::HashMap;

use blindpig_core::{DeviceId, KeyId, KeyMetadata, KeyPair, SecretBytes, SharedKey, KEY_LEN};
use blindpig_crypto::envelope::{b64_decode, b64_encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KeyStoreError, KeyStoreResult};

/// Aktuelle Datensatz-Version
pub const RECORD_VERSION: u32 = 1;

/// Versionierter Schluessel-Paar-Datensatz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKeyRecord {
    /// Format-Version (fehlt im Legacy-Format)
    pub version: u32,
    /// Oeffentlicher Schluessel, Base64
    pub public_key: String,
    /// Privater Schluessel, Base64
    pub secret_key: String,
    /// Metadaten
    pub metadata: KeyMetadata,
    /// Zeitpunkt der Archivierung bei Rotation (nur Backup-Slots)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_timestamp: Option<DateTime<Utc>>,
}

impl StoredKeyRecord {
    /// Erstellt einen Datensatz aus einem Schluessel-Paar
    pub fn from_key_pair(pair: &KeyPair, backup_timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            version: RECORD_VERSION,
            public_key: b64_encode(&pair.public_key),
            secret_key: b64_encode(pair.secret_key.as_bytes()),
            metadata: pair.metadata.clone(),
            backup_timestamp,
        }
    }

    /// Rekonstruiert das Schluessel-Paar aus dem Datensatz
    pub fn to_key_pair(&self) -> KeyStoreResult<KeyPair> {
        let public = decode_key_bytes(&self.public_key)?;
        let secret = b64_decode(&self.secret_key)
            .map_err(|e| KeyStoreError::speicher(format!("beschaedigter Datensatz: {e}")))?;
        if secret.len() != KEY_LEN {
            return Err(KeyStoreError::speicher(format!(
                "beschaedigter Datensatz: Schluessel-Laenge {}",
                secret.len()
            )));
        }
        Ok(KeyPair {
            public_key: public,
            secret_key: SecretBytes::new(secret),
            metadata: self.metadata.clone(),
        })
    }
}

/// Legacy-Datensatz (vor Einfuehrung der Versionierung)
///
/// Das Original speicherte nur die beiden Base64-Schluessel unter
/// camelCase-Feldnamen und ohne Metadaten.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyKeyRecord {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(rename = "secretKey")]
    pub secret_key: String,
}

/// Versionierter Datensatz fuer einen geteilten symmetrischen Schluessel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSharedKeyRecord {
    pub version: u32,
    /// Schluessel-Material, Base64
    pub key: String,
    pub metadata: KeyMetadata,
}

impl StoredSharedKeyRecord {
    pub fn from_shared_key(shared: &SharedKey) -> Self {
        Self {
            version: RECORD_VERSION,
            key: b64_encode(shared.key.as_bytes()),
            metadata: shared.metadata.clone(),
        }
    }

    pub fn to_shared_key(&self) -> KeyStoreResult<SharedKey> {
        let key = b64_decode(&self.key)
            .map_err(|e| KeyStoreError::speicher(format!("beschaedigter Datensatz: {e}")))?;
        if key.len() != KEY_LEN {
            return Err(KeyStoreError::speicher(format!(
                "beschaedigter Datensatz: Schluessel-Laenge {}",
                key.len()
            )));
        }
        Ok(SharedKey {
            key: SecretBytes::new(key),
            metadata: self.metadata.clone(),
        })
    }
}

/// Eintrag im Schluessel-Register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Kontext unter dem der Slot abgeleitet wurde
    pub context: String,
    /// Zeitpunkt der Registrierung
    pub timestamp: DateTime<Utc>,
}

/// Das lokale Schluessel-Register: KeyId -> Slot-Kontext
///
/// Autoritativer Index darueber, welche Slots lebendes Schluessel-Material
/// enthalten. Invariante: Register-Eintraege und belegte Slots bilden eine
/// Bijektion.
pub type KeyRegistry = HashMap<KeyId, RegistryEntry>;

/// Entschluesseltes Backup-Paket (Inhalt des versiegelten Blobs)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupPackage {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub device_id: DeviceId,
    pub keys: Vec<StoredKeyRecord>,
}

/// Aeusseres Backup-Blob-Format
///
/// Das Argon2-Salt reist unverschluesselt neben dem versiegelten Paket –
/// ohne Salt waere der Import auf einem anderen Geraet unmoeglich.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupBlob {
    pub v: u32,
    /// Argon2id-Salt, Base64
    pub salt: String,
    /// base64(nonce || ciphertext) aus `encrypt_symmetric`
    pub sealed: String,
}

fn decode_key_bytes(encoded: &str) -> KeyStoreResult<[u8; KEY_LEN]> {
    let bytes = b64_decode(encoded)
        .map_err(|e| KeyStoreError::speicher(format!("beschaedigter Datensatz: {e}")))?;
    bytes.as_slice().try_into().map_err(|_| {
        KeyStoreError::speicher(format!(
            "beschaedigter Datensatz: Schluessel-Laenge {}",
            bytes.len()
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use blindpig_core::KeyAlgorithm;
    use blindpig_crypto::generate_box_key_pair;

    fn beispiel_key_pair() -> KeyPair {
        let (public, secret) = generate_box_key_pair();
        KeyPair {
            public_key: public,
            secret_key: secret,
            metadata: KeyMetadata::new(KeyAlgorithm::X25519XChaCha20Poly1305, None),
        }
    }

    #[test]
    fn key_record_roundtrip() {
        let pair = beispiel_key_pair();
        let record = StoredKeyRecord::from_key_pair(&pair, None);
        assert_eq!(record.version, RECORD_VERSION);

        let restored = record.to_key_pair().unwrap();
        assert_eq!(restored.public_key, pair.public_key);
        assert_eq!(restored.secret_key, pair.secret_key);
        assert_eq!(restored.metadata, pair.metadata);
    }

    #[test]
    fn backup_timestamp_wird_nur_bei_backup_serialisiert() {
        let pair = beispiel_key_pair();
        let ohne = serde_json::to_string(&StoredKeyRecord::from_key_pair(&pair, None)).unwrap();
        assert!(!ohne.contains("backup_timestamp"));

        let mit =
            serde_json::to_string(&StoredKeyRecord::from_key_pair(&pair, Some(Utc::now())))
                .unwrap();
        assert!(mit.contains("backup_timestamp"));
    }

    #[test]
    fn legacy_record_camel_case() {
        let json = r#"{"publicKey":"cHVi","secretKey":"c2Vj"}"#;
        let legacy: LegacyKeyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(legacy.public_key, "cHVi");
        assert_eq!(legacy.secret_key, "c2Vj");
    }

    #[test]
    fn legacy_record_ist_kein_versionierter_record() {
        let json = r#"{"publicKey":"cHVi","secretKey":"c2Vj"}"#;
        assert!(serde_json::from_str::<StoredKeyRecord>(json).is_err());
    }

    #[test]
    fn beschaedigter_record_ist_speicher_fehler() {
        let pair = beispiel_key_pair();
        let mut record = StoredKeyRecord::from_key_pair(&pair, None);
        record.secret_key = "kein base64!!".into();
        assert!(matches!(
            record.to_key_pair(),
            Err(KeyStoreError::Speicher(_))
        ));
    }

    #[test]
    fn falsche_laenge_ist_speicher_fehler() {
        let pair = beispiel_key_pair();
        let mut record = StoredKeyRecord::from_key_pair(&pair, None);
        record.public_key = b64_encode(&[0u8; 16]);
        assert!(matches!(
            record.to_key_pair(),
            Err(KeyStoreError::Speicher(_))
        ));
    }

    #[test]
    fn registry_serde_roundtrip() {
        let mut registry = KeyRegistry::new();
        registry.insert(
            KeyId::new(),
            RegistryEntry {
                context: "default".into(),
                timestamp: Utc::now(),
            },
        );
        let json = serde_json::to_string(&registry).unwrap();
        let decoded: KeyRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, registry);
    }
}
