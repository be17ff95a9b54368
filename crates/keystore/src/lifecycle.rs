//! Schluessel-Lifecycle: Generierung, Rotation, Backup und Multi-Key-Fallback
//!
//! Orchestriert Key Store und Envelope-Krypto:
//! - Generierung frischer X25519-Paare mit Metadaten
//! - Geplante Rotation (taegliche Pruefung, Rotation nach Alter)
//! - Passwortgeschuetzter Export/Import (Argon2id + Secretbox)
//! - Entschluesselungs-Fallback ueber alle lokal bekannten Schluessel

use std::sync::Arc;

use argon2::Argon2;
use blindpig_core::{KeyAlgorithm, KeyId, KeyMetadata, KeyPair, SecretBytes, KEY_LEN};
use blindpig_crypto::{
    decrypt_asymmetric, decrypt_symmetric, encrypt_symmetric, generate_box_key_pair,
    CryptoError, EncryptedEnvelope,
};
use blindpig_crypto::envelope::{b64_decode, b64_encode};
use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::task::JoinHandle;

use crate::error::{KeyStoreError, KeyStoreResult};
use crate::records::{BackupBlob, BackupPackage, StoredKeyRecord};
use crate::store::KeyStore;

/// Version des Backup-Blob-Formats
pub const BACKUP_VERSION: u32 = 1;

/// Argon2id-Salt-Laenge in Bytes
const SALT_LEN: usize = 16;

/// Standard-Rotations-Intervall in Tagen
pub const DEFAULT_ROTATION_INTERVAL_DAYS: i64 = 30;

/// Abstand zwischen zwei Rotations-Pruefungen (ein Tag Wanduhr-Zeit)
const CHECK_PERIOD: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// Ergebnis einer erfolgreichen Multi-Key-Entschluesselung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiKeyDecryption {
    /// Entschluesselter Klartext
    pub text: String,
    /// KeyId des Schluessels der den Envelope geoeffnet hat
    pub decrypted_with: KeyId,
}

/// Zusammenfassung eines Backup-Imports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Anzahl wiederhergestellter Schluessel-Paare
    pub key_count: usize,
}

/// Handle zum Stoppen des Rotations-Schedules
///
/// `cancel` beendet die Hintergrund-Task deterministisch; nach dem Aufruf
/// findet keine weitere Pruefung statt.
#[derive(Debug)]
pub struct RotationHandle {
    task: JoinHandle<()>,
}

impl RotationHandle {
    /// Stoppt alle zukuenftigen Rotations-Pruefungen
    pub fn cancel(self) {
        self.task.abort();
    }
}

/// Verwaltet den Lebenszyklus der lokalen Schluessel
#[derive(Debug, Clone)]
pub struct KeyLifecycleManager {
    store: Arc<KeyStore>,
}

impl KeyLifecycleManager {
    pub fn new(store: Arc<KeyStore>) -> Self {
        Self { store }
    }

    /// Zugriff auf den darunterliegenden Key Store
    pub fn store(&self) -> &Arc<KeyStore> {
        &self.store
    }

    /// Generiert ein frisches Schluessel-Paar mit Metadaten
    ///
    /// Das Paar wird nicht automatisch gespeichert.
    pub fn generate_key_pair(&self) -> KeyStoreResult<KeyPair> {
        let device_id = self.store.device_id()?;
        let (public_key, secret_key) = generate_box_key_pair();
        Ok(KeyPair {
            public_key,
            secret_key,
            metadata: KeyMetadata::new(
                KeyAlgorithm::X25519XChaCha20Poly1305,
                Some(device_id),
            ),
        })
    }

    /// Rotiert das Primaer-Schluessel-Paar
    ///
    /// Das bisherige Paar wird dauerhaft unter `backup_<key_id>` archiviert
    /// (Rotation loescht nie – historische Nachrichten muessen
    /// entschluesselbar bleiben), danach wird das neue Paar Primaer.
    pub fn rotate_key_pair(&self, current: &KeyPair) -> KeyStoreResult<KeyPair> {
        self.store.archive_key_pair(current, Utc::now())?;

        let fresh = self.generate_key_pair()?;
        self.store.store_key_pair(&fresh, None)?;

        tracing::info!(
            alt = %current.metadata.key_id,
            neu = %fresh.metadata.key_id,
            "Schluessel-Paar rotiert"
        );
        Ok(fresh)
    }

    /// Startet den Rotations-Schedule
    ///
    /// Fuehrt sofort eine Pruefung aus, danach einmal pro Tag: ist der
    /// Primaer-Schluessel aelter als `interval_days`, wird rotiert; fehlt
    /// er, wird einer erstellt. Speicher-Fehler der Hintergrund-Pruefung
    /// werden geloggt, der Schedule laeuft weiter.
    ///
    /// Erfordert eine laufende Tokio-Runtime.
    pub fn setup_rotation_schedule(&self, interval_days: i64) -> RotationHandle {
        let manager = self.clone();
        let task = tokio::spawn(async move {
            loop {
                if let Err(e) = manager.rotation_check(interval_days) {
                    tracing::warn!(error = %e, "Rotations-Pruefung fehlgeschlagen");
                }
                tokio::time::sleep(CHECK_PERIOD).await;
            }
        });
        RotationHandle { task }
    }

    /// Einzelne Rotations-Pruefung (auch vom Schedule verwendet)
    pub fn rotation_check(&self, interval_days: i64) -> KeyStoreResult<()> {
        match self.store.get_key_pair(None)? {
            None => {
                let fresh = self.generate_key_pair()?;
                self.store.store_key_pair(&fresh, None)?;
                tracing::info!(key_id = %fresh.metadata.key_id, "Primaer-Schluessel erstellt");
            }
            Some(current) => {
                let age = Utc::now() - current.metadata.created_at;
                if age > ChronoDuration::days(interval_days) {
                    self.rotate_key_pair(&current)?;
                }
            }
        }
        Ok(())
    }

    /// Versucht einen Envelope mit jedem lokal bekannten Schluessel zu
    /// oeffnen
    ///
    /// Das ist der Wiederherstellungs-Pfad nach Rotation und fuer
    /// Multi-Device: eine unter einem alten oeffentlichen Schluessel
    /// verschluesselte Nachricht bleibt lesbar, solange der zugehoerige
    /// private Schluessel lokal erhalten ist. Die Reihenfolge folgt der
    /// Store-Enumeration, sie ist nicht garantiert.
    pub fn try_decrypt_with_multiple_keys(
        &self,
        envelope: &EncryptedEnvelope,
        sender_public: &[u8; KEY_LEN],
    ) -> KeyStoreResult<MultiKeyDecryption> {
        let keys = self.store.get_all_keys()?;
        let versucht = keys.len();

        for pair in keys {
            match decrypt_asymmetric(envelope, sender_public, &pair.secret_key) {
                Ok(text) => {
                    return Ok(MultiKeyDecryption {
                        text,
                        decrypted_with: pair.metadata.key_id,
                    });
                }
                Err(_) => continue,
            }
        }
        Err(KeyStoreError::KeinPassenderSchluessel { versucht })
    }

    /// Exportiert alle lokalen Schluessel als passwortgeschuetztes Backup
    ///
    /// Der symmetrische Backup-Schluessel wird per Argon2id aus dem
    /// Passwort abgeleitet; das frische Salt reist Base64-kodiert neben dem
    /// versiegelten Paket im Blob.
    pub fn export_encryption_keys(&self, password: &str) -> KeyStoreResult<String> {
        let keys = self.store.get_all_keys()?;
        if keys.is_empty() {
            return Err(KeyStoreError::KeineSchluesselZumExport);
        }

        let package = BackupPackage {
            version: BACKUP_VERSION,
            timestamp: Utc::now(),
            device_id: self.store.device_id()?,
            keys: keys
                .iter()
                .map(|pair| StoredKeyRecord::from_key_pair(pair, None))
                .collect(),
        };
        let package_json = serde_json::to_string(&package)
            .map_err(|e| KeyStoreError::speicher(e.to_string()))?;

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let backup_key = derive_backup_key(password, &salt)?;
        let sealed = encrypt_symmetric(&package_json, &backup_key)?;

        let blob = BackupBlob {
            v: BACKUP_VERSION,
            salt: b64_encode(&salt),
            sealed,
        };
        let encoded = serde_json::to_string(&blob)
            .map_err(|e| KeyStoreError::speicher(e.to_string()))?;

        tracing::info!(keys = package.keys.len(), "Schluessel-Backup exportiert");
        Ok(encoded)
    }

    /// Importiert ein Backup und stellt die enthaltenen Schluessel wieder
    /// her
    ///
    /// Falsches Passwort ergibt einen Entschluesselungs-Fehler bevor
    /// irgendein Schluessel gespeichert wird – keine partielle
    /// Wiederherstellung. Neue Paare landen in einem Slot, der nach ihrer
    /// KeyId benannt ist; lokal bereits registrierte Schluessel behalten
    /// ihren bestehenden Kontext.
    pub fn import_encryption_keys(
        &self,
        blob: &str,
        password: &str,
    ) -> KeyStoreResult<ImportSummary> {
        let blob: BackupBlob = serde_json::from_str(blob)
            .map_err(|e| KeyStoreError::UngueltigesBackupFormat(e.to_string()))?;
        if blob.v != BACKUP_VERSION {
            return Err(KeyStoreError::UngueltigeBackupVersion {
                erwartet: BACKUP_VERSION,
                erhalten: blob.v,
            });
        }

        let salt = b64_decode(&blob.salt)
            .map_err(|e| KeyStoreError::UngueltigesBackupFormat(e.to_string()))?;
        let backup_key = derive_backup_key(password, &salt)?;

        // Falsches Passwort schlaegt hier als Entschluesselungs-Fehler fehl
        let package_json = decrypt_symmetric(&blob.sealed, &backup_key)?;

        let package: BackupPackage = serde_json::from_str(&package_json)
            .map_err(|e| KeyStoreError::UngueltigesBackupFormat(e.to_string()))?;
        if package.version != BACKUP_VERSION {
            return Err(KeyStoreError::UngueltigeBackupVersion {
                erwartet: BACKUP_VERSION,
                erhalten: package.version,
            });
        }

        let registry = self.store.registry()?;
        let mut key_count = 0;
        for record in &package.keys {
            let pair = record
                .to_key_pair()
                .map_err(|e| KeyStoreError::UngueltigesBackupFormat(e.to_string()))?;

            // Bereits registrierte Schluessel behalten ihren Kontext –
            // ein Import auf dem Ursprungs-Geraet darf den Primaer-Slot
            // nicht in einen KeyId-Slot verschieben.
            if registry.contains_key(&pair.metadata.key_id) {
                tracing::debug!(key_id = %pair.metadata.key_id, "Schluessel bereits vorhanden, uebersprungen");
                continue;
            }

            let context = pair.metadata.key_id.to_string();
            self.store.store_key_pair(&pair, Some(&context))?;
            key_count += 1;
        }

        tracing::info!(keys = key_count, device_id = %package.device_id, "Schluessel-Backup importiert");
        Ok(ImportSummary { key_count })
    }
}

/// Leitet den symmetrischen Backup-Schluessel per Argon2id ab
fn derive_backup_key(password: &str, salt: &[u8]) -> KeyStoreResult<SecretBytes> {
    let mut key = vec![0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| KeyStoreError::Crypto(CryptoError::KeyDerivation(e.to_string())))?;
    Ok(SecretBytes::new(key))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
