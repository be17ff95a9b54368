//! Lokaler Key Store
//!
//! Dauerhafte, versionierte Ablage von Schluessel-Material auf dem lokalen
//! Geraet. Jeder Slot wird aus einem Kontext abgeleitet
//! (`encryption_keys_<kontext>`, Standard `encryption_keys_default`); das
//! Register (`encryption_key_registry`) ist der autoritative Index aller
//! belegten Slots.
//!
//! Jede logische Operation laeuft unter einem einzelnen Mutex, damit
//! Slot-Schreiben und Register-Aktualisierung aus Sicht der Aufrufer eine
//! Transaktion bilden. Innerhalb der kritischen Sektion wird der Slot vor
//! dem Register geschrieben.

use std::sync::Arc;

use blindpig_core::{DeviceId, KeyId, KeyMetadata, KeyPair, SharedKey};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{KeyStoreError, KeyStoreResult};
use crate::records::{
    KeyRegistry, LegacyKeyRecord, RegistryEntry, StoredKeyRecord, StoredSharedKeyRecord,
};
use crate::storage::KeyValueStore;

/// Kontext des Primaer-Slots
pub const PRIMARY_CONTEXT: &str = "default";

/// Praefix aller Schluessel-Slots
const SLOT_PREFIX: &str = "encryption_keys_";

/// Slot des Schluessel-Registers
const REGISTRY_SLOT: &str = "encryption_key_registry";

/// Slot der Geraete-ID (wird von `clear_all_keys` nicht angetastet)
const DEVICE_ID_SLOT: &str = "encryption_device_id";

/// Dauerhafter lokaler Schluessel-Speicher
pub struct KeyStore {
    storage: Arc<dyn KeyValueStore>,
    lock: Mutex<()>,
}

impl KeyStore {
    /// Erstellt einen Key Store ueber dem angegebenen Storage-Backend
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    /// Speichert ein Schluessel-Paar unter einem Kontext
    ///
    /// Ohne Kontext landet das Paar im Primaer-Slot. Der Slot wird vor dem
    /// Register geschrieben; ein Leser sieht nie einen Register-Eintrag
    /// ohne zugehoerigen Slot.
    pub fn store_key_pair(&self, pair: &KeyPair, context: Option<&str>) -> KeyStoreResult<KeyId> {
        let _guard = self.lock.lock();
        self.write_key_pair(pair, context.unwrap_or(PRIMARY_CONTEXT), None)
    }

    /// Archiviert ein rotiertes Schluessel-Paar unter `backup_<key_id>`
    ///
    /// Backup-Slots werden nie geloescht, damit historische Nachrichten
    /// entschluesselbar bleiben.
    pub fn archive_key_pair(
        &self,
        pair: &KeyPair,
        backup_timestamp: DateTime<Utc>,
    ) -> KeyStoreResult<KeyId> {
        let _guard = self.lock.lock();
        let context = format!("backup_{}", pair.metadata.key_id);
        self.write_key_pair(pair, &context, Some(backup_timestamp))
    }

    /// Liest das Schluessel-Paar eines Kontexts
    ///
    /// Legacy-Datensaetze (ohne Versions-Feld) werden beim Lesen migriert:
    /// frische Metadaten, Neuschreiben des Slots, Register-Eintrag. Die
    /// Migration ist idempotent.
    pub fn get_key_pair(&self, context: Option<&str>) -> KeyStoreResult<Option<KeyPair>> {
        let _guard = self.lock.lock();
        let context = context.unwrap_or(PRIMARY_CONTEXT);

        let Some(raw) = self.storage.get(&slot_for(context))? else {
            return Ok(None);
        };

        if let Ok(record) = serde_json::from_str::<StoredKeyRecord>(&raw) {
            return record.to_key_pair().map(Some);
        }

        // Legacy-Format: transparent auf Version 1 anheben
        let legacy: LegacyKeyRecord = serde_json::from_str(&raw)
            .map_err(|e| KeyStoreError::speicher(format!("unlesbarer Datensatz: {e}")))?;
        let upgraded = self.upgrade_legacy(legacy, context)?;
        Ok(Some(upgraded))
    }

    /// Gibt alle registrierten Schluessel-Paare zurueck
    ///
    /// Register-Eintraege ohne aufloesbaren Slot werden uebersprungen, nicht
    /// als Fehler gemeldet (Schutz gegen partielle Schreibvorgaenge).
    pub fn get_all_keys(&self) -> KeyStoreResult<Vec<KeyPair>> {
        let _guard = self.lock.lock();
        let registry = self.read_registry()?;

        let mut keys = Vec::with_capacity(registry.len());
        for (key_id, entry) in &registry {
            let Some(raw) = self.storage.get(&slot_for(&entry.context))? else {
                tracing::warn!(key_id = %key_id, context = %entry.context, "Register-Eintrag ohne Slot uebersprungen");
                continue;
            };
            match serde_json::from_str::<StoredKeyRecord>(&raw) {
                Ok(record) => match record.to_key_pair() {
                    Ok(pair) => keys.push(pair),
                    Err(e) => {
                        tracing::warn!(key_id = %key_id, error = %e, "Beschaedigter Datensatz uebersprungen");
                    }
                },
                // Geteilte Schluessel liegen im selben Register, sind aber
                // keine Schluessel-Paare
                Err(_) if serde_json::from_str::<StoredSharedKeyRecord>(&raw).is_ok() => {}
                Err(e) => {
                    tracing::warn!(key_id = %key_id, error = %e, "Unlesbarer Datensatz uebersprungen");
                }
            }
        }
        Ok(keys)
    }

    /// Entfernt alle registrierten Slots und danach das Register selbst
    ///
    /// Die Geraete-ID bleibt erhalten – sie ist kein geheimes
    /// Schluessel-Material.
    pub fn clear_all_keys(&self) -> KeyStoreResult<()> {
        let _guard = self.lock.lock();
        let registry = self.read_registry()?;

        for entry in registry.values() {
            self.storage.remove(&slot_for(&entry.context))?;
        }
        self.storage.remove(REGISTRY_SLOT)?;
        tracing::debug!(entfernt = registry.len(), "Alle Schluessel geloescht");
        Ok(())
    }

    /// Speichert einen geteilten Channel-/Server-Schluessel
    pub fn store_shared_key(&self, shared: &SharedKey, context: &str) -> KeyStoreResult<KeyId> {
        let _guard = self.lock.lock();
        let record = StoredSharedKeyRecord::from_shared_key(shared);
        let json = serde_json::to_string(&record)
            .map_err(|e| KeyStoreError::speicher(e.to_string()))?;

        self.storage.set(&slot_for(context), &json)?;
        self.register(shared.metadata.key_id, context)?;
        Ok(shared.metadata.key_id)
    }

    /// Liest den geteilten Schluessel eines Kontexts
    pub fn get_shared_key(&self, context: &str) -> KeyStoreResult<Option<SharedKey>> {
        let _guard = self.lock.lock();
        let Some(raw) = self.storage.get(&slot_for(context))? else {
            return Ok(None);
        };
        let record: StoredSharedKeyRecord = serde_json::from_str(&raw)
            .map_err(|e| KeyStoreError::speicher(format!("unlesbarer Datensatz: {e}")))?;
        record.to_shared_key().map(Some)
    }

    /// Gibt die Geraete-ID zurueck, erstellt sie beim ersten Zugriff
    ///
    /// Die ID wird einmal pro Installation erzeugt und nie rotiert.
    pub fn device_id(&self) -> KeyStoreResult<DeviceId> {
        let _guard = self.lock.lock();
        self.device_id_inner()
    }

    /// Aktuelles Register (fuer Diagnose und Invarianten-Pruefung)
    pub fn registry(&self) -> KeyStoreResult<KeyRegistry> {
        let _guard = self.lock.lock();
        self.read_registry()
    }

    // -- Interne Helfer (setzen gehaltenen Lock voraus) --------------------

    fn write_key_pair(
        &self,
        pair: &KeyPair,
        context: &str,
        backup_timestamp: Option<DateTime<Utc>>,
    ) -> KeyStoreResult<KeyId> {
        let record = StoredKeyRecord::from_key_pair(pair, backup_timestamp);
        let json = serde_json::to_string(&record)
            .map_err(|e| KeyStoreError::speicher(e.to_string()))?;

        self.storage.set(&slot_for(context), &json)?;
        self.register(pair.metadata.key_id, context)?;

        tracing::debug!(key_id = %pair.metadata.key_id, context, "Schluessel-Paar gespeichert");
        Ok(pair.metadata.key_id)
    }

    fn upgrade_legacy(&self, legacy: LegacyKeyRecord, context: &str) -> KeyStoreResult<KeyPair> {
        let device_id = self.device_id_inner()?;
        let record = StoredKeyRecord {
            version: crate::records::RECORD_VERSION,
            public_key: legacy.public_key,
            secret_key: legacy.secret_key,
            metadata: KeyMetadata::new(Default::default(), Some(device_id)),
            backup_timestamp: None,
        };
        let pair = record.to_key_pair()?;

        let json = serde_json::to_string(&record)
            .map_err(|e| KeyStoreError::speicher(e.to_string()))?;
        self.storage.set(&slot_for(context), &json)?;
        self.register(record.metadata.key_id, context)?;

        tracing::info!(key_id = %record.metadata.key_id, context, "Legacy-Datensatz migriert");
        Ok(pair)
    }

    fn read_registry(&self) -> KeyStoreResult<KeyRegistry> {
        match self.storage.get(REGISTRY_SLOT)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| KeyStoreError::speicher(format!("unlesbares Register: {e}"))),
            None => Ok(KeyRegistry::new()),
        }
    }

    fn write_registry(&self, registry: &KeyRegistry) -> KeyStoreResult<()> {
        let json = serde_json::to_string(registry)
            .map_err(|e| KeyStoreError::speicher(e.to_string()))?;
        self.storage.set(REGISTRY_SLOT, &json)
    }

    /// Registriert einen Schluessel; ein frueherer Eintrag desselben
    /// Kontexts wird ersetzt, damit keine Eintraege auf ueberschriebene
    /// Slots zeigen.
    fn register(&self, key_id: KeyId, context: &str) -> KeyStoreResult<()> {
        let mut registry = self.read_registry()?;
        registry.retain(|_, entry| entry.context != context);

        // Wandert ein Schluessel in einen anderen Kontext (z.B. Rotation
        // in einen Backup-Slot), wird sein alter Slot aufgegeben – sonst
        // entstuende ein Slot ohne Register-Eintrag.
        if let Some(old) = registry.remove(&key_id) {
            if old.context != context {
                self.storage.remove(&slot_for(&old.context))?;
            }
        }

        registry.insert(
            key_id,
            RegistryEntry {
                context: context.to_string(),
                timestamp: Utc::now(),
            },
        );
        self.write_registry(&registry)
    }

    fn device_id_inner(&self) -> KeyStoreResult<DeviceId> {
        if let Some(raw) = self.storage.get(DEVICE_ID_SLOT)? {
            let uuid = Uuid::parse_str(&raw)
                .map_err(|e| KeyStoreError::speicher(format!("beschaedigte Geraete-ID: {e}")))?;
            return Ok(DeviceId(uuid));
        }
        let device_id = DeviceId::new();
        self.storage.set(DEVICE_ID_SLOT, &device_id.inner().to_string())?;
        tracing::info!(device_id = %device_id, "Geraete-ID erstellt");
        Ok(device_id)
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyStore")
    }
}

fn slot_for(context: &str) -> String {
    format!("{SLOT_PREFIX}{context}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use blindpig_core::KeyAlgorithm;
    use blindpig_crypto::envelope::b64_encode;
    use blindpig_crypto::{generate_box_key_pair, generate_shared_key_bytes};

    fn test_store() -> (KeyStore, Arc<MemoryStore>) {
        let memory = Arc::new(MemoryStore::new());
        (KeyStore::new(memory.clone()), memory)
    }

    fn beispiel_key_pair() -> KeyPair {
        let (public, secret) = generate_box_key_pair();
        KeyPair {
            public_key: public,
            secret_key: secret,
            metadata: KeyMetadata::new(KeyAlgorithm::X25519XChaCha20Poly1305, None),
        }
    }

    /// Prueft die Register-Invariante: jeder Eintrag loest zu einem
    /// belegten Slot auf.
    fn pruefe_register_invariante(store: &KeyStore) {
        let registry = store.registry().unwrap();
        for entry in registry.values() {
            let slot = store.storage.get(&slot_for(&entry.context)).unwrap();
            assert!(slot.is_some(), "Eintrag ohne Slot: {}", entry.context);
        }
    }

    #[test]
    fn speichern_und_lesen_primaer() {
        let (store, _) = test_store();
        let pair = beispiel_key_pair();

        let key_id = store.store_key_pair(&pair, None).unwrap();
        assert_eq!(key_id, pair.metadata.key_id);

        let loaded = store.get_key_pair(None).unwrap().unwrap();
        assert_eq!(loaded.public_key, pair.public_key);
        assert_eq!(loaded.secret_key, pair.secret_key);
        assert_eq!(loaded.metadata, pair.metadata);
    }

    #[test]
    fn speichern_unter_kontext() {
        let (store, _) = test_store();
        let pair = beispiel_key_pair();

        store.store_key_pair(&pair, Some("server-42")).unwrap();
        assert!(store.get_key_pair(None).unwrap().is_none());
        assert!(store.get_key_pair(Some("server-42")).unwrap().is_some());
    }

    #[test]
    fn fehlender_kontext_ist_none() {
        let (store, _) = test_store();
        assert!(store.get_key_pair(Some("unbekannt")).unwrap().is_none());
    }

    #[test]
    fn register_invariante_nach_operationen() {
        let (store, _) = test_store();

        store.store_key_pair(&beispiel_key_pair(), None).unwrap();
        store
            .store_key_pair(&beispiel_key_pair(), Some("server-1"))
            .unwrap();
        let alt = beispiel_key_pair();
        store.archive_key_pair(&alt, Utc::now()).unwrap();
        pruefe_register_invariante(&store);

        // Primaer-Slot ueberschreiben: alter Eintrag darf nicht haengen
        // bleiben
        store.store_key_pair(&beispiel_key_pair(), None).unwrap();
        pruefe_register_invariante(&store);
        assert_eq!(store.get_all_keys().unwrap().len(), 3);

        store.clear_all_keys().unwrap();
        assert!(store.registry().unwrap().is_empty());
        assert!(store.get_all_keys().unwrap().is_empty());
    }

    #[test]
    fn get_all_keys_liefert_alle_paare() {
        let (store, _) = test_store();
        store.store_key_pair(&beispiel_key_pair(), None).unwrap();
        store
            .store_key_pair(&beispiel_key_pair(), Some("server-1"))
            .unwrap();

        let keys = store.get_all_keys().unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn get_all_keys_ueberspringt_fehlende_slots() {
        let (store, memory) = test_store();
        store.store_key_pair(&beispiel_key_pair(), None).unwrap();
        store
            .store_key_pair(&beispiel_key_pair(), Some("server-1"))
            .unwrap();

        // Slot von aussen entfernen (simulierter partieller Schreibvorgang)
        memory.remove("encryption_keys_server-1").unwrap();

        let keys = store.get_all_keys().unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn get_all_keys_ueberspringt_geteilte_schluessel() {
        let (store, _) = test_store();
        store.store_key_pair(&beispiel_key_pair(), None).unwrap();

        let shared = SharedKey {
            key: generate_shared_key_bytes(),
            metadata: KeyMetadata::new(KeyAlgorithm::XChaCha20Poly1305, None),
        };
        store.store_shared_key(&shared, "channel-7").unwrap();

        let keys = store.get_all_keys().unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn clear_erhaelt_geraete_id() {
        let (store, _) = test_store();
        let device_id = store.device_id().unwrap();

        store.store_key_pair(&beispiel_key_pair(), None).unwrap();
        store.clear_all_keys().unwrap();

        assert_eq!(store.device_id().unwrap(), device_id);
    }

    #[test]
    fn geraete_id_ist_stabil() {
        let (store, _) = test_store();
        assert_eq!(store.device_id().unwrap(), store.device_id().unwrap());
    }

    #[test]
    fn legacy_migration_ist_idempotent() {
        let (store, memory) = test_store();
        let (public, secret) = generate_box_key_pair();

        // Legacy-Datensatz von Hand schreiben (camelCase, keine Version)
        let legacy = format!(
            r#"{{"publicKey":"{}","secretKey":"{}"}}"#,
            b64_encode(&public),
            b64_encode(secret.as_bytes())
        );
        memory.set("encryption_keys_default", &legacy).unwrap();

        let first = store.get_key_pair(None).unwrap().unwrap();
        assert_eq!(first.public_key, public);
        assert_eq!(first.secret_key, secret);

        // Slot muss jetzt versioniert sein
        let raw = memory.get("encryption_keys_default").unwrap().unwrap();
        assert!(raw.contains("\"version\":1"));

        // Zweites Lesen: gleiche Schluessel, gleiche Metadaten (No-Op)
        let second = store.get_key_pair(None).unwrap().unwrap();
        assert_eq!(second.public_key, first.public_key);
        assert_eq!(second.secret_key, first.secret_key);
        assert_eq!(second.metadata, first.metadata);
        pruefe_register_invariante(&store);
    }

    #[test]
    fn geteilter_schluessel_roundtrip() {
        let (store, _) = test_store();
        let shared = SharedKey {
            key: generate_shared_key_bytes(),
            metadata: KeyMetadata::new(KeyAlgorithm::XChaCha20Poly1305, None),
        };

        store.store_shared_key(&shared, "channel-1").unwrap();
        let loaded = store.get_shared_key("channel-1").unwrap().unwrap();
        assert_eq!(loaded.key, shared.key);
        assert_eq!(loaded.metadata, shared.metadata);
    }

    #[test]
    fn speicher_fehler_wird_sichtbar() {
        /// Backend das jeden Schreibvorgang ablehnt (simulierte Quota)
        struct VollerSpeicher;

        impl KeyValueStore for VollerSpeicher {
            fn get(&self, _slot: &str) -> KeyStoreResult<Option<String>> {
                Ok(None)
            }
            fn set(&self, _slot: &str, _value: &str) -> KeyStoreResult<()> {
                Err(KeyStoreError::speicher("Quota erschoepft"))
            }
            fn remove(&self, _slot: &str) -> KeyStoreResult<()> {
                Ok(())
            }
        }

        let store = KeyStore::new(Arc::new(VollerSpeicher));
        let result = store.store_key_pair(&beispiel_key_pair(), None);
        assert!(matches!(result, Err(KeyStoreError::Speicher(_))));
    }

    #[test]
    fn beschaedigter_primaer_datensatz_ist_speicher_fehler() {
        let (store, memory) = test_store();
        memory
            .set("encryption_keys_default", "{ kein json")
            .unwrap();
        let result = store.get_key_pair(None);
        assert!(matches!(result, Err(KeyStoreError::Speicher(_))));
    }

    #[test]
    fn beschaedigte_schluessel_bytes_sind_speicher_fehler() {
        let (store, memory) = test_store();
        let pair = beispiel_key_pair();
        store.store_key_pair(&pair, None).unwrap();

        let raw = memory.get("encryption_keys_default").unwrap().unwrap();
        let manipuliert = raw.replace(
            &b64_encode(pair.secret_key.as_bytes()),
            &b64_encode(&[0u8; 7]),
        );
        memory.set("encryption_keys_default", &manipuliert).unwrap();

        let result = store.get_key_pair(None);
        assert!(matches!(result, Err(KeyStoreError::Speicher(_))));
    }
}
