//! Storage-Backend fuer den Key Store
//!
//! Das `KeyValueStore`-Trait abstrahiert den konkreten lokalen Speicher
//! (Browser-LocalStorage, Datei, In-Memory). Der Key Store erhaelt das
//! Backend als explizite Capability bei der Konstruktion – kein ambienter
//! globaler Zustand, keine Laufzeit-Umgebungspruefungen.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::KeyStoreResult;

/// Abstrakter lokaler Schluessel/Wert-Speicher
///
/// Alle Operationen sind synchron und blockieren nicht (lokaler Speicher,
/// keine Netzwerk-I/O). Fehler des Backends werden als
/// `KeyStoreError::Speicher` sichtbar.
pub trait KeyValueStore: Send + Sync {
    /// Wert unter einem Slot lesen
    fn get(&self, slot: &str) -> KeyStoreResult<Option<String>>;

    /// Wert unter einem Slot schreiben
    fn set(&self, slot: &str, value: &str) -> KeyStoreResult<()>;

    /// Slot entfernen (kein Fehler falls nicht vorhanden)
    fn remove(&self, slot: &str) -> KeyStoreResult<()>;
}

/// In-Memory-Implementierung
///
/// Standard fuer Tests und native Clients ohne persistenten Speicher.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anzahl belegter Slots (fuer Tests und Diagnose)
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, slot: &str) -> KeyStoreResult<Option<String>> {
        Ok(self.slots.read().get(slot).cloned())
    }

    fn set(&self, slot: &str, value: &str) -> KeyStoreResult<()> {
        self.slots.write().insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> KeyStoreResult<()> {
        self.slots.write().remove(slot);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_und_get() {
        let store = MemoryStore::new();
        store.set("slot-a", "wert").unwrap();
        assert_eq!(store.get("slot-a").unwrap(), Some("wert".to_string()));
    }

    #[test]
    fn fehlender_slot_ist_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nicht-vorhanden").unwrap(), None);
    }

    #[test]
    fn remove_ist_idempotent() {
        let store = MemoryStore::new();
        store.set("slot-b", "wert").unwrap();
        store.remove("slot-b").unwrap();
        store.remove("slot-b").unwrap();
        assert_eq!(store.get("slot-b").unwrap(), None);
    }

    #[test]
    fn ueberschreiben_ersetzt_wert() {
        let store = MemoryStore::new();
        store.set("slot-c", "alt").unwrap();
        store.set("slot-c", "neu").unwrap();
        assert_eq!(store.get("slot-c").unwrap(), Some("neu".to_string()));
    }
}
