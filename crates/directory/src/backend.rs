//! Backend-Abstraktion fuer das Public-Key-Verzeichnis
//!
//! Das `DirectoryBackend`-Trait abstrahiert den externen Persistenz-Dienst
//! (Blob speichern, Blobs je Benutzer auflisten). Der Dienst ist
//! append-only: Eintraege werden nie ueberschrieben oder geloescht, damit
//! die Rotations-Historie abfragbar bleibt.

use blindpig_core::UserId;
use parking_lot::RwLock;

use crate::error::DirectoryResult;
use crate::types::PublicKeyRecord;

/// Abstrakter Verzeichnis-Dienst
///
/// Netzwerk-Aufrufe suspendieren die aufrufende Task; alle anderen
/// Operationen des Key-Managements bleiben synchron.
#[allow(async_fn_in_trait)]
pub trait DirectoryBackend: Send + Sync {
    /// Haengt einen neuen Public-Key-Eintrag an (append-only)
    async fn insert(&self, record: PublicKeyRecord) -> DirectoryResult<()>;

    /// Listet alle Eintraege eines Benutzers
    ///
    /// Die Reihenfolge ist nicht garantiert – der Client sortiert selbst.
    async fn list_for_user(&self, user_id: UserId) -> DirectoryResult<Vec<PublicKeyRecord>>;
}

/// In-Memory-Backend fuer Tests und lokale Entwicklung
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    records: RwLock<Vec<PublicKeyRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gesamtzahl gespeicherter Eintraege (fuer Tests)
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl DirectoryBackend for MemoryDirectory {
    async fn insert(&self, record: PublicKeyRecord) -> DirectoryResult<()> {
        self.records.write().push(record);
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> DirectoryResult<Vec<PublicKeyRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}
