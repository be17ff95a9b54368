//! Verzeichnis-Client: Public Keys veroeffentlichen und abrufen
//!
//! Duenner Adapter ueber dem externen Persistenz-Dienst. Veroeffentlichen
//! haengt immer einen neuen Eintrag an; die Rotations-Historie bleibt
//! vollstaendig abfragbar. Ergebnisse von `fetch_all` sind ueber Geraete
//! hinweg nur eventual-konsistent – fehlt ein erwarteter Schluessel, muss
//! der Aufrufer erneut abfragen.

use std::sync::Arc;

use blindpig_core::{DeviceId, KeyId, UserId, KEY_LEN};
use chrono::Utc;

use crate::backend::DirectoryBackend;
use crate::error::DirectoryResult;
use crate::types::{KeyType, PublicKeyRecord};

/// Client fuer das Public-Key-Verzeichnis
#[derive(Debug)]
pub struct KeyDirectoryClient<B>
where
    B: DirectoryBackend,
{
    backend: Arc<B>,
}

impl<B> KeyDirectoryClient<B>
where
    B: DirectoryBackend,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Veroeffentlicht einen oeffentlichen Schluessel
    ///
    /// Fruehere Eintraege werden nie ueberschrieben oder geloescht.
    pub async fn publish(
        &self,
        user_id: UserId,
        public_key: &[u8; KEY_LEN],
        key_type: KeyType,
        device_id: Option<DeviceId>,
        key_id: Option<KeyId>,
    ) -> DirectoryResult<PublicKeyRecord> {
        let record = PublicKeyRecord {
            user_id,
            public_key: base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                public_key,
            ),
            key_type,
            device_id,
            key_id,
            created_at: Utc::now(),
        };

        self.backend.insert(record.clone()).await?;
        tracing::debug!(user_id = %user_id, key_type = ?key_type, "Public Key veroeffentlicht");
        Ok(record)
    }

    /// Holt alle veroeffentlichten Schluessel eines Benutzers,
    /// neueste zuerst
    ///
    /// Die Sortierung geschieht client-seitig; der Backend-Reihenfolge wird
    /// nicht vertraut. Unterstuetzt das "alle bekannten Schluessel eines
    /// Peers durchprobieren"-Muster der Multi-Key-Entschluesselung.
    pub async fn fetch_all(&self, user_id: UserId) -> DirectoryResult<Vec<PublicKeyRecord>> {
        let mut records = self.backend.list_for_user(user_id).await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
