//! Wire-Format des Public-Key-Verzeichnisses

use blindpig_core::{DeviceId, KeyId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rolle eines veroeffentlichten Schluessels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    /// Aktueller Primaer-Schluessel
    Primary,
    /// Archivierter Vor-Rotations-Schluessel
    Backup,
    /// Durch Rotation ersetzter Schluessel
    Rotation,
    /// Geraetegebundener Schluessel
    Device,
}

/// Ein Eintrag im Public-Key-Verzeichnis (append-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    pub user_id: UserId,
    /// Oeffentlicher Schluessel, Base64
    pub public_key: String,
    pub key_type: KeyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<KeyId>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
