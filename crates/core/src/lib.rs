//! blindpig-core – Gemeinsame Typen fuer das Key-Management
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von den
//! anderen Blindpig-Crates gemeinsam genutzt werden: Schluessel-Paare,
//! Metadaten, symmetrische Schluessel und Geraete-Identitaet.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{
    DeviceId, KeyAlgorithm, KeyId, KeyMetadata, KeyPair, SecretBytes, SharedKey, UserId, KEY_LEN,
};
