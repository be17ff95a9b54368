//! # blindpig-keystore
//!
//! Dauerhafte lokale Ablage von Schluessel-Material und der zugehoerige
//! Lifecycle: Generierung, geplante Rotation, passwortgeschuetzter
//! Export/Import und Multi-Key-Entschluesselungs-Fallback.
//!
//! ## Module
//! - `storage`   - `KeyValueStore`-Capability + In-Memory-Implementierung
//! - `records`   - Versionierte Datensatz-Formate und das Register
//! - `store`     - `KeyStore`: Slots, Register, Geraete-ID
//! - `lifecycle` - `KeyLifecycleManager`: Rotation, Backup, Fallback
//! - `error`     - Fehlertypen

pub mod error;
pub mod lifecycle;
pub mod records;
pub mod storage;
pub mod store;

// Bequeme Re-Exporte
pub use error::{KeyStoreError, KeyStoreResult};
pub use lifecycle::{
    ImportSummary, KeyLifecycleManager, MultiKeyDecryption, RotationHandle,
    DEFAULT_ROTATION_INTERVAL_DAYS,
};
pub use records::{KeyRegistry, RegistryEntry};
pub use storage::{KeyValueStore, MemoryStore};
pub use store::{KeyStore, PRIMARY_CONTEXT};
