//! # blindpig-directory
//!
//! Client fuer das Public-Key-Verzeichnis: oeffentliche Schluessel ueber
//! den externen Persistenz-Dienst veroeffentlichen und abrufen.
//!
//! ## Module
//! - `backend` - `DirectoryBackend`-Capability + In-Memory-Implementierung
//! - `client`  - `KeyDirectoryClient` (publish / fetch_all)
//! - `types`   - Wire-Format (`PublicKeyRecord`, `KeyType`)
//! - `error`   - Fehlertypen

pub mod backend;
pub mod client;
pub mod error;
pub mod types;

// Bequeme Re-Exporte
pub use backend::{DirectoryBackend, MemoryDirectory};
pub use client::KeyDirectoryClient;
pub use error::{DirectoryError, DirectoryResult};
pub use types::{KeyType, PublicKeyRecord};
