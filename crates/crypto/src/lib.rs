//! # blindpig-crypto
//!
//! Envelope-Verschluesselung fuer Blindpig: authentifizierte Verschluesselung
//! fuer asymmetrische (Sender -> Empfaenger) und symmetrische (geteilter
//! Schluessel) Payloads.
//!
//! ## Module
//! - `asymmetric` - Box-Konstruktion (X25519 + HKDF + XChaCha20-Poly1305)
//! - `symmetric`  - Secretbox-Konstruktion (XChaCha20-Poly1305)
//! - `reaction`   - Strukturierte Reaktions-Payloads
//! - `envelope`   - Selbstbeschreibendes Wire-Format
//! - `error`      - Fehlertypen

pub mod asymmetric;
pub mod envelope;
pub mod error;
pub mod reaction;
pub mod symmetric;

// Bequeme Re-Exporte
pub use asymmetric::{
    decrypt_asymmetric, encrypt_asymmetric, generate_box_key_pair, hkdf_derive,
};
pub use envelope::{EncryptedEnvelope, EnvelopeMetadata, ENVELOPE_VERSION, NONCE_LEN, TAG_LEN};
pub use error::{CryptoError, CryptoResult};
pub use reaction::{decrypt_reaction, encrypt_reaction, ReactionPayload};
pub use symmetric::{decrypt_symmetric, encrypt_symmetric, generate_shared_key_bytes};
