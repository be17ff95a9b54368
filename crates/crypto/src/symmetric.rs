//! Symmetrische Secretbox-Verschluesselung (XChaCha20-Poly1305)
//!
//! Fuer Daten, die unter einem geteilten Channel- oder Server-Schluessel
//! liegen: ein einzelner Schluessel, keine Sender/Empfaenger-Unterscheidung.
//!
//! ## Format
//! ```text
//! base64( [nonce(24)] [ciphertext + auth_tag(16)] )
//! ```

use blindpig_core::{SecretBytes, KEY_LEN};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::envelope::{b64_encode, split_nonce_ciphertext, NONCE_LEN};
use crate::error::{CryptoError, CryptoResult};

/// Generiert einen frischen symmetrischen Schluessel (32 Bytes)
pub fn generate_shared_key_bytes() -> SecretBytes {
    let mut key = vec![0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    SecretBytes::new(key)
}

/// Verschluesselt Text mit einem geteilten Schluessel
///
/// Die Nonce wird pro Aufruf frisch zufaellig erzeugt.
pub fn encrypt_symmetric(data: &str, shared_key: &SecretBytes) -> CryptoResult<String> {
    let cipher = cipher_from(shared_key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let sealed = cipher
        .encrypt(XNonce::from_slice(&nonce_bytes), data.as_bytes())
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

    let mut raw = Vec::with_capacity(NONCE_LEN + sealed.len());
    raw.extend_from_slice(&nonce_bytes);
    raw.extend_from_slice(&sealed);
    Ok(b64_encode(&raw))
}

/// Entschluesselt Daten mit einem geteilten Schluessel
pub fn decrypt_symmetric(encoded: &str, shared_key: &SecretBytes) -> CryptoResult<String> {
    let (nonce_bytes, sealed) = split_nonce_ciphertext(encoded)?;
    let cipher = cipher_from(shared_key)?;

    let plaintext = cipher
        .decrypt(XNonce::from_slice(&nonce_bytes), sealed.as_slice())
        .map_err(|_| CryptoError::Entschluesselung)?;

    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::UngueltigerPayload(e.to_string()))
}

fn cipher_from(shared_key: &SecretBytes) -> CryptoResult<XChaCha20Poly1305> {
    if shared_key.len() != KEY_LEN {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: KEY_LEN,
            erhalten: shared_key.len(),
        });
    }
    Ok(XChaCha20Poly1305::new(Key::from_slice(
        shared_key.as_bytes(),
    )))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
