//! Authentifizierte Public-Key-Verschluesselung (Box-Konstruktion)
//!
//! Sender und Empfaenger leiten aus statischem X25519-Diffie-Hellman und
//! HKDF-SHA256 denselben symmetrischen Schluessel ab; der Payload wird mit
//! XChaCha20-Poly1305 versiegelt. Eine erfolgreiche Entschluesselung beweist
//! damit gleichzeitig, dass die Nachricht vom Inhaber des behaupteten
//! privaten Schluessels stammt.
//!
//! ## Format
//! ```text
//! base64( [nonce(24)] [ciphertext + auth_tag(16)] )
//! ```

use blindpig_core::{KeyAlgorithm, SecretBytes, KEY_LEN};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::envelope::{
    b64_encode, split_nonce_ciphertext, EncryptedEnvelope, EnvelopeMetadata, NONCE_LEN,
};
use crate::error::{CryptoError, CryptoResult};

/// HKDF-Info fuer die Ableitung des Box-Schluessels
const BOX_INFO: &[u8] = b"blindpig-envelope-v1";

/// Generiert ein frisches X25519-Schluessel-Paar
pub fn generate_box_key_pair() -> ([u8; KEY_LEN], SecretBytes) {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = X25519PublicKey::from(&secret);
    (public.to_bytes(), SecretBytes::new(secret.to_bytes().to_vec()))
}

/// Verschluesselt eine Textnachricht fuer einen Empfaenger
///
/// Die Nonce wird pro Aufruf frisch zufaellig erzeugt und nie
/// wiederverwendet.
pub fn encrypt_asymmetric(
    message: &str,
    recipient_public: &[u8; KEY_LEN],
    sender_secret: &SecretBytes,
) -> CryptoResult<EncryptedEnvelope> {
    let box_key = derive_box_key(sender_secret, recipient_public)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&box_key));
    let sealed = cipher
        .encrypt(nonce, message.as_bytes())
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

    let mut raw = Vec::with_capacity(NONCE_LEN + sealed.len());
    raw.extend_from_slice(&nonce_bytes);
    raw.extend_from_slice(&sealed);

    Ok(EncryptedEnvelope {
        ciphertext: b64_encode(&raw),
        metadata: EnvelopeMetadata::new(KeyAlgorithm::X25519XChaCha20Poly1305),
    })
}

/// Entschluesselt einen Envelope eines bekannten Senders
///
/// Version und Algorithmus werden vor der Entschluesselung geprueft.
/// Ein ungueltiger Auth-Tag ergibt `Entschluesselung` – falscher
/// Schluessel, Korruption und Manipulation sind nicht unterscheidbar.
pub fn decrypt_asymmetric(
    envelope: &EncryptedEnvelope,
    sender_public: &[u8; KEY_LEN],
    recipient_secret: &SecretBytes,
) -> CryptoResult<String> {
    envelope.check_header(KeyAlgorithm::X25519XChaCha20Poly1305)?;

    let (nonce_bytes, sealed) = split_nonce_ciphertext(&envelope.ciphertext)?;
    let box_key = derive_box_key(recipient_secret, sender_public)?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&box_key));
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&nonce_bytes), sealed.as_slice())
        .map_err(|_| CryptoError::Entschluesselung)?;

    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::UngueltigerPayload(e.to_string()))
}

/// Leitet den symmetrischen Box-Schluessel aus DH(eigener privater,
/// fremder oeffentlicher Schluessel) via HKDF-SHA256 ab.
///
/// DH ist kommutativ, beide Seiten erhalten denselben Schluessel.
fn derive_box_key(
    own_secret: &SecretBytes,
    peer_public: &[u8; KEY_LEN],
) -> CryptoResult<[u8; KEY_LEN]> {
    let secret_bytes: [u8; KEY_LEN] = own_secret.as_bytes().try_into().map_err(|_| {
        CryptoError::UngueltigeSchluesselLaenge {
            erwartet: KEY_LEN,
            erhalten: own_secret.len(),
        }
    })?;

    let secret = StaticSecret::from(secret_bytes);
    let peer = X25519PublicKey::from(*peer_public);
    let dh_output = secret.diffie_hellman(&peer);

    let okm = hkdf_derive(dh_output.as_bytes(), &[], BOX_INFO, KEY_LEN)?;
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&okm);
    Ok(key)
}

/// HKDF-basierte Key Derivation (allgemein verwendbar)
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
