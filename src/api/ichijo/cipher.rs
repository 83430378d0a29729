use std::string::FromUtf8Error;

use aes::Aes128;
use base64::{Engine, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use serde::{Deserialize, Serialize};

type Encryptor = cbc::Encryptor<Aes128>;
type Decryptor = cbc::Decryptor<Aes128>;

pub const KEY_LENGTH: usize = 16;
pub const IV_LENGTH: usize = 16;

/// Shared secret of the device firmware.
const DEVICE_KEY: [u8; KEY_LENGTH] = *b"Ez1mIchiJ0EnrGy!";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed envelope")]
    Envelope(#[from] serde_json::Error),

    #[error("invalid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("the IV must be 16 bytes long, got {0}")]
    IvLength(usize),

    #[error("invalid padding or corrupted ciphertext")]
    Padding,

    #[error("the plaintext is not UTF-8")]
    Utf8(#[from] FromUtf8Error),
}

/// AES-128-CBC with PKCS#7 padding and a fixed key.
///
/// Confidentiality only: there is no authentication tag, so tampering is detected
/// only when it breaks the padding or the text encoding.
#[derive(Copy, Clone)]
pub struct Cipher {
    key: [u8; KEY_LENGTH],
}

impl Default for Cipher {
    fn default() -> Self {
        Self::new(DEVICE_KEY)
    }
}

impl Cipher {
    pub const fn new(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Encrypt the text under a fresh random IV.
    #[must_use]
    pub fn encrypt(&self, plaintext: &str) -> (Vec<u8>, [u8; IV_LENGTH]) {
        let iv: [u8; IV_LENGTH] = rand::random();
        let ciphertext = Encryptor::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        (ciphertext, iv)
    }

    /// Decrypt and unpad the ciphertext.
    ///
    /// Only damage that breaks the padding or the UTF-8 encoding is detected, a flipped byte
    /// in an earlier block may decrypt to garbled text without an error.
    pub fn decrypt(&self, ciphertext: &[u8], iv: &[u8]) -> Result<String, DecodeError> {
        let iv: [u8; IV_LENGTH] = iv.try_into().map_err(|_| DecodeError::IvLength(iv.len()))?;
        let plaintext = Decryptor::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| DecodeError::Padding)?;
        Ok(String::from_utf8(plaintext)?)
    }

    pub fn seal(&self, plaintext: &str) -> Envelope {
        let (ciphertext, iv) = self.encrypt(plaintext);
        Envelope { ciphertext: STANDARD.encode(ciphertext), iv: STANDARD.encode(iv) }
    }

    pub fn open(&self, envelope: &Envelope) -> Result<String, DecodeError> {
        let ciphertext = STANDARD.decode(&envelope.ciphertext)?;
        let iv = STANDARD.decode(&envelope.iv)?;
        self.decrypt(&ciphertext, &iv)
    }
}

/// Request and response body of the device API.
#[must_use]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Base64-encoded ciphertext.
    #[serde(rename = "data")]
    pub ciphertext: String,

    /// Base64-encoded initialization vector.
    pub iv: String,
}
