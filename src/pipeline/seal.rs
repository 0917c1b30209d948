//! Sealing stage: Camellia-256-CBC with explicit block padding.
//!
//! Output layout: `[iv: 16][ciphertext: k * 16]`.
//!
//! There is no authentication tag. A wrong key, a wrong IV or a tampered
//! ciphertext is only caught when the padding check fails; otherwise it
//! decrypts to garbage that the later stages may or may not reject.

use crate::config::{BLOCK_SIZE, IV_LEN, KEY_LEN, MIN_SEALED_LEN};
use crate::error::{Result, TrizipError};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

type CamelliaCbcEnc = cbc::Encryptor<camellia::Camellia256>;
type CamelliaCbcDec = cbc::Decryptor<camellia::Camellia256>;

/// Byte used to right-pad short keys
const KEY_PAD_BYTE: u8 = b' ';

/// IV-prefixed ciphertext
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SealedBlob(Vec<u8>);

impl SealedBlob {
    /// Wrap raw bytes, checking the structural invariants:
    /// at least IV plus one block, ciphertext block aligned.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < MIN_SEALED_LEN {
            return Err(TrizipError::IntegrityError(format!(
                "sealed blob is {} bytes, need at least {}",
                bytes.len(),
                MIN_SEALED_LEN
            )));
        }
        if (bytes.len() - IV_LEN) % BLOCK_SIZE != 0 {
            return Err(TrizipError::IntegrityError(format!(
                "ciphertext length {} is not a multiple of {}",
                bytes.len() - IV_LEN,
                BLOCK_SIZE
            )));
        }
        Ok(Self(bytes))
    }

    pub fn iv(&self) -> &[u8] {
        &self.0[..IV_LEN]
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.0[IV_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SealedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedBlob").field("len", &self.0.len()).finish()
    }
}

/// Bring an arbitrary caller key to exactly 32 bytes: truncate long keys,
/// right-pad short ones with ASCII spaces.
///
/// This is not a key derivation function. It is kept for compatibility with
/// existing carrier sets and is the one place to swap in a KDF.
pub fn normalize_key(key: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut out = Zeroizing::new([KEY_PAD_BYTE; KEY_LEN]);
    let n = key.len().min(KEY_LEN);
    out[..n].copy_from_slice(&key[..n]);
    out
}

/// Append `p` bytes of value `p`, `p` in 1..=16. A full block is added when
/// the input is already aligned.
pub fn pad(data: &[u8]) -> Zeroizing<Vec<u8>> {
    let p = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut out = Zeroizing::new(Vec::with_capacity(data.len() + p));
    out.extend_from_slice(data);
    out.resize(data.len() + p, p as u8);
    out
}

/// Strip padding, validating the length byte and every padding byte
pub fn unpad(data: &[u8]) -> Result<&[u8]> {
    let &p = data
        .last()
        .ok_or_else(|| TrizipError::IntegrityError("nothing to unpad".into()))?;
    let p = p as usize;
    if p == 0 || p > BLOCK_SIZE || p > data.len() {
        return Err(TrizipError::IntegrityError(format!(
            "padding length {} outside 1..={}",
            p, BLOCK_SIZE
        )));
    }
    let (body, padding) = data.split_at(data.len() - p);
    if padding.iter().any(|&b| b as usize != p) {
        return Err(TrizipError::IntegrityError("inconsistent padding bytes".into()));
    }
    Ok(body)
}

/// Encrypt with a fresh random IV
pub fn seal(plaintext: &[u8], key: &[u8]) -> Result<SealedBlob> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    seal_with_iv(plaintext, key, &iv)
}

/// Encrypt with a caller-chosen IV. Only for reproducible tests and
/// vectors; real runs go through [`seal`].
pub fn seal_with_iv(plaintext: &[u8], key: &[u8], iv: &[u8; IV_LEN]) -> Result<SealedBlob> {
    let key = normalize_key(key);
    let padded = pad(plaintext);

    let cipher = CamelliaCbcEnc::new_from_slices(&key[..], iv).map_err(|e| {
        TrizipError::Collaborator {
            collaborator: "camellia-cbc",
            message: e.to_string(),
        }
    })?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<NoPadding>(&padded);

    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    SealedBlob::from_bytes(out)
}

/// Decrypt a sealed blob and strip its padding
pub fn unseal(blob: &SealedBlob, key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let key = normalize_key(key);

    let cipher = CamelliaCbcDec::new_from_slices(&key[..], blob.iv()).map_err(|e| {
        TrizipError::Collaborator {
            collaborator: "camellia-cbc",
            message: e.to_string(),
        }
    })?;
    let decrypted = Zeroizing::new(
        cipher
            .decrypt_padded_vec_mut::<NoPadding>(blob.ciphertext())
            .map_err(|_| TrizipError::IntegrityError("ciphertext is not block aligned".into()))?,
    );

    let body = unpad(&decrypted)?;
    Ok(Zeroizing::new(body.to_vec()))
}
