use crate::config::HashAlgorithm;
use crate::error::Result;
use digest::Digest;
use sha2::Sha256;
use sha3::Sha3_256;
use std::path::Path;

/// Hex digest of `data`
pub fn fingerprint(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => digest_hex::<Sha256>(data),
        HashAlgorithm::Sha3 => digest_hex::<Sha3_256>(data),
        HashAlgorithm::Blake3 => blake3::hash(data).to_hex().to_string(),
    }
}

/// Hex digest of a file's contents
pub fn fingerprint_file(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let data = std::fs::read(path)?;
    Ok(fingerprint(&data, algorithm))
}

fn digest_hex<D: Digest>(data: &[u8]) -> String {
    hex::encode(D::digest(data))
}
