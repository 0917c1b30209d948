use crate::config::Compression;
use crate::error::{Result, TrizipError};
use std::io::{Read, Write};
use zeroize::Zeroizing;

/// Compress data and prefix the algorithm tag.
/// Layout: [tag: 1][compressed data...]
pub fn compress(data: &[u8], algorithm: Compression) -> Result<Zeroizing<Vec<u8>>> {
    let body = match algorithm {
        Compression::Zstd => compress_zstd(data)?,
        Compression::Lz4 => lz4_flex::compress_prepend_size(data),
        Compression::Brotli => compress_brotli(data)?,
        Compression::None => data.to_vec(),
    };
    let body = Zeroizing::new(body);

    let mut out = Zeroizing::new(Vec::with_capacity(1 + body.len()));
    out.push(algorithm.tag());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decompress a tagged stream. The input came out of decryption, so any
/// failure here is reported as an integrity error.
pub fn decompress(data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let (&tag, body) = data
        .split_first()
        .ok_or_else(|| TrizipError::IntegrityError("empty compressed stream".into()))?;
    let algorithm = Compression::from_tag(tag).ok_or_else(|| {
        TrizipError::IntegrityError(format!("unknown compression tag 0x{:02x}", tag))
    })?;

    let out = match algorithm {
        Compression::Zstd => decompress_zstd(body)?,
        Compression::Lz4 => lz4_flex::decompress_size_prepended(body)
            .map_err(|e| TrizipError::IntegrityError(format!("lz4: {}", e)))?,
        Compression::Brotli => decompress_brotli(body)?,
        Compression::None => body.to_vec(),
    };
    Ok(Zeroizing::new(out))
}

fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, 3).map_err(|e| TrizipError::Collaborator {
        collaborator: "zstd",
        message: e.to_string(),
    })
}

fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data).map_err(|e| TrizipError::IntegrityError(format!("zstd: {}", e)))
}

fn compress_brotli(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut writer = brotli::CompressorWriter::new(&mut output, 4096, 9, 22);
    writer
        .write_all(data)
        .map_err(|e| TrizipError::Collaborator {
            collaborator: "brotli",
            message: e.to_string(),
        })?;
    drop(writer);
    Ok(output)
}

fn decompress_brotli(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut reader = brotli::Decompressor::new(data, 4096);
    reader
        .read_to_end(&mut output)
        .map_err(|e| TrizipError::IntegrityError(format!("brotli: {}", e)))?;
    Ok(output)
}
