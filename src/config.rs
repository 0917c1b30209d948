use crate::error::{Result, TrizipError};
use serde::{Deserialize, Serialize};

/// Cipher block size in bytes (Camellia, 128-bit blocks)
pub const BLOCK_SIZE: usize = 16;

/// Initialization vector length; one cipher block
pub const IV_LEN: usize = BLOCK_SIZE;

/// Normalized key length (Camellia-256)
pub const KEY_LEN: usize = 32;

/// Smallest valid sealed blob: IV plus one padded block
pub const MIN_SEALED_LEN: usize = IV_LEN + BLOCK_SIZE;

/// Compression algorithm options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Zstd,
    Lz4,
    Brotli,
    None,
}

impl Compression {
    /// One-byte tag written in front of the compressed stream
    pub fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Zstd => 1,
            Self::Lz4 => 2,
            Self::Brotli => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            1 => Some(Self::Zstd),
            2 => Some(Self::Lz4),
            3 => Some(Self::Brotli),
            _ => None,
        }
    }
}

impl std::str::FromStr for Compression {
    type Err = TrizipError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "zstd" => Ok(Self::Zstd),
            "lz4" => Ok(Self::Lz4),
            "brotli" => Ok(Self::Brotli),
            "none" => Ok(Self::None),
            _ => Err(TrizipError::UnsupportedAlgorithm(format!(
                "compression: {}",
                s
            ))),
        }
    }
}

/// Hash algorithm used for file fingerprints in reports and comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha3,
    Blake3,
}

impl std::str::FromStr for HashAlgorithm {
    type Err = TrizipError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha3" => Ok(Self::Sha3),
            "blake3" => Ok(Self::Blake3),
            _ => Err(TrizipError::UnsupportedAlgorithm(format!("hash: {}", s))),
        }
    }
}

/// Options shared by both directions of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub compression: Compression,
    /// Embed and reveal carriers on one scoped thread each
    pub parallel: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            parallel: true,
        }
    }
}
