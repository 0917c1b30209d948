//! Trizip - seal a file set and split it across steganographic carriers
//!
//! A set of files is archived, compressed and sealed with Camellia-256-CBC
//! under a passphrase. The sealed blob is cut into one chunk per cover image
//! and each chunk is hidden in the least significant bits of its cover.
//! Every carrier is needed to get anything back.
//!
//! ## Pipeline
//!
//! ```text
//! secure:  Files → Archive → Compress → Seal → Partition → Embed → Carriers
//! restore: Carriers → Extract → Reassemble → Unseal → Decompress → Unarchive → Files
//! ```
//!
//! - **Archive**: length-prefixed container of base names and contents
//! - **Compress**: zstd (default), lz4, brotli, or none, tagged in the stream
//! - **Seal**: Camellia-256-CBC, random IV, output is `IV ‖ ciphertext`
//! - **Partition**: `floor(len / n)` bytes per chunk, remainder on the last
//! - **Embed**: chunk travels as `"<index>:<hex>"` in the image LSBs
//!
//! Carriers may be restored in any order.
//!
//! ## Example
//!
//! ```no_run
//! use trizip::cli::{restore_files, secure_files, RestoreOptions, SecureOptions};
//! use std::path::PathBuf;
//!
//! let report = secure_files(
//!     &[PathBuf::from("secret.txt")],
//!     &[PathBuf::from("cat.png"), PathBuf::from("dog.png"), PathBuf::from("owl.png")],
//!     &SecureOptions {
//!         key: "my passphrase".into(),
//!         ..Default::default()
//!     },
//! ).unwrap();
//!
//! let carriers: Vec<PathBuf> = report.carriers.into_iter().map(|c| c.carrier).collect();
//! restore_files(
//!     &carriers,
//!     &RestoreOptions {
//!         key: "my passphrase".into(),
//!         ..Default::default()
//!     },
//! ).unwrap();
//! ```

pub mod carrier;
pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod run;

pub use carrier::{CarrierCodec, LsbCodec};
pub use config::{Compression, HashAlgorithm, PipelineOptions};
pub use error::{Result, TrizipError};
pub use orchestrator::{restore, secure, Carrier, EmbeddedCarrier};
pub use pipeline::{ArchiveEntry, Chunk, SealedBlob};
pub use run::{Operation, RunState, Stage};
