use crate::error::{Result, TrizipError};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Separator between the index and the hex payload in a transport string
pub const TRANSPORT_SEPARATOR: char = ':';

/// A contiguous slice of a sealed blob with its position in the split
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Chunk {
    pub index: usize,
    pub payload: Vec<u8>,
}

impl Chunk {
    pub fn new(index: usize, payload: Vec<u8>) -> Self {
        Self { index, payload }
    }

    /// Serialize as `<decimal index>:<lowercase hex payload>`
    pub fn to_transport(&self) -> String {
        let mut out = self.index.to_string();
        out.push(TRANSPORT_SEPARATOR);
        out.push_str(&hex::encode(&self.payload));
        out
    }

    /// Parse a transport string. Only the first separator counts.
    pub fn from_transport(text: &str) -> Result<Self> {
        let (index_part, hex_part) = text.split_once(TRANSPORT_SEPARATOR).ok_or_else(|| {
            TrizipError::MalformedChunk("missing ':' between index and payload".into())
        })?;

        if index_part.is_empty() || !index_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TrizipError::MalformedChunk(format!(
                "index {:?} is not a non-negative integer",
                truncate_for_display(index_part)
            )));
        }
        let index = index_part.parse::<usize>().map_err(|_| {
            TrizipError::MalformedChunk(format!(
                "index {:?} is out of range",
                truncate_for_display(index_part)
            ))
        })?;

        let payload = hex::decode(hex_part)
            .map_err(|e| TrizipError::MalformedChunk(format!("payload: {}", e)))?;

        Ok(Self { index, payload })
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("index", &self.index)
            .field("len", &self.payload.len())
            .finish()
    }
}

fn truncate_for_display(s: &str) -> &str {
    match s.char_indices().nth(32) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
