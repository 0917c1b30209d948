use crate::error::{Result, TrizipError};
use std::collections::HashSet;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Archive magic
pub const ARCHIVE_MAGIC: &[u8; 4] = b"TZA1";

/// A single file in the archive, stored under its base name
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Entry names are bare file names; nothing that could escape the output
/// directory is accepted.
pub fn validate_entry_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("empty entry name".into());
    }
    if name == "." || name == ".." {
        return Err(format!("reserved entry name {:?}", name));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(format!("entry name {:?} is not a bare file name", name));
    }
    if name.len() > u16::MAX as usize {
        return Err("entry name too long".into());
    }
    Ok(())
}

/// Pack entries into one stream.
/// Layout: [magic: 4][count: 4 LE] then per entry
/// [name_len: 2 LE][name][data_len: 8 LE][data]
pub fn pack(entries: &[ArchiveEntry]) -> Result<Zeroizing<Vec<u8>>> {
    let mut seen = HashSet::new();
    for entry in entries {
        validate_entry_name(&entry.name).map_err(TrizipError::InvalidInput)?;
        if !seen.insert(entry.name.as_str()) {
            return Err(TrizipError::InvalidInput(format!(
                "duplicate file name {:?}",
                entry.name
            )));
        }
    }
    let count = u32::try_from(entries.len())
        .map_err(|_| TrizipError::InvalidInput("too many files".into()))?;

    let total: usize = entries
        .iter()
        .map(|e| 2 + e.name.len() + 8 + e.data.len())
        .sum();
    let mut out = Zeroizing::new(Vec::with_capacity(8 + total));
    out.extend_from_slice(ARCHIVE_MAGIC);
    out.extend_from_slice(&count.to_le_bytes());
    for entry in entries {
        out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(&(entry.data.len() as u64).to_le_bytes());
        out.extend_from_slice(&entry.data);
    }
    Ok(out)
}

/// Unpack a stream produced by [`pack`]. The input came out of decryption,
/// so every structural problem is an integrity error.
pub fn unpack(stream: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let mut reader = Reader { data: stream, pos: 0 };

    if reader.take(4)? != ARCHIVE_MAGIC {
        return Err(corrupt("bad archive magic"));
    }
    let count = u32::from_le_bytes(reader.array()?) as usize;

    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    for _ in 0..count {
        let name_len = u16::from_le_bytes(reader.array()?) as usize;
        let name = std::str::from_utf8(reader.take(name_len)?)
            .map_err(|_| corrupt("entry name is not UTF-8"))?
            .to_string();
        validate_entry_name(&name).map_err(|e| corrupt(&e))?;
        if !seen.insert(name.clone()) {
            return Err(corrupt(&format!("duplicate entry {:?}", name)));
        }

        let data_len = u64::from_le_bytes(reader.array()?);
        let data_len =
            usize::try_from(data_len).map_err(|_| corrupt("entry length overflows"))?;
        let data = reader.take(data_len)?.to_vec();
        entries.push(ArchiveEntry { name, data });
    }

    if reader.pos != stream.len() {
        return Err(corrupt("trailing bytes after last entry"));
    }
    Ok(entries)
}

fn corrupt(msg: &str) -> TrizipError {
    TrizipError::IntegrityError(format!("archive: {}", msg))
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| corrupt("truncated stream"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }
}
