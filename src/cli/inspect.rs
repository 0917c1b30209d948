use crate::carrier::{load_image, CarrierCodec, LsbCodec};
use crate::config::{BLOCK_SIZE, MIN_SEALED_LEN};
use crate::error::Result;
use crate::pipeline::{chunk_sizes, find_gaps, Chunk, MAX_LISTED_MISSING};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

enum Finding {
    Chunk { index: usize, bytes: usize },
    Empty,
    Malformed(String),
    Unreadable(String),
}

fn examine(path: &Path) -> Finding {
    let image = match load_image(path) {
        Ok(image) => image,
        Err(e) => return Finding::Unreadable(e.to_string()),
    };
    match LsbCodec.reveal(&image) {
        Ok(Some(text)) => match Chunk::from_transport(&text) {
            Ok(chunk) => Finding::Chunk {
                index: chunk.index,
                bytes: chunk.payload.len(),
            },
            Err(e) => Finding::Malformed(e.to_string()),
        },
        Ok(None) => Finding::Empty,
        Err(e) => Finding::Unreadable(e.to_string()),
    }
}

/// Describe what each carrier holds and whether together they form a
/// complete set. Needs no key.
pub fn inspect_carriers(paths: &[PathBuf]) -> Result<String> {
    let mut output = String::new();
    let mut by_index: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

    let _ = writeln!(output, "Trizip Carrier Inspection");
    let _ = writeln!(output, "=========================\n");

    for path in paths {
        match examine(path) {
            Finding::Chunk { index, bytes } => {
                let _ = writeln!(
                    output,
                    "{}: chunk {} ({})",
                    path.display(),
                    index,
                    format_size(bytes as u64)
                );
                by_index.entry(index).or_default().push(bytes);
            }
            Finding::Empty => {
                let _ = writeln!(output, "{}: no hidden payload", path.display());
            }
            Finding::Malformed(reason) => {
                let _ = writeln!(output, "{}: malformed ({})", path.display(), reason);
            }
            Finding::Unreadable(reason) => {
                let _ = writeln!(output, "{}: unreadable ({})", path.display(), reason);
            }
        }
    }

    let readable: usize = by_index.values().map(Vec::len).sum();
    let total: usize = by_index.values().filter_map(|sizes| sizes.first()).sum();
    let _ = writeln!(output);
    let _ = writeln!(output, "Summary:");
    let _ = writeln!(output, "  Carriers examined: {}", paths.len());
    let _ = writeln!(output, "  Chunks found: {}", readable);
    let _ = writeln!(output, "  Sealed size: {}", format_size(total as u64));

    let _ = writeln!(output, "  Set: {}", describe_set(&by_index, total));
    Ok(output)
}

fn describe_set(by_index: &BTreeMap<usize, Vec<usize>>, total: usize) -> String {
    let Some((&highest, _)) = by_index.last_key_value() else {
        return "empty".to_string();
    };

    let duplicates: Vec<usize> = by_index
        .iter()
        .filter(|(_, sizes)| sizes.len() > 1)
        .map(|(index, _)| *index)
        .collect();
    if !duplicates.is_empty() {
        return format!("duplicate indices {:?}", duplicates);
    }

    let Some(count) = highest.checked_add(1) else {
        return format!("index {} is out of range", highest);
    };
    let (gaps, gap_count) = find_gaps(by_index.keys().copied(), count, MAX_LISTED_MISSING);
    if gap_count > gaps.len() {
        return format!(
            "incomplete, missing indices {:?} and {} more",
            gaps,
            gap_count - gaps.len()
        );
    }
    if !gaps.is_empty() {
        return format!("incomplete, missing indices {:?}", gaps);
    }

    let sizes: Vec<usize> = by_index.values().map(|sizes| sizes[0]).collect();
    if sizes != chunk_sizes(total, count) {
        return format!("indices 0..{} present but chunk sizes are inconsistent", count);
    }
    if total < MIN_SEALED_LEN || total % BLOCK_SIZE != 0 {
        return format!(
            "indices 0..{} present but {} bytes cannot be a sealed blob",
            count, total
        );
    }
    format!("complete ({} carriers)", count)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
