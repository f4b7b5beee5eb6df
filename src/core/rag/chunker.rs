// =============================================================================
// TEXT CHUNKER - Overlapping windows over extracted document text
// =============================================================================
//
// Two policies:
// - Standard: recursive character splitting (prefer paragraph breaks, then
//   line breaks, then sentence/word boundaries) into ~1500-char windows with
//   ~150 chars of overlap.
// - Catalog: larger windows (2500/300) PLUS a second pass that treats lines
//   starting with `Title:`/`Resource:`/`Program:`/`Service:` as entry
//   boundaries, so a catalog row rarely gets cut in half. Both outputs are
//   concatenated; the duplication trades precision for recall.
//
// Sizes are measured in characters, not bytes, so multi-byte text never
// splits mid-codepoint.

use once_cell::sync::Lazy;
use regex::Regex;

/// Separator preference for the recursive splitter, most-structural first.
/// The empty string is the terminal hard-split-by-character fallback.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", ", ", " ", ""];

/// Lines that look like the start of a new catalog record.
static ENTRY_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(Title|Resource|Program|Service):").expect("entry boundary regex")
});

/// Window sizes for both chunking policies.
///
/// These are tuning choices inherited from the original deployment, not
/// derived constants; keep them configurable.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub catalog_chunk_size: usize,
    pub catalog_chunk_overlap: usize,
    /// Catalog entries shorter than this are dropped by the boundary pass.
    pub min_catalog_entry_len: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 150,
            catalog_chunk_size: 2500,
            catalog_chunk_overlap: 300,
            min_catalog_entry_len: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPolicy {
    Standard,
    Catalog,
}

/// Splits text into chunks according to the given policy.
pub fn split_text(text: &str, policy: ChunkPolicy, config: &ChunkingConfig) -> Vec<String> {
    match policy {
        ChunkPolicy::Standard => {
            recursive_split(text, config.chunk_size, config.chunk_overlap)
        }
        ChunkPolicy::Catalog => {
            let mut chunks = recursive_split(
                text,
                config.catalog_chunk_size,
                config.catalog_chunk_overlap,
            );
            chunks.extend(catalog_entries(text, config.min_catalog_entry_len));
            chunks
        }
    }
}

/// Splits `text` at entry-boundary lines, keeping each record whole.
///
/// Entries at or below `min_len` characters are dropped: they are almost
/// always headers or column labels rather than real records.
fn catalog_entries(text: &str, min_len: usize) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if ENTRY_BOUNDARY.is_match(line) && current.trim().chars().count() > min_len {
            entries.push(current.trim().to_string());
            current = line.to_string();
        } else {
            current.push('\n');
            current.push_str(line);
        }
    }

    if current.trim().chars().count() > min_len {
        entries.push(current.trim().to_string());
    }

    entries
}

/// Recursive character splitting: break the text into pieces no longer than
/// `chunk_size` using the separator preference order, then merge adjacent
/// pieces into overlapping windows.
fn recursive_split(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let pieces = split_into_pieces(text, SEPARATORS, chunk_size);
    merge_pieces(&pieces, chunk_size, overlap)
}

fn split_into_pieces(text: &str, separators: &[&str], chunk_size: usize) -> Vec<String> {
    if text.chars().count() <= chunk_size {
        if text.is_empty() {
            return Vec::new();
        }
        return vec![text.to_string()];
    }

    let (sep, rest) = match separators.split_first() {
        Some(pair) => pair,
        None => return hard_split(text, chunk_size),
    };

    if sep.is_empty() {
        return hard_split(text, chunk_size);
    }
    if !text.contains(sep) {
        return split_into_pieces(text, rest, chunk_size);
    }

    let mut pieces = Vec::new();
    for part in text.split_inclusive(sep) {
        if part.chars().count() <= chunk_size {
            pieces.push(part.to_string());
        } else {
            pieces.extend(split_into_pieces(part, rest, chunk_size));
        }
    }
    pieces
}

/// Hard split by character count; the fallback when no separator helps.
fn hard_split(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// Greedily packs pieces into windows of at most `chunk_size` characters,
/// backing up by roughly `overlap` characters between windows.
fn merge_pieces(pieces: &[String], chunk_size: usize, overlap: usize) -> Vec<String> {
    let lens: Vec<usize> = pieces.iter().map(|p| p.chars().count()).collect();
    let mut chunks = Vec::new();

    let mut i = 0;
    while i < pieces.len() {
        let mut len = 0;
        let mut j = i;
        while j < pieces.len() && len + lens[j] <= chunk_size {
            len += lens[j];
            j += 1;
        }
        // Guarantee progress even if a single piece somehow exceeds the
        // window (cannot happen after split_into_pieces, but stay safe).
        if j == i {
            j = i + 1;
        }

        let chunk: String = pieces[i..j].concat();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if j >= pieces.len() {
            break;
        }

        // Back up over trailing pieces to form the overlap with the next
        // window; never back up past the start of the chunk just emitted.
        let mut back = j;
        let mut overlap_len = 0;
        while back > i + 1 && overlap_len + lens[back - 1] <= overlap {
            back -= 1;
            overlap_len += lens[back];
        }
        i = if back > i { back } else { j };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 40,
            chunk_overlap: 10,
            catalog_chunk_size: 80,
            catalog_chunk_overlap: 15,
            min_catalog_entry_len: 20,
        }
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = split_text("hello world", ChunkPolicy::Standard, &small_config());
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_standard_chunks_respect_size() {
        let text = "one two three four five six seven eight nine ten. \
                    eleven twelve thirteen fourteen fifteen sixteen.";
        let config = small_config();
        let chunks = split_text(text, ChunkPolicy::Standard, &config);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= config.chunk_size, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = "first paragraph sits here\n\nsecond paragraph sits here";
        let config = ChunkingConfig {
            chunk_size: 30,
            chunk_overlap: 0,
            ..small_config()
        };
        let chunks = split_text(text, ChunkPolicy::Standard, &config);
        assert!(chunks[0].contains("first paragraph"));
        assert!(!chunks[0].contains("second paragraph"));
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = "aaaa bbbb cccc dddd eeee ffff gggg hhhh iiii jjjj kkkk llll";
        let config = ChunkingConfig {
            chunk_size: 20,
            chunk_overlap: 8,
            ..small_config()
        };
        let chunks = split_text(text, ChunkPolicy::Standard, &config);
        assert!(chunks.len() >= 2);
        // The tail of chunk N reappears at the head of chunk N+1.
        let tail: String = chunks[0].chars().rev().take(4).collect::<Vec<_>>()
            .into_iter().rev().collect();
        assert!(chunks[1].contains(tail.trim()), "no overlap between {:?} and {:?}", chunks[0], chunks[1]);
    }

    #[test]
    fn test_hard_split_handles_unbroken_text() {
        let text = "x".repeat(100);
        let chunks = split_text(&text, ChunkPolicy::Standard, &small_config());
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 100);
    }

    #[test]
    fn test_catalog_boundary_pass_emits_entries() {
        let text = "Title: Internet Basics Course\nA long description of the course offering goes right here.\n\
                    Title: Device Lending Program\nAnother long description of this lending program goes here.";
        let chunks = split_text(text, ChunkPolicy::Catalog, &small_config());
        // Both whole-window chunks and per-entry chunks are present.
        assert!(chunks.iter().any(|c| c.starts_with("Title: Internet Basics Course")));
        assert!(chunks.iter().any(|c| c.starts_with("Title: Device Lending Program")));
    }

    #[test]
    fn test_catalog_drops_short_entries() {
        let text = "Title: A\nshort\nTitle: B\nalso short";
        let entries = catalog_entries(text, 100);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_catalog_boundary_is_case_insensitive() {
        let text = format!(
            "PROGRAM: Uppercase heading\n{}\nprogram: lowercase heading\n{}",
            "filler text ".repeat(10),
            "more filler text ".repeat(10)
        );
        let entries = catalog_entries(&text, 20);
        assert_eq!(entries.len(), 2);
    }
}
