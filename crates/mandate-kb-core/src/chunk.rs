//! Paragraph-boundary text chunker.
//!
//! Connectors that read whole documents (the filesystem connector, for
//! one) use [`chunk_text`] to cut them into retrievable pieces before they
//! reach the store. Splitting happens on blank lines so each chunk stays a
//! coherent run of paragraphs.
//!
//! # Algorithm
//!
//! 1. Convert `max_tokens` to `max_chars` using a 4 chars/token ratio.
//! 2. Split text on `\n\n` paragraph boundaries, dropping blank paragraphs.
//! 3. Accumulate paragraphs until the next one would exceed `max_chars`,
//!    then flush.
//! 4. A single paragraph longer than `max_chars` is hard-split at the last
//!    newline or space before the limit.
//!
//! Unlike a document indexer, blank input yields no chunks at all: an empty
//! chunk can never answer a question.
//!
//! # Example
//!
//! ```rust
//! use mandate_kb_core::chunk::chunk_text;
//!
//! let pieces = chunk_text("Land restitution.\n\nLanguage rights.", 512);
//! assert_eq!(pieces.len(), 1);
//! ```

use crate::models::ChunkInput;

/// Approximate characters-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split text into pieces on paragraph boundaries, respecting `max_tokens`.
///
/// Returned pieces are trimmed and never empty.
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<String> {
    let max_chars = max_tokens.max(1) * CHARS_PER_TOKEN;
    let mut chunks = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let would_be = if buf.is_empty() {
            para.len()
        } else {
            buf.len() + 2 + para.len()
        };

        if would_be > max_chars && !buf.is_empty() {
            chunks.push(std::mem::take(&mut buf));
        }

        if para.len() > max_chars {
            hard_split(para, max_chars, &mut chunks);
            continue;
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(para);
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }

    chunks
}

/// Chunk a document and wrap each piece as a [`ChunkInput`].
///
/// Ids are derived from `id_prefix` and the piece index so re-reading an
/// unchanged document yields the same ids.
pub fn chunk_document(
    id_prefix: &str,
    text: &str,
    source: &str,
    date: Option<&str>,
    max_tokens: usize,
) -> Vec<ChunkInput> {
    chunk_text(text, max_tokens)
        .into_iter()
        .enumerate()
        .map(|(i, piece)| ChunkInput {
            id: Some(format!("{}#{}", id_prefix, i)),
            text: piece,
            source: source.to_string(),
            date: date.map(str::to_string),
        })
        .collect()
}

fn hard_split(para: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut remaining = para;
    while !remaining.is_empty() {
        let mut split_at = snap_to_char_boundary(remaining, max_chars);
        if split_at < remaining.len() {
            if let Some(pos) = remaining[..split_at]
                .rfind('\n')
                .or_else(|| remaining[..split_at].rfind(' '))
            {
                split_at = pos + 1;
            }
        }
        if split_at == 0 {
            // A single char wider than the limit; take it whole.
            split_at = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }
        let piece = remaining[..split_at].trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        remaining = &remaining[split_at..];
    }
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 512);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(chunk_text("", 512).is_empty());
        assert!(chunk_text("  \n\n \n\n", 512).is_empty());
    }

    #[test]
    fn test_paragraphs_merge_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_text(text, 512);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].starts_with("First paragraph."));
        assert!(chunks[0].ends_with("Third paragraph."));
    }

    #[test]
    fn test_paragraphs_split_over_limit() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = chunk_text(text, 6);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1], "This is paragraph two.");
    }

    #[test]
    fn test_long_paragraph_hard_split_on_spaces() {
        let text = "word ".repeat(100);
        let chunks = chunk_text(&text, 5);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.len() <= 20);
            assert!(!c.starts_with(' '));
        }
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘";
        let chunks = chunk_text(text, 3);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_chunk_document_ids_are_stable() {
        let text = "Alpha\n\nBeta\n\nGamma";
        let a = chunk_document("notes/a.md", text, "Notes", Some("2024-04-01"), 2);
        let b = chunk_document("notes/a.md", text, "Notes", Some("2024-04-01"), 2);
        assert_eq!(a, b);
        assert_eq!(a[0].id.as_deref(), Some("notes/a.md#0"));
        assert_eq!(a[0].source, "Notes");
        assert_eq!(a[0].date.as_deref(), Some("2024-04-01"));
    }
}
