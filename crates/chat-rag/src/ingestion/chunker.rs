//! Fixed-window text chunking with offset tracking

use unicode_segmentation::UnicodeSegmentation;

use crate::types::{Chunk, Document};

/// A window of text and where it starts in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow {
    /// Offset of the first character, counted in grapheme clusters
    pub offset: usize,
    /// Window text
    pub text: String,
}

/// Splits text into overlapping windows of `chunk_size` characters.
///
/// Consecutive windows start `chunk_size - overlap` characters apart and the
/// final window always ends at the end of the text. Characters are grapheme
/// clusters, so a window never splits a multi-byte character.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. `overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Number of windows `split` produces for a text of `len` characters
    pub fn expected_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.chunk_size {
            1
        } else {
            (len - self.overlap).div_ceil(self.stride())
        }
    }

    /// Split text into windows
    pub fn split(&self, text: &str) -> Vec<TextWindow> {
        let graphemes: Vec<(usize, &str)> = text.grapheme_indices(true).collect();
        let len = graphemes.len();
        let mut windows = Vec::with_capacity(self.expected_count(len));

        let mut start = 0usize;
        while start < len {
            let end = (start + self.chunk_size).min(len);
            let byte_start = graphemes[start].0;
            let byte_end = graphemes.get(end).map(|(i, _)| *i).unwrap_or(text.len());

            windows.push(TextWindow {
                offset: start,
                text: text[byte_start..byte_end].to_string(),
            });

            if end == len {
                break;
            }
            start += self.stride();
        }

        windows
    }

    /// Chunk a document's extracted text. Chunks carry no embedding yet.
    pub fn chunk_document(&self, doc: &Document, text: &str) -> Vec<Chunk> {
        let source = doc.source();
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(index, window)| {
                Chunk::new(doc.id, window.text, source.clone(), window.offset, index as u32)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_windows_for_2400_chars() {
        let paragraph = "x".repeat(799);
        let text = format!("{}\n{}\n{}\n", paragraph, paragraph, paragraph);
        assert_eq!(text.chars().count(), 2400);

        let chunker = TextChunker::new(1000, 200);
        let windows = chunker.split(&text);

        assert_eq!(windows.len(), 3);
        assert_eq!(
            windows.iter().map(|w| w.offset).collect::<Vec<_>>(),
            vec![0, 800, 1600]
        );
        assert_eq!(windows[0].text.len(), 1000);
        assert_eq!(windows[2].text.len(), 800);
    }

    #[test]
    fn test_count_matches_formula() {
        let chunker = TextChunker::new(1000, 200);
        for len in [1usize, 999, 1000, 1001, 1800, 1801, 2400, 5000, 12345] {
            let text = "a".repeat(len);
            let windows = chunker.split(&text);
            assert_eq!(windows.len(), chunker.expected_count(len), "len {}", len);
            assert_eq!(
                windows.last().map(|w| w.offset + w.text.len()),
                Some(len),
                "last window must reach the end for len {}",
                len
            );
        }
    }

    #[test]
    fn test_overlap_is_shared() {
        let text: String = ('a'..='z').cycle().take(50).collect();
        let windows = TextChunker::new(20, 5).split(&text);

        for pair in windows.windows(2) {
            let tail = &pair[0].text[pair[0].text.len() - 5..];
            assert!(pair[1].text.starts_with(tail));
        }
    }

    #[test]
    fn test_multibyte_text_is_not_split_mid_character() {
        let text = "é🙂".repeat(30);
        let windows = TextChunker::new(16, 4).split(&text);

        assert!(windows.len() > 1);
        for window in &windows {
            assert!(window.text.graphemes(true).count() <= 16);
        }
        assert_eq!(windows[1].offset, 12);
    }

    #[test]
    fn test_empty_text_has_no_windows() {
        assert!(TextChunker::new(100, 10).split("").is_empty());
    }
}
