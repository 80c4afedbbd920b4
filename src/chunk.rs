//! Recursive separator-priority text chunker.
//!
//! Splits extracted document text into overlapping, length-bounded chunks
//! suitable for embedding. Splitting tries each separator in [`SEPARATORS`]
//! in order — paragraph break, line break, sentence end, word boundary,
//! character boundary — and recurses with the remaining separators whenever
//! a piece still exceeds the target size. Neighboring chunks share a
//! configurable character overlap.
//!
//! Chunking is fully deterministic: the same input text always produces the
//! same chunk sequence. Lengths are measured in characters, and the
//! character-boundary fallback never splits inside a UTF-8 scalar.

use crate::config::ChunkingConfig;

/// Separator priority list, most semantically meaningful first.
/// The empty string means "split at character boundaries".
pub const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    min_chunk_chars: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, min_chunk_chars: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_chunk_chars,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(
            config.chunk_size,
            config.chunk_overlap,
            config.min_chunk_chars,
        )
    }

    /// Split `text` into chunks.
    ///
    /// Empty or whitespace-only input yields an empty vec — callers must
    /// treat that as "no content to index", not as an error here. Chunks
    /// whose trimmed length is at or below `min_chunk_chars` are dropped.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        self.split(text, &SEPARATORS)
            .into_iter()
            .filter(|c| char_len(c.trim()) > self.min_chunk_chars)
            .collect()
    }

    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // Pick the earliest separator that actually occurs in the text;
        // the final "" entry always matches.
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        if separator.is_empty() {
            return self.hard_split(text);
        }

        let parts: Vec<String> = text
            .split(separator)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let mut out = Vec::new();
        let mut fitting: Vec<String> = Vec::new();
        for part in parts {
            if char_len(&part) <= self.chunk_size {
                fitting.push(part);
            } else {
                // Flush what fit so far, then break the oversized piece
                // down with the lower-priority separators.
                if !fitting.is_empty() {
                    out.extend(self.merge(std::mem::take(&mut fitting), separator));
                }
                if remaining.is_empty() {
                    out.extend(self.hard_split(&part));
                } else {
                    out.extend(self.split(&part, remaining));
                }
            }
        }
        if !fitting.is_empty() {
            out.extend(self.merge(fitting, separator));
        }
        out
    }

    /// Greedily join `parts` (all individually within `chunk_size`) into
    /// chunks, carrying up to `chunk_overlap` characters of trailing parts
    /// into the next chunk.
    fn merge(&self, parts: Vec<String>, separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: Vec<String> = Vec::new();
        // Character length of the window including internal separators.
        let mut window_len = 0usize;

        for part in parts {
            let part_len = char_len(&part);
            let added = if window.is_empty() {
                part_len
            } else {
                part_len + sep_len
            };

            if window_len + added > self.chunk_size && !window.is_empty() {
                chunks.push(window.join(separator));
                // Shrink the window to the overlap budget, also making room
                // for the incoming part.
                while window_len > self.chunk_overlap
                    || (window_len + part_len + sep_len > self.chunk_size && window_len > 0)
                {
                    let removed = window.remove(0);
                    window_len -= char_len(&removed);
                    if window.is_empty() {
                        window_len = 0;
                        break;
                    }
                    window_len -= sep_len;
                }
            }

            window_len += if window.is_empty() {
                part_len
            } else {
                part_len + sep_len
            };
            window.push(part);
        }

        if !window.is_empty() {
            chunks.push(window.join(separator));
        }
        chunks
    }

    /// Character-boundary fallback: fixed-size windows stepped by
    /// `chunk_size - chunk_overlap`.
    fn hard_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut out = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            out.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        out
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
