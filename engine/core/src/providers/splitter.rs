//! Recursive character text splitter (§4.4): tries a list of separators from
//! coarsest to finest, merging pieces back up to `chunk_size` with
//! `chunk_overlap` retained between adjacent chunks.

use crate::chunk::{sanitize_text, Chunk};
use crate::error::{Error, Result};

const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveCharacterTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterTextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    /// Splits `text` into pieces no longer than `chunk_size` characters where
    /// possible, preferring to break on the coarsest separator that actually
    /// occurs in the text.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }

    /// Splits every chunk's content, carrying its metadata onto each piece.
    pub fn split_chunks(&self, chunks: Vec<Chunk>) -> Vec<Chunk> {
        chunks
            .into_iter()
            .flat_map(|chunk| {
                let metadata = chunk.metadata.clone();
                self.split_text(&chunk.content)
                    .into_iter()
                    .map(move |piece| Chunk::new(piece).with_metadata(metadata.clone()))
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, rest) = Self::choose_separator(separators, text);
        let pieces = Self::split_on(text, &separator);

        let mut good_pieces: Vec<String> = Vec::new();
        let mut chunks: Vec<String> = Vec::new();

        for piece in pieces {
            if piece.chars().count() < self.chunk_size {
                good_pieces.push(piece);
                continue;
            }
            if !good_pieces.is_empty() {
                chunks.extend(self.merge_pieces(&good_pieces, &separator));
                good_pieces.clear();
            }
            if rest.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, &rest));
            }
        }
        if !good_pieces.is_empty() {
            chunks.extend(self.merge_pieces(&good_pieces, &separator));
        }
        chunks
    }

    fn choose_separator(separators: &[String], text: &str) -> (String, Vec<String>) {
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep.as_str()) {
                return (sep.clone(), separators[i + 1..].to_vec());
            }
        }
        (
            separators.last().cloned().unwrap_or_default(),
            Vec::new(),
        )
    }

    fn split_on(text: &str, separator: &str) -> Vec<String> {
        if separator.is_empty() {
            text.chars().map(|c| c.to_string()).collect()
        } else {
            text.split(separator).map(|s| s.to_string()).collect()
        }
    }

    /// Greedily packs `pieces` back together up to `chunk_size`, carrying the
    /// trailing `chunk_overlap` characters' worth of pieces into the next
    /// chunk.
    fn merge_pieces(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = separator.chars().count();
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut total = 0usize;

        for piece in pieces {
            let piece_len = piece.chars().count();
            let added_len = piece_len + if current.is_empty() { 0 } else { sep_len };

            if total + added_len > self.chunk_size && !current.is_empty() {
                chunks.push(current.join(separator));

                while total > self.chunk_overlap && current.len() > 1 {
                    let removed = current.remove(0);
                    total -= removed.chars().count() + sep_len;
                }
                if current.len() == 1 && total > self.chunk_overlap {
                    current.clear();
                    total = 0;
                }
            }

            total += piece.chars().count() + if current.is_empty() { 0 } else { sep_len };
            current.push(piece.clone());
        }

        if !current.is_empty() {
            chunks.push(current.join(separator));
        }

        chunks
            .into_iter()
            .map(|c| sanitize_text(&c))
            .filter(|c| !c.trim().is_empty())
            .collect()
    }
}

/// Validates a caller-supplied chunk size, falling back to `default` when
/// unset. `chunk_size <= 0` is a validation error (§8, invariant 10).
pub fn validate_chunk_size(chunk_size: Option<i64>, default: usize) -> Result<usize> {
    match chunk_size {
        None => Ok(default),
        Some(size) if size <= 0 => Err(Error::processing(400, "chunk_size needs to be >0")),
        Some(size) => Ok(size as usize),
    }
}

/// Validates a caller-supplied chunk overlap, falling back to `default` when
/// unset. `chunk_overlap < 0` is a validation error (§8, invariant 10).
pub fn validate_chunk_overlap(chunk_overlap: Option<i64>, default: usize) -> Result<usize> {
    match chunk_overlap {
        None => Ok(default),
        Some(overlap) if overlap < 0 => {
            Err(Error::processing(400, "chunk_overlap needs to be >=0"))
        }
        Some(overlap) => Ok(overlap as usize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_markdown_heading_as_first_chunk() {
        let splitter = RecursiveCharacterTextSplitter::new(1000, 200);
        let text = "# Birthdays\n\n## Dagobert Duck";
        let pieces = splitter.split_text(text);
        assert!(pieces[0].starts_with("# Birthdays"));
    }

    #[test]
    fn respects_small_chunk_size() {
        let splitter = RecursiveCharacterTextSplitter::new(10, 0);
        let text = "one two three four five six seven";
        let pieces = splitter.split_text(text);
        assert!(pieces.len() > 1);
        for p in &pieces {
            assert!(p.chars().count() <= 10 || !p.contains(' '));
        }
    }

    #[test]
    fn validate_chunk_size_rejects_non_positive() {
        assert!(validate_chunk_size(Some(0), 100).is_err());
        assert!(validate_chunk_size(Some(-1), 100).is_err());
        assert_eq!(validate_chunk_size(Some(50), 100).unwrap(), 50);
        assert_eq!(validate_chunk_size(None, 100).unwrap(), 100);
    }

    #[test]
    fn validate_chunk_overlap_rejects_negative() {
        assert!(validate_chunk_overlap(Some(-1), 0).is_err());
        assert_eq!(validate_chunk_overlap(Some(5), 0).unwrap(), 5);
        assert_eq!(validate_chunk_overlap(None, 20).unwrap(), 20);
    }
}
