//! Sliding-window token chunker.
//!
//! Splits source text into overlapping windows of `max_tokens` tokens over
//! the `cl100k_base` vocabulary. Consecutive chunks share exactly
//! `overlap_tokens` tokens, so dropping each chunk's leading overlap and
//! concatenating reconstructs the original token sequence.
//!
//! Each chunk receives a UUID and a SHA-256 hash of its text.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tiktoken_rs::CoreBPE;
use uuid::Uuid;

use crate::models::Chunk;

/// Token-window chunker bound to one (max, overlap) configuration.
pub struct Chunker {
    bpe: CoreBPE,
    max_tokens: usize,
    overlap_tokens: usize,
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("max_tokens", &self.max_tokens)
            .field("overlap_tokens", &self.overlap_tokens)
            .finish_non_exhaustive()
    }
}

impl Chunker {
    /// Build a chunker. `overlap_tokens >= max_tokens` is a configuration
    /// error; `max_tokens` must be positive.
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Result<Self> {
        if max_tokens == 0 {
            bail!("max_tokens must be > 0");
        }
        if overlap_tokens >= max_tokens {
            bail!(
                "overlap_tokens ({}) must be strictly less than max_tokens ({})",
                overlap_tokens,
                max_tokens
            );
        }
        let bpe = tiktoken_rs::cl100k_base().context("failed to load cl100k_base encoding")?;
        Ok(Self {
            bpe,
            max_tokens,
            overlap_tokens,
        })
    }

    /// Count tokens in a text. Used by the prompt budget in the answer path.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Split `text` into chunks for `source_id`, with contiguous indices
    /// starting at 0. Empty input yields an empty vector.
    pub fn split(&self, source_id: &str, text: &str) -> Result<Vec<Chunk>> {
        let tokens = self.bpe.encode_ordinary(text);
        let mut chunks = Vec::new();

        for (index, (start, end)) in
            window_bounds(tokens.len(), self.max_tokens, self.overlap_tokens)
                .into_iter()
                .enumerate()
        {
            let window = tokens[start..end].to_vec();
            let token_count = window.len() as i64;
            let chunk_text = self
                .bpe
                .decode(window)
                .map_err(|e| anyhow::anyhow!("failed to decode token window: {}", e))?;
            chunks.push(make_chunk(source_id, index as i64, chunk_text, token_count));
        }

        Ok(chunks)
    }
}

/// Compute `(start, end)` token ranges for the sliding window.
///
/// Windows advance by `max - overlap`; the final window may be shorter
/// but is never empty. A window that would only repeat the previous
/// window's overlap tail is not emitted.
fn window_bounds(total: usize, max: usize, overlap: usize) -> Vec<(usize, usize)> {
    let step = max - overlap;
    let mut bounds = Vec::new();
    let mut start = 0;

    while start < total {
        let end = (start + max).min(total);
        bounds.push((start, end));
        if end == total {
            break;
        }
        start += step;
    }

    bounds
}

fn make_chunk(source_id: &str, index: i64, text: String, token_count: i64) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        source_id: source_id.to_string(),
        chunk_index: index,
        text,
        token_count,
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = Chunker::new(1000, 150).unwrap();
        let chunks = chunker.split("src1", "").unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn overlap_equal_to_max_is_rejected() {
        let err = Chunker::new(100, 100).unwrap_err();
        assert!(err.to_string().contains("overlap_tokens"));
        assert!(Chunker::new(100, 150).is_err());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = Chunker::new(1000, 150).unwrap();
        let chunks = chunker.split("src1", "Hello, world!").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn window_sizes_for_2500_tokens() {
        // max=1000, overlap=150 => step 850: [0,1000), [850,1850), [1700,2500)
        let bounds = window_bounds(2500, 1000, 150);
        assert_eq!(bounds, vec![(0, 1000), (850, 1850), (1700, 2500)]);
        let sizes: Vec<usize> = bounds.iter().map(|(s, e)| e - s).collect();
        assert_eq!(sizes, vec![1000, 1000, 800]);
        // Consecutive windows share exactly 150 positions.
        for pair in bounds.windows(2) {
            assert_eq!(pair[0].1 - pair[1].0, 150);
        }
    }

    #[test]
    fn windows_reconstruct_the_token_sequence() {
        for (total, max, overlap) in [(2500, 1000, 150), (7, 3, 1), (10, 10, 0), (1, 5, 2)] {
            let bounds = window_bounds(total, max, overlap);
            let mut rebuilt: Vec<usize> = Vec::new();
            for (i, (start, end)) in bounds.iter().enumerate() {
                let skip = if i == 0 { 0 } else { overlap };
                rebuilt.extend(*start + skip..*end);
            }
            assert_eq!(rebuilt, (0..total).collect::<Vec<_>>(), "case {total}/{max}/{overlap}");
        }
    }

    #[test]
    fn no_trailing_window_of_pure_overlap() {
        // total exactly at a window boundary: the loop must stop, not
        // emit a final window that is all overlap.
        let bounds = window_bounds(1000, 1000, 150);
        assert_eq!(bounds, vec![(0, 1000)]);
    }

    #[test]
    fn chunk_indices_contiguous_and_counts_recorded() {
        let chunker = Chunker::new(12, 4).unwrap();
        let text = (0..60)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunker.split("src1", &text).unwrap();
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert!(c.token_count > 0 && c.token_count <= 12);
        }
        // All but the last window are full-size.
        for c in &chunks[..chunks.len() - 1] {
            assert_eq!(c.token_count, 12);
        }
    }

    #[test]
    fn split_is_deterministic_in_text_and_hash() {
        let chunker = Chunker::new(8, 2).unwrap();
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let a = chunker.split("src1", text).unwrap();
        let b = chunker.split("src1", text).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.text, y.text);
            assert_eq!(x.hash, y.hash);
            assert_eq!(x.chunk_index, y.chunk_index);
        }
    }
}
