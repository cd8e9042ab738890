use std::ops::Range;

use crate::config::DEFAULT_CHUNK_SIZE;

/// Policy deciding where new data is split into leaf blocks.
pub trait Chunker: Send + Sync {
    /// Split `data` into consecutive, non-empty ranges covering all of it.
    fn split(&self, data: &[u8]) -> Vec<Range<usize>>;
}

/// Splits data into blocks of a fixed size; the last block may be short.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedSizeChunker {
    size: usize,
}

impl FixedSizeChunker {
    /// A chunker producing blocks of `size` bytes. A zero size is treated as 1.
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, data: &[u8]) -> Vec<Range<usize>> {
        (0..data.len())
            .step_by(self.size)
            .map(|start| start..(start + self.size).min(data.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_chunks() {
        assert!(FixedSizeChunker::new(4).split(&[]).is_empty());
    }

    #[test]
    fn last_chunk_may_be_short() {
        let chunks = FixedSizeChunker::new(4).split(&[0u8; 10]);
        assert_eq!(chunks, vec![0..4, 4..8, 8..10]);
    }

    #[test]
    fn exact_multiple() {
        let chunks = FixedSizeChunker::new(5).split(&[0u8; 10]);
        assert_eq!(chunks, vec![0..5, 5..10]);
    }

    #[test]
    fn zero_size_is_clamped() {
        let chunker = FixedSizeChunker::new(0);
        assert_eq!(chunker.size(), 1);
        assert_eq!(chunker.split(b"ab").len(), 2);
    }
}
