//! Byte range planning for resumable uploads

use std::fmt;

/// Inclusive byte range of a file of `total` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Last byte offset, inclusive
    pub end: u64,
    pub total: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64, total: u64) -> Self {
        Self { start, end, total }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]/{}", self.start, self.end, self.total)
    }
}

/// How a file of `total` bytes splits into chunks of `chunk_size`
///
/// There are `floor(total / chunk_size)` full chunks and one trailing chunk
/// holding the remainder. A trailing chunk with no bytes is never produced,
/// so a file that is an exact multiple of the chunk size ends on a full chunk
/// and an empty file produces no ranges at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    pub fn new(total: u64, chunk_size: u64) -> Self {
        Self {
            total,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of full chunks
    pub fn full_chunks(&self) -> u64 {
        self.total / self.chunk_size
    }

    pub fn remainder(&self) -> u64 {
        self.total - self.full_chunks() * self.chunk_size
    }

    /// Loop bound for the upload: every full chunk plus the trailing one
    pub fn iterations(&self) -> u64 {
        self.full_chunks() + 1
    }

    /// Range submitted on iteration `index`, or `None` once the file is exhausted
    pub fn range(&self, index: u64) -> Option<ByteRange> {
        let full = self.full_chunks();
        if index > full {
            return None;
        }

        let start = index * self.chunk_size;
        let end = if index == full {
            start + self.remainder()
        } else {
            start + self.chunk_size
        };

        if end == start {
            return None;
        }
        Some(ByteRange::new(start, end - 1, self.total))
    }

    pub fn ranges(&self) -> Vec<ByteRange> {
        (0..self.iterations()).filter_map(|i| self.range(i)).collect()
    }
}
