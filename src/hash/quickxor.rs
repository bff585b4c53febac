//! QuickXorHash
//!
//! The 160-bit XOR/rotate digest the drive reports for every stored file. Each
//! input byte is XORed into a circular 160-bit register at a position that
//! advances by 11 bits per byte; the total input length is XORed into the last
//! eight bytes when the digest is finalised.

use base64::Engine;

const WIDTH_IN_BITS: usize = 160;
const SHIFT: usize = 11;
const CELLS: usize = (WIDTH_IN_BITS - 1) / 64 + 1;

/// Digest length in bytes
pub const DIGEST_LEN: usize = (WIDTH_IN_BITS - 1) / 8 + 1;

/// Streaming QuickXorHash state
#[derive(Debug, Clone, Default)]
pub struct QuickXorHasher {
    data: [u64; CELLS],
    shift_so_far: usize,
    length_so_far: u64,
}

impl QuickXorHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes; splitting input across calls does not change the digest
    pub fn update(&mut self, bytes: &[u8]) {
        let mut cell = self.shift_so_far / 64;
        let mut offset = self.shift_so_far % 64;

        for i in 0..bytes.len().min(WIDTH_IN_BITS) {
            let is_last_cell = cell == CELLS - 1;
            let bits_in_cell = if is_last_cell { WIDTH_IN_BITS % 64 } else { 64 };

            // Bytes 160 apart land on the same register position.
            let folded = bytes[i..]
                .iter()
                .step_by(WIDTH_IN_BITS)
                .fold(0u8, |acc, b| acc ^ b);

            if offset <= bits_in_cell - 8 {
                self.data[cell] ^= u64::from(folded) << offset;
            } else {
                let next = if is_last_cell { 0 } else { cell + 1 };
                let low = bits_in_cell - offset;
                self.data[cell] ^= u64::from(folded) << offset;
                self.data[next] ^= u64::from(folded) >> low;
            }

            offset += SHIFT;
            while offset >= bits_in_cell {
                cell = if is_last_cell { 0 } else { cell + 1 };
                offset -= bits_in_cell;
            }
        }

        self.shift_so_far =
            (self.shift_so_far + SHIFT * (bytes.len() % WIDTH_IN_BITS)) % WIDTH_IN_BITS;
        self.length_so_far += bytes.len() as u64;
    }

    /// Raw 20-byte digest
    pub fn finalize(&self) -> [u8; DIGEST_LEN] {
        let mut out = [0u8; DIGEST_LEN];

        for (i, cell) in self.data.iter().enumerate() {
            let start = i * 8;
            let end = (start + 8).min(DIGEST_LEN);
            out[start..end].copy_from_slice(&cell.to_le_bytes()[..end - start]);
        }

        let length = self.length_so_far.to_le_bytes();
        let base = WIDTH_IN_BITS / 8 - length.len();
        for (i, b) in length.iter().enumerate() {
            out[base + i] ^= b;
        }

        out
    }

    /// Digest encoded the way the drive reports it
    pub fn finalize_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.finalize())
    }
}

/// QuickXorHash of an in-memory buffer, base64 encoded
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = QuickXorHasher::new();
    hasher.update(data);
    hasher.finalize_base64()
}
