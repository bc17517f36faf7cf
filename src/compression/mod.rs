//! Block compression for cold nodes.
//!
//! The container treats compression as an optional optimisation: a
//! compressor may decline any input, and a declined node simply stays raw.
//! Every compressed payload records the CRC32 of the raw block so a bad
//! decompression is caught instead of handing out garbage entries.

use bytes::Bytes;

use crate::block::Block;
use crate::config::CompressionType;
use crate::error::{Error, Result};

/// Blocks smaller than this are never compressed.
pub const MIN_COMPRESS_BYTES: usize = 48;

/// A compressed payload must be at least this many bytes smaller than the raw
/// block, otherwise the attempt counts as declined.
pub const MIN_COMPRESS_IMPROVE: usize = 8;

/// A whole-block byte compressor.
pub trait BlockCompressor {
    /// Compress `raw`. Returns `None` to decline.
    fn compress(&self, raw: &[u8]) -> Option<Vec<u8>>;

    /// Restore `raw_len` bytes from `compressed`.
    fn decompress(&self, compressed: &[u8], raw_len: usize) -> Result<Vec<u8>>;
}

impl BlockCompressor for CompressionType {
    fn compress(&self, raw: &[u8]) -> Option<Vec<u8>> {
        match self {
            CompressionType::None => None,
            #[cfg(feature = "snappy")]
            CompressionType::Snappy => snap::raw::Encoder::new().compress_vec(raw).ok(),
            #[cfg(feature = "lz4-compression")]
            CompressionType::Lz4 => lz4::block::compress(raw, None, false).ok(),
        }
    }

    fn decompress(&self, compressed: &[u8], raw_len: usize) -> Result<Vec<u8>> {
        let raw = match self {
            CompressionType::None => {
                return Err(Error::corruption("Compressed payload without a compressor"));
            }
            #[cfg(feature = "snappy")]
            CompressionType::Snappy => {
                let len = snap::raw::decompress_len(compressed)
                    .map_err(|e| Error::corruption(format!("Decompression failed: {}", e)))?;
                if len != raw_len {
                    return Err(Error::corruption(format!(
                        "Decompressed length {} does not match recorded length {}",
                        len, raw_len
                    )));
                }
                snap::raw::Decoder::new()
                    .decompress_vec(compressed)
                    .map_err(|e| Error::corruption(format!("Decompression failed: {}", e)))?
            }
            #[cfg(feature = "lz4-compression")]
            CompressionType::Lz4 => {
                let size = i32::try_from(raw_len)
                    .map_err(|_| Error::corruption("Recorded length too large for lz4"))?;
                lz4::block::decompress(compressed, Some(size))
                    .map_err(|e| Error::corruption(format!("Decompression failed: {}", e)))?
            }
        };
        if raw.len() != raw_len {
            return Err(Error::corruption(format!(
                "Decompressed length {} does not match recorded length {}",
                raw.len(),
                raw_len
            )));
        }
        Ok(raw)
    }
}

/// A block held in compressed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlock {
    data: Bytes,
    raw_len: usize,
    checksum: u32,
    compression: CompressionType,
}

impl CompressedBlock {
    /// Compress `block`. Returns `None` when the block is too small, the
    /// compressor declines, or the saving is below [`MIN_COMPRESS_IMPROVE`].
    pub fn compress(block: &Block, compression: CompressionType) -> Option<Self> {
        let raw = block.as_bytes();
        if raw.len() < MIN_COMPRESS_BYTES {
            return None;
        }
        let compressed = compression.compress(raw)?;
        if compressed.is_empty() || compressed.len() + MIN_COMPRESS_IMPROVE >= raw.len() {
            return None;
        }
        Some(Self {
            data: Bytes::from(compressed),
            raw_len: raw.len(),
            checksum: crc32fast::hash(raw),
            compression,
        })
    }

    /// Restore the raw block, verifying length and checksum.
    pub fn decompress(&self) -> Result<Block> {
        let raw = self
            .compression
            .decompress(&self.data, self.raw_len)
            .inspect_err(|e| log::error!("Failed to decompress node payload: {}", e))?;
        let actual = crc32fast::hash(&raw);
        if actual != self.checksum {
            log::error!("Node payload checksum mismatch");
            return Err(Error::ChecksumMismatch { expected: self.checksum, actual });
        }
        Block::from_bytes(raw)
    }

    /// The compressed bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Size of the compressed bytes.
    pub fn compressed_len(&self) -> usize {
        self.data.len()
    }

    /// Size of the raw block this payload decompresses to.
    pub fn raw_len(&self) -> usize {
        self.raw_len
    }

    /// The compressor that produced this payload.
    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Deep copy of the compressed bytes, reporting allocation failure.
    pub fn try_clone(&self) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(self.data.len())?;
        data.extend_from_slice(&self.data);
        Ok(Self {
            data: Bytes::from(data),
            raw_len: self.raw_len,
            checksum: self.checksum,
            compression: self.compression,
        })
    }

    #[cfg(test)]
    pub(crate) fn corrupt_for_test(&mut self) {
        let mut bytes = self.data.to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        self.data = Bytes::from(bytes);
    }
}
