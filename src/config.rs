//! Configuration options for a quicklist.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest entry count a count-capped node may be configured with.
pub const FILL_MAX: u16 = (1 << 15) - 1;

/// Largest compression depth.
pub const COMPRESS_MAX: u16 = u16::MAX;

/// Byte limit applied to count-capped nodes so that a large count cap
/// cannot produce arbitrarily large blocks.
pub const SIZE_SAFETY_LIMIT: usize = 8192;

/// Byte-size tiers for size-bounded nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    /// 4 KiB per node (`fill = -1`).
    Kb4,
    /// 8 KiB per node (`fill = -2`).
    Kb8,
    /// 16 KiB per node (`fill = -3`).
    Kb16,
    /// 32 KiB per node (`fill = -4`).
    Kb32,
    /// 64 KiB per node (`fill = -5`).
    Kb64,
}

impl SizeClass {
    /// Maximum uncompressed block size, in bytes, of a node in this class.
    pub fn max_bytes(self) -> usize {
        match self {
            SizeClass::Kb4 => 4 * 1024,
            SizeClass::Kb8 => 8 * 1024,
            SizeClass::Kb16 => 16 * 1024,
            SizeClass::Kb32 => 32 * 1024,
            SizeClass::Kb64 => 64 * 1024,
        }
    }

    fn from_level(level: i32) -> Option<Self> {
        match level {
            -1 => Some(SizeClass::Kb4),
            -2 => Some(SizeClass::Kb8),
            -3 => Some(SizeClass::Kb16),
            -4 => Some(SizeClass::Kb32),
            -5 => Some(SizeClass::Kb64),
            _ => None,
        }
    }

    fn level(self) -> i32 {
        match self {
            SizeClass::Kb4 => -1,
            SizeClass::Kb8 => -2,
            SizeClass::Kb16 => -3,
            SizeClass::Kb32 => -4,
            SizeClass::Kb64 => -5,
        }
    }
}

/// Rule bounding how much a single node may hold.
///
/// Serialized as the classic integer convention: a positive number caps
/// entries per node, `-1` through `-5` select a [`SizeClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum FillPolicy {
    /// At most this many entries per node (and at most
    /// [`SIZE_SAFETY_LIMIT`] bytes).
    Count(u16),
    /// At most this many bytes per node.
    Size(SizeClass),
}

impl FillPolicy {
    /// Resolves the integer fill convention into a policy.
    pub fn from_fill(fill: i32) -> Result<Self> {
        if fill > 0 {
            if fill > FILL_MAX as i32 {
                return Err(Error::invalid_argument(format!(
                    "fill {} exceeds the maximum entry count {}",
                    fill, FILL_MAX
                )));
            }
            return Ok(FillPolicy::Count(fill as u16));
        }
        SizeClass::from_level(fill).map(FillPolicy::Size).ok_or_else(|| {
            Error::invalid_argument(format!(
                "fill must be a positive entry count or a size class in -5..=-1, got {}",
                fill
            ))
        })
    }

    /// The integer form of this policy.
    pub fn as_fill(self) -> i32 {
        match self {
            FillPolicy::Count(count) => count as i32,
            FillPolicy::Size(class) => class.level(),
        }
    }

    /// Returns true if a node of `size` bytes holding `count` entries is
    /// within this policy.
    pub fn allows(self, size: usize, count: usize) -> bool {
        match self {
            FillPolicy::Size(class) => size <= class.max_bytes() && count <= u16::MAX as usize,
            FillPolicy::Count(limit) => size <= SIZE_SAFETY_LIMIT && count <= limit as usize,
        }
    }

    /// Validates the policy.
    pub fn validate(self) -> Result<()> {
        match self {
            FillPolicy::Count(0) => Err(Error::invalid_argument("fill count must be > 0")),
            FillPolicy::Count(count) if count > FILL_MAX => Err(Error::invalid_argument(
                format!("fill {} exceeds the maximum entry count {}", count, FILL_MAX),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for FillPolicy {
    fn default() -> Self {
        FillPolicy::Size(SizeClass::Kb8)
    }
}

impl TryFrom<i32> for FillPolicy {
    type Error = Error;

    fn try_from(fill: i32) -> Result<Self> {
        FillPolicy::from_fill(fill)
    }
}

impl From<FillPolicy> for i32 {
    fn from(policy: FillPolicy) -> Self {
        policy.as_fill()
    }
}

/// Compression algorithms available for cold nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    /// No compression; every attempt is declined.
    None,

    /// Snappy compression (fast, moderate compression ratio).
    #[cfg(feature = "snappy")]
    Snappy,

    /// LZ4 compression (very fast, lower compression ratio).
    #[cfg(feature = "lz4-compression")]
    Lz4,
}

impl Default for CompressionType {
    fn default() -> Self {
        #[cfg(feature = "snappy")]
        return CompressionType::Snappy;

        #[cfg(all(not(feature = "snappy"), feature = "lz4-compression"))]
        return CompressionType::Lz4;

        #[cfg(not(any(feature = "snappy", feature = "lz4-compression")))]
        CompressionType::None
    }
}

/// Configuration options for creating a quicklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Per-node fill bound.
    /// Default: 8 KiB per node
    pub fill: FillPolicy,

    /// Number of nodes at each end kept uncompressed. `0` disables
    /// compression.
    /// Default: 0
    pub compress_depth: u16,

    /// Compressor used for cold nodes.
    /// Default: CompressionType::Snappy
    pub compression: CompressionType,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            fill: FillPolicy::default(),
            compress_depth: 0,
            compression: CompressionType::default(),
        }
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options from the integer conventions for fill and depth.
    pub fn from_raw(fill: i32, compress_depth: i32) -> Result<Self> {
        let fill = FillPolicy::from_fill(fill)?;
        let compress_depth = u16::try_from(compress_depth).map_err(|_| {
            Error::invalid_argument(format!(
                "compress depth must be in 0..={}, got {}",
                COMPRESS_MAX, compress_depth
            ))
        })?;
        Ok(Self { fill, compress_depth, ..Self::default() })
    }

    /// Sets the fill policy.
    pub fn fill(mut self, fill: FillPolicy) -> Self {
        self.fill = fill;
        self
    }

    /// Sets the compression depth.
    pub fn compress_depth(mut self, depth: u16) -> Self {
        self.compress_depth = depth;
        self
    }

    /// Sets the compression algorithm.
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> Result<()> {
        self.fill.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = Options::default();
        assert_eq!(opts.fill, FillPolicy::Size(SizeClass::Kb8));
        assert_eq!(opts.compress_depth, 0);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_options_builder() {
        let opts = Options::new()
            .fill(FillPolicy::Count(128))
            .compress_depth(2)
            .compression(CompressionType::None);

        assert_eq!(opts.fill, FillPolicy::Count(128));
        assert_eq!(opts.compress_depth, 2);
        assert_eq!(opts.compression, CompressionType::None);
    }

    #[test]
    fn test_fill_from_integer() {
        assert_eq!(FillPolicy::from_fill(5).unwrap(), FillPolicy::Count(5));
        assert_eq!(FillPolicy::from_fill(-1).unwrap(), FillPolicy::Size(SizeClass::Kb4));
        assert_eq!(FillPolicy::from_fill(-5).unwrap(), FillPolicy::Size(SizeClass::Kb64));
        assert!(FillPolicy::from_fill(0).is_err());
        assert!(FillPolicy::from_fill(-6).is_err());
        assert!(FillPolicy::from_fill(FILL_MAX as i32 + 1).is_err());

        for fill in [-5, -3, -1, 1, 128, FILL_MAX as i32] {
            assert_eq!(FillPolicy::from_fill(fill).unwrap().as_fill(), fill);
        }
    }

    #[test]
    fn test_fill_allows() {
        let count = FillPolicy::Count(3);
        assert!(count.allows(100, 3));
        assert!(!count.allows(100, 4));
        assert!(!count.allows(SIZE_SAFETY_LIMIT + 1, 1));

        let size = FillPolicy::Size(SizeClass::Kb4);
        assert!(size.allows(4096, 10_000));
        assert!(!size.allows(4097, 1));
    }

    #[test]
    fn test_options_validation() {
        let mut opts = Options::default();
        assert!(opts.validate().is_ok());

        opts.fill = FillPolicy::Count(0);
        assert!(opts.validate().is_err());

        opts.fill = FillPolicy::Count(FILL_MAX + 1);
        assert!(opts.validate().is_err());

        assert!(Options::from_raw(-2, -1).is_err());
        assert!(Options::from_raw(0, 1).is_err());
        assert_eq!(Options::from_raw(16, 3).unwrap().compress_depth, 3);
    }
}
