//! # quicklist - A Compressed List of Packed Blocks
//!
//! A memory-efficient sequence container for list-valued storage. Entries
//! are packed into compact blocks, blocks are chained into a doubly linked
//! list, and blocks away from both ends can be compressed.
//!
//! ## Architecture
//!
//! The container consists of several key components:
//!
//! - **Block**: Packed array of byte-string and integer entries
//! - **Compression**: Optional Snappy / LZ4 compression of whole blocks
//! - **QuickList**: Linked list of blocks with a fill policy and a
//!   compression depth
//! - **Iter / Cursor**: Read-only and mutating traversal in both directions
//!
//! ## Example Usage
//!
//! ```rust
//! use quicklist::{Direction, FillPolicy, Options, QuickList};
//!
//! # fn main() -> Result<(), quicklist::Error> {
//! let options = Options::new().fill(FillPolicy::Count(128)).compress_depth(1);
//! let mut list = QuickList::new(options)?;
//!
//! // End operations
//! list.push_tail(b"world")?;
//! list.push_head(b"hello")?;
//! list.push_tail(b"42")?;
//!
//! // Indexed lookup
//! assert!(list.index(0)?.matches(b"hello"));
//! assert_eq!(list.index(-1)?.value().as_int(), Some(42));
//!
//! // Iteration
//! for entry in list.iter(Direction::Backward) {
//!     println!("{}", entry?.value());
//! }
//!
//! // Range deletion
//! list.delete_range(0, 2)?;
//! assert_eq!(list.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod block;
pub mod compression;
pub mod config;
pub mod error;
pub mod quicklist;

// Re-exports
pub use block::{Block, Value};
pub use compression::{BlockCompressor, CompressedBlock};
pub use config::{CompressionType, FillPolicy, Options, SizeClass};
pub use error::{Error, Result};
pub use quicklist::{Cursor, Direction, End, Entry, Iter, NodeId, NodeInfo, QuickList};
