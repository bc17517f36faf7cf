//! Compact block format.
//!
//! A block stores a variable number of variable-length entries contiguously
//! in one byte buffer. Entries can be walked in both directions, so any
//! entry is addressed by the byte offset of its encoding byte.
//!
//! Format:
//! ```text
//! [total_bytes: u32]
//! [entry_count: u16]
//! [Entry 1]
//! ...
//! [Entry N]
//! [0xFF]
//! ```
//!
//! Each entry format:
//! ```text
//! [encoding: u8]   // kind and, for small values, the value itself
//! [payload: bytes] // integer bytes or string length + data
//! [backlen: 1-5B]  // length of encoding + payload, read right to left
//! ```
//!
//! Encodings:
//! ```text
//! 0x00..=0x7F  7-bit unsigned integer, no payload
//! 0x80..=0xBF  string, length in the low 6 bits
//! 0xC0         i8       0xC1  i16      0xC2  i32      0xC3  i64
//! 0xD0         string with u16 length  0xD1  string with u32 length
//! 0xFF         end of block
//! ```

mod iter;
mod value;

pub use iter::BlockIter;
pub use value::Value;

pub(crate) use value::parse_int;

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};

/// Size of the block header (total bytes + entry count).
pub const HEADER_SIZE: usize = 6;

/// Size of an empty block (header + terminator).
pub const EMPTY_BLOCK_SIZE: usize = HEADER_SIZE + 1;

const END: u8 = 0xFF;
const STR6: u8 = 0x80;
const STR6_MAX: usize = 0x3F;
const INT8: u8 = 0xC0;
const INT16: u8 = 0xC1;
const INT32: u8 = 0xC2;
const INT64: u8 = 0xC3;
const STR16: u8 = 0xD0;
const STR32: u8 = 0xD1;

/// A packed array of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    data: Vec<u8>,
}

/// How an incoming byte string will be stored.
#[derive(Debug, Clone, Copy)]
enum Encoding<'a> {
    Int(i64),
    Str(&'a [u8]),
}

impl<'a> Encoding<'a> {
    fn classify(value: &'a [u8]) -> Self {
        match parse_int(value) {
            Some(v) => Encoding::Int(v),
            None => Encoding::Str(value),
        }
    }

    /// Length of encoding byte + payload.
    fn body_len(self) -> usize {
        match self {
            Encoding::Int(v) if (0..=0x7F).contains(&v) => 1,
            Encoding::Int(v) if i8::try_from(v).is_ok() => 2,
            Encoding::Int(v) if i16::try_from(v).is_ok() => 3,
            Encoding::Int(v) if i32::try_from(v).is_ok() => 5,
            Encoding::Int(_) => 9,
            Encoding::Str(s) if s.len() <= STR6_MAX => 1 + s.len(),
            Encoding::Str(s) if s.len() <= u16::MAX as usize => 3 + s.len(),
            Encoding::Str(s) => 5 + s.len(),
        }
    }

    fn entry_len(self) -> usize {
        let body = self.body_len();
        body + backlen_size(body)
    }

    fn write(self, out: &mut Vec<u8>) {
        let body = self.body_len();
        match self {
            Encoding::Int(v) if (0..=0x7F).contains(&v) => out.put_u8(v as u8),
            Encoding::Int(v) if i8::try_from(v).is_ok() => {
                out.put_u8(INT8);
                out.put_i8(v as i8);
            }
            Encoding::Int(v) if i16::try_from(v).is_ok() => {
                out.put_u8(INT16);
                out.put_i16_le(v as i16);
            }
            Encoding::Int(v) if i32::try_from(v).is_ok() => {
                out.put_u8(INT32);
                out.put_i32_le(v as i32);
            }
            Encoding::Int(v) => {
                out.put_u8(INT64);
                out.put_i64_le(v);
            }
            Encoding::Str(s) if s.len() <= STR6_MAX => {
                out.put_u8(STR6 | s.len() as u8);
                out.put_slice(s);
            }
            Encoding::Str(s) if s.len() <= u16::MAX as usize => {
                out.put_u8(STR16);
                out.put_u16_le(s.len() as u16);
                out.put_slice(s);
            }
            Encoding::Str(s) => {
                out.put_u8(STR32);
                out.put_u32_le(s.len() as u32);
                out.put_slice(s);
            }
        }
        write_backlen(body, out);
    }
}

/// Number of bytes used to store a backlen of `len`.
fn backlen_size(len: usize) -> usize {
    match len {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Writes `len` as a varint meant to be read from its last byte backwards:
/// the last byte holds the low 7 bits, the high bit marks more bytes to the
/// left.
fn write_backlen(len: usize, out: &mut Vec<u8>) {
    let size = backlen_size(len);
    for group in (0..size).rev() {
        let mut byte = ((len >> (7 * group)) & 0x7F) as u8;
        if group + 1 < size {
            byte |= 0x80;
        }
        out.put_u8(byte);
    }
}

/// Reads the backlen that ends right before `end`.
/// Returns `(len, bytes used)`.
fn read_backlen(data: &[u8], end: usize) -> Option<(usize, usize)> {
    let mut len = 0usize;
    let mut pos = end;
    for shift in 0..5 {
        pos = pos.checked_sub(1)?;
        let byte = data[pos];
        len |= ((byte & 0x7F) as usize) << (7 * shift);
        if byte & 0x80 == 0 {
            return Some((len, end - pos));
        }
    }
    None
}

/// Length of encoding byte + payload of the entry at `offset`, bounds checked
/// against `limit` (the terminator position).
fn checked_body_len(data: &[u8], offset: usize, limit: usize) -> Option<usize> {
    let enc = *data.get(offset)?;
    let string_len = |width: usize| -> Option<usize> {
        let start = offset + 1;
        if start + width > limit {
            return None;
        }
        let mut raw = &data[start..start + width];
        Some(if width == 2 { raw.get_u16_le() as usize } else { raw.get_u32_le() as usize })
    };
    let body = match enc {
        0x00..=0x7F => 1,
        0x80..=0xBF => 1 + (enc as usize & STR6_MAX),
        INT8 => 2,
        INT16 => 3,
        INT32 => 5,
        INT64 => 9,
        STR16 => 3 + string_len(2)?,
        STR32 => 5 + string_len(4)?,
        _ => return None,
    };
    (offset + body <= limit).then_some(body)
}

impl Block {
    /// Create a new, empty block.
    pub fn new() -> Self {
        let mut data = Vec::with_capacity(EMPTY_BLOCK_SIZE);
        data.put_u32_le(EMPTY_BLOCK_SIZE as u32);
        data.put_u16_le(0);
        data.put_u8(END);
        Self { data }
    }

    /// Adopt an encoded block, validating every entry.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() < EMPTY_BLOCK_SIZE {
            return Err(Error::corruption("Block too small"));
        }
        let total = (&data[0..4]).get_u32_le() as usize;
        if total != data.len() {
            return Err(Error::corruption(format!(
                "Block length mismatch: header says {}, buffer has {}",
                total,
                data.len()
            )));
        }
        let end = data.len() - 1;
        if data[end] != END {
            return Err(Error::corruption("Block is missing its terminator"));
        }

        let declared = (&data[4..6]).get_u16_le() as usize;
        let mut count = 0usize;
        let mut offset = HEADER_SIZE;
        while offset < end {
            let body = checked_body_len(&data, offset, end)
                .ok_or_else(|| Error::corruption(format!("Bad entry at offset {}", offset)))?;
            let next = offset + body + backlen_size(body);
            if next > end || read_backlen(&data, next) != Some((body, backlen_size(body))) {
                return Err(Error::corruption(format!("Bad backlen at offset {}", offset)));
            }
            offset = next;
            count += 1;
        }
        if count != declared {
            return Err(Error::corruption(format!(
                "Block declares {} entries but holds {}",
                declared, count
            )));
        }

        Ok(Self { data })
    }

    /// Copy this block, reporting allocation failure instead of aborting.
    pub fn try_clone(&self) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(self.data.len())?;
        data.extend_from_slice(&self.data);
        Ok(Self { data })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        (&self.data[4..6]).get_u16_le() as usize
    }

    /// Check if the block has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encoded size in bytes, header and terminator included.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Get the raw data
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the block and return its encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Bytes an entry holding `value` occupies once encoded.
    pub fn encoded_len(value: &[u8]) -> usize {
        Encoding::classify(value).entry_len()
    }

    fn end(&self) -> usize {
        self.data.len() - 1
    }

    fn body_len_at(&self, offset: usize) -> usize {
        let enc = self.data[offset];
        match enc {
            0x00..=0x7F => 1,
            0x80..=0xBF => 1 + (enc as usize & STR6_MAX),
            INT8 => 2,
            INT16 => 3,
            INT32 => 5,
            INT64 => 9,
            STR16 => 3 + (&self.data[offset + 1..]).get_u16_le() as usize,
            STR32 => 5 + (&self.data[offset + 1..]).get_u32_le() as usize,
            _ => unreachable!("invalid block encoding {:#x} at offset {}", enc, offset),
        }
    }

    /// Encoded size of the entry at `offset`, backlen included.
    pub fn entry_len_at(&self, offset: usize) -> usize {
        let body = self.body_len_at(offset);
        body + backlen_size(body)
    }

    /// Offset of the first entry.
    pub fn first_offset(&self) -> Option<usize> {
        (!self.is_empty()).then_some(HEADER_SIZE)
    }

    /// Offset of the last entry.
    pub fn last_offset(&self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        self.prev_of(self.end())
    }

    /// Offset of the entry after the one at `offset`.
    pub fn next_offset(&self, offset: usize) -> Option<usize> {
        let next = offset + self.entry_len_at(offset);
        (next < self.end()).then_some(next)
    }

    /// Offset of the entry before the one at `offset`.
    pub fn prev_offset(&self, offset: usize) -> Option<usize> {
        if offset <= HEADER_SIZE {
            return None;
        }
        self.prev_of(offset)
    }

    fn prev_of(&self, offset: usize) -> Option<usize> {
        let (body, used) = read_backlen(&self.data, offset)?;
        Some(offset - used - body)
    }

    /// Offset of the entry at `index`; negative indexes count from the end,
    /// `-1` being the last entry.
    pub fn offset_of(&self, index: isize) -> Option<usize> {
        let len = self.len();
        let index = if index < 0 { len.checked_sub(index.unsigned_abs())? } else { index as usize };
        if index >= len {
            return None;
        }

        if index <= len / 2 {
            let mut offset = HEADER_SIZE;
            for _ in 0..index {
                offset = self.next_offset(offset)?;
            }
            Some(offset)
        } else {
            let mut offset = self.last_offset()?;
            for _ in index + 1..len {
                offset = self.prev_offset(offset)?;
            }
            Some(offset)
        }
    }

    /// Decode the entry at `offset`.
    pub fn get(&self, offset: usize) -> Value {
        let enc = self.data[offset];
        let mut payload = &self.data[offset + 1..];
        match enc {
            0x00..=0x7F => Value::Int(enc as i64),
            0x80..=0xBF => {
                let len = enc as usize & STR6_MAX;
                Value::Bytes(payload[..len].to_vec())
            }
            INT8 => Value::Int(payload.get_i8() as i64),
            INT16 => Value::Int(payload.get_i16_le() as i64),
            INT32 => Value::Int(payload.get_i32_le() as i64),
            INT64 => Value::Int(payload.get_i64_le()),
            STR16 => {
                let len = payload.get_u16_le() as usize;
                Value::Bytes(payload[..len].to_vec())
            }
            STR32 => {
                let len = payload.get_u32_le() as usize;
                Value::Bytes(payload[..len].to_vec())
            }
            _ => unreachable!("invalid block encoding {:#x} at offset {}", enc, offset),
        }
    }

    /// Compare the entry at `offset` with `value` without decoding it into an
    /// owned buffer. Integer-like values compare by their integer encoding.
    pub fn entry_eq(&self, offset: usize, value: &[u8]) -> bool {
        let enc = self.data[offset];
        let mut payload = &self.data[offset + 1..];
        let stored = match enc {
            0x00..=0x7F => Encoding::Int(enc as i64),
            0x80..=0xBF => Encoding::Str(&payload[..enc as usize & STR6_MAX]),
            INT8 => Encoding::Int(payload.get_i8() as i64),
            INT16 => Encoding::Int(payload.get_i16_le() as i64),
            INT32 => Encoding::Int(payload.get_i32_le() as i64),
            INT64 => Encoding::Int(payload.get_i64_le()),
            STR16 => {
                let len = payload.get_u16_le() as usize;
                Encoding::Str(&payload[..len])
            }
            STR32 => {
                let len = payload.get_u32_le() as usize;
                Encoding::Str(&payload[..len])
            }
            _ => return false,
        };
        match (stored, Encoding::classify(value)) {
            (Encoding::Int(a), Encoding::Int(b)) => a == b,
            (Encoding::Str(a), Encoding::Str(b)) => a == b,
            _ => false,
        }
    }

    fn set_header(&mut self, count: usize) {
        let total = self.data.len() as u32;
        self.data[0..4].copy_from_slice(&total.to_le_bytes());
        self.data[4..6].copy_from_slice(&(count as u16).to_le_bytes());
    }

    fn encode(value: &[u8]) -> Result<Vec<u8>> {
        if value.len() > u32::MAX as usize {
            return Err(Error::invalid_argument("Entry larger than 4GiB"));
        }
        let encoding = Encoding::classify(value);
        let mut entry = Vec::new();
        entry.try_reserve_exact(encoding.entry_len())?;
        encoding.write(&mut entry);
        Ok(entry)
    }

    /// Insert `value` before the entry at `offset`. An offset equal to the
    /// terminator position appends.
    pub fn insert_at(&mut self, offset: usize, value: &[u8]) -> Result<()> {
        let count = self.len();
        if count >= u16::MAX as usize {
            return Err(Error::invalid_argument("Block entry count overflow"));
        }
        if offset < HEADER_SIZE || offset > self.end() {
            return Err(Error::invalid_argument(format!("Offset {} outside block", offset)));
        }
        let entry = Self::encode(value)?;
        if self.data.len() + entry.len() > u32::MAX as usize {
            return Err(Error::invalid_argument("Block larger than 4GiB"));
        }
        self.data.try_reserve(entry.len())?;
        self.data.splice(offset..offset, entry);
        self.set_header(count + 1);
        Ok(())
    }

    /// Append `value` as the last entry.
    pub fn push_back(&mut self, value: &[u8]) -> Result<()> {
        self.insert_at(self.end(), value)
    }

    /// Prepend `value` as the first entry.
    pub fn push_front(&mut self, value: &[u8]) -> Result<()> {
        self.insert_at(HEADER_SIZE, value)
    }

    /// Replace the entry at `offset` with `value`.
    pub fn replace_at(&mut self, offset: usize, value: &[u8]) -> Result<()> {
        let entry = Self::encode(value)?;
        let old_len = self.entry_len_at(offset);
        if entry.len() > old_len {
            self.data.try_reserve(entry.len() - old_len)?;
        }
        self.data.splice(offset..offset + old_len, entry);
        self.set_header(self.len());
        Ok(())
    }

    /// Remove the entry at `offset`. Returns the offset of the entry that now
    /// follows the removed one, if any.
    pub fn remove_at(&mut self, offset: usize) -> Option<usize> {
        let len = self.entry_len_at(offset);
        self.data.drain(offset..offset + len);
        self.set_header(self.len() - 1);
        (offset < self.end()).then_some(offset)
    }

    /// Remove up to `count` entries starting at `offset`. Returns the number
    /// removed.
    pub fn remove_range(&mut self, offset: usize, count: usize) -> usize {
        let mut stop = offset;
        let mut removed = 0;
        while removed < count && stop < self.end() {
            stop += self.entry_len_at(stop);
            removed += 1;
        }
        self.data.drain(offset..stop);
        self.set_header(self.len() - removed);
        removed
    }

    /// Split the block at `offset`: entries from `offset` on move into the
    /// returned block, the rest stay.
    pub fn split_off(&mut self, offset: usize) -> Result<Block> {
        let end = self.end();
        let mut moved = 0;
        let mut cursor = offset;
        while cursor < end {
            cursor += self.entry_len_at(cursor);
            moved += 1;
        }

        let mut data = Vec::new();
        data.try_reserve_exact(HEADER_SIZE + (end - offset) + 1)?;
        data.put_u32_le(0);
        data.put_u16_le(0);
        data.extend_from_slice(&self.data[offset..end]);
        data.put_u8(END);
        let mut tail = Block { data };
        tail.set_header(moved);

        let kept = self.len() - moved;
        self.data.truncate(offset);
        self.data.put_u8(END);
        self.set_header(kept);
        Ok(tail)
    }

    /// Append every entry of `other` after the entries of this block.
    pub fn append_block(&mut self, other: &Block) -> Result<()> {
        let count = self.len() + other.len();
        if count > u16::MAX as usize {
            return Err(Error::invalid_argument("Block entry count overflow"));
        }
        let entries = &other.data[HEADER_SIZE..other.end()];
        self.data.try_reserve(entries.len())?;
        self.data.truncate(self.end());
        self.data.extend_from_slice(entries);
        self.data.put_u8(END);
        self.set_header(count);
        Ok(())
    }

    /// Iterate over `(offset, value)` pairs.
    pub fn iter(&self) -> BlockIter<'_> {
        BlockIter::new(self)
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a Block {
    type Item = (usize, Value);
    type IntoIter = BlockIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
