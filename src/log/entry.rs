//! Log entry definitions
//!
//! Defines the on-disk record and its header codec. Decoding is split in two:
//! the fixed-size header is decoded first, then exactly `key_size + value_size`
//! body bytes are read by the caller.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{LogKvError, Result};

/// Header size: KeySize (4) + ValueSize (4) + Mark (4) = 12 bytes
pub const HEADER_SIZE: usize = 12;

/// Record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Mark {
    /// A key-value write
    Put = 0,

    /// A tombstone for a previously written key
    Delete = 1,
}

impl Mark {
    fn from_u32(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Mark::Put),
            1 => Ok(Mark::Delete),
            _ => Err(LogKvError::corruption(0, format!("unknown mark: {}", raw))),
        }
    }
}

/// Decoded fixed-size header of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub key_size: u32,
    pub value_size: u32,
    pub mark: Mark,
}

impl EntryHeader {
    /// Decode a header from the first `HEADER_SIZE` bytes of `bytes`
    ///
    /// Corruption errors carry offset 0; callers that know where the header
    /// came from re-anchor them with `LogKvError::at_offset`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(LogKvError::corruption(
                0,
                format!(
                    "incomplete header: expected {} bytes, got {}",
                    HEADER_SIZE,
                    bytes.len()
                ),
            ));
        }

        let mut buf = &bytes[..HEADER_SIZE];
        let key_size = buf.get_u32();
        let value_size = buf.get_u32();
        let mark = Mark::from_u32(buf.get_u32())?;

        Ok(Self {
            key_size,
            value_size,
            mark,
        })
    }

    /// `HEADER_SIZE + key_size + value_size` as declared by raw header bytes,
    /// without validating the mark
    pub fn declared_size(bytes: &[u8; HEADER_SIZE]) -> u64 {
        let mut buf = &bytes[..];
        let key_size = buf.get_u32() as u64;
        let value_size = buf.get_u32() as u64;
        HEADER_SIZE as u64 + key_size + value_size
    }

    /// Append the encoded header to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u32(self.key_size);
        buf.put_u32(self.value_size);
        buf.put_u32(self.mark as u32);
    }

    /// Bytes following the header: key + value
    pub fn body_size(&self) -> u64 {
        self.key_size as u64 + self.value_size as u64
    }

    /// Exact number of bytes the whole entry occupies in the log
    pub fn total_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.body_size()
    }
}

/// A single record in the append log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub mark: Mark,
}

impl Entry {
    /// Create a PUT entry
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            key,
            value,
            mark: Mark::Put,
        }
    }

    /// Create a DELETE entry (no value)
    pub fn delete(key: Vec<u8>) -> Self {
        Self {
            key,
            value: Vec::new(),
            mark: Mark::Delete,
        }
    }

    pub fn is_put(&self) -> bool {
        self.mark == Mark::Put
    }

    /// Build the header, failing if a length does not fit in a u32
    pub fn header(&self) -> Result<EntryHeader> {
        Ok(EntryHeader {
            key_size: length_to_u32(self.key.len())?,
            value_size: length_to_u32(self.value.len())?,
            mark: self.mark,
        })
    }

    /// Encode to `header || key || value`
    pub fn encode(&self) -> Result<Bytes> {
        let header = self.header()?;
        let mut buf = BytesMut::with_capacity(header.total_size() as usize);
        header.encode_into(&mut buf);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);
        Ok(buf.freeze())
    }

    /// `HEADER_SIZE + key_size + value_size`
    pub fn total_size(&self) -> u64 {
        (HEADER_SIZE + self.key.len() + self.value.len()) as u64
    }
}

fn length_to_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| LogKvError::EntryTooLarge { size: len })
}
