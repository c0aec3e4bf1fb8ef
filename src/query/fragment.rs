// src/query/fragment.rs
use bzip2::read::BzDecoder;
use log::debug;
use std::io::Read;

use super::packet::{PacketReader, SIMPLE_HEADER};
use crate::error::QueryError;

/// High bit of the split request id marks a bzip2-compressed message.
const COMPRESSED_FLAG: u32 = 0x8000_0000;

/// Upper bound on a decompressed message.
pub const MAX_DECOMPRESSED: usize = 1 << 20;

/// One datagram of a split response, with the leading `-2` already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub id: u32,
    pub total: u8,
    pub index: u8,
    /// Decompressed length and CRC32, only present on fragment 0 of a
    /// compressed message.
    pub compression: Option<(u32, u32)>,
    pub payload: Vec<u8>,
}

impl Fragment {
    pub fn parse(data: &[u8]) -> Result<Self, QueryError> {
        let mut reader = PacketReader::new(data);
        let id = reader.u32("split id")?;
        let total = reader.u8("split total")?;
        let index = reader.u8("split index")?;
        let _max_size = reader.u16("split size")?;

        let compression = if id & COMPRESSED_FLAG != 0 && index == 0 {
            let size = reader.u32("decompressed size")?;
            let crc = reader.u32("decompressed crc")?;
            Some((size, crc))
        } else {
            None
        };

        if total == 0 {
            return Err(QueryError::malformed("split response with zero fragments"));
        }
        if index >= total {
            return Err(QueryError::malformed(format!(
                "fragment index {} out of range for {} fragments",
                index, total
            )));
        }

        Ok(Self {
            id,
            total,
            index,
            compression,
            payload: reader.rest().to_vec(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Assembly {
    /// Still waiting on fragments.
    Pending,
    /// Fragment belonged to a different response and was dropped.
    Discarded,
    /// All fragments arrived; holds the message body after its `-1` header.
    Complete(Vec<u8>),
}

/// Buffers the fragments of exactly one split response. Fragments are
/// placed by index, so arrival order does not matter.
#[derive(Debug)]
pub struct SplitAssembler {
    id: u32,
    parts: Vec<Option<Vec<u8>>>,
    received: usize,
    compression: Option<(u32, u32)>,
}

impl SplitAssembler {
    pub fn new(id: u32, total: u8) -> Self {
        Self {
            id,
            parts: vec![None; total as usize],
            received: 0,
            compression: None,
        }
    }

    pub fn push(&mut self, fragment: Fragment) -> Result<Assembly, QueryError> {
        if fragment.id != self.id {
            debug!(
                "Discarding fragment of split response {:#010x} while assembling {:#010x}",
                fragment.id, self.id
            );
            return Ok(Assembly::Discarded);
        }
        if fragment.total as usize != self.parts.len() {
            return Err(QueryError::malformed(format!(
                "fragment count changed from {} to {}",
                self.parts.len(),
                fragment.total
            )));
        }

        if fragment.compression.is_some() {
            self.compression = fragment.compression;
        }

        let slot = &mut self.parts[fragment.index as usize];
        if slot.is_some() {
            debug!("Ignoring duplicate fragment {} of {:#010x}", fragment.index, self.id);
            return Ok(Assembly::Pending);
        }
        *slot = Some(fragment.payload);
        self.received += 1;

        if self.received < self.parts.len() {
            return Ok(Assembly::Pending);
        }
        self.finish().map(Assembly::Complete)
    }

    fn finish(&mut self) -> Result<Vec<u8>, QueryError> {
        let joined: Vec<u8> = self.parts.iter_mut().filter_map(Option::take).flatten().collect();

        let message = if self.id & COMPRESSED_FLAG != 0 {
            let (size, crc) = self
                .compression
                .ok_or_else(|| QueryError::malformed("compressed response without size header"))?;
            decompress(&joined, size, crc)?
        } else {
            joined
        };

        let mut reader = PacketReader::new(&message);
        match reader.i32("reassembled header")? {
            SIMPLE_HEADER => Ok(reader.rest().to_vec()),
            other => Err(QueryError::malformed(format!(
                "reassembled response has header {:#x}",
                other
            ))),
        }
    }
}

fn decompress(data: &[u8], size: u32, crc: u32) -> Result<Vec<u8>, QueryError> {
    let size = size as usize;
    if size > MAX_DECOMPRESSED {
        return Err(QueryError::malformed(format!(
            "decompressed size {} exceeds limit",
            size
        )));
    }

    let mut out = Vec::with_capacity(size);
    BzDecoder::new(data)
        .take(MAX_DECOMPRESSED as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| QueryError::malformed(format!("bzip2: {}", e)))?;

    if out.len() != size {
        return Err(QueryError::malformed(format!(
            "decompressed {} bytes, header announced {}",
            out.len(),
            size
        )));
    }
    if crc32fast::hash(&out) != crc {
        return Err(QueryError::malformed("decompressed payload failed CRC check"));
    }
    Ok(out)
}
