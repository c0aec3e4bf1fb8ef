// src/query/packet.rs
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::QueryError;
use crate::models::QueryKind;

/// Leading i32 of a packet that carries a whole message.
pub const SIMPLE_HEADER: i32 = -1;
/// Leading i32 of one fragment of a split message.
pub const SPLIT_HEADER: i32 = -2;

pub const A2S_INFO: u8 = 0x54;
pub const A2S_PLAYER: u8 = 0x55;

pub const S2C_CHALLENGE: u8 = 0x41;
pub const S2A_INFO_SOURCE: u8 = 0x49;
pub const S2A_INFO_GOLDSRC: u8 = 0x6D;
pub const S2A_PLAYER: u8 = 0x44;

const INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";

/// Placeholder a player request carries while no challenge is known yet.
const NO_CHALLENGE: u32 = 0xFFFF_FFFF;

/// A request datagram for one query kind, optionally carrying the challenge
/// token the server handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    kind: QueryKind,
    challenge: Option<u32>,
}

impl Request {
    pub fn new(kind: QueryKind) -> Self {
        Self { kind, challenge: None }
    }

    pub fn with_challenge(self, token: u32) -> Self {
        Self { challenge: Some(token), ..self }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(32);
        packet.extend_from_slice(&SIMPLE_HEADER.to_le_bytes());
        match self.kind {
            QueryKind::Info => {
                packet.push(A2S_INFO);
                packet.extend_from_slice(INFO_PAYLOAD);
                if let Some(token) = self.challenge {
                    packet.extend_from_slice(&token.to_le_bytes());
                }
            }
            QueryKind::PlayerList => {
                packet.push(A2S_PLAYER);
                let token = self.challenge.unwrap_or(NO_CHALLENGE);
                packet.extend_from_slice(&token.to_le_bytes());
            }
        }
        packet
    }
}

/// Marker byte a successful answer to `kind` starts with.
pub fn response_markers(kind: QueryKind) -> &'static [u8] {
    match kind {
        QueryKind::Info => &[S2A_INFO_SOURCE, S2A_INFO_GOLDSRC],
        QueryKind::PlayerList => &[S2A_PLAYER],
    }
}

/// Sequential little-endian reader over a received payload. Running out of
/// bytes is always a `Malformed` failure naming the field being read.
pub struct PacketReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(data) }
    }

    pub fn remaining(&self) -> usize {
        let data = self.cursor.get_ref();
        data.len().saturating_sub(self.cursor.position() as usize)
    }

    pub fn rest(&self) -> &'a [u8] {
        let data: &'a [u8] = *self.cursor.get_ref();
        let pos = (self.cursor.position() as usize).min(data.len());
        &data[pos..]
    }

    pub fn u8(&mut self, field: &str) -> Result<u8, QueryError> {
        self.cursor.read_u8().map_err(|_| truncated(field))
    }

    pub fn u16(&mut self, field: &str) -> Result<u16, QueryError> {
        self.cursor.read_u16::<LittleEndian>().map_err(|_| truncated(field))
    }

    pub fn i32(&mut self, field: &str) -> Result<i32, QueryError> {
        self.cursor.read_i32::<LittleEndian>().map_err(|_| truncated(field))
    }

    pub fn u32(&mut self, field: &str) -> Result<u32, QueryError> {
        self.cursor.read_u32::<LittleEndian>().map_err(|_| truncated(field))
    }

    pub fn u64(&mut self, field: &str) -> Result<u64, QueryError> {
        self.cursor.read_u64::<LittleEndian>().map_err(|_| truncated(field))
    }

    pub fn f32(&mut self, field: &str) -> Result<f32, QueryError> {
        self.cursor.read_f32::<LittleEndian>().map_err(|_| truncated(field))
    }

    pub fn bool(&mut self, field: &str) -> Result<bool, QueryError> {
        Ok(self.u8(field)? != 0)
    }

    /// Reads a NUL-terminated string, decoding invalid UTF-8 lossily.
    pub fn string(&mut self, field: &str) -> Result<String, QueryError> {
        let rest = self.rest();
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| QueryError::malformed(format!("unterminated string in {}", field)))?;
        let value = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.cursor.set_position(self.cursor.position() + end as u64 + 1);
        Ok(value)
    }

    pub fn skip(&mut self, len: usize, field: &str) -> Result<(), QueryError> {
        if self.remaining() < len {
            return Err(truncated(field));
        }
        self.cursor.set_position(self.cursor.position() + len as u64);
        Ok(())
    }
}

fn truncated(field: &str) -> QueryError {
    QueryError::malformed(format!("packet ended before {}", field))
}
