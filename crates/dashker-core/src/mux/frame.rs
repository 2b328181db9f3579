//! Frame header layout of the runtime's multiplexed stream.
//!
//! ```text
//! [kind: u8][0, 0, 0][payload_len: u32 BE][payload ...]
//! ```
//!
//! With timestamps requested, the payload starts with a fixed-width
//! RFC3339-nano timestamp followed by a single space.

use bytes::{BufMut, BytesMut};

use super::types::StreamKind;
use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 8;
pub const TIMESTAMP_LEN: usize = 30;
pub const TIMESTAMP_PREFIX_LEN: usize = TIMESTAMP_LEN + 1;

/// Kind byte of a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Stream(StreamKind),
    /// The runtime's own error channel.
    SystemError,
}

impl FrameKind {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::Stream(StreamKind::Stdin)),
            1 => Ok(Self::Stream(StreamKind::Stdout)),
            2 => Ok(Self::Stream(StreamKind::Stderr)),
            3 => Ok(Self::SystemError),
            other => Err(Error::Frame(format!("unknown stream kind {other}"))),
        }
    }

    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Stream(StreamKind::Stdin) => 0,
            Self::Stream(StreamKind::Stdout) => 1,
            Self::Stream(StreamKind::Stderr) => 2,
            Self::SystemError => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    /// Length of everything after the header, timestamp prefix included.
    pub payload_len: u32,
}

impl FrameHeader {
    /// Parse the first [`HEADER_LEN`] bytes of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let Some(header) = buf.get(..HEADER_LEN) else {
            return Err(Error::Frame(format!(
                "header needs {HEADER_LEN} bytes, got {}",
                buf.len()
            )));
        };
        let kind = FrameKind::from_byte(header[0])?;
        let payload_len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        Ok(Self { kind, payload_len })
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_LEN);
        dst.put_u8(self.kind.as_byte());
        dst.put_slice(&[0, 0, 0]);
        dst.put_u32(self.payload_len);
    }
}

/// Encode one complete frame carrying `payload`.
pub fn encode_frame(kind: FrameKind, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| Error::Frame(format!("payload of {} bytes does not fit a frame", payload.len())))?;
    FrameHeader { kind, payload_len }.encode(dst);
    dst.put_slice(payload);
    Ok(())
}
