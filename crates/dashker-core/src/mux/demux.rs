//! Frame decoder for non-interactive container output.

use bytes::BytesMut;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};
use tracing::debug;

use super::frame::{FrameHeader, FrameKind, HEADER_LEN, TIMESTAMP_LEN, TIMESTAMP_PREFIX_LEN};
use super::types::LogRecord;
use crate::error::{Error, Result};

/// Largest payload accepted unless overridden.
pub const DEFAULT_MAX_PAYLOAD: usize = 8 * 1024 * 1024;

/// Lazy sequence of records decoded from a multiplexed byte source.
pub type Demultiplexer<R> = FramedRead<R, FrameDecoder>;

/// Wrap `reader` so it yields one [`LogRecord`] per frame.
pub fn demultiplex<R: AsyncRead>(reader: R, decoder: FrameDecoder) -> Demultiplexer<R> {
    FramedRead::new(reader, decoder)
}

/// Decodes 8-byte-header frames into [`LogRecord`]s.
///
/// End of input is never an error: a trailing partial header (or partial
/// timestamp prefix) is dropped, and a frame whose body was cut short is
/// emitted with the bytes that did arrive.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    timestamps: bool,
    max_payload: usize,
}

impl FrameDecoder {
    /// `timestamps` must match whether timestamps were requested from the runtime.
    pub const fn new(timestamps: bool) -> Self {
        Self {
            timestamps,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    pub const fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    fn record(&self, header: FrameHeader, payload: &[u8]) -> Result<LogRecord> {
        let stream = match header.kind {
            FrameKind::Stream(stream) => stream,
            FrameKind::SystemError => {
                return Err(Error::RuntimeReported(
                    String::from_utf8_lossy(payload).trim_end().to_string(),
                ));
            }
        };

        if !self.timestamps {
            return Ok(LogRecord::new(stream, "", String::from_utf8_lossy(payload)));
        }

        if payload.len() < TIMESTAMP_PREFIX_LEN {
            return Err(Error::Frame(format!(
                "payload of {} bytes is shorter than the {TIMESTAMP_PREFIX_LEN}-byte timestamp prefix",
                payload.len()
            )));
        }
        Ok(LogRecord::new(
            stream,
            String::from_utf8_lossy(&payload[..TIMESTAMP_LEN]),
            String::from_utf8_lossy(&payload[TIMESTAMP_PREFIX_LEN..]),
        ))
    }
}

impl Decoder for FrameDecoder {
    type Item = LogRecord;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<LogRecord>> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let header = FrameHeader::parse(src)?;
        let payload_len = header.payload_len as usize;
        if payload_len > self.max_payload {
            return Err(Error::Frame(format!(
                "payload of {payload_len} bytes exceeds limit of {}",
                self.max_payload
            )));
        }

        let frame_len = HEADER_LEN + payload_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_len);
        self.record(header, &frame[HEADER_LEN..]).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<LogRecord>> {
        if let Some(record) = self.decode(src)? {
            return Ok(Some(record));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let remaining = src.split();
        if remaining.len() < HEADER_LEN {
            debug!(bytes = remaining.len(), "Dropping partial frame header at end of stream");
            return Ok(None);
        }

        let header = FrameHeader::parse(&remaining)?;
        let payload = &remaining[HEADER_LEN..];
        if self.timestamps && payload.len() < TIMESTAMP_PREFIX_LEN {
            debug!(bytes = payload.len(), "Dropping partial timestamp prefix at end of stream");
            return Ok(None);
        }

        debug!(
            declared = header.payload_len,
            received = payload.len(),
            "Emitting truncated frame at end of stream"
        );
        self.record(header, payload).map(Some)
    }
}
