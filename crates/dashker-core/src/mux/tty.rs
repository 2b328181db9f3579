//! Line splitter for interactive (TTY) container output.
//!
//! With a TTY attached the runtime does not multiplex. Each log line is
//! `"<timestamp> <message>"` terminated by `\n`.

use bytes::BytesMut;
use tokio::io::AsyncRead;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, FramedRead};
use tracing::warn;

use super::demux::DEFAULT_MAX_PAYLOAD;
use super::types::{LogRecord, StreamKind};
use crate::error::{Error, Result};

/// Lazy sequence of records split from interactive output.
pub type TtyLines<R> = FramedRead<R, TtyLineDecoder>;

/// Split `reader` into records, discarding lines longer than `max_line` bytes.
pub fn split_lines<R: AsyncRead>(reader: R, max_line: usize) -> TtyLines<R> {
    FramedRead::new(reader, TtyLineDecoder::new(max_line))
}

/// Split one line on its first space into `(timestamp, message)`.
pub fn split_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(' ')
}

/// Newline-delimited decoder yielding one [`LogRecord`] per well-formed line.
///
/// Lines without a space separator, and lines over the length limit, are
/// skipped with a warning. An over-long line is discarded up to its newline,
/// so the buffer never holds much more than `max_line` bytes.
#[derive(Debug, Clone)]
pub struct TtyLineDecoder {
    lines: AnyDelimiterCodec,
    max_line: usize,
}

impl Default for TtyLineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl TtyLineDecoder {
    pub fn new(max_line: usize) -> Self {
        Self {
            lines: AnyDelimiterCodec::new_with_max_length(vec![b'\n'], Vec::new(), max_line),
            max_line,
        }
    }

    fn parse(line: &[u8]) -> Option<LogRecord> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(line);
        match split_line(&text) {
            Some((timestamp, message)) => Some(LogRecord::new(StreamKind::Stdout, timestamp, message)),
            None => {
                warn!(line = %text, "Skipping interactive log line without timestamp separator");
                None
            }
        }
    }

    fn next_record(&mut self, src: &mut BytesMut, eof: bool) -> Result<Option<LogRecord>> {
        loop {
            let line = if eof {
                self.lines.decode_eof(src)
            } else {
                self.lines.decode(src)
            };
            match line {
                Ok(Some(line)) => {
                    if let Some(record) = Self::parse(&line) {
                        return Ok(Some(record));
                    }
                }
                Ok(None) => return Ok(None),
                Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                    warn!(limit = self.max_line, "Skipping interactive log line over length limit");
                }
                Err(e) => return Err(Error::Frame(e.to_string())),
            }
        }
    }
}

impl Decoder for TtyLineDecoder {
    type Item = LogRecord;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<LogRecord>> {
        self.next_record(src, false)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<LogRecord>> {
        self.next_record(src, true)
    }
}
