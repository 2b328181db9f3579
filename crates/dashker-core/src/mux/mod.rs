//! Demultiplexer for the container runtime's log output.
//!
//! Non-interactive containers interleave stdout and stderr on one byte
//! stream using 8-byte frame headers. Interactive (TTY) containers write
//! plain `timestamp message` lines instead. Both decoders plug into
//! `tokio_util::codec::FramedRead` and yield [`LogRecord`]s lazily.

mod demux;
mod frame;
mod tty;
mod types;

pub use demux::{DEFAULT_MAX_PAYLOAD, Demultiplexer, FrameDecoder, demultiplex};
pub use frame::{FrameHeader, FrameKind, HEADER_LEN, TIMESTAMP_LEN, TIMESTAMP_PREFIX_LEN, encode_frame};
pub use tty::{TtyLineDecoder, TtyLines, split_line, split_lines};
pub use types::*;
