//! Clip message wire protocol.
//!
//! Each message is one JSON object followed by `\n`:
//!
//! ```text
//! {"content":"hello\nworld","timestamp":"2024-05-01T12:30:00.123Z","peer_name":"laptop"}
//! ```
//!
//! JSON escapes control characters inside strings, so an encoded message
//! never contains a raw newline and the newline is an unambiguous delimiter.
//! `peer_name` is display metadata only and may be empty.

pub mod stream;

pub use stream::{BroadcastFailure, InboundClip, MessageProtocol};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::PeerId;

/// Maximum encoded line length (16 MB).
pub const MAX_LINE_LEN: usize = 16 * 1024 * 1024;

/// Number of id characters shown when a peer has not announced a name.
pub const PEER_ID_PREFIX_LEN: usize = 8;

/// A clipboard change as sent between peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipMessage {
    /// Clipboard text
    pub content: String,
    /// When the sender observed the change
    pub timestamp: DateTime<Utc>,
    /// Sender's display name (may be empty)
    #[serde(default)]
    pub peer_name: String,
}

impl ClipMessage {
    /// Create a message.
    #[must_use]
    pub fn new(
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        peer_name: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            timestamp,
            peer_name: peer_name.into(),
        }
    }
}

/// Encode a message as one newline-terminated line.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if encoding fails.
pub fn encode_line(message: &ClipMessage) -> Result<Vec<u8>> {
    let mut line =
        serde_json::to_vec(message).map_err(|e| Error::Serialization(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

/// Decode one line (with or without its trailing newline).
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the line is not a valid message.
pub fn decode_line(line: &[u8]) -> Result<ClipMessage> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    serde_json::from_slice(line).map_err(|e| Error::Serialization(e.to_string()))
}

/// Write one message and flush.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub async fn write_message<W>(writer: &mut W, message: &ClipMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = encode_line(message)?;
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the next raw line.
///
/// Returns `Ok(None)` at end of stream. A final line without a trailing
/// newline is still returned.
///
/// # Errors
///
/// Returns [`Error::Io`] on read failure and [`Error::ProtocolError`] if a
/// line exceeds [`MAX_LINE_LEN`].
pub async fn read_line<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let limit = u64::try_from(MAX_LINE_LEN).unwrap_or(u64::MAX) + 1;
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut line).await?;

    if n == 0 {
        return Ok(None);
    }
    if line.len() > MAX_LINE_LEN {
        return Err(Error::ProtocolError(format!(
            "line exceeds {MAX_LINE_LEN} bytes"
        )));
    }
    Ok(Some(line))
}

/// Display string for a peer.
///
/// Returns `known` when it is non-empty, otherwise the first
/// [`PEER_ID_PREFIX_LEN`] characters of the id followed by `...`. Ids that
/// short are returned whole.
#[must_use]
pub fn display_name(peer: &PeerId, known: Option<&str>) -> String {
    if let Some(name) = known.filter(|name| !name.is_empty()) {
        return name.to_string();
    }

    let id = peer.as_str();
    if id.chars().count() <= PEER_ID_PREFIX_LEN {
        id.to_string()
    } else {
        let prefix: String = id.chars().take(PEER_ID_PREFIX_LEN).collect();
        format!("{prefix}...")
    }
}
