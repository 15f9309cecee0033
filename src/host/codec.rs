//! Native-messaging framing: a 4-byte little-endian length, then UTF-8 JSON.

use std::io;

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Browsers accept at most 1 MiB per message from the host.
pub const MAX_OUTBOUND_BYTES: usize = 1024 * 1024;
/// And send at most 64 MiB to it.
pub const MAX_INBOUND_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("native messaging pipe failed: {0}")]
    Io(#[from] io::Error),
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    /// After a bad JSON body the stream is still aligned on a frame boundary.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

/// Returns `None` on a clean end of stream (the browser closed the port).
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Value>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let size = u32::from_le_bytes(header) as usize;
    if size > MAX_INBOUND_BYTES {
        return Err(CodecError::TooLarge {
            size,
            limit: MAX_INBOUND_BYTES,
        });
    }

    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await?;
    Ok(Some(serde_json::from_slice(&body)?))
}

pub async fn write_frame<W>(writer: &mut W, message: &Value) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_OUTBOUND_BYTES {
        return Err(CodecError::TooLarge {
            size: body.len(),
            limit: MAX_OUTBOUND_BYTES,
        });
    }

    writer.write_all(&(body.len() as u32).to_le_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}
