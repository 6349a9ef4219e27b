//! Frame codec for the coordination socket.
//!
//! A frame is a 4-byte big-endian length prefix followed by a bincode
//! body. The length is validated against the configured limit on both
//! sides before any allocation.

use crate::error::CoordinationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default frame-size limit, matching the default server buffer size.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Write one length-prefixed frame.
pub async fn write_frame<W, T>(
    writer: &mut W,
    message: &T,
    max_frame_bytes: usize,
) -> Result<(), CoordinationError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = bincode::serialize(message).map_err(|err| CoordinationError::Encode(err.to_string()))?;
    if body.len() > max_frame_bytes {
        return Err(CoordinationError::FrameTooLarge {
            size: body.len(),
            max: max_frame_bytes,
        });
    }
    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame.
pub async fn read_frame<R, T>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<T, CoordinationError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix).await?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len > max_frame_bytes {
        return Err(CoordinationError::FrameTooLarge {
            size: len,
            max: max_frame_bytes,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    bincode::deserialize(&body).map_err(|err| CoordinationError::Decode(err.to_string()))
}
