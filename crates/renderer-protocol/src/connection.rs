//! Length-prefixed framing for the renderer channel.
//!
//! Every message travels as one frame:
//!
//! ```text
//! [4 bytes: length of the rest (big-endian u32)] [1 byte: message type] [payload bytes]
//! ```
//!
//! The two directions are sized differently. Requests from the client are a
//! type byte plus a language id or theme name, so the host refuses anything
//! past [`MAX_CONTROL_FRAME_SIZE`]. Replies from the host may carry the whole
//! tokenizer engine binary, so the client accepts up to [`MAX_FRAME_SIZE`].
//! Senders check the same limits, so an oversized message fails where it is
//! produced instead of tearing down the peer's reader.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::message::{ClientMessage, HostMessage, ProtocolError};

/// Largest host reply frame (type byte included): 64 MiB.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Largest client request frame (type byte included): 64 KiB.
pub const MAX_CONTROL_FRAME_SIZE: usize = 64 * 1024;

/// Length prefix for a frame of `len` bytes, or `InvalidInput` when it is
/// over the reply limit.
fn frame_header(len: usize) -> std::io::Result<[u8; 4]> {
    let too_large = || {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("frame too large to send: {} bytes (max {})", len, MAX_FRAME_SIZE),
        )
    };
    if len > MAX_FRAME_SIZE {
        return Err(too_large());
    }
    let len = u32::try_from(len).map_err(|_| too_large())?;
    Ok(len.to_be_bytes())
}

/// Write one frame and flush. Nothing is written if `data` is over the
/// reply limit.
pub async fn send_frame<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> std::io::Result<()> {
    let header = frame_header(data.len())?;
    writer.write_all(&header).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame of at most `max_size` bytes. `None` means the peer closed
/// the stream between frames.
async fn recv_frame_with_limit<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_size: usize,
) -> std::io::Result<Option<Vec<u8>>> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(header) as usize;

    if len > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame too large: {} bytes (max {})", len, max_size),
        ));
    }

    let mut frame = vec![0u8; len];
    reader.read_exact(&mut frame).await?;
    Ok(Some(frame))
}

/// Read a host reply frame (up to [`MAX_FRAME_SIZE`]).
pub async fn recv_frame<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>> {
    recv_frame_with_limit(reader, MAX_FRAME_SIZE).await
}

/// Read a client request frame (up to [`MAX_CONTROL_FRAME_SIZE`]).
pub async fn recv_control_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> std::io::Result<Option<Vec<u8>>> {
    recv_frame_with_limit(reader, MAX_CONTROL_FRAME_SIZE).await
}

/// Send a client request as one frame.
pub async fn send_client_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &ClientMessage,
) -> Result<(), ProtocolError> {
    send_frame(writer, &message.encode()?).await?;
    Ok(())
}

/// Receive one raw client request frame. Returns `None` on EOF.
///
/// Decoding is left to the caller so a bad frame can be skipped without
/// tearing down the connection.
pub async fn recv_client_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, ProtocolError> {
    Ok(recv_control_frame(reader).await?)
}

/// Send a host reply as one frame.
pub async fn send_host_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &HostMessage,
) -> Result<(), ProtocolError> {
    send_frame(writer, &message.encode()?).await?;
    Ok(())
}

/// Receive one raw host reply frame. Returns `None` on EOF.
pub async fn recv_host_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, ProtocolError> {
    Ok(recv_frame(reader).await?)
}
