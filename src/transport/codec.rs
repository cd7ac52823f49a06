//! Async frame I/O over a byte stream.
//!
//! The stream can be anything implementing tokio's `AsyncRead`/`AsyncWrite`:
//! a `TcpStream` in production, a `DuplexStream` in tests.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::TransportResult;
use super::frame::{Frame, FrameError, encode_frame, remaining_len};
use crate::core::{FRAME_SIZE_FIELD_LEN, MsgType};

/// Read one complete frame from `reader`.
///
/// Never returns a partial frame: if the stream ends before the size field
/// or the announced body is complete, this fails with
/// [`FrameError::Truncated`].
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> TransportResult<Frame> {
    let mut size_buf = [0u8; FRAME_SIZE_FIELD_LEN];
    let n = read_full(reader, &mut size_buf).await?;
    if n < FRAME_SIZE_FIELD_LEN {
        return Err(FrameError::Truncated {
            expected: FRAME_SIZE_FIELD_LEN,
            actual: n,
        }
        .into());
    }

    let remaining = remaining_len(size_buf)?;
    let mut body = vec![0u8; remaining];
    let n = read_full(reader, &mut body).await?;
    if n < remaining {
        return Err(FrameError::Truncated {
            expected: FRAME_SIZE_FIELD_LEN + remaining,
            actual: FRAME_SIZE_FIELD_LEN + n,
        }
        .into());
    }

    let frame = Frame::from_body(&body)?;
    tracing::trace!(msg_type = frame.msg_type, len = frame.total_size(), "frame read");
    Ok(frame)
}

/// Encode and write one frame to `writer`.
///
/// The frame is fully encoded before the first byte is written, so an
/// oversized payload leaves the stream untouched. Returns the number of
/// bytes written.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg_type: MsgType,
    payload: &[u8],
) -> TransportResult<usize> {
    let bytes = encode_frame(msg_type.as_u16(), payload)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;

    tracing::trace!(msg_type = %msg_type, len = bytes.len(), "frame written");
    Ok(bytes.len())
}

/// Read until `buf` is full or the stream ends; returns bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::core::MAX_PAYLOAD_LEN;
    use crate::transport::TransportError;

    #[tokio::test]
    async fn test_roundtrip() {
        let mut buf = Vec::new();
        let written = write_frame(&mut buf, MsgType::Init, &[7u8; 8]).await.unwrap();
        assert_eq!(written, 12);

        let mut cursor = Cursor::new(buf);
        let frame = read_frame(&mut cursor).await.unwrap();
        assert_eq!(frame.kind(), Some(MsgType::Init));
        assert_eq!(frame.payload, vec![7u8; 8]);
    }

    #[tokio::test]
    async fn test_read_consecutive_frames() {
        let mut buf = Vec::new();
        write_frame(&mut buf, MsgType::Init, &[1; 8]).await.unwrap();
        write_frame(&mut buf, MsgType::Success, &[0, 0, 0, 1]).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let first = read_frame(&mut cursor).await.unwrap();
        let second = read_frame(&mut cursor).await.unwrap();
        assert_eq!(first.kind(), Some(MsgType::Init));
        assert_eq!(second.kind(), Some(MsgType::Success));
        assert_eq!(second.payload, vec![0, 0, 0, 1]);
    }

    #[tokio::test]
    async fn test_read_empty_stream() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Frame(FrameError::Truncated {
                expected: 2,
                actual: 0
            })
        ));
    }

    #[tokio::test]
    async fn test_read_truncated_body() {
        // Announces 12 bytes, delivers 9
        let bytes = hex::decode("000a02a80102030405").unwrap();
        let mut cursor = Cursor::new(bytes);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Frame(FrameError::Truncated {
                expected: 12,
                actual: 9
            })
        ));
    }

    #[tokio::test]
    async fn test_read_split_across_writes() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let reader = tokio::spawn(async move { read_frame(&mut client).await });

        server.write_all(&[0x00]).await.unwrap();
        tokio::task::yield_now().await;
        server.write_all(&[0x0A, 0x02, 0xA8, 1, 2]).await.unwrap();
        tokio::task::yield_now().await;
        server.write_all(&[3, 4, 5, 6, 7, 8]).await.unwrap();

        let frame = reader.await.unwrap().unwrap();
        assert_eq!(frame.kind(), Some(MsgType::Init));
        assert_eq!(frame.payload, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_read_malformed_size() {
        let mut cursor = Cursor::new(vec![0x00, 0x01, 0x02]);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Frame(FrameError::Malformed { total_size: 1 })
        ));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_write_too_large_writes_nothing() {
        let mut buf = Vec::new();
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        let err = write_frame(&mut buf, MsgType::Register, &payload)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Frame(FrameError::TooLarge { .. })));
        assert!(buf.is_empty());
    }
}
