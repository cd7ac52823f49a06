//! TCP connection setup for the enrollment client.
//!
//! Resolves the remote host, connects to the first resolved address and
//! hands back a plain `TcpStream`. The stream is owned by exactly one session.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, lookup_host};

use super::error::{TransportError, TransportResult};

/// Resolve `host:port` to the first socket address.
pub async fn resolve(host: &str, port: u16) -> TransportResult<SocketAddr> {
    let mut addrs = lookup_host((host, port)).await?;
    addrs.next().ok_or_else(|| TransportError::Resolve {
        host: host.to_string(),
    })
}

/// Open a TCP stream to `host:port`.
///
/// With a `timeout`, the connect attempt is abandoned after that long and
/// fails with [`TransportError::ConnectTimeout`].
pub async fn connect(
    host: &str,
    port: u16,
    timeout: Option<Duration>,
) -> TransportResult<TcpStream> {
    let addr = resolve(host, port).await?;
    tracing::debug!(%host, %addr, "resolved remote address");

    let stream = match timeout {
        Some(limit) => tokio::time::timeout(limit, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout)??,
        None => TcpStream::connect(addr).await?,
    };
    stream.set_nodelay(true)?;

    tracing::info!(
        remote = %addr,
        local = %stream.local_addr()?,
        "connected to enrollment service"
    );
    Ok(stream)
}

/// Shut down the write half of `stream`.
///
/// Errors are logged and dropped; the peer may already have closed.
pub async fn close(stream: &mut TcpStream) {
    if let Err(e) = stream.shutdown().await {
        tracing::debug!(error = %e, "stream shutdown failed");
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addr = resolve("127.0.0.1", 34151).await.unwrap();
        assert_eq!(addr, "127.0.0.1:34151".parse().unwrap());
    }

    #[tokio::test]
    async fn test_connect_and_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let accept = tokio::spawn(async move {
            let (mut peer, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            // Returns once the client shuts down its write half
            peer.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let mut stream = connect("127.0.0.1", port, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(stream.nodelay().unwrap());
        close(&mut stream).await;

        assert!(accept.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect("127.0.0.1", port, None).await.unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }
}
