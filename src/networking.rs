//! Thin sequential transport over a TCP stream.
//!
//! The protocol is strictly request/response ordered on a single
//! connection, so the adapter exposes exactly three operations: connect,
//! write a whole buffer, read an exact number of bytes. Short reads are
//! absorbed by `read_exact`; EOF before the requested length, refused
//! connections, and elapsed timeouts all surface as transport failures.

use std::time::Duration;

use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{ClientError, Result};

pub struct Connection {
    stream: TcpStream,
    /// Per-operation deadline. `None` blocks indefinitely, which matches
    /// the original flagless behavior.
    timeout: Option<Duration>,
}

impl Connection {
    /// Resolves `addr` (a `host:port` string) and establishes the stream.
    pub async fn connect(addr: &str, timeout: Option<Duration>) -> Result<Connection> {
        debug!("Connecting to {}", addr);
        let connect = TcpStream::connect(addr);
        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| ClientError::timed_out("connect", limit))?,
            None => connect.await,
        }
        .map_err(ClientError::Transport)?;
        debug!("Connected to {}", addr);
        Ok(Connection { stream, timeout })
    }

    /// Writes the full buffer before returning.
    pub async fn send_all(&mut self, bytes: &[u8]) -> Result<()> {
        let limit = self.timeout;
        let write = async {
            self.stream.write_all(bytes).await?;
            self.stream.flush().await
        };
        match limit {
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .map_err(|_| ClientError::timed_out("send", limit))?,
            None => write.await,
        }
        .map_err(ClientError::Transport)
    }

    /// Reads exactly `n` bytes, retrying short reads internally.
    pub async fn recv_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let limit = self.timeout;
        let mut buffer = vec![0u8; n];
        let read = self.stream.read_exact(&mut buffer);
        match limit {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| ClientError::timed_out("receive", limit))?,
            None => read.await,
        }
        .map_err(ClientError::Transport)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_send_and_receive_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let echo = tokio::spawn(async move {
            let (mut peer, _) = listener.accept().await.unwrap();
            let mut buffer = [0u8; 5];
            peer.read_exact(&mut buffer).await.unwrap();
            peer.write_all(&buffer).await.unwrap();
        });

        let mut conn = Connection::connect(&addr.to_string(), None).await.unwrap();
        conn.send_all(b"hello").await.unwrap();
        assert_eq!(conn.recv_exact(5).await.unwrap(), b"hello");
        echo.await.unwrap();
    }

    #[tokio::test]
    async fn test_eof_before_requested_length_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut peer, _) = listener.accept().await.unwrap();
            peer.write_all(b"ab").await.unwrap();
            // Drop the stream with only 2 of the 4 requested bytes written.
        });

        let mut conn = Connection::connect(&addr.to_string(), None).await.unwrap();
        server.await.unwrap();
        let result = conn.recv_exact(4).await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }

    #[tokio::test]
    async fn test_connect_refused_is_transport_failure() {
        // Bind then drop to obtain a port with no listener behind it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = Connection::connect(&addr.to_string(), None).await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }

    #[tokio::test]
    async fn test_receive_timeout_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept but never write anything back.
        let server = tokio::spawn(async move {
            let (peer, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(peer);
        });

        let mut conn = Connection::connect(&addr.to_string(), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        let result = conn.recv_exact(1).await;
        match result {
            Err(ClientError::Transport(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::TimedOut);
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
        server.abort();
    }
}
