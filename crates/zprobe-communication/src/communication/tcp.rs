//! TCP transport
//!
//! Networked grblHAL boards expose their console as a raw telnet-style
//! socket. No telnet option negotiation is performed; bytes are passed
//! through unchanged.

use super::{ConnectionParams, Transport};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use zprobe_core::{ConnectionError, Result};

const READ_BUFFER_SIZE: usize = 1024;

/// Controller connection over TCP
pub struct TcpTransport {
    stream: Option<TcpStream>,
    peer: String,
}

impl TcpTransport {
    /// Connect to the controller described by `params`
    pub async fn connect(params: &ConnectionParams) -> Result<Self> {
        let addr = params.connect_addr();
        let timeout = Duration::from_millis(params.connect_timeout_ms);

        tracing::info!("Connecting to {}", addr);
        let stream = match time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ConnectionError::FailedToOpen {
                    address: addr,
                    reason: e.to_string(),
                }
                .into())
            }
            Err(_) => {
                return Err(ConnectionError::ConnectionTimeout {
                    timeout_ms: params.connect_timeout_ms,
                }
                .into())
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not disable Nagle on {}: {}", addr, e);
        }

        tracing::info!("Connected to {}", addr);
        Ok(Self {
            stream: Some(stream),
            peer: addr,
        })
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| ConnectionError::NotConnected.into())
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        stream
            .write_all(data)
            .await
            .map_err(|e| ConnectionError::ConnectionLost {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let stream = self.stream_mut()?;
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|e| ConnectionError::ConnectionLost {
                reason: e.to_string(),
            })?;

        if n == 0 {
            return Ok(None);
        }
        Ok(Some(buf[..n].to_vec()))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            tracing::info!("Closing connection to {}", self.peer);
            if let Err(e) = stream.shutdown().await {
                return Err(ConnectionError::TcpError {
                    reason: e.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use zprobe_core::Error;

    #[tokio::test]
    async fn test_round_trip_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"GrblHAL 1.1f\r\n").await.unwrap();
            let mut buf = [0u8; 8];
            let n = socket.read(&mut buf).await.unwrap();
            buf[..n].to_vec()
        });

        let params = ConnectionParams {
            host: "127.0.0.1".to_string(),
            port,
            connect_timeout_ms: 1000,
        };
        let mut transport = TcpTransport::connect(&params).await.unwrap();
        assert!(transport.is_connected());

        let chunk = transport.read_chunk().await.unwrap().unwrap();
        assert!(chunk.starts_with(b"GrblHAL"));

        transport.write(b"$X\n").await.unwrap();
        assert_eq!(server.await.unwrap(), b"$X\n".to_vec());

        transport.close().await.unwrap();
        assert!(!transport.is_connected());
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let params = ConnectionParams {
            host: "127.0.0.1".to_string(),
            port,
            connect_timeout_ms: 1000,
        };
        let err = TcpTransport::connect(&params).await.err().unwrap();
        assert!(matches!(
            err,
            Error::Connection(ConnectionError::FailedToOpen { .. })
        ));
    }
}
