//! TCP helpers for hypervisor-side sockets.

use std::time::Duration;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::Instant;

const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Connect to `addr`, retrying refused connections until `timeout` elapses.
///
/// Returns the last connect error once the deadline passes.
pub async fn connect_with_retry<A>(addr: A, timeout: Duration) -> std::io::Result<TcpStream>
where
    A: ToSocketAddrs + Clone,
{
    let deadline = Instant::now() + timeout;
    loop {
        match TcpStream::connect(addr.clone()).await {
            Ok(stream) => return Ok(stream),
            Err(e) if Instant::now() + RETRY_INTERVAL < deadline => {
                tracing::trace!(error = %e, "Connect failed, retrying");
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connects_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = connect_with_retry(addr, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(stream.peer_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn test_gives_up_after_timeout() {
        // Bind then drop to get a port with nothing listening.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let result = connect_with_retry(addr, Duration::from_millis(100)).await;
        assert!(result.is_err());
    }
}
