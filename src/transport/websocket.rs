//! WebSocket connector.
//!
//! Opens a client WebSocket with `tokio-tungstenite` and pumps text frames
//! between the socket and the link channels on a dedicated task.
//!
//! # Pump
//!
//! ```text
//!   Link writer ──► outbound rx ──► ws_write (Message::Text)
//!   Link reader ◄── inbound tx  ◄── ws_read  (Text / UTF-8 Binary)
//! ```
//!
//! The pump exits when either side goes away: a remote close ends the
//! inbound channel (the transport sees `onClose`), a dropped link writer
//! closes the socket.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::link::{Connector, Link};

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocketConnector
// ============================================================================

/// Connector for `ws://` and `wss://` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, address: &str) -> Result<Link> {
        let url = Url::parse(address).map_err(|e| Error::invalid_address(address, e.to_string()))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::invalid_address(
                address,
                "WebSocket address must use ws:// or wss://",
            ));
        }

        let (ws_stream, response) = connect_async(url.as_str()).await?;

        debug!(address, status = %response.status(), "WebSocket handshake completed");

        let (writer, outbound) = mpsc::unbounded_channel();
        let (inbound, reader) = mpsc::unbounded_channel();

        tokio::spawn(run_pump(ws_stream, outbound, inbound));

        Ok(Link::new(writer, reader))
    }
}

// ============================================================================
// Pump
// ============================================================================

/// Moves frames between the socket and the link channels until either closes.
async fn run_pump(
    ws_stream: ClientStream,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<String>,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = ws_read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if inbound.send(text.as_str().to_owned()).is_err() {
                            break;
                        }
                    }

                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => {
                            if inbound.send(text).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Dropping non UTF-8 binary frame"),
                    },

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by remote");
                        break;
                    }

                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }

                    // Ping/Pong are answered by tungstenite
                    Some(Ok(_)) => {}
                }
            }

            text = outbound.recv() => {
                match text {
                    Some(text) => {
                        trace!(len = text.len(), "WebSocket frame out");
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            warn!(error = %e, "WebSocket send failed");
                            break;
                        }
                    }

                    None => {
                        debug!("Link released, closing WebSocket");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    trace!("WebSocket pump terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::time::timeout;

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        (listener, format!("ws://127.0.0.1:{port}/"))
    }

    #[tokio::test]
    async fn test_open_rejects_non_ws_scheme() {
        let result = WebSocketConnector.open("tcp://127.0.0.1:1").await;
        assert!(matches!(result, Err(Error::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_open_refused() {
        let (listener, address) = bind().await;
        drop(listener);

        let err = WebSocketConnector.open(&address).await.unwrap_err();
        assert!(matches!(err, Error::WebSocket(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_frames_both_directions() {
        let (listener, address) = bind().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            ws.send(Message::Text("from server\n".into())).await.expect("send");
            let frame = ws.next().await.expect("frame").expect("ok");
            frame.into_text().expect("text").as_str().to_owned()
        });

        let link = WebSocketConnector.open(&address).await.expect("open");
        let (writer, mut reader) = link.into_parts();

        let chunk = timeout(Duration::from_secs(5), reader.recv())
            .await
            .expect("chunk in time");
        assert_eq!(chunk.as_deref(), Some("from server\n"));

        writer.send("from client\n".to_string()).expect("send");
        let received = timeout(Duration::from_secs(5), server)
            .await
            .expect("server in time")
            .expect("server task");
        assert_eq!(received, "from client\n");
    }

    #[tokio::test]
    async fn test_remote_close_ends_reader() {
        let (listener, address) = bind().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            let _ = ws.close(None).await;
        });

        let link = WebSocketConnector.open(&address).await.expect("open");
        let (_writer, mut reader) = link.into_parts();

        let end = timeout(Duration::from_secs(5), reader.recv())
            .await
            .expect("close in time");
        assert!(end.is_none());
    }
}
