//! Plain TCP connector.
//!
//! Streams raw bytes over a TCP socket. Reads are forwarded as text chunks
//! with no regard for message boundaries; reassembly is the codec's job.
//! A multi-byte UTF-8 sequence cut by a read boundary is held back until the
//! rest of it arrives.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

use super::link::{Connector, Link};

// ============================================================================
// Constants
// ============================================================================

/// Socket read size.
const READ_SIZE: usize = 4096;

/// Address prefix accepted in front of `host:port`.
const SCHEME_PREFIX: &str = "tcp://";

// ============================================================================
// TcpConnector
// ============================================================================

/// Connector for `tcp://host:port` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn open(&self, address: &str) -> Result<Link> {
        let target = address.strip_prefix(SCHEME_PREFIX).unwrap_or(address);
        let target = target.trim_end_matches('/');

        if target.is_empty() {
            return Err(Error::invalid_address(address, "missing host:port"));
        }

        let stream = TcpStream::connect(target)
            .await
            .map_err(|e| Error::connection(format!("TCP connect to {target} failed: {e}")))?;
        stream.set_nodelay(true)?;

        debug!(address = target, "TCP connection established");

        let (writer, outbound) = mpsc::unbounded_channel();
        let (inbound, reader) = mpsc::unbounded_channel();

        tokio::spawn(run_pump(stream, outbound, inbound));

        Ok(Link::new(writer, reader))
    }
}

// ============================================================================
// Pump
// ============================================================================

async fn run_pump(
    stream: TcpStream,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<String>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let mut buf = vec![0u8; READ_SIZE];
    let mut carry = Vec::new();

    loop {
        tokio::select! {
            read = read_half.read(&mut buf) => {
                match read {
                    Ok(0) => {
                        debug!("TCP stream ended");
                        break;
                    }

                    Ok(n) => {
                        carry.extend_from_slice(&buf[..n]);
                        let text = take_utf8(&mut carry);
                        if !text.is_empty() && inbound.send(text).is_err() {
                            break;
                        }
                    }

                    Err(e) => {
                        warn!(error = %e, "TCP read failed");
                        break;
                    }
                }
            }

            text = outbound.recv() => {
                match text {
                    Some(text) => {
                        trace!(len = text.len(), "TCP write");
                        if let Err(e) = write_half.write_all(text.as_bytes()).await {
                            warn!(error = %e, "TCP write failed");
                            break;
                        }
                    }

                    None => {
                        debug!("Link released, shutting down TCP stream");
                        let _ = write_half.shutdown().await;
                        break;
                    }
                }
            }
        }
    }

    trace!("TCP pump terminated");
}

/// Drains the decodable prefix of `carry` as text.
///
/// Invalid bytes are replaced with U+FFFD; an incomplete trailing sequence
/// always stays in `carry` for the next read.
fn take_utf8(carry: &mut Vec<u8>) -> String {
    let mut text = String::new();
    let mut rest: &[u8] = carry.as_slice();

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                rest = &[];
                break;
            }

            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                text.push_str(&String::from_utf8_lossy(valid));

                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    }
                    None => {
                        rest = after;
                        break;
                    }
                }
            }
        }
    }

    let consumed = carry.len() - rest.len();
    carry.drain(..consumed);
    text
}

// ============================================================================
// Tests
// ============================================================================
