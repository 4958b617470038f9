//! Text transports.
//!
//! A [`Transport`] carries one request line out and one reply body back. A
//! [`Connector`] opens a fresh transport per request; dropping the transport
//! closes the underlying socket, which is how superseded requests are torn
//! down.
//!
//! Two wire carriers are provided: WebSocket text frames, and the gateway's
//! length-prefixed TCP framing (`<char count>|<payload>`). The gateway counts
//! Unicode scalar values, not bytes.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::ClientError;

/// One open duplex text channel.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: &str) -> Result<(), ClientError>;
    async fn recv_text(&mut self) -> Result<String, ClientError>;
    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Opens transports to one server.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn Transport>, ClientError>;
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// Connects with `ws://` or `wss://` URLs.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, ClientError> {
        debug!(url = %self.url, "opening websocket");
        let (stream, _response) = connect_async(self.url.as_str()).await?;
        Ok(Box::new(WsTransport { stream }))
    }
}

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: &str) -> Result<(), ClientError> {
        self.stream.send(Message::Text(text.to_string().into())).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String, ClientError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(text) => return Ok(text.to_string()),
                Message::Binary(bytes) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
                Message::Close(_) => break,
                // Pings are answered by tungstenite on the next read.
                _ => continue,
            }
        }
        Err(ClientError::Connection(
            "websocket closed before a reply arrived".into(),
        ))
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Length-prefixed TCP
// ---------------------------------------------------------------------------

/// Longest accepted length header, in digits.
const MAX_HEADER_DIGITS: usize = 20;

/// Connects to `host:port`, optionally written as `tcp://host:port`.
#[derive(Debug, Clone)]
pub struct FramedTcpConnector {
    addr: String,
}

impl FramedTcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        let addr = addr.into();
        let addr = addr
            .strip_prefix("tcp://")
            .map(str::to_string)
            .unwrap_or(addr);
        Self { addr }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Connector for FramedTcpConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, ClientError> {
        debug!(addr = %self.addr, "opening framed tcp");
        let stream = TcpStream::connect(&self.addr).await?;
        Ok(Box::new(FramedTcpTransport {
            stream: BufReader::new(stream),
        }))
    }
}

pub struct FramedTcpTransport {
    stream: BufReader<TcpStream>,
}

#[async_trait]
impl Transport for FramedTcpTransport {
    async fn send_text(&mut self, text: &str) -> Result<(), ClientError> {
        let stream = self.stream.get_mut();
        stream.write_all(&encode_frame(text)).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String, ClientError> {
        read_frame(&mut self.stream).await
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }
}

/// `<char count>|<payload>`.
pub fn encode_frame(payload: &str) -> Vec<u8> {
    let mut frame = format!("{}|", payload.chars().count()).into_bytes();
    frame.extend_from_slice(payload.as_bytes());
    frame
}

/// Reads one length-prefixed frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<String, ClientError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut digits = String::new();
    loop {
        let byte = reader.read_u8().await.map_err(|err| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                ClientError::Connection("connection closed before a reply arrived".into())
            }
            _ => ClientError::from(err),
        })?;
        match byte {
            b'|' => break,
            b'0'..=b'9' if digits.len() < MAX_HEADER_DIGITS => digits.push(byte as char),
            _ => {
                return Err(ClientError::ProtocolDecode(format!(
                    "bad frame header byte {byte:#04x} after '{digits}'"
                )))
            }
        }
    }
    let chars: usize = digits
        .parse()
        .map_err(|_| ClientError::ProtocolDecode("empty frame length".into()))?;

    let mut payload = Vec::with_capacity(chars);
    for _ in 0..chars {
        let lead = reader.read_u8().await?;
        let width = utf8_width(lead).ok_or_else(|| {
            ClientError::ProtocolDecode(format!("frame is not utf-8: bad lead byte {lead:#04x}"))
        })?;
        payload.push(lead);
        let start = payload.len();
        payload.resize(start + width - 1, 0);
        reader.read_exact(&mut payload[start..]).await?;
    }
    String::from_utf8(payload)
        .map_err(|err| ClientError::ProtocolDecode(format!("frame is not utf-8: {err}")))
}

/// Encoded length of the character starting with `lead`.
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7f => Some(1),
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_length_counts_chars() {
        assert_eq!(encode_frame("PMINFO"), b"6|PMINFO".to_vec());
        assert_eq!(encode_frame("é"), b"1|\xc3\xa9".to_vec());
        let line = "PAQURY_LIST_1_CONTIG_Brassica\tnapus_α";
        assert_eq!(encode_frame(line), format!("37|{line}").into_bytes());
        assert_eq!(encode_frame(""), b"0|".to_vec());
    }

    #[tokio::test]
    async fn non_ascii_frame_is_read_whole() {
        let body = r#"{"nodes":[{"data":{"id":"g1","description":"α-amylase, Brassica rapa ssp. pekinensis"}}],"edges":[]}"#;
        let mut wire = encode_frame(body);
        wire.extend_from_slice(&encode_frame("näst"));
        let mut input: &[u8] = &wire;
        assert_eq!(read_frame(&mut input).await.unwrap(), body);
        assert_eq!(read_frame(&mut input).await.unwrap(), "näst");
        assert!(input.is_empty());
    }

    #[tokio::test]
    async fn stray_continuation_byte_is_decode_error() {
        let mut input: &[u8] = b"1|\xa9";
        assert!(matches!(
            read_frame(&mut input).await,
            Err(ClientError::ProtocolDecode(_))
        ));
    }

    #[tokio::test]
    async fn reads_consecutive_frames() {
        let mut input: &[u8] = b"5|hello11|a|b\nc|d|e|f0|";
        assert_eq!(read_frame(&mut input).await.unwrap(), "hello");
        assert_eq!(read_frame(&mut input).await.unwrap(), "a|b\nc|d|e|f");
        assert_eq!(read_frame(&mut input).await.unwrap(), "");
    }

    #[tokio::test]
    async fn truncated_frame_is_connection_error() {
        let mut input: &[u8] = b"10|short";
        assert!(read_frame(&mut input).await.unwrap_err().is_connection());

        let mut empty: &[u8] = b"";
        assert!(read_frame(&mut empty).await.unwrap_err().is_connection());
    }

    #[tokio::test]
    async fn garbage_header_is_decode_error() {
        let mut input: &[u8] = b"x|abc";
        assert!(matches!(
            read_frame(&mut input).await,
            Err(ClientError::ProtocolDecode(_))
        ));
        let mut input: &[u8] = b"|abc";
        assert!(matches!(
            read_frame(&mut input).await,
            Err(ClientError::ProtocolDecode(_))
        ));
    }

    #[test]
    fn tcp_scheme_is_optional() {
        assert_eq!(FramedTcpConnector::new("tcp://db:7000").addr(), "db:7000");
        assert_eq!(FramedTcpConnector::new("db:7000").addr(), "db:7000");
    }
}
