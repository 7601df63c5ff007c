//! Engine.IO transports
//!
//! A [`Transport`] moves engine packets to and from the server. Two are
//! provided: a persistent WebSocket and HTTP long-polling. [`SocketIoConnector`]
//! tries them in the configured order and returns the first that completes the
//! Engine.IO open handshake.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::error::ChannelError;
use super::packet::{decode_payload, encode_payload, EnginePacket, Handshake};
use crate::config::{ChannelConfig, ServerConfig, TransportKind};

/// Engine.IO protocol revision spoken by this client
pub const ENGINE_IO_VERSION: u8 = 4;

/// Bidirectional engine packet pipe
///
/// `recv` must be cancel-safe: the channel loop polls it inside `select!`.
#[async_trait]
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    async fn send(&mut self, packet: EnginePacket) -> Result<(), ChannelError>;

    /// Next packet, or `None` once the transport has closed
    async fn recv(&mut self) -> Option<Result<EnginePacket, ChannelError>>;

    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// Opens transports for the channel loop
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<(Box<dyn Transport>, Handshake), ChannelError>;
}

/// Socket.IO endpoint on the leaderboard server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
    path: String,
}

impl Endpoint {
    pub fn new(base_url: &str, path: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            path: path.trim_matches('/').to_string(),
        }
    }

    /// URL for `kind`, with the session id once one has been assigned
    pub fn url(&self, kind: TransportKind, sid: Option<&str>) -> String {
        let base = match kind {
            TransportKind::Websocket => to_ws_scheme(&self.base_url),
            TransportKind::Polling => self.base_url.clone(),
        };
        let mut url = format!(
            "{}/{}/?EIO={}&transport={}",
            base,
            self.path,
            ENGINE_IO_VERSION,
            kind.as_str()
        );
        if let Some(sid) = sid {
            url.push_str("&sid=");
            url.push_str(&urlencoding::encode(sid));
        }
        url
    }
}

fn to_ws_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        url.to_string()
    }
}

// ── WebSocket ───────────────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Engine.IO over a single WebSocket
pub struct WebSocketTransport {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl WebSocketTransport {
    /// Connect and wait for the engine open packet
    pub async fn connect(url: &str) -> Result<(Self, Handshake), ChannelError> {
        let (socket, _response) = tokio_tungstenite::connect_async(url).await?;
        let (sink, stream) = socket.split();
        let mut transport = Self { sink, stream };

        match transport.recv().await {
            Some(Ok(EnginePacket::Open(handshake))) => Ok((transport, handshake)),
            Some(Ok(other)) => Err(ChannelError::Protocol(format!(
                "expected open packet, got {:?}",
                other
            ))),
            Some(Err(e)) => Err(e),
            None => Err(ChannelError::Closed),
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Websocket
    }

    async fn send(&mut self, packet: EnginePacket) -> Result<(), ChannelError> {
        self.sink.send(Message::Text(packet.encode())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<EnginePacket, ChannelError>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(EnginePacket::decode(&text)),
                Some(Ok(Message::Binary(_))) => {
                    tracing::debug!("Ignoring binary WebSocket frame");
                }
                // tungstenite answers pings itself
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(frame = ?frame, "WebSocket closed by server");
                    return None;
                }
                Some(Err(e)) => return Some(Err(e.into())),
                None => return None,
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        let _ = self.sink.send(Message::Close(None)).await;
        self.sink.close().await?;
        Ok(())
    }
}

// ── Long-polling ────────────────────────────────────────────────────

/// Engine.IO over HTTP long-polling
///
/// A background task keeps one GET outstanding and forwards decoded packets
/// through a channel, so `recv` never drops a response half-read.
pub struct PollingTransport {
    client: reqwest::Client,
    url: String,
    inbox: mpsc::Receiver<Result<EnginePacket, ChannelError>>,
    poller: JoinHandle<()>,
}

impl PollingTransport {
    /// Perform the open request and start polling
    pub async fn connect(
        client: reqwest::Client,
        endpoint: &Endpoint,
    ) -> Result<(Self, Handshake), ChannelError> {
        let open_url = endpoint.url(TransportKind::Polling, None);
        let body = poll_once(&client, &open_url, None).await?;
        let mut packets = decode_payload(&body)?.into_iter();

        let handshake = match packets.next() {
            Some(EnginePacket::Open(handshake)) => handshake,
            Some(other) => {
                return Err(ChannelError::Protocol(format!(
                    "expected open packet, got {:?}",
                    other
                )))
            }
            None => return Err(ChannelError::Protocol("empty open response".to_string())),
        };

        let url = endpoint.url(TransportKind::Polling, Some(&handshake.sid));
        let (tx, inbox) = mpsc::channel(64);

        for packet in packets {
            let _ = tx.try_send(Ok(packet));
        }

        let poller = tokio::spawn(poll_loop(
            client.clone(),
            url.clone(),
            handshake.heartbeat_deadline(),
            tx,
        ));

        Ok((
            Self {
                client,
                url,
                inbox,
                poller,
            },
            handshake,
        ))
    }
}

async fn poll_once(
    client: &reqwest::Client,
    url: &str,
    timeout: Option<Duration>,
) -> Result<String, ChannelError> {
    let mut request = client.get(url);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(ChannelError::HttpStatus(response.status().as_u16()));
    }
    Ok(response.text().await?)
}

async fn poll_loop(
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    tx: mpsc::Sender<Result<EnginePacket, ChannelError>>,
) {
    loop {
        let packets = match poll_once(&client, &url, Some(timeout)).await {
            Ok(body) => decode_payload(&body),
            Err(e) => Err(e),
        };

        match packets {
            Ok(packets) => {
                for packet in packets {
                    let closing = packet == EnginePacket::Close;
                    if tx.send(Ok(packet)).await.is_err() || closing {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
}

#[async_trait]
impl Transport for PollingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Polling
    }

    async fn send(&mut self, packet: EnginePacket) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "text/plain;charset=UTF-8")
            .body(encode_payload(&[packet]))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChannelError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<EnginePacket, ChannelError>> {
        self.inbox.recv().await
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.poller.abort();
        self.send(EnginePacket::Close).await
    }
}

impl Drop for PollingTransport {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

// ── Connector ───────────────────────────────────────────────────────

/// Opens the first configured transport that completes the handshake
pub struct SocketIoConnector {
    endpoint: Endpoint,
    transports: Vec<TransportKind>,
    http: reqwest::Client,
    handshake_timeout: Duration,
}

impl SocketIoConnector {
    pub fn new(
        endpoint: Endpoint,
        transports: Vec<TransportKind>,
        handshake_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            endpoint,
            transports,
            http,
            handshake_timeout,
        })
    }

    pub fn from_config(server: &ServerConfig, channel: &ChannelConfig) -> Result<Self, ChannelError> {
        Self::new(
            Endpoint::new(&server.url, &channel.path),
            channel.transports.clone(),
            server.request_timeout(),
        )
    }

    async fn open(&self, kind: TransportKind) -> Result<(Box<dyn Transport>, Handshake), ChannelError> {
        match kind {
            TransportKind::Websocket => {
                let url = self.endpoint.url(kind, None);
                let (transport, handshake) = WebSocketTransport::connect(&url).await?;
                let transport: Box<dyn Transport> = Box::new(transport);
                Ok((transport, handshake))
            }
            TransportKind::Polling => {
                let (transport, handshake) =
                    PollingTransport::connect(self.http.clone(), &self.endpoint).await?;
                let transport: Box<dyn Transport> = Box::new(transport);
                Ok((transport, handshake))
            }
        }
    }
}

#[async_trait]
impl Connector for SocketIoConnector {
    async fn connect(&self) -> Result<(Box<dyn Transport>, Handshake), ChannelError> {
        let mut last_error = ChannelError::NoTransport;

        for &kind in &self.transports {
            match tokio::time::timeout(self.handshake_timeout, self.open(kind)).await {
                Ok(Ok((transport, handshake))) => {
                    tracing::debug!(transport = %kind, sid = %handshake.sid, "Engine.IO open");
                    return Ok((transport, handshake));
                }
                Ok(Err(e)) => {
                    tracing::warn!(transport = %kind, error = %e, "Transport failed to open");
                    last_error = e;
                }
                Err(_) => {
                    tracing::warn!(transport = %kind, "Transport handshake timed out");
                    last_error = ChannelError::HandshakeTimeout;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite;

    #[test]
    fn test_websocket_url() {
        let endpoint = Endpoint::new("http://localhost:8003/", "/socket.io/");
        assert_eq!(
            endpoint.url(TransportKind::Websocket, None),
            "ws://localhost:8003/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_secure_websocket_url() {
        let endpoint = Endpoint::new("https://scores.example.com", "socket.io");
        assert!(endpoint
            .url(TransportKind::Websocket, None)
            .starts_with("wss://scores.example.com/socket.io/"));
    }

    #[tokio::test]
    async fn test_secure_websocket_attempts_tls() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hang up so the TLS handshake fails
            while let Ok((stream, _)) = listener.accept().await {
                drop(stream);
            }
        });

        let endpoint = Endpoint::new(&format!("https://{}", addr), "socket.io");
        let url = endpoint.url(TransportKind::Websocket, None);
        let err = WebSocketTransport::connect(&url)
            .await
            .err()
            .expect("plain TCP listener cannot complete a TLS handshake");

        match err {
            ChannelError::WebSocket(inner) => assert!(
                !matches!(
                    *inner,
                    tungstenite::Error::Url(tungstenite::error::UrlError::TlsFeatureNotEnabled)
                ),
                "wss URLs must be supported"
            ),
            other => panic!("Expected WebSocket error, got {:?}", other),
        }
    }

    #[test]
    fn test_polling_url_with_sid() {
        let endpoint = Endpoint::new("http://localhost:8003", "socket.io");
        assert_eq!(
            endpoint.url(TransportKind::Polling, Some("ab+c")),
            "http://localhost:8003/socket.io/?EIO=4&transport=polling&sid=ab%2Bc"
        );
    }

    #[tokio::test]
    async fn test_connector_without_transports() {
        let connector = SocketIoConnector::new(
            Endpoint::new("http://127.0.0.1:9", "socket.io"),
            vec![],
            Duration::from_secs(1),
        )
        .unwrap();

        let result = connector.connect().await;
        assert!(matches!(result, Err(ChannelError::NoTransport)));
    }
}
