//! Push channel task
//!
//! [`ChannelHandle`] is a thin handle over a background task that owns the
//! transport. The task connects, performs the Socket.IO handshake, answers
//! heartbeats, forwards server events and reconnects with backoff when the
//! transport is lost. Lifecycle and data events are delivered on a bounded
//! channel returned from [`ChannelHandle::start`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use super::error::ChannelError;
use super::messages::{ChannelEvent, ClientEvent, ServerEvent};
use super::packet::{EnginePacket, Handshake, SocketPacket};
use super::transport::{Connector, Transport};
use crate::config::ChannelConfig;

/// Handle to the push channel task
///
/// Declarations are queued to the task over an unbounded channel and return
/// immediately. Dropping the handle aborts the task.
pub struct ChannelHandle {
    cmd_tx: mpsc::UnboundedSender<ClientEvent>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
    closed: Arc<AtomicBool>,
}

impl ChannelHandle {
    /// Spawn the channel task and return the handle plus its event receiver
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        connector: impl Connector + 'static,
        config: ChannelConfig,
    ) -> (Self, mpsc::Receiver<ChannelEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (event_tx, event_rx) = mpsc::channel::<ChannelEvent>(config.event_channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let closed = Arc::new(AtomicBool::new(false));
        let shutdown_timeout = config.shutdown_timeout();

        let task = tokio::spawn(channel_loop(
            Box::new(connector),
            config,
            cmd_rx,
            event_tx,
            shutdown_rx,
            Arc::clone(&closed),
        ));

        let handle = Self {
            cmd_tx,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout,
            closed,
        };

        (handle, event_rx)
    }

    /// Queue an event for the server
    ///
    /// Events queued while the link is down are discarded on reconnect.
    pub fn emit(&self, event: ClientEvent) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::NotConnected);
        }
        self.cmd_tx
            .send(event)
            .map_err(|_| ChannelError::NotConnected)
    }

    /// Signal the task to close the transport. Returns immediately.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        if let Some(tx) = self.shutdown_tx.take() {
            tracing::debug!("Channel close requested");
            let _ = tx.send(());
        }
    }

    /// Close and wait for the task to exit, aborting it after the timeout
    pub async fn shutdown(&mut self) {
        self.close();

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    tracing::warn!("channel task terminated with join error: {join_err}");
                }
                Err(_) => {
                    tracing::warn!("channel task did not exit within timeout; aborting");
                    task.abort();
                }
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("closed", &self.is_closed())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// How a single link ended
enum LinkEnd {
    Shutdown,
    Lost {
        reason: String,
        was_connected: bool,
    },
}

async fn channel_loop(
    connector: Box<dyn Connector>,
    config: ChannelConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientEvent>,
    event_tx: mpsc::Sender<ChannelEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
    closed: Arc<AtomicBool>,
) {
    tracing::debug!("channel task started");
    let mut attempt: u32 = 0;

    loop {
        emit_event(&event_tx, ChannelEvent::Connecting { attempt }).await;

        let opened = tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            opened = connector.connect() => opened,
        };

        match opened {
            Ok((transport, handshake)) => {
                // Declarations from a previous link are stale; the owner
                // re-declares once this link is acknowledged.
                let mut stale = 0;
                while cmd_rx.try_recv().is_ok() {
                    stale += 1;
                }
                if stale > 0 {
                    tracing::debug!(count = stale, "Discarded stale declarations");
                }

                match run_link(transport, handshake, &mut cmd_rx, &event_tx, &mut shutdown_rx).await {
                    LinkEnd::Shutdown => break,
                    LinkEnd::Lost {
                        reason,
                        was_connected,
                    } => {
                        tracing::warn!(reason = %reason, "Push channel lost");
                        if was_connected {
                            attempt = 0;
                        }
                        let event = ChannelEvent::Disconnected {
                            reason: Some(reason),
                        };
                        deliver_event(&event_tx, event).await;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Push channel connect failed");
            }
        }

        if let Some(max) = config.max_reconnect_attempts {
            if attempt >= max {
                tracing::error!(attempts = attempt, "Giving up on push channel");
                deliver_event(
                    &event_tx,
                    ChannelEvent::Disconnected {
                        reason: Some("reconnect attempts exhausted".to_string()),
                    },
                )
                .await;
                break;
            }
        }

        let delay = config.reconnect_delay(attempt);
        attempt = attempt.saturating_add(1);
        tracing::debug!(delay_ms = delay.as_millis() as u64, attempt, "Reconnecting");

        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    closed.store(true, Ordering::Release);
    if event_tx.send(ChannelEvent::Closed).await.is_err() {
        tracing::debug!("event channel closed, receiver dropped");
    }
    tracing::debug!("channel task exited");
}

/// Drive one established transport until it is lost or shut down
async fn run_link(
    mut transport: Box<dyn Transport>,
    handshake: Handshake,
    cmd_rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
    event_tx: &mpsc::Sender<ChannelEvent>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> LinkEnd {
    let kind = transport.kind();
    let mut connected = false;

    let lost = |reason: String, connected: bool| LinkEnd::Lost {
        reason,
        was_connected: connected,
    };

    if let Err(e) = transport.send(SocketPacket::connect().into_engine()).await {
        return lost(format!("connect send failed: {}", e), false);
    }

    let heartbeat = handshake.heartbeat_deadline();
    let mut deadline = Instant::now() + heartbeat;

    loop {
        tokio::select! {
            biased;

            _ = &mut *shutdown_rx => {
                if connected {
                    let _ = transport.send(SocketPacket::disconnect().into_engine()).await;
                }
                let _ = transport.close().await;
                return LinkEnd::Shutdown;
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(event) if connected => {
                        let packet = match event.to_packet() {
                            Ok(packet) => packet,
                            Err(e) => {
                                tracing::error!(error = %e, "failed to serialize client event");
                                continue;
                            }
                        };
                        tracing::debug!(event = event.name(), "Emitting");
                        if let Err(e) = transport.send(packet.into_engine()).await {
                            return lost(format!("send failed: {}", e), connected);
                        }
                    }
                    Some(event) => {
                        tracing::debug!(event = event.name(), "Dropping event before handshake");
                    }
                    // Every handle is gone
                    None => {
                        let _ = transport.close().await;
                        return LinkEnd::Shutdown;
                    }
                }
            }

            _ = tokio::time::sleep_until(deadline) => {
                return lost("heartbeat timeout".to_string(), connected);
            }

            incoming = transport.recv() => {
                let packet = match incoming {
                    Some(Ok(packet)) => packet,
                    Some(Err(e)) => return lost(format!("receive failed: {}", e), connected),
                    None => return lost("transport closed".to_string(), connected),
                };
                deadline = Instant::now() + heartbeat;

                match packet {
                    EnginePacket::Ping(data) => {
                        if let Err(e) = transport.send(EnginePacket::Pong(data)).await {
                            return lost(format!("pong failed: {}", e), connected);
                        }
                    }
                    EnginePacket::Close => {
                        return lost("server closed the session".to_string(), connected);
                    }
                    EnginePacket::Message(text) => {
                        match SocketPacket::decode(&text) {
                            Ok(SocketPacket::Connect { .. }) => {
                                connected = true;
                                tracing::info!(transport = %kind, "Push channel connected");
                                deliver_event(event_tx, ChannelEvent::Connected { transport: kind }).await;
                            }
                            Ok(SocketPacket::ConnectError { data, .. }) => {
                                return lost(format!("connect rejected: {}", data), connected);
                            }
                            Ok(SocketPacket::Disconnect { .. }) => {
                                return lost("server disconnected the socket".to_string(), connected);
                            }
                            Ok(SocketPacket::Event { name, args, .. }) => {
                                dispatch_server_event(event_tx, &name, args).await;
                            }
                            Ok(SocketPacket::Ack { ack, .. }) => {
                                tracing::debug!(ack, "Ignoring ack");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, raw = %text, "Invalid socket packet");
                            }
                        }
                    }
                    EnginePacket::Open(_) => {
                        tracing::warn!("Unexpected open packet on established transport");
                    }
                    EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
                }
            }
        }
    }
}

async fn dispatch_server_event(
    event_tx: &mpsc::Sender<ChannelEvent>,
    name: &str,
    args: Vec<serde_json::Value>,
) {
    match ServerEvent::from_event(name, args) {
        Ok(ServerEvent::ConnectionResponse(data)) => {
            deliver_event(event_tx, ChannelEvent::ConnectionResponse(data)).await;
        }
        Ok(ServerEvent::LeaderboardUpdate(update)) => {
            tracing::debug!(rows = update.leaderboard.len(), "Leaderboard update received");
            deliver_event(event_tx, ChannelEvent::LeaderboardUpdate(update.leaderboard)).await;
        }
        Ok(ServerEvent::Unknown { name }) => {
            tracing::debug!(event = %name, "Ignoring unknown server event");
        }
        Err(e) => {
            tracing::warn!(event = %name, error = %e, "Malformed server event");
        }
    }
}

/// Emit a progress event without blocking the task; drop it if the owner lags
async fn emit_event(event_tx: &mpsc::Sender<ChannelEvent>, event: ChannelEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            tracing::warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!("event channel closed, receiver dropped");
        }
    }
}

/// Deliver an event the owner must see, waiting for queue space.
/// Connectivity changes and rankings are never dropped.
async fn deliver_event(event_tx: &mpsc::Sender<ChannelEvent>, event: ChannelEvent) {
    if event_tx.send(event).await.is_err() {
        tracing::debug!("event channel closed, receiver dropped");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transports for exercising the channel task

    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// A transport fed from a channel and recording what it sends
    pub struct MockTransport {
        pub incoming: mpsc::UnboundedReceiver<Option<String>>,
        pub sent: Arc<StdMutex<Vec<String>>>,
        pub closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        fn kind(&self) -> crate::config::TransportKind {
            crate::config::TransportKind::Websocket
        }

        async fn send(&mut self, packet: EnginePacket) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(packet.encode());
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<EnginePacket, ChannelError>> {
            match self.incoming.recv().await {
                Some(Some(text)) => Some(EnginePacket::decode(&text)),
                // An explicit `None` script entry closes the transport
                Some(None) => None,
                // Script exhausted: stay open until shutdown
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<(), ChannelError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    /// Script handle for one mock link
    pub struct MockLink {
        pub server: mpsc::UnboundedSender<Option<String>>,
        pub sent: Arc<StdMutex<Vec<String>>>,
        pub closed: Arc<AtomicBool>,
    }

    impl MockLink {
        pub fn push(&self, text: &str) {
            let _ = self.server.send(Some(text.to_string()));
        }

        pub fn drop_transport(&self) {
            let _ = self.server.send(None);
        }

        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    /// Hands out pre-built transports, one per connect
    pub struct MockConnector {
        links: StdMutex<VecDeque<MockTransport>>,
    }

    impl MockConnector {
        pub fn new(count: usize) -> (Self, Vec<MockLink>) {
            let mut transports = VecDeque::new();
            let mut links = Vec::new();
            for _ in 0..count {
                let (server, incoming) = mpsc::unbounded_channel();
                let sent = Arc::new(StdMutex::new(Vec::new()));
                let closed = Arc::new(AtomicBool::new(false));
                transports.push_back(MockTransport {
                    incoming,
                    sent: Arc::clone(&sent),
                    closed: Arc::clone(&closed),
                });
                links.push(MockLink {
                    server,
                    sent,
                    closed,
                });
            }
            (
                Self {
                    links: StdMutex::new(transports),
                },
                links,
            )
        }
    }

    pub fn handshake() -> Handshake {
        Handshake {
            sid: "test-sid".to_string(),
            upgrades: vec![],
            ping_interval: 25_000,
            ping_timeout: 20_000,
            max_payload: None,
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self) -> Result<(Box<dyn Transport>, Handshake), ChannelError> {
            let next = self.links.lock().unwrap().pop_front();
            match next {
                Some(transport) => {
                    let transport: Box<dyn Transport> = Box::new(transport);
                    Ok((transport, handshake()))
                }
                None => Err(ChannelError::Closed),
            }
        }
    }

    pub fn fast_config() -> ChannelConfig {
        ChannelConfig {
            reconnect_delay_ms: 10,
            reconnect_delay_max_ms: 20,
            ..ChannelConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::model::Interest;

    async fn next_event(rx: &mut mpsc::Receiver<ChannelEvent>) -> ChannelEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for channel event")
            .expect("event channel closed")
    }

    async fn wait_for_sent(link: &MockLink, count: usize) -> Vec<String> {
        for _ in 0..200 {
            let sent = link.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        link.sent()
    }

    #[tokio::test]
    async fn test_handshake_and_update() {
        let (connector, links) = MockConnector::new(1);
        let (mut handle, mut events) = ChannelHandle::start(connector, fast_config());

        assert_eq!(next_event(&mut events).await, ChannelEvent::Connecting { attempt: 0 });
        assert_eq!(wait_for_sent(&links[0], 1).await, vec!["40".to_string()]);

        links[0].push(r#"40{"sid":"abc"}"#);
        assert!(matches!(
            next_event(&mut events).await,
            ChannelEvent::Connected { .. }
        ));

        links[0].push(r#"42["connection_response",{"data":"Connected"}]"#);
        assert!(matches!(
            next_event(&mut events).await,
            ChannelEvent::ConnectionResponse(_)
        ));

        links[0].push(r#"42["leaderboard_update",{"leaderboard":[{"id":"a","name":"Alpha","score":10}]}]"#);
        match next_event(&mut events).await {
            ChannelEvent::LeaderboardUpdate(rows) => assert_eq!(rows[0].id, "a"),
            other => panic!("Expected LeaderboardUpdate, got {:?}", other),
        }

        handle.shutdown().await;
        assert!(links[0].closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_answers_ping() {
        let (connector, links) = MockConnector::new(1);
        let (mut handle, _events) = ChannelHandle::start(connector, fast_config());

        wait_for_sent(&links[0], 1).await;
        links[0].push("2");
        let sent = wait_for_sent(&links[0], 2).await;
        assert_eq!(sent, vec!["40".to_string(), "3".to_string()]);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_emit_after_connect() {
        let (connector, links) = MockConnector::new(1);
        let (mut handle, mut events) = ChannelHandle::start(connector, fast_config());

        next_event(&mut events).await;
        links[0].push("40");
        next_event(&mut events).await;

        handle
            .emit(ClientEvent::from(&Interest::Team("a".into())))
            .unwrap();
        let sent = wait_for_sent(&links[0], 2).await;
        assert_eq!(sent[1], r#"42["request_leaderboard",{"team_id":"a"}]"#);

        handle.shutdown().await;
        // Socket.IO disconnect is sent before the transport closes
        assert_eq!(links[0].sent().last().map(String::as_str), Some("41"));
    }

    #[tokio::test]
    async fn test_reconnects_after_loss() {
        let (connector, links) = MockConnector::new(2);
        let (mut handle, mut events) = ChannelHandle::start(connector, fast_config());

        next_event(&mut events).await;
        links[0].push("40");
        assert!(matches!(next_event(&mut events).await, ChannelEvent::Connected { .. }));

        links[0].drop_transport();
        assert!(matches!(
            next_event(&mut events).await,
            ChannelEvent::Disconnected { .. }
        ));
        assert_eq!(next_event(&mut events).await, ChannelEvent::Connecting { attempt: 1 });

        wait_for_sent(&links[1], 1).await;
        links[1].push("40");
        assert!(matches!(next_event(&mut events).await, ChannelEvent::Connected { .. }));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_full_queue_still_delivers_connect_and_update() {
        let (connector, links) = MockConnector::new(1);
        let config = ChannelConfig {
            event_channel_capacity: 1,
            ..fast_config()
        };
        let (mut handle, mut events) = ChannelHandle::start(connector, config);

        // Connecting fills the queue; nothing is read until both packets are in
        wait_for_sent(&links[0], 1).await;
        links[0].push("40");
        links[0].push(r#"42["leaderboard_update",{"leaderboard":[{"id":"a","name":"Alpha","score":10}]}]"#);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(next_event(&mut events).await, ChannelEvent::Connecting { attempt: 0 });
        assert!(matches!(
            next_event(&mut events).await,
            ChannelEvent::Connected { .. }
        ));
        match next_event(&mut events).await {
            ChannelEvent::LeaderboardUpdate(rows) => assert_eq!(rows[0].id, "a"),
            other => panic!("Expected LeaderboardUpdate, got {:?}", other),
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_declarations_from_lost_link_are_discarded() {
        let (connector, links) = MockConnector::new(2);
        let config = ChannelConfig {
            reconnect_delay_ms: 200,
            reconnect_delay_max_ms: 200,
            ..ChannelConfig::default()
        };
        let (mut handle, mut events) = ChannelHandle::start(connector, config);

        next_event(&mut events).await;
        links[0].push("40");
        assert!(matches!(next_event(&mut events).await, ChannelEvent::Connected { .. }));

        links[0].drop_transport();
        assert!(matches!(
            next_event(&mut events).await,
            ChannelEvent::Disconnected { .. }
        ));

        // Queued during the reconnect delay, before the next link opens
        handle
            .emit(ClientEvent::from(&Interest::Team("a".into())))
            .unwrap();

        assert_eq!(next_event(&mut events).await, ChannelEvent::Connecting { attempt: 1 });
        assert_eq!(wait_for_sent(&links[1], 1).await, vec!["40".to_string()]);
        links[1].push("40");
        assert!(matches!(next_event(&mut events).await, ChannelEvent::Connected { .. }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(links[1].sent(), vec!["40".to_string()]);

        handle
            .emit(ClientEvent::from(&Interest::All))
            .unwrap();
        let sent = wait_for_sent(&links[1], 2).await;
        assert_eq!(sent, vec!["40".to_string(), r#"42["request_leaderboard",{}]"#.to_string()]);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (connector, _links) = MockConnector::new(0);
        let config = ChannelConfig {
            max_reconnect_attempts: Some(2),
            ..fast_config()
        };
        let (_handle, mut events) = ChannelHandle::start(connector, config);

        let mut saw_disconnected = false;
        loop {
            match next_event(&mut events).await {
                ChannelEvent::Disconnected { .. } => saw_disconnected = true,
                ChannelEvent::Closed => break,
                _ => {}
            }
        }
        assert!(saw_disconnected);
    }

    #[tokio::test]
    async fn test_emit_after_close_fails() {
        let (connector, _links) = MockConnector::new(1);
        let (mut handle, _events) = ChannelHandle::start(connector, fast_config());

        handle.close();
        assert!(handle.is_closed());
        assert!(matches!(
            handle.emit(ClientEvent::from(&Interest::All)),
            Err(ChannelError::NotConnected)
        ));
        handle.shutdown().await;
    }
}
