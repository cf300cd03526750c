//! WebSocket connection and the outbound sender loop
//!
//! The connection's receive task is the only reader of the socket and the
//! sender loop is the only writer. Neither touches the game state: inbound
//! frames become [`Event`]s on the inbound queue, outbound requests are taken
//! from the outbound queue one at a time.

use crate::queue::BoundedQueue;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use shared::{DecodeTable, Event, Request};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("not connected")]
    NotConnected,
    #[error("connection already started")]
    AlreadyStarted,
    #[error("connection is closed, build a new one to reconnect")]
    Closed,
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    NotConnected,
    Connected,
    Failed,
}

/// Items on the outbound queue
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Send(Request),
    /// Wakes the sender loop so it can exit
    Stop,
}

/// Anything the sender loop can write a raw frame to
pub trait Transport: Send + Sync {
    fn send(&self, raw: &str) -> Result<(), ConnectionError>;
}

/// Turns the four socket transitions into events on the inbound queue
#[derive(Clone)]
struct InboundSignals {
    inbound: Arc<BoundedQueue<Event>>,
    table: Arc<DecodeTable>,
}

impl InboundSignals {
    fn on_open(&self) {
        info!("Connection established");
        self.inbound.put(Event::connection_established());
    }

    fn on_message(&self, text: &str) {
        match self.table.decode(text) {
            Ok(event) => self.inbound.put(event),
            Err(e) => {
                warn!("Failed to decode frame: {} | raw: {}", e, text);
                self.inbound.put(Event::error(format!("JSON Error: {}", e)));
            }
        }
    }

    fn on_close(&self, frame: Option<CloseFrame<'_>>) {
        let (code, reason) = match frame {
            Some(frame) => (u16::from(frame.code), frame.reason.into_owned()),
            None => (1005, String::new()),
        };
        info!("Connection closed: {} {}", code, reason);
        self.inbound
            .put(Event::error(format!("Connection Closed: {} {}", code, reason)));
    }

    fn on_error(&self, reason: &str) {
        error!("Connection error: {}", reason);
        self.inbound
            .put(Event::error(format!("Connection Error: {}", reason)));
    }
}

/// One WebSocket session. A failed connection is not reused; build a new one to retry.
pub struct Connection {
    url: String,
    signals: InboundSignals,
    runtime: Handle,
    sink: Arc<tokio::sync::Mutex<Option<WsSink>>>,
    phase: Arc<Mutex<ConnectionPhase>>,
    started: AtomicBool,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Must be called from within a tokio runtime; the connection keeps a
    /// handle to it for its receive task.
    pub fn new(url: &str, inbound: Arc<BoundedQueue<Event>>, table: Arc<DecodeTable>) -> Self {
        Self {
            url: url.to_string(),
            signals: InboundSignals { inbound, table },
            runtime: Handle::current(),
            sink: Arc::new(tokio::sync::Mutex::new(None)),
            phase: Arc::new(Mutex::new(ConnectionPhase::NotConnected)),
            started: AtomicBool::new(false),
            reader: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn phase(&self) -> ConnectionPhase {
        *self.phase.lock()
    }

    /// Opens the socket in the background and starts the receive task.
    /// Connect failures are reported as events, not returned. A connection
    /// starts at most once, even after `close`.
    pub fn start(&self) -> Result<(), ConnectionError> {
        if self.phase() != ConnectionPhase::NotConnected {
            return Err(ConnectionError::Closed);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ConnectionError::AlreadyStarted);
        }
        let mut reader = self.reader.lock();

        let url = self.url.clone();
        let signals = self.signals.clone();
        let sink = Arc::clone(&self.sink);
        let phase = Arc::clone(&self.phase);

        *reader = Some(self.runtime.spawn(async move {
            info!("Connecting to {}", url);
            let stream = match connect_async(url.as_str()).await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    *phase.lock() = ConnectionPhase::Failed;
                    signals.on_error(&e.to_string());
                    return;
                }
            };

            let (write, mut read) = stream.split();
            *sink.lock().await = Some(write);
            *phase.lock() = ConnectionPhase::Connected;
            signals.on_open();

            loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => signals.on_message(&text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => signals.on_message(&text),
                        Err(e) => signals.on_message(&format!("<binary frame: {}>", e)),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        signals.on_close(frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        signals.on_error(&e.to_string());
                        break;
                    }
                    None => {
                        signals.on_close(None);
                        break;
                    }
                }
            }

            *phase.lock() = ConnectionPhase::Failed;
            sink.lock().await.take();
            debug!("Receive loop finished");
        }));

        Ok(())
    }

    /// Sends a close frame and stops the receive task
    pub async fn close(&self) {
        let open_sink = self.sink.lock().await.take();
        if let Some(mut sink) = open_sink {
            if let Err(e) = sink.close().await {
                debug!("Close handshake failed: {}", e);
            }
        }

        let reader = self.reader.lock().take();
        if let Some(reader) = reader {
            if !reader.is_finished() {
                reader.abort();
                self.signals.on_close(None);
            }
        }
        *self.phase.lock() = ConnectionPhase::Failed;
    }
}

impl Transport for Connection {
    /// Writes one text frame. Blocks the calling thread, so it must be called
    /// from outside the async runtime, which the sender loop is.
    fn send(&self, raw: &str) -> Result<(), ConnectionError> {
        self.runtime.block_on(async {
            let mut sink = self.sink.lock().await;
            match sink.as_mut() {
                Some(sink) => sink
                    .send(Message::Text(raw.to_string()))
                    .await
                    .map_err(ConnectionError::from),
                None => Err(ConnectionError::NotConnected),
            }
        })
    }
}

/// Drains the outbound queue into `transport` until `running` is cleared or a
/// [`Outgoing::Stop`] is taken. Failed sends are logged and skipped.
pub fn run_sender<T: Transport + ?Sized>(
    outbound: &BoundedQueue<Outgoing>,
    transport: &T,
    running: &AtomicBool,
) {
    while running.load(Ordering::Acquire) {
        let request = match outbound.take() {
            Outgoing::Send(request) => request,
            Outgoing::Stop => break,
        };

        let text = match request.encode() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode {}: {}", request.kind().as_str(), e);
                continue;
            }
        };

        match transport.send(&text) {
            Ok(()) => debug!("Sent {}", text),
            Err(e) => error!("Failed to send {}: {}", request.kind().as_str(), e),
        }
    }
    debug!("Sender loop finished");
}

/// Runs [`run_sender`] on its own OS thread
pub fn spawn_sender<T: Transport + 'static>(
    outbound: Arc<BoundedQueue<Outgoing>>,
    transport: Arc<T>,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || run_sender(&outbound, transport.as_ref(), &running))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Direction, EventKind};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
        fail_first: AtomicBool,
    }

    impl Transport for RecordingTransport {
        fn send(&self, raw: &str) -> Result<(), ConnectionError> {
            if self.fail_first.swap(false, Ordering::SeqCst) {
                return Err(ConnectionError::NotConnected);
            }
            self.sent.lock().push(raw.to_string());
            Ok(())
        }
    }

    fn signals() -> (InboundSignals, Arc<BoundedQueue<Event>>) {
        let inbound = Arc::new(BoundedQueue::new());
        let signals = InboundSignals {
            inbound: Arc::clone(&inbound),
            table: Arc::new(DecodeTable::standard()),
        };
        (signals, inbound)
    }

    #[test]
    fn test_sender_preserves_order_and_stops_on_sentinel() {
        let outbound = Arc::new(BoundedQueue::new());
        let transport = Arc::new(RecordingTransport::default());
        let running = Arc::new(AtomicBool::new(true));

        outbound.put(Outgoing::Send(Request::init()));
        outbound.put(Outgoing::Send(Request::movement(Direction::Left)));
        outbound.put(Outgoing::Stop);
        outbound.put(Outgoing::Send(Request::attack()));

        run_sender(&outbound, transport.as_ref(), &running);

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("\"INIT\""));
        assert!(sent[1].contains("\"LEFT\""));
        assert_eq!(outbound.len(), 1);
    }

    #[test]
    fn test_sender_continues_after_failed_send() {
        let outbound = BoundedQueue::new();
        let transport = RecordingTransport::default();
        transport.fail_first.store(true, Ordering::SeqCst);
        let running = AtomicBool::new(true);

        outbound.put(Outgoing::Send(Request::attack()));
        outbound.put(Outgoing::Send(Request::interact()));
        outbound.put(Outgoing::Stop);

        run_sender(&outbound, &transport, &running);

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("INTERACT"));
    }

    #[test]
    fn test_blocked_sender_wakes_on_stop() {
        let outbound = Arc::new(BoundedQueue::new());
        let transport = Arc::new(RecordingTransport::default());
        let running = Arc::new(AtomicBool::new(true));

        let handle = spawn_sender(
            Arc::clone(&outbound),
            Arc::clone(&transport),
            Arc::clone(&running),
        );

        std::thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::Release);
        outbound.put(Outgoing::Stop);

        handle.join().unwrap();
        assert!(transport.sent.lock().is_empty());
    }

    #[test]
    fn test_bad_frame_becomes_error_event() {
        let (signals, inbound) = signals();
        signals.on_message("{not json");

        let event = inbound.try_take().unwrap();
        assert_eq!(event.kind(), &EventKind::Error);
        assert!(event.payload().as_str().unwrap().starts_with("JSON Error: "));
    }

    #[test]
    fn test_transitions_produce_events_in_order() {
        let (signals, inbound) = signals();
        signals.on_open();
        signals.on_message(r#"{"type": "SEND_MESSAGE", "payload": "hi"}"#);
        signals.on_error("reset by peer");
        signals.on_close(None);

        assert_eq!(
            inbound.try_take().unwrap().kind(),
            &EventKind::ConnectionEstablished
        );
        assert_eq!(inbound.try_take().unwrap().kind(), &EventKind::Message);
        assert_eq!(
            inbound.try_take().unwrap().payload().as_str(),
            Some("Connection Error: reset by peer")
        );
        assert_eq!(
            inbound.try_take().unwrap().payload().as_str(),
            Some("Connection Closed: 1005 ")
        );
        assert!(inbound.try_take().is_none());
    }

    #[tokio::test]
    async fn test_send_before_connect_is_rejected() {
        let inbound = Arc::new(BoundedQueue::new());
        let connection = Arc::new(Connection::new(
            "ws://127.0.0.1:9/game",
            inbound,
            Arc::new(DecodeTable::standard()),
        ));

        assert_eq!(connection.phase(), ConnectionPhase::NotConnected);
        let result = tokio::task::spawn_blocking({
            let connection = Arc::clone(&connection);
            move || connection.send("{}")
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(ConnectionError::NotConnected)));
    }

    #[test]
    fn test_close_before_start_is_quiet() {
        tokio_test::block_on(async {
            let inbound = Arc::new(BoundedQueue::new());
            let connection = Connection::new(
                "ws://127.0.0.1:9/game",
                Arc::clone(&inbound),
                Arc::new(DecodeTable::standard()),
            );

            connection.close().await;

            assert!(inbound.is_empty());
            assert_eq!(connection.phase(), ConnectionPhase::Failed);
            assert_eq!(connection.url(), "ws://127.0.0.1:9/game");
            assert!(matches!(connection.start(), Err(ConnectionError::Closed)));
            assert!(inbound.is_empty());
        });
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_closed_connection_cannot_be_restarted() {
        let inbound = Arc::new(BoundedQueue::new());
        let connection = Connection::new(
            "ws://127.0.0.1:9/game",
            Arc::clone(&inbound),
            Arc::new(DecodeTable::standard()),
        );

        assert!(connection.start().is_ok());
        assert!(matches!(
            connection.start(),
            Err(ConnectionError::AlreadyStarted) | Err(ConnectionError::Closed)
        ));

        connection.close().await;
        assert_eq!(connection.phase(), ConnectionPhase::Failed);
        assert!(connection.start().is_err());
        assert_eq!(connection.phase(), ConnectionPhase::Failed);
    }
}
