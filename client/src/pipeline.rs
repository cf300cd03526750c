//! Wires the queues, network threads and game loop together

use crate::dispatcher::Dispatcher;
use crate::game::GameState;
use crate::input::{InputProducer, KeySource};
use crate::network::{spawn_sender, Connection, ConnectionError, Outgoing};
use crate::queue::BoundedQueue;
use crate::rendering::Renderer;
use log::{error, info, warn};
use parking_lot::Mutex;
use shared::DecodeTable;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// The running client: one connection, one sender thread and the tick loop
/// that feeds keys in, applies events and draws.
pub struct Client {
    state: Arc<Mutex<GameState>>,
    outbound: Arc<BoundedQueue<Outgoing>>,
    running: Arc<AtomicBool>,
    connection: Arc<Connection>,
    dispatcher: Dispatcher,
    input: InputProducer,
    sender: Option<thread::JoinHandle<()>>,
    tick: Duration,
}

impl Client {
    /// Must be called from within a multi-threaded tokio runtime
    pub fn new(server_url: &str, tick: Duration) -> Self {
        let state = Arc::new(Mutex::new(GameState::new()));
        let inbound = Arc::new(BoundedQueue::new());
        let outbound = Arc::new(BoundedQueue::new());
        let running = Arc::new(AtomicBool::new(true));
        let table = Arc::new(DecodeTable::standard());

        let connection = Arc::new(Connection::new(server_url, Arc::clone(&inbound), table));
        let dispatcher = Dispatcher::new(
            Arc::clone(&inbound),
            Arc::clone(&outbound),
            Arc::clone(&state),
            Arc::clone(&running),
        );
        let input = InputProducer::new(Arc::clone(&outbound), Arc::clone(&state));

        Self {
            state,
            outbound,
            running,
            connection,
            dispatcher,
            input,
            sender: None,
            tick,
        }
    }

    pub fn state(&self) -> Arc<Mutex<GameState>> {
        Arc::clone(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts the sender thread and opens the connection
    pub fn start(&mut self) -> Result<(), ClientError> {
        if self.sender.is_none() {
            self.sender = Some(spawn_sender(
                Arc::clone(&self.outbound),
                Arc::clone(&self.connection),
                Arc::clone(&self.running),
            ));
        }
        self.connection.start()?;
        info!("Client started against {}", self.connection.url());
        Ok(())
    }

    /// One tick: keys, then queued events, then a frame. Returns `false` once
    /// the client should stop.
    pub fn step<K, R>(&mut self, keys: &mut K, renderer: &mut R) -> Result<bool, ClientError>
    where
        K: KeySource + ?Sized,
        R: Renderer + ?Sized,
    {
        self.input.poll(keys);
        if let Some((width, height)) = keys.take_resize() {
            renderer.resize(width, height);
        }
        if !self.dispatcher.tick() {
            return Ok(false);
        }

        let state = self.state.lock();
        renderer.render(&state)?;
        Ok(true)
    }

    /// Ticks until exit is requested, then shuts down
    pub async fn run<K, R>(&mut self, keys: &mut K, renderer: &mut R) -> Result<(), ClientError>
    where
        K: KeySource + ?Sized,
        R: Renderer + ?Sized,
    {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let result = loop {
            interval.tick().await;
            match self.step(keys, renderer) {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(e) => {
                    error!("Game loop failed: {}", e);
                    break Err(e);
                }
            }
        };

        self.shutdown().await;
        result
    }

    /// Stops the sender, closes the connection and waits for the sender thread
    pub async fn shutdown(&mut self) {
        info!("Shutting down");
        self.running.store(false, Ordering::Release);
        self.outbound.put(Outgoing::Stop);
        self.connection.close().await;

        if let Some(sender) = self.sender.take() {
            match tokio::task::spawn_blocking(move || sender.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => warn!("Sender thread panicked"),
                Err(e) => warn!("Failed to join sender thread: {}", e),
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.sender.is_some() {
            self.running.store(false, Ordering::Release);
            self.outbound.put(Outgoing::Stop);
        }
    }
}
