//! # Metro Game Client Library
//!
//! Terminal client for the metro game server. The client talks to the server
//! over a WebSocket carrying JSON envelopes and draws the world in the terminal.
//!
//! ## Architecture Overview
//!
//! Network I/O and game logic never touch each other directly. They are joined
//! by two FIFO queues and one lock-protected state snapshot:
//!
//! ```text
//!   socket ──► receive task ──► inbound queue ──► Dispatcher ─┐
//!                                                            ├─► GameState ──► Renderer
//!   keyboard ──────────────────────────────► InputProducer ──┘
//!                                                 │
//!   socket ◄── sender thread ◄── outbound queue ◄─┘
//! ```
//!
//! ### Receive task
//! Runs on the tokio runtime. Every text frame is decoded into an event; open,
//! close and error transitions of the socket become events too.
//!
//! ### Sender thread
//! A plain OS thread blocked on the outbound queue. Requests leave in the
//! order they were queued, one at a time.
//!
//! ### Game loop
//! Ticks at a fixed rate. Each tick handles pending keys, applies every event
//! queued so far and draws one frame. The state lock is held only for the
//! length of a single event, key or frame.
//!
//! ## Module Organization
//!
//! ### Queue Module (`queue`)
//! Blocking FIFO shared between threads.
//!
//! ### Network Module (`network`)
//! WebSocket connection, the transport seam and the sender loop.
//!
//! ### Dispatcher Module (`dispatcher`)
//! One handler per event kind; the only writer of server-confirmed state.
//!
//! ### Game Module (`game`)
//! Client state: lifecycle phase, player, world, modals and rolling logs.
//!
//! ### Input Module (`input`)
//! Key capture and the per-screen key map.
//!
//! ### Rendering Module (`rendering`)
//! Frame composition and terminal output.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::input::TerminalKeys;
//! use client::pipeline::Client;
//! use client::rendering::{TerminalGuard, TerminalRenderer};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = Client::new("ws://127.0.0.1:8080/game", Duration::from_millis(16));
//! client.start()?;
//!
//! let _terminal = TerminalGuard::enter()?;
//! client
//!     .run(&mut TerminalKeys::default(), &mut TerminalRenderer::stdout())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod game;
pub mod input;
pub mod network;
pub mod pipeline;
pub mod queue;
pub mod rendering;
