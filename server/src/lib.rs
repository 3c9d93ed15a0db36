//! # Canvas Server Library
//!
//! Authoritative server for the shared real-time character canvas: a fixed
//! 10x10 grid where each connected player may claim one cell at a time,
//! rate-limited by a per-player cooldown, with every accepted edit broadcast
//! live to all connected clients.
//!
//! ## Architecture
//!
//! All shared mutable state (sessions, grid, edit log) is owned by the
//! [`engine::Engine`] and mutated only from the server's main loop, which
//! consumes incoming packets one at a time. That single serialization point
//! guarantees:
//!
//! - last-write-wins on a cell is decided by acceptance order,
//! - the edit log order always matches the order edits were applied,
//! - no two edits to the same cell interleave partially.
//!
//! The engine itself performs no I/O: each operation returns the outbound
//! messages it produced as [`engine::Effect`] values, and the network layer
//! fans them out. This separation keeps the whole request pipeline testable
//! without a socket.
//!
//! ## Module Organization
//!
//! - [`connection`] — transport-level connection table: id assignment,
//!   address routing, activity tracking, idle-timeout sweep.
//! - [`session`] — session registry binding connections to player names and
//!   cooldown state.
//! - [`cooldown`] — the pure cooldown policy (may-edit / arm / remaining).
//! - [`grid`] — the authoritative cell matrix, last-write-wins mutation.
//! - [`history`] — bounded, acceptance-ordered edit log.
//! - [`engine`] — the synchronization engine tying the above together.
//! - [`network`] — UDP transport, tokio tasks, and the main loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_secs(60), // edit cooldown
//!         Duration::from_secs(10), // idle connection timeout
//!     ).await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod cooldown;
pub mod engine;
pub mod grid;
pub mod history;
pub mod network;
pub mod session;
