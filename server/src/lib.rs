//! # Two-Player Grid Match Server
//!
//! Authoritative server for a two-player tic-tac-toe style game played over
//! TCP. Clients connect, introduce themselves with a display name, and are
//! paired into a match as soon as exactly two of them are logged in. From
//! then on the server relays every claimed cell to both players, applies it
//! to the board, and ends the match when a player completes a line or one
//! side disconnects.
//!
//! ## Architecture
//!
//! The server is event-driven around a single coordinator task. Each
//! accepted connection gets a [`session::Session`]: the session owns the
//! write half and runs the protocol state machine, while a small reader task
//! decodes inbound frames and forwards them over a channel. Because the
//! coordinator task is the only place that touches the session registry and
//! the board, no locking is needed and message handling per session is
//! totally ordered.
//!
//! While a match is in progress the coordinator stops accepting new
//! connections; sessions that logged in too late stay registered and are
//! paired once the current match ends.
//!
//! ## Liveness
//!
//! Liveness uses a one-credit scheme: every inbound keepalive from a client
//! grants one credit, and every outbound probe spends it. A probe that finds
//! the credit already spent means the client never answered the previous
//! probe and is treated as gone.
//!
//! ## Modules
//!
//! - [`board`]: the grid model and win detection
//! - [`session`]: per-connection protocol state machine
//! - [`coordinator`]: pairing, relaying, and end-of-match handling

pub mod board;
pub mod coordinator;
pub mod session;
