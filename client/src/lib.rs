//! # Game Client Library
//!
//! Client-side counterpart of the grid match server: a thin connection
//! wrapper that handles the handshake, sends moves, and answers the
//! server's keepalive probes. The binary in this crate builds an
//! interactive console player on top of it; the integration tests use it
//! to drive full matches against a real server.

pub mod network;
