//! Match coordination: pairs two logged-in sessions, relays their moves,
//! and ends the match on a win or a disconnect.

use crate::board::Board;
use crate::session::{Session, SessionEvent, SessionUpdate};
use log::{info, warn};
use shared::{Message, BOARD_HEIGHT, BOARD_WIDTH};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Coordinates sessions, the board, and the listener for one game instance.
///
/// All mutable state is owned by the task running [`GameServer::run`]; the
/// per-session reader tasks only feed events into its channel, so no state
/// needs locking. While a match is in progress the accept branch is disabled,
/// keeping the "match on" flag and the listener state in lockstep.
pub struct GameServer {
    listener: TcpListener,
    registry: BTreeMap<u32, Session>,
    board: Board,
    match_on: bool,
    next_session_id: u32,
    heartbeat: Duration,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl GameServer {
    /// Binds the listener; `heartbeat` sets the liveness probe interval.
    pub async fn new(
        addr: &str,
        heartbeat: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(GameServer {
            listener,
            registry: BTreeMap::new(),
            board: Board::new(),
            match_on: false,
            next_session_id: 1,
            heartbeat,
            events_tx,
            events_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main loop: accepts players, processes session events, probes liveness.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut heartbeat = interval(self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first tick since it fires immediately.
        heartbeat.tick().await;

        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept(), if !self.match_on => {
                    match accepted {
                        Ok((stream, addr)) => self.register_session(stream, addr),
                        Err(e) => warn!("Failed to accept connection: {}", e),
                    }
                },

                event = self.events_rx.recv() => {
                    match event {
                        Some(SessionEvent::Message { id, message }) => {
                            self.handle_session_message(id, message).await;
                        }
                        Some(SessionEvent::Disconnected { id }) => {
                            self.handle_disconnected(id).await;
                        }
                        // Unreachable while we hold a sender, but exiting
                        // beats spinning if that ever changes.
                        None => break,
                    }
                },

                _ = heartbeat.tick() => {
                    self.probe_sessions().await;
                },
            }

            // Pairing is re-evaluated after every event: a login can bring
            // the logged count to two, but so can a match ending while a
            // third player was already waiting.
            self.try_begin_match().await;
        }

        Ok(())
    }

    fn register_session(&mut self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        let id = self.next_session_id;
        self.next_session_id += 1;

        let session = Session::new(id, stream, self.events_tx.clone());
        self.registry.insert(id, session);

        let working = self.registry.values().filter(|s| s.is_working()).count();
        info!("New connection from {} ({} sessions active)", addr, working);
    }

    async fn handle_session_message(&mut self, id: u32, message: Message) {
        let session = match self.registry.get_mut(&id) {
            Some(session) => session,
            // Already removed; a late frame from a closed connection.
            None => return,
        };

        match session.handle_message(message).await {
            Ok(Some(SessionUpdate::LoggedIn)) => {
                let players_online = self.registry.values().filter(|s| s.is_logged()).count();
                info!("Players online: {}", players_online);
            }
            Ok(Some(SessionUpdate::FieldSet { x, y })) => self.handle_field_set(id, x, y).await,
            Ok(None) => {}
            Err(e) => {
                warn!("Session {} protocol failure: {}", id, e);
                self.handle_disconnected(id).await;
            }
        }
    }

    /// Starts a match when exactly two logged sessions are waiting.
    ///
    /// Symbols are assigned in registry order, so the earliest-connected
    /// player gets symbol 1.
    async fn try_begin_match(&mut self) {
        if self.match_on {
            return;
        }
        let players_online = self.registry.values().filter(|s| s.is_logged()).count();
        if players_online != 2 {
            return;
        }

        self.match_on = true;
        info!("Match started, listener closed to new players");

        let mut symbol = 1u8;
        let mut failed = Vec::new();
        for session in self.registry.values_mut().filter(|s| s.is_logged()) {
            if let Err(e) = session.begin_game(symbol, BOARD_WIDTH, BOARD_HEIGHT).await {
                warn!("Failed to start match for session {}: {}", session.id(), e);
                failed.push(session.id());
            }
            symbol += 1;
        }
        for id in failed {
            self.handle_disconnected(id).await;
        }
    }

    /// Relays a move to every logged session, applies it, checks for a win.
    async fn handle_field_set(&mut self, id: u32, x: u8, y: u8) {
        let symbol = self.registry.get(&id).map(Session::symbol).unwrap_or(0);

        if !self.match_on || symbol == 0 {
            warn!("Ignoring move from session {} outside a match", id);
            return;
        }
        if !self.board.in_bounds(x, y) {
            warn!(
                "Ignoring out-of-range move ({}, {}) from session {}",
                x, y, id
            );
            return;
        }

        info!("Player {} claims ({}, {})", symbol, x, y);

        let mut failed = Vec::new();
        for session in self.registry.values_mut().filter(|s| s.is_logged()) {
            if let Err(e) = session.send_field_set(symbol, x, y).await {
                warn!("Failed to relay move to session {}: {}", session.id(), e);
                failed.push(session.id());
            }
        }
        for failed_id in failed {
            self.handle_disconnected(failed_id).await;
        }
        if !self.match_on {
            // A relay failure already tore the match down.
            return;
        }

        self.board.set_field(symbol, x, y);
        let winner = self.board.who_won();
        if winner != 0 {
            self.finish_match(winner).await;
        }
    }

    /// Announces the winner, closes both players, reopens the listener.
    ///
    /// Logged sessions without a symbol were never part of this match; they
    /// stay registered and become candidates for the next pairing.
    async fn finish_match(&mut self, winner: u8) {
        info!("Player {} won", winner);
        self.reopen_listener();

        let players: Vec<u32> = self
            .registry
            .values()
            .filter(|s| s.is_logged() && s.symbol() != 0)
            .map(Session::id)
            .collect();
        for id in players {
            if let Some(mut session) = self.registry.remove(&id) {
                if let Err(e) = session.end_game(winner).await {
                    warn!("Failed to notify session {} of the result: {}", id, e);
                }
                session.close();
            }
        }

        self.board.clear();
    }

    /// Disconnect path: drops the session, aborts any running match, and
    /// tells every remaining logged session the game ended without a winner.
    async fn handle_disconnected(&mut self, id: u32) {
        let mut session = match self.registry.remove(&id) {
            Some(session) => session,
            // Already removed for this id; nothing left to do.
            None => return,
        };
        if session.is_logged() {
            info!("Session {} ({}) disconnected", id, session.name());
        } else {
            info!("Session {} disconnected before logging in", id);
        }
        session.close();
        drop(session);

        self.reopen_listener();
        // Stale cells must not leak into the next pairing.
        self.board.clear();

        let mut failed = Vec::new();
        for session in self.registry.values_mut().filter(|s| s.is_logged()) {
            if session.end_game(0).await.is_err() {
                failed.push(session.id());
            }
            session.reset_symbol();
        }
        for failed_id in failed {
            if let Some(mut session) = self.registry.remove(&failed_id) {
                session.close();
            }
        }
    }

    /// Probes every logged session; a spent credit or a failed write means
    /// the peer is gone.
    async fn probe_sessions(&mut self) {
        let mut dead = Vec::new();
        for session in self.registry.values_mut().filter(|s| s.is_logged()) {
            match session.keepalive().await {
                Ok(true) => {}
                Ok(false) => {
                    warn!("Session {} missed its heartbeat", session.id());
                    dead.push(session.id());
                }
                Err(e) => {
                    warn!("Heartbeat write to session {} failed: {}", session.id(), e);
                    dead.push(session.id());
                }
            }
        }
        for id in dead {
            self.handle_disconnected(id).await;
        }
    }

    fn reopen_listener(&mut self) {
        if self.match_on {
            self.match_on = false;
            info!("Match over, listener reopened for new players");
        }
    }
}
