//! Per-connection protocol state machine.
//!
//! A session owns the write half of one client connection and walks the
//! handshake -> authenticated -> closed lifecycle. A spawned reader task
//! decodes inbound frames and forwards them to the coordinator as
//! [`SessionEvent`]s; the coordinator feeds them back through
//! [`Session::handle_message`] so all state lives on one task.

use log::{debug, info};
use shared::{read_message, unix_millis, write_message, Message, MAX_NAME_LEN};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Events forwarded from a session's reader task to the coordinator.
#[derive(Debug)]
pub enum SessionEvent {
    /// A decoded frame arrived from the client.
    Message { id: u32, message: Message },
    /// The read side failed or reached EOF.
    Disconnected { id: u32 },
}

/// Outcome of feeding one inbound message through the state machine.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Handshake completed and the acknowledgment went out.
    LoggedIn,
    /// The client claimed a cell.
    FieldSet { x: u8, y: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    AwaitingHandshake,
    Authenticated,
    Closed,
}

/// Server-side state for one client connection.
pub struct Session {
    id: u32,
    name: String,
    symbol: u8,
    state: SessionState,
    started: bool,
    alive: bool,
    writer: OwnedWriteHalf,
    reader_task: JoinHandle<()>,
}

impl Session {
    /// Takes ownership of an accepted connection and starts listening.
    ///
    /// The reader task runs until the connection drops or the session is
    /// closed; every decoded frame is forwarded through `events`.
    pub fn new(id: u32, stream: TcpStream, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        let (mut read_half, writer) = stream.into_split();

        let reader_task = tokio::spawn(async move {
            loop {
                match read_message(&mut read_half).await {
                    Ok(message) => {
                        if events.send(SessionEvent::Message { id, message }).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Session {} read ended: {}", id, e);
                        let _ = events.send(SessionEvent::Disconnected { id });
                        break;
                    }
                }
            }
        });

        Self {
            id,
            name: String::new(),
            symbol: 0,
            state: SessionState::AwaitingHandshake,
            started: true,
            alive: true,
            writer,
            reader_task,
        }
    }

    /// Advances the state machine with one inbound message.
    ///
    /// Messages that are not expected in the current state produce an
    /// `InvalidData` error; the caller routes any error through the
    /// disconnect path.
    pub async fn handle_message(
        &mut self,
        message: Message,
    ) -> std::io::Result<Option<SessionUpdate>> {
        match (self.state, message) {
            (SessionState::AwaitingHandshake, Message::Handshake { name }) => {
                if name.is_empty() || name.len() > MAX_NAME_LEN {
                    self.send(&Message::Feedback { result: 1 }).await?;
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("rejected name of {} bytes", name.len()),
                    ));
                }
                self.name = name;
                self.send(&Message::Feedback { result: 0 }).await?;
                // Logged only once the acknowledgment is on the wire.
                self.state = SessionState::Authenticated;
                info!("Session {} logged in as {}", self.id, self.name);
                Ok(Some(SessionUpdate::LoggedIn))
            }
            (SessionState::Authenticated, Message::FieldSet { x, y, .. }) => {
                Ok(Some(SessionUpdate::FieldSet { x, y }))
            }
            (SessionState::Authenticated, Message::Keepalive { .. }) => {
                self.alive = true;
                Ok(None)
            }
            (state, message) => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unexpected {:?} in state {:?}", message, state),
            )),
        }
    }

    /// Relays a claimed cell to this client.
    pub async fn send_field_set(&mut self, symbol: u8, x: u8, y: u8) -> std::io::Result<()> {
        self.send(&Message::FieldSet { x, y, symbol }).await
    }

    /// Starts the match for this client and records its assigned symbol.
    pub async fn begin_game(&mut self, symbol: u8, width: u8, height: u8) -> std::io::Result<()> {
        self.symbol = symbol;
        self.send(&Message::GameBegin {
            symbol,
            width,
            height,
        })
        .await
    }

    /// Announces the end of the match; 0 means aborted.
    pub async fn end_game(&mut self, result: u8) -> std::io::Result<()> {
        self.send(&Message::GameEnd { result }).await
    }

    /// Probes the client's liveness.
    ///
    /// Returns false without sending anything when the credit from the last
    /// inbound keepalive is already spent; otherwise consumes the credit and
    /// sends a fresh probe. The caller treats false as a dead peer.
    pub async fn keepalive(&mut self) -> std::io::Result<bool> {
        if !self.alive {
            return Ok(false);
        }
        self.alive = false;
        self.send(&Message::Keepalive {
            timestamp: unix_millis(),
        })
        .await?;
        Ok(true)
    }

    /// Tears the session down. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        self.reader_task.abort();
        debug!("Session {} closed", self.id);
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> u8 {
        self.symbol
    }

    /// Drops the assigned symbol when a match dissolves without this
    /// session being closed.
    pub fn reset_symbol(&mut self) {
        self.symbol = 0;
    }

    pub fn is_logged(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Eligible for gameplay: listening was started and not torn down yet.
    pub fn is_working(&self) -> bool {
        self.started && !self.is_closed()
    }

    async fn send(&mut self, message: &Message) -> std::io::Result<()> {
        write_message(&mut self.writer, message).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
