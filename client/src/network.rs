//! TCP connection handling for the game client.

use log::debug;
use shared::{read_message, unix_millis, write_message, Message};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// One client-side connection to the game server.
pub struct Connection {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl Connection {
    pub async fn connect(server_addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        debug!("Connected to {}", server_addr);

        let (reader, writer) = stream.into_split();
        Ok(Connection { reader, writer })
    }

    /// Sends the handshake and waits for the server's verdict; 0 = accepted.
    pub async fn login(&mut self, name: &str) -> std::io::Result<u8> {
        self.send(&Message::Handshake {
            name: name.to_string(),
        })
        .await?;

        match self.recv().await? {
            Message::Feedback { result } => Ok(result),
            other => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("expected feedback, got {:?}", other),
            )),
        }
    }

    /// Claims cell (x, y) with this player's symbol.
    pub async fn send_field_set(&mut self, symbol: u8, x: u8, y: u8) -> std::io::Result<()> {
        self.send(&Message::FieldSet { x, y, symbol }).await
    }

    /// Answers (or initiates) a liveness probe.
    pub async fn send_keepalive(&mut self) -> std::io::Result<()> {
        self.send(&Message::Keepalive {
            timestamp: unix_millis(),
        })
        .await
    }

    /// Next message from the server, keepalives included.
    pub async fn recv(&mut self) -> std::io::Result<Message> {
        read_message(&mut self.reader).await
    }

    /// Next game-relevant message; keepalive probes are answered in place.
    pub async fn recv_game(&mut self) -> std::io::Result<Message> {
        loop {
            match self.recv().await? {
                Message::Keepalive { .. } => self.send_keepalive().await?,
                message => return Ok(message),
            }
        }
    }

    async fn send(&mut self, message: &Message) -> std::io::Result<()> {
        write_message(&mut self.writer, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    /// Connection paired with the raw server end of the stream.
    async fn connected() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_string = addr.to_string();
        let (connection, accepted) = tokio::join!(
            Connection::connect(&addr_string),
            listener.accept()
        );
        (connection.unwrap(), accepted.unwrap().0)
    }

    #[tokio::test]
    async fn login_reports_the_feedback_result() {
        let (mut connection, mut server) = connected().await;

        let exchange = tokio::spawn(async move {
            match read_message(&mut server).await.unwrap() {
                Message::Handshake { name } => assert_eq!(name, "alice"),
                other => panic!("Unexpected message: {:?}", other),
            }
            write_message(&mut server, &Message::Feedback { result: 0 })
                .await
                .unwrap();
            server
        });

        let result = connection.login("alice").await.unwrap();
        assert_eq!(result, 0);
        exchange.await.unwrap();
    }

    #[tokio::test]
    async fn recv_game_answers_keepalives_transparently() {
        let (mut connection, mut server) = connected().await;

        write_message(&mut server, &Message::Keepalive { timestamp: 1 })
            .await
            .unwrap();
        write_message(&mut server, &Message::GameEnd { result: 2 })
            .await
            .unwrap();

        let message = timeout(Duration::from_secs(2), connection.recv_game())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message, Message::GameEnd { result: 2 });

        // The probe was answered on the way.
        let answer = timeout(Duration::from_secs(2), read_message(&mut server))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(answer, Message::Keepalive { .. }));
    }
}
