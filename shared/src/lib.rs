//! Wire protocol shared between the game server and its clients.
//!
//! Messages are flat records serialized with bincode and framed on the TCP
//! stream as a big-endian `u32` length prefix followed by the payload.
//! Anything that fails to decode is surfaced as an I/O error, which callers
//! treat as a disconnect.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Board width used for every match.
pub const BOARD_WIDTH: u8 = 3;
/// Board height used for every match.
pub const BOARD_HEIGHT: u8 = 3;
/// Maximum accepted player name length in bytes.
pub const MAX_NAME_LEN: usize = 32;
/// Upper bound on a single frame's payload size.
pub const MAX_FRAME_LEN: usize = 1024;

/// All messages exchanged between client and server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Message {
    /// Client introduces itself with a display name.
    Handshake { name: String },
    /// Server acknowledges a handshake; 0 means accepted.
    Feedback { result: u8 },
    /// Server starts a match and tells the client its symbol.
    GameBegin { symbol: u8, width: u8, height: u8 },
    /// A cell was claimed; relayed by the server to every player.
    FieldSet { x: u8, y: u8, symbol: u8 },
    /// Liveness probe/answer carrying a unix-millis timestamp.
    Keepalive { timestamp: u64 },
    /// Match is over; 0 means aborted, otherwise the winning symbol.
    GameEnd { result: u8 },
}

/// Writes one framed message to the stream and flushes it.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = bincode::serialize(message)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await
}

/// Reads the next framed message from the stream.
///
/// Fails with `InvalidData` on oversized frames or undecodable payloads and
/// with `UnexpectedEof` when the peer goes away mid-frame.
pub async fn read_message<R>(reader: &mut R) -> std::io::Result<Message>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    bincode::deserialize(&payload)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Current time as unix milliseconds, saturating on clock errors.
pub fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serialization_handshake() {
        let message = Message::Handshake {
            name: "alice".to_string(),
        };
        let serialized = bincode::serialize(&message).unwrap();
        let deserialized: Message = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Message::Handshake { name } => assert_eq!(name, "alice"),
            _ => panic!("Wrong message type after deserialization"),
        }
    }

    #[test]
    fn message_serialization_field_set() {
        let message = Message::FieldSet {
            x: 2,
            y: 1,
            symbol: 1,
        };
        let serialized = bincode::serialize(&message).unwrap();
        let deserialized: Message = bincode::deserialize(&serialized).unwrap();

        assert_eq!(deserialized, message);
    }

    #[tokio::test]
    async fn frame_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(256);

        let outgoing = Message::GameBegin {
            symbol: 2,
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
        };
        write_message(&mut client, &outgoing).await.unwrap();

        let incoming = read_message(&mut server).await.unwrap();
        assert_eq!(incoming, outgoing);
    }

    #[tokio::test]
    async fn frame_sequence_stays_ordered() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        for result in 0..4u8 {
            write_message(&mut client, &Message::Feedback { result })
                .await
                .unwrap();
        }

        for expected in 0..4u8 {
            match read_message(&mut server).await.unwrap() {
                Message::Feedback { result } => assert_eq!(result, expected),
                other => panic!("Unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let bogus_len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        client.write_all(&bogus_len).await.unwrap();

        let err = read_message(&mut server).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn truncated_frame_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(64);

        // Length prefix promises 10 bytes, then the peer goes away.
        client.write_all(&10u32.to_be_bytes()).await.unwrap();
        client.write_all(&[1, 2, 3]).await.unwrap();
        drop(client);

        assert!(read_message(&mut server).await.is_err());
    }

    #[tokio::test]
    async fn garbage_payload_is_invalid_data() {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_all(&4u32.to_be_bytes()).await.unwrap();
        client.write_all(&[0xff, 0xff, 0xff, 0xff]).await.unwrap();

        let err = read_message(&mut server).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn unix_millis_is_monotonic_enough() {
        let first = unix_millis();
        let second = unix_millis();
        assert!(second >= first);
    }
}
