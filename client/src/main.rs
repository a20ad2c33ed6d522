use clap::Parser;
use client::network::Connection;
use log::warn;
use shared::Message;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:6667")]
    server: String,

    /// Display name to log in with
    #[arg(short, long, default_value = "player")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let mut connection = Connection::connect(&args.server).await?;

    let result = connection.login(&args.name).await?;
    if result != 0 {
        eprintln!("Login rejected with code {}", result);
        return Ok(());
    }
    println!("Logged in as {}, waiting for an opponent...", args.name);

    let mut symbol = 0u8;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            message = connection.recv() => match message? {
                Message::Keepalive { .. } => connection.send_keepalive().await?,
                Message::GameBegin { symbol: assigned, width, height } => {
                    symbol = assigned;
                    println!(
                        "Match started on a {}x{} board, you play symbol {}",
                        width, height, assigned
                    );
                    println!("Enter moves as: x y");
                }
                Message::FieldSet { x, y, symbol } => {
                    println!("Cell ({}, {}) taken by player {}", x, y, symbol);
                }
                Message::GameEnd { result: 0 } => {
                    println!("Match aborted");
                    break;
                }
                Message::GameEnd { result } => {
                    println!("Player {} won!", result);
                    break;
                }
                other => warn!("Unexpected message: {:?}", other),
            },

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if symbol == 0 {
                    println!("The match has not started yet");
                    continue;
                }
                match parse_move(&line) {
                    Some((x, y)) => connection.send_field_set(symbol, x, y).await?,
                    None => println!("Could not parse that, expected: x y"),
                }
            },
        }
    }

    Ok(())
}

/// Parses a move typed as two whitespace-separated coordinates.
fn parse_move(line: &str) -> Option<(u8, u8)> {
    let mut parts = line.split_whitespace();
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_moves() {
        assert_eq!(parse_move("0 2"), Some((0, 2)));
        assert_eq!(parse_move("  1   1  "), Some((1, 1)));
    }

    #[test]
    fn rejects_malformed_moves() {
        assert_eq!(parse_move(""), None);
        assert_eq!(parse_move("1"), None);
        assert_eq!(parse_move("1 2 3"), None);
        assert_eq!(parse_move("a b"), None);
        assert_eq!(parse_move("300 0"), None);
    }
}
