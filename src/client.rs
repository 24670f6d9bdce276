//! Client library for connecting to a nestkv server
//!
//! Each connection is its own session on the server, so transactions opened
//! through a client are invisible to every other client.

use crate::error::{NestKvError, Result};
use crate::protocol::{Command, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;

/// Client for connecting to a nestkv server
pub struct Client {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: BufWriter<tokio::net::tcp::OwnedWriteHalf>,
}

impl Client {
    /// Connect to a nestkv server
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        let reader = BufReader::new(read_half);
        let writer = BufWriter::new(write_half);

        Ok(Self { reader, writer })
    }

    /// Send a command and receive a response
    async fn send_command(&mut self, command: &Command) -> Result<Response> {
        let statement = format!("{}\r\n", command.to_statement());
        self.writer.write_all(statement.as_bytes()).await?;
        self.writer.flush().await?;

        let mut response_line = String::new();
        if self.reader.read_line(&mut response_line).await? == 0 {
            return Err(NestKvError::Client("Connection closed by server".to_string()));
        }

        Response::parse_wire(&response_line)
    }

    /// Send a command that only acknowledges
    async fn expect_ok(&mut self, command: Command, name: &str) -> Result<()> {
        match self.send_command(&command).await? {
            Response::Ok => Ok(()),
            Response::Error(e) => Err(NestKvError::Server(e)),
            _ => Err(NestKvError::Protocol(format!("Unexpected response for {}", name))),
        }
    }

    /// Set a key-value pair
    pub async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let command = Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        };
        self.expect_ok(command, "SET").await
    }

    /// Get a value by key
    pub async fn get(&mut self, key: &str) -> Result<Option<String>> {
        let command = Command::Get {
            key: key.to_string(),
        };

        match self.send_command(&command).await? {
            Response::Value(value) => Ok(Some(value)),
            Response::Null => Ok(None),
            Response::Error(e) => Err(NestKvError::Server(e)),
            _ => Err(NestKvError::Protocol("Unexpected response for GET".to_string())),
        }
    }

    /// Delete a key
    pub async fn delete(&mut self, key: &str) -> Result<()> {
        let command = Command::Delete {
            key: key.to_string(),
        };
        self.expect_ok(command, "DELETE").await
    }

    /// Number of keys holding `value`
    pub async fn count(&mut self, value: &str) -> Result<i64> {
        let command = Command::Count {
            value: value.to_string(),
        };

        match self.send_command(&command).await? {
            Response::Count(n) => Ok(n),
            Response::Error(e) => Err(NestKvError::Server(e)),
            _ => Err(NestKvError::Protocol("Unexpected response for COUNT".to_string())),
        }
    }

    pub async fn begin(&mut self) -> Result<()> {
        self.expect_ok(Command::Begin, "BEGIN").await
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.expect_ok(Command::Rollback, "ROLLBACK").await
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.expect_ok(Command::Commit, "COMMIT").await
    }

    /// Reset this connection's store and end the session
    pub async fn end(mut self) -> Result<()> {
        self.expect_ok(Command::End, "END").await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Close the connection
    pub async fn close(mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
