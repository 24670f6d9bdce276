//! Statement execution against a store
//!
//! A [`Session`] owns one store and turns statement lines into responses.
//! [`run_session`] drives a session over any async line stream; the console
//! and every TCP connection go through it.

use crate::error::{NestKvError, Result};
use crate::protocol::{parse_statement, Command, OutputMode, Response};
use crate::store::{CommitPolicy, LayeredStore, Store};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tracing::debug;

/// What the caller should do after a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Blank statement, nothing to report
    Skip,
    /// Statement executed (or rejected) with this response
    Reply(Response),
    /// END was issued; the store has been reset
    End,
}

/// Interpreter state for a single client
#[derive(Debug, Default)]
pub struct Session<S: Store = LayeredStore> {
    store: S,
}

impl Session<LayeredStore> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CommitPolicy) -> Self {
        Self::with_store(LayeredStore::with_policy(policy))
    }
}

impl<S: Store> Session<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Parse and execute one statement line
    pub fn execute(&mut self, line: &str) -> Outcome {
        debug!(statement = line.trim(), "processing statement");

        match parse_statement(line) {
            Ok(command) => {
                let ends_session = command == Command::End;
                let response = self.apply(command);
                if ends_session {
                    Outcome::End
                } else {
                    Outcome::Reply(response)
                }
            }
            Err(NestKvError::EmptyStatement) => Outcome::Skip,
            Err(e) => Outcome::Reply(Response::Error(e.to_string())),
        }
    }

    /// Execute a parsed command
    pub fn apply(&mut self, command: Command) -> Response {
        let response = match command {
            Command::Set { key, value } => Self::unit(self.store.set(key, value)),
            Command::Get { key } => match self.store.get(&key) {
                Ok(value) if value.is_empty() => Response::Null,
                Ok(value) => Response::Value(value),
                Err(NestKvError::KeyNotFound(_)) => Response::Null,
                Err(e) => Response::Error(e.to_string()),
            },
            Command::Delete { key } => Self::unit(self.store.delete(&key)),
            Command::Count { value } => Response::Count(self.store.count(&value)),
            Command::Begin => Self::unit(self.store.begin()),
            Command::Rollback => Self::unit(self.store.rollback()),
            Command::Commit => Self::unit(self.store.commit()),
            Command::End => {
                self.store.reset();
                Response::Ok
            }
        };

        debug!(depth = self.store.depth(), response = ?response, "statement done");
        response
    }

    fn unit(result: Result<()>) -> Response {
        match result {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error(e.to_string()),
        }
    }
}

/// Drive a session over a line reader until END, end of input or shutdown
pub async fn run_session<S, R, W>(
    session: &mut Session<S>,
    mut reader: R,
    mut writer: W,
    mode: OutputMode,
    prompt: Option<&str>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()>
where
    S: Store,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        if let Some(prompt) = prompt {
            writer.write_all(prompt.as_bytes()).await?;
            writer.flush().await?;
        }
        line.clear();

        tokio::select! {
            result = reader.read_line(&mut line) => {
                if result? == 0 {
                    debug!("end of input");
                    break;
                }

                match session.execute(&line) {
                    Outcome::Skip => {
                        if mode == OutputMode::Wire {
                            let empty = NestKvError::EmptyStatement.to_string();
                            writer.write_all(&Response::Error(empty).encode(mode)).await?;
                        }
                    }
                    Outcome::Reply(response) => {
                        writer.write_all(&response.encode(mode)).await?;
                    }
                    Outcome::End => {
                        writer.write_all(&Response::Ok.encode(mode)).await?;
                        writer.flush().await?;
                        break;
                    }
                }
                writer.flush().await?;
            }

            _ = shutdown_rx.recv() => {
                debug!("shutdown signal received, closing session");
                break;
            }
        }
    }

    Ok(())
}
