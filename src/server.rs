//! nestkv TCP server
//!
//! Every connection gets its own session and therefore its own store;
//! nothing is shared between clients except the shutdown signal.

use crate::{
    config::Config,
    error::{NestKvError, Result},
    protocol::OutputMode,
    session::{run_session, Session},
    store::CommitPolicy,
};
use std::sync::Arc;
use tokio::{
    io::BufReader,
    net::{TcpListener, TcpStream},
    sync::{broadcast, Semaphore},
};
use tracing::{debug, error, info, warn};

/// Address used when the configuration does not name one
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// nestkv TCP server
pub struct NestKvServer {
    bind_addr: String,
    commit_policy: CommitPolicy,
    connection_slots: Arc<Semaphore>,
    shutdown_tx: broadcast::Sender<()>,
}

impl NestKvServer {
    /// Create a new server instance
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            bind_addr: config.listen_addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            commit_policy: config.commit_policy,
            connection_slots: Arc::new(Semaphore::new(config.max_connections)),
            shutdown_tx,
        })
    }

    /// Start the server
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!(addr = %self.bind_addr, policy = ?self.commit_policy, "nestkv server listening");

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!(%addr, "client connected");
                            let slots = Arc::clone(&self.connection_slots);
                            let shutdown_rx = self.shutdown_tx.subscribe();
                            let policy = self.commit_policy;

                            tokio::spawn(async move {
                                let handled =
                                    Self::handle_client(stream, policy, slots, shutdown_rx).await;
                                if let Err(e) = handled {
                                    warn!(%addr, error = %e, "error handling client");
                                }
                                info!(%addr, "client disconnected");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        info!("server stopped");
        Ok(())
    }

    /// Handle a single client connection
    async fn handle_client(
        mut stream: TcpStream,
        policy: CommitPolicy,
        slots: Arc<Semaphore>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        debug!(available = slots.available_permits(), "waiting for connection slot");
        let _permit = slots
            .acquire_owned()
            .await
            .map_err(|_| NestKvError::Server("connection slots closed".to_string()))?;

        let (reader, writer) = stream.split();
        let mut session = Session::with_policy(policy);

        run_session(
            &mut session,
            BufReader::new(reader),
            writer,
            OutputMode::Wire,
            None,
            shutdown_rx,
        )
        .await
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.shutdown_tx.send(()).map_err(|_| {
            NestKvError::Server("Failed to send shutdown signal".to_string())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_creation() {
        let config = Config {
            listen_addr: Some("127.0.0.1:0".to_string()),
            max_connections: 10,
            ..Config::default()
        };

        let server = NestKvServer::new(config).unwrap();
        assert_eq!(server.bind_addr, "127.0.0.1:0");
        // No receivers yet, so the send may fail; that's fine here
        let _ = server.shutdown();
    }

    #[test]
    fn test_zero_connections_rejected() {
        let config = Config {
            max_connections: 0,
            ..Config::default()
        };
        assert!(matches!(NestKvServer::new(config), Err(NestKvError::Config(_))));
    }
}
