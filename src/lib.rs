//! nestkv - An in-memory key-value store with nested transactions
//!
//! This library provides:
//! - A layered store where each open transaction is a delta over its parent
//! - Value-frequency counting that stays consistent across BEGIN/ROLLBACK/COMMIT
//! - A line-oriented statement protocol parsed with nom
//! - A console session and a TCP server with one independent session per client

pub mod client;
pub mod config;
pub mod error;
pub mod layer;
pub mod protocol;
pub mod server;
pub mod session;
pub mod store;

pub use client::Client;
pub use config::Config;
pub use error::{NestKvError, Result};
pub use protocol::{parse_statement, Command, OutputMode, Response};
pub use server::NestKvServer;
pub use session::{run_session, Outcome, Session};
pub use store::{CommitPolicy, LayeredStore, Store};
