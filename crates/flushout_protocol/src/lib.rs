//! # Flushout Protocol
//!
//! Replication protocol types and CBOR codec for Flushout.
//!
//! This crate provides:
//! - `Command` for document mutations
//! - `CommandLog` for a proxy's unacknowledged commands
//! - Protocol messages (Snapshot, CompletionBatch, ApplyResult)
//! - CBOR encoding/decoding
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Flush cycle
//!
//! 1. A proxy applies commands locally and logs them
//! 2. The proxy sends its log as a `CompletionBatch`
//! 3. The master answers with an `ApplyResult` carrying `SyncInfo`
//! 4. The proxy drops the acknowledged commands and reconciles ids and
//!    server-injected fields

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod codec;
mod command;
mod command_log;
mod error;
mod messages;

pub use codec::{decode, encode, transfer, WireMessage};
pub use command::{Command, CommandAction};
pub use command_log::{CommandLog, LogEntry};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    ApplyResult, CompletionBatch, ErrorInfo, ErrorKind, FieldOverride, IdRemap, Snapshot, SyncInfo,
};
