//! # Flushout Proxy
//!
//! Client side of the Flushout replication protocol.
//!
//! This crate provides:
//! - `Proxy`: an optimistic replica that applies commands locally and logs
//!   them until the master acknowledges them
//! - `Backend`: the transport seam between a client and the master
//! - `LoopbackBackend`: an in-process backend for tests and demos
//! - `SyncClient`: pairs a proxy with a backend and runs the flush cycle
//!
//! # Flushing
//!
//! A flush packs the unacknowledged commands into a batch, sends it to the
//! master and reconciles the answer:
//! - Acknowledged commands leave the log
//! - Entries the master moved to a new id are rekeyed locally
//! - Fields the master's interceptor set are merged into local entries
//!
//! Only one batch is in flight at a time. Commands applied during a flight
//! are sent with the next flush.
//!
//! # Example
//!
//! ```
//! use flushout_document::{props, Document, Untyped};
//! use flushout_master::Master;
//! use flushout_protocol::Snapshot;
//! use flushout_proxy::{LoopbackBackend, SyncClient};
//! use std::sync::Arc;
//!
//! # let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # runtime.block_on(async {
//! let document = Document::<Untyped>::empty().with_collection("todos").unwrap();
//! let master = Arc::new(Master::new(Snapshot::new(0, document)));
//!
//! let mut client = SyncClient::<Untyped, _>::new(LoopbackBackend::new(Arc::clone(&master)));
//! client.connect().await.unwrap();
//! client.create("todos", props([("text", "buy milk")])).unwrap();
//!
//! let report = client.flush().await.unwrap();
//! assert_eq!(report.sent, 1);
//! assert_eq!(master.command_count(), 1);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod backend;
mod client;
mod config;
mod error;
mod proxy;

pub use backend::{Backend, LoopbackBackend};
pub use client::{FlushReport, SyncClient};
pub use config::{ClientConfig, RetryConfig};
pub use error::{ProxyError, ProxyResult};
pub use proxy::{FlushOutcome, Proxy};
