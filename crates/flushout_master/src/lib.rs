//! # Flushout Master
//!
//! The authoritative replica of a Flushout document.
//!
//! This crate provides:
//! - `Master`: applies proxy batches atomically and hands out snapshots
//! - `Interceptor`: a hook to rewrite fields clients cannot be trusted to set
//! - `MasterConfig`: batch limits and stale batch handling
//!
//! # Architecture
//!
//! There is exactly one master per document. It is shared between request
//! handlers (typically behind an `Arc`) and serializes batch application
//! internally:
//! - Each batch runs against a working copy of the document
//! - The working copy and the new command count are committed together
//! - A failed batch commits nothing
//!
//! # Id collisions
//!
//! Proxies generate entry ids offline, so two of them can pick the same id.
//! The master keeps the first entry and moves the later Create to a fresh
//! id, reporting the move in the batch's `SyncInfo`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod interceptor;
mod master;

pub use config::{MasterConfig, StaleBatchPolicy};
pub use error::{MasterError, MasterResult};
pub use interceptor::{Interceptor, NoInterceptor};
pub use master::Master;
