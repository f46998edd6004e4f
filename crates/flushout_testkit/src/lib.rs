//! # Flushout Testkit
//!
//! Test utilities for Flushout.
//!
//! This crate provides:
//! - The todo-list document fixture (schema, entry type, command helpers)
//! - A `createdAt` stamping interceptor with deterministic clocks
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use flushout_testkit::prelude::*;
//!
//! #[test]
//! fn master_stamps_todos() {
//!     let master = Master::with_interceptor(
//!         empty_todo_snapshot(),
//!         stamp_created_at(sequential_clock(1)),
//!     );
//!     // ... apply batches
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
