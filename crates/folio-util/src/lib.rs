//! Shared utilities for folio.
//!
//! This crate provides common utilities used across the folio workspace:
//! - Monotonic ULID-based identifier generation
//! - Logging setup with tracing
//! - Data and config directory resolution

pub mod id;
pub mod log;
pub mod path;

pub use id::{IdPrefix, Identifier};
