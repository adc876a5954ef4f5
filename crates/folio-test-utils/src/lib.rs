//! Testing utilities for folio.
//!
//! - **Storage**: a storage backend whose reads and writes can be made to fail
//! - **Assertions**: `assert_ok!` / `assert_err!` style helpers
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use folio_test_utils::{assert_err, FlakyStorage};
//!
//! #[tokio::test]
//! async fn test_write_failure() {
//!     let storage = Arc::new(FlakyStorage::new());
//!     storage.fail_writes(true);
//!     let err = assert_err!(store.capture(&doc, "text", "t", SnapshotKind::Auto).await);
//!     assert!(err.is_persistence());
//! }
//! ```

pub mod assertions;
pub mod storage;

pub use storage::FlakyStorage;
