//! Reference motion sequence store.
//!
//! This crate provides:
//! - The `ReferenceStore` seam used by the analysis pipeline
//! - A filesystem store reading `{root}/{category}/{category}_001.json`
//! - A read-only in-process cache shared across requests

pub mod error;
pub mod reference;

pub use error::{StorageError, StorageResult};
pub use reference::{FsReferenceStore, ReferenceStore};
