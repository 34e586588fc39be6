//! Storage layer
//!
//! Record metadata lives in SQLite; file payloads live in a
//! content-addressed block store on local disk.

pub mod blocks;
pub mod db;
pub mod query;

pub use blocks::{BlockError, BlockStore, StagedBlock, StoredBlock};
pub use db::{FileFilter, InboxDb, StoredFile};
pub use query::{ListQuery, Page};
