//! Inbox API Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
/// Contact and file data models
pub mod models;
pub mod services;
/// Application state management
///
/// Shared handles to the record store, block store and request limits.
pub mod state;
pub mod store;
