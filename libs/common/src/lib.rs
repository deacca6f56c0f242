//! Common library for the portal client
//!
//! This crate provides the durable key-value storage shared by the portal
//! services: the [`store::KeyValueStore`] contract, in-memory and file
//! backends, a Redis backend, and the associated error types.
//!
//! ```rust,no_run
//! use common::store::{FileStore, KeyValueStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FileStore::new(".portal/session.json");
//!     store.set("token", "opaque").await?;
//!     println!("Stored token: {:?}", store.get("token").await?);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{FileStore, KeyValueStore, MemoryStore};
