//! Pagyr - a page-addressed, multi-file disk storage layer in Rust
//!
//! This crate provides the physical storage core for a disk-oriented database
//! engine: it translates a (logical file name, page id) pair into a durable
//! byte-range read or write against persistent storage, and hands out fresh
//! page ids per file.
//!
//! # Architecture
//!
//! - **Storage Layer** (`storage`): Handles all disk I/O
//!   - `DiskManager`: Maps one file per database object (table, index) under
//!     a base directory, performs positional page reads/writes with forced
//!     durability, and allocates page ids from per-file counters
//!
//! - **Buffer Pool**: page caching, pinning, and eviction (TODO)
//!
//! - **Page Layout**: slotted pages and tuple storage within a page (TODO)
//!
//! Every write is synchronously durable at this layer; deciding *when* to
//! write is the buffer pool's job, deciding *whether* a finished write is
//! durable is this layer's.
//!
//! # Example
//!
//! ```rust,no_run
//! use pagyr::storage::disk::DiskManager;
//! use pagyr::common::PAGE_SIZE;
//!
//! // Open a disk manager over a database directory
//! let dm = DiskManager::open("mydb").unwrap();
//!
//! // Allocate a page in a table's file and write to it
//! let page_id = dm.allocate_page("users_table.data").unwrap();
//! let data = [0u8; PAGE_SIZE];
//! dm.write_page("users_table.data", page_id, &data).unwrap();
//!
//! // Read it back
//! let mut buf = [0u8; PAGE_SIZE];
//! dm.read_page("users_table.data", page_id, &mut buf).unwrap();
//!
//! dm.shut_down().unwrap();
//! ```

pub mod common;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{PageId, Result, StorageError};
