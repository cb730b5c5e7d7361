//! Strata - block storage and buffer management for a relational storage engine
//!
//! This crate is the layer every other component of the engine reads and
//! writes through. It maps disk blocks to fixed-size in-memory frames, keeps
//! frames pinned while transactions use them, and writes modified frames
//! back only after the log records protecting them are durable.
//!
//! # Architecture
//!
//! The crate is organized into several layers:
//!
//! - **Storage Layer** (`storage`): Block-addressable files
//!   - `BlockStore`: Read, write and append fixed-size blocks of named files
//!   - `FileManager`: Directory-backed `BlockStore` with a file handle cache
//!   - `Page`: Block-sized buffer with typed accessors
//!
//! - **Write-Ahead Log** (`wal`): Durability barrier for modified pages
//!   - `LogManager`: `flush(lsn)` contract used by the buffer pool
//!   - `LogFile`: Block-structured log stored through the `BlockStore`
//!
//! - **Buffer Pool** (`buffer`): Memory management for blocks
//!   - `BufferPoolManager`: Pin/unpin protocol with bounded waiting
//!   - `FrameHeader`: Per-frame pin count and modification state
//!   - `BufferHandle`: RAII pin giving access to a frame's page
//!
//! - **Engine** (`engine`): Opens all of the above from a `StorageConfig`
//!
//! # Example
//!
//! ```rust,no_run
//! use strata::common::{StorageConfig, TxId};
//! use strata::engine::StorageEngine;
//! use strata::storage::disk::BlockStore;
//!
//! let engine = StorageEngine::open(StorageConfig::new("demo-db")).unwrap();
//! let bpm = engine.buffer_pool();
//!
//! // Add a block to a table file and pin it
//! let block = engine.file_manager().append("students.tbl").unwrap();
//! let handle = bpm.pin(&block).unwrap();
//!
//! // Log the change, then write the page and record the modification
//! let lsn = engine.log_manager().append(b"set 0 = 42").unwrap();
//! handle.page_mut().set_int(0, 42).unwrap();
//! handle.set_modified(TxId::new(1), Some(lsn));
//! bpm.unpin(handle);
//!
//! // Commit: log first, then the page
//! bpm.flush_all(TxId::new(1)).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod engine;
pub mod storage;
pub mod wal;

// Re-export commonly used types at the crate root
pub use common::{BlockId, Lsn, Result, StrataError, TxId};
