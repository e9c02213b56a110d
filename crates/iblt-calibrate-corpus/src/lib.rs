//! # IBLT Calibrate Corpus
//!
//! Replays a recorded multi-node corpus as a sequence of block transfers.
//!
//! ## Overview
//!
//! A corpus-with-hints file records, for every block height, what each node
//! put in its block and what each node guessed the block would contain from
//! its mempool. Replaying it yields one [`BlockTransfer`] per
//! (source, receiver) pair whose views differ: the set difference the
//! receiver would have to reconcile.
//!
//! ## File Format
//!
//! ```text
//! # <height>:<node>:<block|mempool>:<txid>,<txid>,...
//! 352720:au:block:9f1c...,0a77...
//! 352720:sf:mempool:9f1c...
//! 352721:au:block:...
//! ```
//!
//! Heights never decrease, and all records for one height are contiguous.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use iblt_calibrate_corpus::BlockStream;
//!
//! let mut stream = BlockStream::open("corpus-with-hints.txt").unwrap();
//! while let Some(transfers) = stream.next_block_transfers().unwrap() {
//!     for transfer in transfers {
//!         println!("{} -> {}: {}", transfer.source, transfer.receiver, transfer.overhead());
//!     }
//! }
//! ```

pub mod error;
pub mod overhead;
pub mod record;
pub mod stream;

pub use error::{CorpusError, Result};
pub use overhead::{OverheadRow, OverheadSummary};
pub use record::{CorpusRecord, NodeName, RecordKind};
pub use stream::{BlockStream, BlockTransfer};
