//! # IBLT Calibrate Testkit
//!
//! Testing utilities for the calibration engine.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Oracles**: Stand-ins for the reconciliation codec with known failure curves
//! - **Fixtures**: Populated stores, scratch directories, and corpus builders
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use iblt_calibrate_testkit::fixtures::{CorpusBuilder, TestFixture};
//!
//! let fixture = TestFixture::new(10).unwrap();
//! let corpus = CorpusBuilder::new()
//!     .block(1, "au", &[fixture.id(0), fixture.id(1)])
//!     .mempool(1, "sf", &[fixture.id(1)])
//!     .build();
//! assert_eq!(corpus.lines().count(), 2);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    populated_store, transactions, CorpusBuilder, CountingOracle, HashedOracle, TestFixture,
    ThresholdOracle,
};
