//! In-memory dataset collaborator consumed by the partitioning core.
//!
//! # Overview
//!
//! - [`Dataset`]: ordered named columns of equal length, immutable once
//!   built, shared read-only across partitions.
//! - [`Column`] / [`Key`]: column storage and the discrete keys used by
//!   class- and id-driven strategies.
//! - [`Partition`]: a lightweight row- or column-subset view over an
//!   `Arc<Dataset>`; storage is gathered only on access.
//!
//! The core consumes only this contract: row count, column access, and
//! row/column selection. Loading data into a [`Dataset`] from files or the
//! network is the caller's business.

mod column;
mod dataset;
mod partition;

pub use column::{Column, Key};
pub use dataset::{Dataset, DatasetBuilder, DatasetError};
pub use partition::Partition;
