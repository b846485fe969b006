//! fedsplit: reproducible federated dataset partitioning.
//!
//! Partitions a flat, row-indexed dataset into disjoint per-client
//! partitions with tunable statistical heterogeneity, from fully IID to
//! extreme non-IID. The crate is a deterministic assignment engine: given
//! the same dataset length, configuration, and seed it produces
//! bit-identical partition mappings. No I/O, no training, no CLI.
//!
//! # Key Types
//!
//! - [`Dataset`] / [`Partition`] - the in-memory data collaborator and the
//!   per-partition view
//! - [`Partitioner`] - attach a dataset once, load partitions lazily
//! - [`Strategy`] - the closed set of assignment algorithms
//! - [`ConfigError`] / [`PartitionError`] - validation and computation
//!   failures
//!
//! # Strategies
//!
//! IID ([`IidPartitioner`]), size-function families ([`SizePartitioner`]),
//! Dirichlet ([`DirichletPartitioner`], [`InnerDirichletPartitioner`]),
//! shards ([`ShardPartitioner`], [`PathologicalPartitioner`]), explicit
//! target distributions ([`DistributionPartitioner`]), natural ids
//! ([`NaturalIdPartitioner`], [`GroupedNaturalIdPartitioner`]), continuous
//! labels ([`ContinuousPartitioner`]), and vertical column splits
//! ([`VerticalEvenPartitioner`], [`VerticalSizePartitioner`]).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fedsplit::{DirichletPartitioner, Partitioner};
//! use fedsplit::testing::classification_dataset;
//!
//! let dataset = Arc::new(classification_dataset(1000, 10, 42));
//!
//! let strategy = DirichletPartitioner::builder()
//!     .num_partitions(10)
//!     .partition_by("label")
//!     .alpha(0.5)
//!     .build()
//!     .unwrap();
//!
//! let mut partitioner = Partitioner::new(strategy);
//! partitioner.attach(dataset).unwrap();
//!
//! let partition = partitioner.load_partition(0).unwrap();
//! assert!(partition.n_rows() > 0);
//! ```

pub mod binning;
pub mod data;
pub mod error;
pub mod partition;
pub mod testing;

mod sampling;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use binning::BinningStrategy;
pub use data::{Column, Dataset, DatasetBuilder, DatasetError, Key, Partition};
pub use error::{ConfigError, PartitionError};
pub use partition::{
    Alpha, ClassAssignment, ContinuousPartitioner, CountMethod, DirichletPartitioner,
    DistributionPartitioner, GroupedNaturalIdPartitioner, GroupingMode, IidPartitioner,
    InnerDirichletPartitioner, NaturalIdPartitioner, PartitionMapping, PartitionStrategy,
    Partitioner, PathologicalPartitioner, ShardPartitioner, SizePartitioner, SizeSpec, Strategy,
    VerticalEvenPartitioner, VerticalSizePartitioner,
};
