//! Partitioning strategies and the partitioner state machine.
//!
//! # Overview
//!
//! A strategy is a value describing one assignment algorithm; the closed
//! [`Strategy`] enum delegates to the concrete variants through the
//! [`PartitionStrategy`] trait, so the set of algorithms is fixed at
//! compile time and chosen once at construction.
//!
//! [`Partitioner`] owns the lifecycle: `Unconfigured → DatasetAttached →
//! Computing (first load) → Cached`. The mapping is computed at most once
//! per instance and published through a `OnceLock`; a failed computation is
//! cached as failed, so errors are terminal and no partial mapping ever
//! escapes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fedsplit::data::Dataset;
//! use fedsplit::partition::{IidPartitioner, Partitioner};
//!
//! let dataset = Arc::new(
//!     Dataset::builder()
//!         .add_int("label", (0..100).map(|i| i % 2).collect())
//!         .build()
//!         .unwrap(),
//! );
//!
//! let strategy = IidPartitioner::builder().num_partitions(5).build().unwrap();
//! let mut partitioner = Partitioner::new(strategy);
//! partitioner.attach(dataset).unwrap();
//!
//! let partition = partitioner.load_partition(0).unwrap();
//! assert_eq!(partition.n_rows(), 20);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::data::{Dataset, Key, Partition};
use crate::error::{ConfigError, PartitionError};

mod continuous;
mod dirichlet;
mod distribution;
mod iid;
mod inner_dirichlet;
mod natural_id;
mod pathological;
mod shard;
mod size;
mod vertical;

pub use continuous::ContinuousPartitioner;
pub use dirichlet::{Alpha, DirichletPartitioner};
pub use distribution::{CountMethod, DistributionPartitioner};
pub use iid::IidPartitioner;
pub use inner_dirichlet::InnerDirichletPartitioner;
pub use natural_id::{GroupedNaturalIdPartitioner, GroupingMode, NaturalIdPartitioner};
pub use pathological::{ClassAssignment, PathologicalPartitioner};
pub use shard::ShardPartitioner;
pub use size::{SizePartitioner, SizeSpec};
pub use vertical::{VerticalEvenPartitioner, VerticalSizePartitioner};

// =============================================================================
// PartitionMapping
// =============================================================================

/// The full assignment computed by a strategy: partition id to row indices
/// (or column names, for vertical strategies).
///
/// Row mappings hold ordered, duplicate-free `u64` indices; for every
/// non-vertical strategy the partitions are pairwise disjoint and (except
/// for documented shard leftovers) cover the full row range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartitionMapping {
    /// Row-partitioning result: one index list per partition.
    Rows(Vec<Vec<u64>>),
    /// Vertical result: one column-name list per partition.
    Columns(Vec<Vec<String>>),
}

impl PartitionMapping {
    /// Number of partitions in the mapping.
    pub fn num_partitions(&self) -> usize {
        match self {
            PartitionMapping::Rows(rows) => rows.len(),
            PartitionMapping::Columns(columns) => columns.len(),
        }
    }

    /// Per-partition sizes (row counts or column counts).
    pub fn partition_sizes(&self) -> Vec<usize> {
        match self {
            PartitionMapping::Rows(rows) => rows.iter().map(Vec::len).collect(),
            PartitionMapping::Columns(columns) => columns.iter().map(Vec::len).collect(),
        }
    }

    /// True for a vertical (column-axis) mapping.
    pub fn is_vertical(&self) -> bool {
        matches!(self, PartitionMapping::Columns(_))
    }
}

// =============================================================================
// PartitionStrategy trait
// =============================================================================

/// One assignment algorithm.
///
/// Implementors are immutable configuration; all randomness is derived from
/// the configured seed inside `compute_mapping`, so identical
/// `(dataset length, config, seed)` inputs yield bit-identical mappings.
pub trait PartitionStrategy {
    /// The partition count fixed at construction, or `None` when it can
    /// only be resolved against a dataset (plain natural-id).
    fn declared_partitions(&self) -> Option<usize>;

    /// The column this strategy keys on, if any. Checked at `attach`.
    fn partition_column(&self) -> Option<&str> {
        None
    }

    /// Compute the full mapping for `dataset`.
    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError>;
}

// =============================================================================
// Strategy (unified enum)
// =============================================================================

/// Closed set of partitioning strategies, selected at construction.
///
/// Each variant wraps one concrete strategy; `From` impls let the concrete
/// builders feed [`Partitioner::new`] directly.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Seeded uniform split.
    Iid(IidPartitioner),
    /// Size-function family: linear/square/exponential/explicit/custom.
    Size(SizePartitioner),
    /// Per-class Dirichlet proportions.
    Dirichlet(DirichletPartitioner),
    /// Dirichlet class priors under fixed partition sizes.
    InnerDirichlet(InnerDirichletPartitioner),
    /// Same-class shard pooling.
    Shard(ShardPartitioner),
    /// Class-capped shard assignment.
    Pathological(PathologicalPartitioner),
    /// Explicit target-distribution matrix.
    Distribution(DistributionPartitioner),
    /// One partition per unique id.
    NaturalId(NaturalIdPartitioner),
    /// Ids merged into a fixed number of partitions.
    GroupedNaturalId(GroupedNaturalIdPartitioner),
    /// Binned continuous label with Dirichlet assignment.
    Continuous(ContinuousPartitioner),
    /// Even column split.
    VerticalEven(VerticalEvenPartitioner),
    /// Explicit column-count split.
    VerticalSize(VerticalSizePartitioner),
}

macro_rules! delegate {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Strategy::Iid($inner) => $body,
            Strategy::Size($inner) => $body,
            Strategy::Dirichlet($inner) => $body,
            Strategy::InnerDirichlet($inner) => $body,
            Strategy::Shard($inner) => $body,
            Strategy::Pathological($inner) => $body,
            Strategy::Distribution($inner) => $body,
            Strategy::NaturalId($inner) => $body,
            Strategy::GroupedNaturalId($inner) => $body,
            Strategy::Continuous($inner) => $body,
            Strategy::VerticalEven($inner) => $body,
            Strategy::VerticalSize($inner) => $body,
        }
    };
}

impl PartitionStrategy for Strategy {
    fn declared_partitions(&self) -> Option<usize> {
        delegate!(self, s => s.declared_partitions())
    }

    fn partition_column(&self) -> Option<&str> {
        delegate!(self, s => s.partition_column())
    }

    fn compute_mapping(&self, dataset: &Dataset) -> Result<PartitionMapping, PartitionError> {
        delegate!(self, s => s.compute_mapping(dataset))
    }
}

macro_rules! strategy_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Strategy {
            fn from(inner: $ty) -> Self {
                Strategy::$variant(inner)
            }
        }
    };
}

strategy_from!(Iid, IidPartitioner);
strategy_from!(Size, SizePartitioner);
strategy_from!(Dirichlet, DirichletPartitioner);
strategy_from!(InnerDirichlet, InnerDirichletPartitioner);
strategy_from!(Shard, ShardPartitioner);
strategy_from!(Pathological, PathologicalPartitioner);
strategy_from!(Distribution, DistributionPartitioner);
strategy_from!(NaturalId, NaturalIdPartitioner);
strategy_from!(GroupedNaturalId, GroupedNaturalIdPartitioner);
strategy_from!(Continuous, ContinuousPartitioner);
strategy_from!(VerticalEven, VerticalEvenPartitioner);
strategy_from!(VerticalSize, VerticalSizePartitioner);

// =============================================================================
// Partitioner
// =============================================================================

/// Owns a strategy, the attached dataset, and the once-computed mapping.
///
/// The dataset is attached exactly once; the mapping is computed lazily on
/// the first partition request and cached for the instance's lifetime.
/// Changing configuration means constructing a new instance.
#[derive(Debug)]
pub struct Partitioner {
    strategy: Strategy,
    dataset: Option<Arc<Dataset>>,
    cache: OnceLock<Result<PartitionMapping, PartitionError>>,
}

impl Partitioner {
    /// Create a partitioner for the given strategy.
    pub fn new(strategy: impl Into<Strategy>) -> Self {
        Self {
            strategy: strategy.into(),
            dataset: None,
            cache: OnceLock::new(),
        }
    }

    /// The configured strategy.
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Bind the dataset. Allowed exactly once.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DatasetAlreadyAttached`] on a second call;
    /// [`ConfigError::MissingColumn`] if the strategy's `partition_by`
    /// column is absent from the dataset.
    pub fn attach(&mut self, dataset: Arc<Dataset>) -> Result<(), ConfigError> {
        if self.dataset.is_some() {
            return Err(ConfigError::DatasetAlreadyAttached);
        }
        if let Some(column) = self.strategy.partition_column() {
            if !dataset.has_column(column) {
                return Err(ConfigError::MissingColumn(column.to_string()));
            }
        }
        self.dataset = Some(dataset);
        Ok(())
    }

    /// True once a dataset is attached.
    pub fn is_attached(&self) -> bool {
        self.dataset.is_some()
    }

    /// True once the mapping (or its terminal error) is cached.
    pub fn is_cached(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Number of partitions.
    ///
    /// Declared strategies answer without a dataset; the plain natural-id
    /// strategy resolves against the attached dataset, computing the
    /// mapping if needed.
    pub fn num_partitions(&self) -> Result<usize, PartitionError> {
        if let Some(n) = self.strategy.declared_partitions() {
            return Ok(n);
        }
        Ok(self.mapping()?.num_partitions())
    }

    /// The full mapping, computing and caching it on first use.
    ///
    /// The `OnceLock` publishes exactly one result; because every strategy
    /// is deterministic in `(dataset, config, seed)`, a racing duplicate
    /// computation under concurrent first access would publish the same
    /// value.
    pub fn mapping(&self) -> Result<&PartitionMapping, PartitionError> {
        let dataset = self
            .dataset
            .as_deref()
            .ok_or(ConfigError::NoDatasetAttached)?;
        let result = self.cache.get_or_init(|| {
            let mapping = self.strategy.compute_mapping(dataset)?;
            tracing::debug!(
                num_partitions = mapping.num_partitions(),
                vertical = mapping.is_vertical(),
                "partition mapping computed"
            );
            Ok(mapping)
        });
        match result {
            Ok(mapping) => Ok(mapping),
            Err(err) => Err(err.clone()),
        }
    }

    /// Load one partition as a lightweight view.
    ///
    /// Triggers the mapping computation if it is not cached yet.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoDatasetAttached`] before `attach`;
    /// [`PartitionError::PartitionIdOutOfRange`] for a bad id; any error of
    /// the first mapping computation (then cached as terminal).
    pub fn load_partition(&self, partition_id: usize) -> Result<Partition, PartitionError> {
        let dataset = self
            .dataset
            .clone()
            .ok_or(ConfigError::NoDatasetAttached)?;

        // Range-check against the declared count before paying for the
        // computation; data-dependent strategies check after.
        if let Some(n) = self.strategy.declared_partitions() {
            if partition_id >= n {
                return Err(PartitionError::PartitionIdOutOfRange {
                    id: partition_id,
                    num_partitions: n,
                });
            }
        }

        let mapping = self.mapping()?;
        let n = mapping.num_partitions();
        if partition_id >= n {
            return Err(PartitionError::PartitionIdOutOfRange {
                id: partition_id,
                num_partitions: n,
            });
        }

        Ok(match mapping {
            PartitionMapping::Rows(rows) => {
                Partition::from_rows(dataset, rows[partition_id].as_slice().into())
            }
            PartitionMapping::Columns(columns) => {
                Partition::from_columns(dataset, columns[partition_id].as_slice().into())
            }
        })
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Group row indices by discrete key, in sorted key order.
///
/// The deterministic key order is what makes class-driven strategies
/// reproducible across runs; index lists keep dataset order.
pub(crate) fn indices_by_key(keys: &[Key]) -> BTreeMap<Key, Vec<u64>> {
    let mut grouped: BTreeMap<Key, Vec<u64>> = BTreeMap::new();
    for (row, key) in keys.iter().enumerate() {
        grouped.entry(key.clone()).or_default().push(row as u64);
    }
    grouped
}
