//! Error types for partition configuration and computation.
//!
//! Two layers of failure exist:
//!
//! - [`ConfigError`]: the configuration is invalid or inconsistent, either
//!   on its own or against the attached dataset. Checked eagerly where
//!   possible (at builder `build()` time), otherwise at the first mapping
//!   computation.
//! - [`PartitionError`]: the top-level error returned by
//!   [`Partitioner`](crate::partition::Partitioner) operations. Wraps
//!   [`ConfigError`] and adds failures that only occur while computing or
//!   addressing partitions.
//!
//! All errors are terminal for a partitioner instance: a failed mapping
//! computation is cached as failed and every later call observes the same
//! error. Build a new, corrected instance instead of retrying.

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// num_partitions must be at least 1.
    #[error("num_partitions must be at least 1")]
    InvalidNumPartitions,

    /// Dirichlet concentration must be positive and finite.
    #[error("alpha must be positive and finite, got {0}")]
    InvalidAlpha(f64),

    /// Per-class alpha vector does not match the number of classes.
    #[error("alpha must provide one value per class: got {got} values for {classes} classes")]
    AlphaLengthMismatch { got: usize, classes: usize },

    /// A column named in the configuration is absent from the dataset.
    #[error("column {0:?} not found in dataset")]
    MissingColumn(String),

    /// A column has the wrong type for its role.
    #[error("column {column:?} has type {got}, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        got: &'static str,
    },

    /// A numeric column contains NaN or infinite values.
    #[error("column {column:?} contains non-finite values")]
    NonFiniteValues { column: String },

    /// `attach` was called on a partitioner that already holds a dataset.
    #[error("a dataset is already attached")]
    DatasetAlreadyAttached,

    /// A dataset-dependent operation ran before `attach`.
    #[error("no dataset attached")]
    NoDatasetAttached,

    /// Explicit partition sizes must sum to the dataset length.
    #[error("partition sizes sum to {got}, dataset has {expected} rows")]
    SizesSumMismatch { expected: usize, got: usize },

    /// An explicit size list must have one entry per partition.
    #[error("expected {expected} partition sizes, got {got}")]
    SizesLengthMismatch { expected: usize, got: usize },

    /// A size weight function produced a non-finite or negative weight.
    #[error("size weight for partition {partition_id} must be non-negative and finite, got {value}")]
    InvalidSizeWeight { partition_id: usize, value: f64 },

    /// Weights handed to an apportionment must be non-negative, finite,
    /// and have positive total mass.
    #[error("weights must be non-negative and finite with positive total mass")]
    InvalidWeights,

    /// Exactly one of `shard_size` and `num_shards_per_partition` must be set.
    #[error("exactly one of shard_size and num_shards_per_partition must be set")]
    ShardSizingConflict,

    /// shard_size must be at least 1.
    #[error("shard_size must be at least 1")]
    InvalidShardSize,

    /// num_shards_per_partition must be at least 1.
    #[error("num_shards_per_partition must be at least 1")]
    InvalidNumShardsPerPartition,

    /// The derived shard size came out as zero.
    #[error("{rows} rows cannot fill {partitions} x {shards_per_partition} shards")]
    ShardSizeUnderflow {
        rows: usize,
        partitions: usize,
        shards_per_partition: usize,
    },

    /// Fewer shards could be formed than the assignment requires.
    #[error("need {required} shards but only {available} could be formed")]
    InsufficientShards { required: usize, available: usize },

    /// num_classes_per_partition exceeds the distinct classes present.
    #[error("num_classes_per_partition ({requested}) exceeds the {available} distinct classes")]
    TooManyClassesPerPartition { requested: usize, available: usize },

    /// The class-capped assignment cannot cover every class.
    #[error("{slots} class slots cannot cover {classes} distinct classes")]
    UncoveredClasses { classes: usize, slots: usize },

    /// num_classes_per_partition must be at least 1.
    #[error("num_classes_per_partition must be at least 1")]
    InvalidClassesPerPartition,

    /// The distribution matrix shape does not match the dataset classes.
    #[error("distribution matrix has {got} class columns, dataset has {expected} classes")]
    DistributionShape { expected: usize, got: usize },

    /// Distribution entries must be non-negative and finite, and every
    /// class column must carry positive mass.
    #[error("distribution entries must be non-negative and finite, with positive mass per class column")]
    InvalidDistribution,

    /// num_bins must be at least 1.
    #[error("num_bins must be at least 1")]
    InvalidNumBins,

    /// Fewer unique ids than requested partitions.
    #[error("only {ids} unique ids for {partitions} partitions")]
    TooFewIds { ids: usize, partitions: usize },

    /// A custom grouping function returned an out-of-range partition.
    #[error("group function mapped id {id:?} to partition {got}, valid range is 0..{partitions}")]
    GroupFnOutOfRange {
        id: String,
        got: usize,
        partitions: usize,
    },

    /// Explicit column counts must sum to the number of splittable columns.
    #[error("column sizes sum to {got}, dataset has {expected} splittable columns")]
    ColumnSizesSumMismatch { expected: usize, got: usize },
}

/// Top-level partitioning error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PartitionError {
    /// Invalid or inconsistent configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `load_partition` was called with an id outside `0..num_partitions`.
    #[error("partition id {id} is out of range for {num_partitions} partitions")]
    PartitionIdOutOfRange { id: usize, num_partitions: usize },

    /// Resampling could not reach `min_partition_size` within the retry budget.
    #[error("min_partition_size {min_partition_size} not reached after {retries} retries")]
    MinSizeUnreachable {
        min_partition_size: usize,
        retries: usize,
    },
}
