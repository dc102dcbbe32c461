use thiserror::Error;

/// Returned by `check_invariants` when the index and the ordering structure of a cache
/// disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("{len} entries exceed the capacity of {capacity}")]
    OverCapacity { len: usize, capacity: usize },

    #[error("index holds {indexed} keys but the ordering structure holds {ordered}")]
    LengthMismatch { indexed: usize, ordered: usize },

    #[error("slot {slot} is linked into the ordering structure but not indexed")]
    Unindexed { slot: usize },

    #[error("links around slot {slot} are not symmetric")]
    BrokenLink { slot: usize },

    #[error("entry with frequency {frequency} is filed under bucket {bucket}")]
    Misfiled { frequency: u64, bucket: u64 },

    #[error("bucket for frequency {frequency} is empty but still present")]
    EmptyBucket { frequency: u64 },

    #[error("tracked minimum frequency is {tracked} but the smallest bucket is {actual}")]
    StaleMinimum { tracked: u64, actual: u64 },

    #[error("running access count {tracked} is below the frequency sum {actual}")]
    AccessCountDrift { tracked: u64, actual: u64 },

    #[error("a key is cached in the main store and also awaiting promotion")]
    PromotedKeyInHistory,

    #[error("a pending value has no matching history entry")]
    OrphanedPendingValue,
}
