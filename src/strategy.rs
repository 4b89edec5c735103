//! Invalidation strategies applied after a successful mutation.

use std::fmt;

/// How a successful create/update refreshes cached views of an entity kind.
///
/// Deletes ignore the strategy and always invalidate both the kind and the
/// deleted record's detail key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationStrategy {
    /// Mark every key under `[kind]` stale.
    Broad,

    /// Mark `[kind]` and `[kind, "detail", id]` stale.
    Targeted,

    /// Mark `[kind]` stale, then write the server's response into
    /// `[kind, "detail", id]` so the edited record is served without a refetch.
    OptimisticOverwrite,
}

impl fmt::Display for InvalidationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationStrategy::Broad => write!(f, "Broad"),
            InvalidationStrategy::Targeted => write!(f, "Targeted"),
            InvalidationStrategy::OptimisticOverwrite => write!(f, "OptimisticOverwrite"),
        }
    }
}
