//! Data-fetching layer: cached reads and invalidating mutations.

pub mod cache;
pub mod handle;
pub mod mutation;

pub use cache::{CachedValue, EntryInfo, QueryCache, QueryKey, QueryStatus};
pub use handle::{Query, QueryState};
pub use mutation::{MutationSpec, Mutator};
