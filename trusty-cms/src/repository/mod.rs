//! Document store abstraction
//!
//! - [`DocumentStore`]: object-safe async trait for collection-oriented storage
//! - [`MemoryStore`]: the in-process implementation with JSON snapshots
//! - [`FilterDescriptor`]: field conditions with store-side matching
//! - [`FindOptions`]: sort, projection and skip/limit window
//! - [`RelationLoader`]: best-effort reference expansion
//! - [`Collection`]: typed access for one [`Resource`]

mod collection;
mod error;
mod filter;
mod memory;
mod options;
mod traits;

pub use collection::{decode, encode, Collection, Resource};
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use filter::{field_value, CompareOp, Condition, Document, FilterDescriptor, FilterError};
pub use memory::MemoryStore;
pub use options::{FindOptions, OrderDirection, Projection, ProjectionError, SortKey, SortSpec};
pub use traits::{DocumentStore, RelationLoader, RepositoryResult};
