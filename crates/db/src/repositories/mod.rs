//! Repository layer.
//!
//! Repositories are zero-sized structs whose associated functions take the
//! store as their first argument. All collections share [`CollectionRepo`];
//! slug and sequence assignment live in their own modules.

pub mod collection_repo;
pub mod sequence;
pub mod slug;

pub use collection_repo::CollectionRepo;
pub use sequence::{next_sequence, plan_reorder, SequenceStrategy};
pub use slug::assign_slug;
