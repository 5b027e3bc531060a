//! Persistence boundary for placed orders.
//!
//! The engine and the stream consumer talk to storage only through the
//! [`OrderStore`] trait: insert, filtered paged reads, and single-document
//! updates. Writes are independent and last-write-wins; the store is
//! expected to serialize concurrent writes to the same document.

mod error;
mod memory;
mod store;

pub use error::StoreError;
pub use memory::InMemoryOrderStore;
pub use store::{OrderFilter, OrderStore, OrderUpdate, Page, SharedOrderStore, SortOrder, UpdateOutcome, ORDERS_COLLECTION};
