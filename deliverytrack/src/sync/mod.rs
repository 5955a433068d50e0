//! Remote synchronization.
//!
//! - [`store`] - the remote document store interface
//! - [`memory`] - an in-memory store with failure injection
//! - [`bridge`] - typed tracking reads, writes and subscriptions
//! - [`policy`] - what to do when a remote operation fails

pub mod bridge;
pub mod memory;
pub mod policy;
pub mod store;

pub use bridge::{RemoteSyncBridge, SessionSubscription, StatusSubscription};
pub use memory::InMemoryRemoteStore;
pub use policy::best_effort;
pub use store::{
    Document, DocumentListener, DocumentPath, RemoteError, RemoteStore, ORDERS_COLLECTION,
    TRACKING_COLLECTION,
};
