// Remote collaborators - the hosted data service that owns the roster

pub mod errors;
pub mod memory;
pub mod rest;

pub use errors::RemoteError;
pub use memory::InMemoryRosterStore;
pub use rest::RestRosterStore;

use crate::board::types::{Client, StageUpdate};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// Source of truth for clients and their stage assignments
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait::async_trait]
pub trait RosterStore: Send + Sync {
    /// Full current roster, each record with its stage assignment
    async fn fetch_clients(&self) -> Result<Vec<Client>, RemoteError>;

    /// Persist a client's stage and ordering hint. The only write path moves use.
    async fn update_stage(&self, update: &StageUpdate) -> Result<(), RemoteError>;

    /// Force the next `fetch_clients` to bypass any cached roster
    async fn invalidate(&self);
}
