//! Local tool registry and its synchronization with the catalog

mod local;
mod sync;

pub use local::{LOCAL_PLATFORM, LocalRegistry, LocalToolInfo, LocalToolKind};
pub use sync::{RegistrySynchronizer, SyncReport};
