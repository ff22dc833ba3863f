/*!
 * IPC Module
 * Kernel IPC objects, the role race and the bounded rendezvous
 */

pub mod arbiter;
pub mod backends;
pub mod core;
pub mod key;
pub mod rendezvous;
pub mod utils;

// Re-export for convenience
pub use self::core::*;
pub use arbiter::{arbitrate, Arbitration};
pub use key::{KeyResolver, MarkerFile, ProjectId, ResolvedName};
pub use rendezvous::{Rendezvous, RendezvousError};
pub use utils::Deadline;
