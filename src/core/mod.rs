/*!
 * Core Module
 * Fundamental probe types, limits and error handling
 */

pub mod errors;
pub mod guard;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use guard::{Guard, GuardDrop, GuardError, GuardResult, ObjectGuard, Ownership};
pub use types::*;
