/*!
 * IPC Core Module
 * Transport trait, shared types and the queue message codec
 */

pub mod codec;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use traits::*;
pub use types::*;
