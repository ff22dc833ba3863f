/*!
 * RAII Resource Guards
 *
 * Guards own a kernel IPC handle and release it exactly once, either
 * explicitly through `finish` or best-effort on drop.
 *
 * ## Guard Types
 *
 * - **ObjectGuard**: a server object (destroyed) or an attached peer object
 *   (closed)
 *
 * ## Example
 *
 * ```ignore
 * let guard = ObjectGuard::owned(&backend, handle, name);
 * // Use guard.handle()?
 * guard.finish()?; // Or best-effort destroy on drop
 * ```
 */

mod object;
mod traits;

pub use object::{ObjectGuard, Ownership};
pub use traits::{Guard, GuardDrop};

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
    pub pid: u32,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
            pid: std::process::id(),
        }
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
