/*!
 * IPC Object Guard
 *
 * RAII owner of one kernel IPC handle. An `Owner` guard destroys the object,
 * an `Attached` guard only closes its local reference. The handle is moved
 * out on release, so the kernel object is removed at most once.
 */

use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use crate::ipc::{IpcError, IpcObjectName, IpcResult, TransportBackend};
use tracing::{debug, warn};

/// What releasing the guard does to the kernel object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Created by this process; released by destroying it
    Owner,
    /// Opened from a peer; released by closing the local reference
    Attached,
}

/// IPC object guard with automatic cleanup
///
/// # Example
///
/// ```ignore
/// let guard = ObjectGuard::owned(&backend, handle, name);
/// backend.receive_with_deadline(guard.handle()?, &deadline, &token)?;
/// guard.finish()?;
/// ```
pub struct ObjectGuard<'a, B: TransportBackend> {
    backend: &'a B,
    handle: Option<B::Handle>,
    name: IpcObjectName,
    ownership: Ownership,
    metadata: GuardMetadata,
}

impl<'a, B: TransportBackend> ObjectGuard<'a, B> {
    /// Guard an object this process created
    pub fn owned(backend: &'a B, handle: B::Handle, name: IpcObjectName) -> Self {
        Self::new(backend, handle, name, Ownership::Owner)
    }

    /// Guard an object a peer created
    pub fn attached(backend: &'a B, handle: B::Handle, name: IpcObjectName) -> Self {
        Self::new(backend, handle, name, Ownership::Attached)
    }

    fn new(backend: &'a B, handle: B::Handle, name: IpcObjectName, ownership: Ownership) -> Self {
        debug!(object = %name, ?ownership, "Guarding IPC object");
        Self {
            metadata: GuardMetadata::new(backend.kind().as_str()),
            backend,
            handle: Some(handle),
            name,
            ownership,
        }
    }

    /// Borrow the live handle
    pub fn handle(&self) -> IpcResult<&B::Handle> {
        self.handle
            .as_ref()
            .ok_or_else(|| IpcError::Closed(self.name.label()))
    }

    #[inline]
    pub fn name(&self) -> &IpcObjectName {
        &self.name
    }

    /// Release explicitly and report the outcome
    pub fn finish(mut self) -> IpcResult<()> {
        self.release_handle()
    }

    fn release_handle(&mut self) -> IpcResult<()> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| IpcError::Closed(self.name.label()))?;
        let result = match self.ownership {
            Ownership::Owner => self.backend.destroy(handle, &self.name),
            Ownership::Attached => self.backend.close(handle),
        };
        debug!(
            object = %self.name,
            ownership = ?self.ownership,
            lifetime_us = self.metadata.lifetime_micros(),
            ok = result.is_ok(),
            "Released IPC object"
        );
        result
    }
}

impl<B: TransportBackend> Guard for ObjectGuard<'_, B> {
    fn resource_type(&self) -> &'static str {
        self.metadata.resource_type
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        if !self.is_active() {
            return Err(GuardError::AlreadyReleased);
        }
        self.release_handle()
            .map_err(|e| GuardError::OperationFailed(e.to_string()))
    }
}

impl<B: TransportBackend> GuardDrop for ObjectGuard<'_, B> {
    fn on_drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.release() {
                warn!(
                    object = %self.name,
                    ownership = ?self.ownership,
                    error = %e,
                    "IPC object cleanup failed during drop"
                );
            }
        }
    }
}

impl<B: TransportBackend> Drop for ObjectGuard<'_, B> {
    fn drop(&mut self) {
        self.on_drop();
    }
}
