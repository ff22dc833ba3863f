/*!
 * IPC Traits
 * Capability set every transport backend exposes to the probe core
 */

use super::types::*;
use crate::core::types::BackendKind;
use crate::ipc::utils::Deadline;
use crate::signals::CancellationToken;

/// Transport backend interface
///
/// One implementation per kernel IPC mechanism. Role arbitration, the
/// bounded rendezvous and cleanup are written once against this trait.
///
/// # Ownership
///
/// `destroy` and `close` consume the handle, so a handle can be released at
/// most once. The kernel does not make removal idempotent.
pub trait TransportBackend {
    /// Process-local reference to an opened object
    type Handle;

    fn kind(&self) -> BackendKind;

    /// Which interaction the probe runs once roles are decided
    fn exchange(&self) -> Exchange;

    /// How `receive_with_deadline` is bounded
    fn timeout_mechanism(&self) -> TimeoutMechanism {
        TimeoutMechanism::Native
    }

    /// Atomically create the object only if absent
    ///
    /// "Already exists" must be reported as `CreateOutcome::AlreadyExists`,
    /// never as an error, so the caller can become the client.
    fn create_exclusive(
        &self,
        name: &IpcObjectName,
        hints: &CapacityHints,
    ) -> IpcResult<CreateOutcome<Self::Handle>>;

    /// Attach to an object a peer already created
    fn open_existing(&self, name: &IpcObjectName) -> IpcResult<Self::Handle>;

    /// Send a message, post the semaphore, or connect
    fn send(&self, handle: &Self::Handle, message: &Message) -> IpcResult<()>;

    /// Single bounded receive attempt
    ///
    /// Returns `Received::TimedOut` once `deadline` has passed or `token` is
    /// cancelled, `Received::Interrupted` when a signal cut the call short.
    fn receive_with_deadline(
        &self,
        handle: &Self::Handle,
        deadline: &Deadline,
        token: &CancellationToken,
    ) -> IpcResult<Received>;

    /// Remove the kernel object
    fn destroy(&self, handle: Self::Handle, name: &IpcObjectName) -> IpcResult<()>;

    /// Release the local reference, leaving the object in place
    fn close(&self, handle: Self::Handle) -> IpcResult<()>;

    /// Create the client-owned object the server replies to
    ///
    /// Only request/reply backends support this.
    fn open_reply_channel(
        &self,
        _name: &IpcObjectName,
        _hints: &CapacityHints,
    ) -> IpcResult<(Self::Handle, ReplyAddress)> {
        Err(IpcError::Unsupported("reply channel"))
    }

    /// Attach to the reply object named in a client request
    fn attach_reply_channel(&self, _address: &ReplyAddress) -> IpcResult<Self::Handle> {
        Err(IpcError::Unsupported("reply channel"))
    }
}
