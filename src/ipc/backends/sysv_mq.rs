/*!
 * System V Message Queue Backend
 *
 * Queues are addressed by a key derived from a shared marker file. The
 * client's reply queue is `IPC_PRIVATE` and its id travels inside the request.
 * `msgrcv` has no timeout, so waits are bounded by the alarm timer.
 */

use crate::core::limits::{MAX_MESSAGE_SIZE, QUEUE_PERMISSIONS};
use crate::core::types::BackendKind;
use crate::ipc::core::codec;
use crate::ipc::core::traits::TransportBackend;
use crate::ipc::core::types::*;
use crate::ipc::utils::Deadline;
use crate::signals::CancellationToken;
use nix::errno::Errno;
use tracing::{debug, info};

/// Every probe message uses the same type
const MESSAGE_TYPE: libc::c_long = 1;

#[repr(C)]
struct MsgBuf {
    mtype: libc::c_long,
    mtext: [u8; MAX_MESSAGE_SIZE],
}

impl MsgBuf {
    fn empty() -> Self {
        Self {
            mtype: 0,
            mtext: [0; MAX_MESSAGE_SIZE],
        }
    }
}

/// System V queue identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysvQueueHandle {
    qid: libc::c_int,
}

/// System V message queue transport
#[derive(Debug, Clone, Copy, Default)]
pub struct SysvQueueBackend;

impl SysvQueueBackend {
    pub fn new() -> Self {
        Self
    }

    fn key_of(name: &IpcObjectName) -> IpcResult<libc::key_t> {
        match name {
            IpcObjectName::Key { key, .. } => Ok(*key),
            other => Err(IpcError::InvalidName {
                name: other.label(),
                reason: "System V queues are addressed by a derived key",
            }),
        }
    }

    fn msgget(key: libc::key_t, flags: libc::c_int) -> Result<libc::c_int, Errno> {
        // SAFETY: plain syscall wrapper
        let qid = unsafe { libc::msgget(key, flags) };
        if qid == -1 {
            Err(Errno::last())
        } else {
            Ok(qid)
        }
    }
}

impl TransportBackend for SysvQueueBackend {
    type Handle = SysvQueueHandle;

    fn kind(&self) -> BackendKind {
        BackendKind::SysvMq
    }

    fn exchange(&self) -> Exchange {
        Exchange::RequestReply
    }

    fn timeout_mechanism(&self) -> TimeoutMechanism {
        TimeoutMechanism::Alarm
    }

    fn create_exclusive(
        &self,
        name: &IpcObjectName,
        _hints: &CapacityHints,
    ) -> IpcResult<CreateOutcome<SysvQueueHandle>> {
        let key = Self::key_of(name)?;
        let flags = libc::IPC_CREAT | libc::IPC_EXCL | QUEUE_PERMISSIONS as libc::c_int;
        match Self::msgget(key, flags) {
            Ok(qid) => {
                info!(queue = %name, qid, "Created System V queue");
                Ok(CreateOutcome::Created(SysvQueueHandle { qid }))
            }
            Err(Errno::EEXIST) => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(IpcError::os("msgget", e)),
        }
    }

    fn open_existing(&self, name: &IpcObjectName) -> IpcResult<SysvQueueHandle> {
        let key = Self::key_of(name)?;
        match Self::msgget(key, 0) {
            Ok(qid) => Ok(SysvQueueHandle { qid }),
            Err(Errno::ENOENT) => Err(IpcError::NotFound(name.label())),
            Err(e) => Err(IpcError::os("msgget", e)),
        }
    }

    fn send(&self, handle: &SysvQueueHandle, message: &Message) -> IpcResult<()> {
        let bytes = codec::encode(message)?;
        let mut buf = MsgBuf::empty();
        buf.mtype = MESSAGE_TYPE;
        buf.mtext[..bytes.len()].copy_from_slice(&bytes);

        // SAFETY: buf is a valid msgbuf with at least bytes.len() bytes of text
        let rc = unsafe {
            libc::msgsnd(
                handle.qid,
                &buf as *const MsgBuf as *const libc::c_void,
                bytes.len(),
                0,
            )
        };
        if rc == -1 {
            return Err(IpcError::last_os("msgsnd"));
        }
        debug!(qid = handle.qid, bytes = bytes.len(), "Message sent");
        Ok(())
    }

    fn receive_with_deadline(
        &self,
        handle: &SysvQueueHandle,
        deadline: &Deadline,
        token: &CancellationToken,
    ) -> IpcResult<Received> {
        // msgrcv itself cannot observe the deadline; the alarm interrupts it
        if token.is_cancelled() || deadline.is_expired() {
            return Ok(Received::TimedOut);
        }

        let mut buf = MsgBuf::empty();
        // SAFETY: buf has room for MAX_MESSAGE_SIZE bytes of text
        let received = unsafe {
            libc::msgrcv(
                handle.qid,
                &mut buf as *mut MsgBuf as *mut libc::c_void,
                MAX_MESSAGE_SIZE,
                0,
                0,
            )
        };
        if received == -1 {
            return match Errno::last() {
                Errno::EINTR => Ok(Received::Interrupted),
                e => Err(IpcError::os("msgrcv", e)),
            };
        }
        let len = received as usize;
        Ok(Received::Message(codec::decode(&buf.mtext[..len])?))
    }

    fn destroy(&self, handle: SysvQueueHandle, name: &IpcObjectName) -> IpcResult<()> {
        // SAFETY: IPC_RMID takes no buffer
        let rc = unsafe { libc::msgctl(handle.qid, libc::IPC_RMID, std::ptr::null_mut()) };
        if rc == -1 {
            return Err(IpcError::last_os("msgctl(IPC_RMID)"));
        }
        debug!(queue = %name, qid = handle.qid, "Removed System V queue");
        Ok(())
    }

    fn close(&self, _handle: SysvQueueHandle) -> IpcResult<()> {
        // System V ids hold no per-process reference
        Ok(())
    }

    fn open_reply_channel(
        &self,
        _name: &IpcObjectName,
        _hints: &CapacityHints,
    ) -> IpcResult<(SysvQueueHandle, ReplyAddress)> {
        let qid = Self::msgget(libc::IPC_PRIVATE, QUEUE_PERMISSIONS as libc::c_int)
            .map_err(|e| IpcError::os("msgget(IPC_PRIVATE)", e))?;
        debug!(qid, "Created private reply queue");
        Ok((SysvQueueHandle { qid }, IpcObjectName::Private(qid)))
    }

    fn attach_reply_channel(&self, address: &ReplyAddress) -> IpcResult<SysvQueueHandle> {
        match address {
            IpcObjectName::Private(qid) => Ok(SysvQueueHandle { qid: *qid }),
            other => Err(IpcError::InvalidName {
                name: other.label(),
                reason: "System V replies go to a private queue id",
            }),
        }
    }
}
