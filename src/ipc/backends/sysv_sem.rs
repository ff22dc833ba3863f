/*!
 * System V Semaphore Backend
 *
 * A one-element semaphore set addressed by a derived key. The initial value
 * of a new set is unspecified, so the creator resets it to zero before any
 * peer can post. `semop` has no timeout here; the alarm timer interrupts it.
 */

use crate::core::limits::SYSV_SEMAPHORE_PERMISSIONS;
use crate::core::types::BackendKind;
use crate::ipc::core::traits::TransportBackend;
use crate::ipc::core::types::*;
use crate::ipc::utils::Deadline;
use crate::signals::CancellationToken;
use nix::errno::Errno;
use tracing::{debug, info, warn};

/// System V semaphore set identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysvSemaphoreHandle {
    semid: libc::c_int,
}

/// System V semaphore transport
#[derive(Debug, Clone, Copy, Default)]
pub struct SysvSemaphoreBackend;

impl SysvSemaphoreBackend {
    pub fn new() -> Self {
        Self
    }

    fn key_of(name: &IpcObjectName) -> IpcResult<libc::key_t> {
        match name {
            IpcObjectName::Key { key, .. } => Ok(*key),
            other => Err(IpcError::InvalidName {
                name: other.label(),
                reason: "System V semaphores are addressed by a derived key",
            }),
        }
    }

    fn semop(semid: libc::c_int, delta: libc::c_short) -> Result<(), Errno> {
        let mut op = libc::sembuf {
            sem_num: 0,
            sem_op: delta,
            sem_flg: 0,
        };
        // SAFETY: one valid sembuf
        if unsafe { libc::semop(semid, &mut op, 1) } == -1 {
            Err(Errno::last())
        } else {
            Ok(())
        }
    }

    fn remove(semid: libc::c_int) -> IpcResult<()> {
        // SAFETY: IPC_RMID takes no argument
        if unsafe { libc::semctl(semid, 0, libc::IPC_RMID) } == -1 {
            return Err(IpcError::last_os("semctl(IPC_RMID)"));
        }
        Ok(())
    }
}

impl TransportBackend for SysvSemaphoreBackend {
    type Handle = SysvSemaphoreHandle;

    fn kind(&self) -> BackendKind {
        BackendKind::SysvSem
    }

    fn exchange(&self) -> Exchange {
        Exchange::Signal
    }

    fn timeout_mechanism(&self) -> TimeoutMechanism {
        TimeoutMechanism::Alarm
    }

    fn create_exclusive(
        &self,
        name: &IpcObjectName,
        _hints: &CapacityHints,
    ) -> IpcResult<CreateOutcome<SysvSemaphoreHandle>> {
        let key = Self::key_of(name)?;
        let flags = libc::IPC_CREAT | libc::IPC_EXCL | SYSV_SEMAPHORE_PERMISSIONS as libc::c_int;
        // SAFETY: plain syscall wrapper
        let semid = unsafe { libc::semget(key, 1, flags) };
        if semid == -1 {
            return match Errno::last() {
                Errno::EEXIST => Ok(CreateOutcome::AlreadyExists),
                e => Err(IpcError::os("semget", e)),
            };
        }

        // SAFETY: SETVAL takes the new value as an int
        if unsafe { libc::semctl(semid, 0, libc::SETVAL, 0 as libc::c_int) } == -1 {
            let err = IpcError::last_os("semctl(SETVAL)");
            // the set was created by us; do not leave it behind
            if let Err(e) = Self::remove(semid) {
                warn!(error = %e, semid, "Failed to remove semaphore after SETVAL failure");
            }
            return Err(err);
        }

        info!(semaphore = %name, semid, "Created System V semaphore");
        Ok(CreateOutcome::Created(SysvSemaphoreHandle { semid }))
    }

    fn open_existing(&self, name: &IpcObjectName) -> IpcResult<SysvSemaphoreHandle> {
        let key = Self::key_of(name)?;
        // SAFETY: plain syscall wrapper
        let semid = unsafe { libc::semget(key, 1, 0) };
        if semid == -1 {
            return match Errno::last() {
                Errno::ENOENT => Err(IpcError::NotFound(name.label())),
                e => Err(IpcError::os("semget", e)),
            };
        }
        Ok(SysvSemaphoreHandle { semid })
    }

    fn send(&self, handle: &SysvSemaphoreHandle, _message: &Message) -> IpcResult<()> {
        Self::semop(handle.semid, 1).map_err(|e| IpcError::os("semop(+1)", e))?;
        debug!(semid = handle.semid, "Semaphore incremented");
        Ok(())
    }

    fn receive_with_deadline(
        &self,
        handle: &SysvSemaphoreHandle,
        deadline: &Deadline,
        token: &CancellationToken,
    ) -> IpcResult<Received> {
        if token.is_cancelled() || deadline.is_expired() {
            return Ok(Received::TimedOut);
        }
        match Self::semop(handle.semid, -1) {
            Ok(()) => Ok(Received::Message(Message::signal())),
            Err(Errno::EINTR) => Ok(Received::Interrupted),
            Err(e) => Err(IpcError::os("semop(-1)", e)),
        }
    }

    fn destroy(&self, handle: SysvSemaphoreHandle, name: &IpcObjectName) -> IpcResult<()> {
        Self::remove(handle.semid)?;
        debug!(semaphore = %name, semid = handle.semid, "Removed System V semaphore");
        Ok(())
    }

    fn close(&self, _handle: SysvSemaphoreHandle) -> IpcResult<()> {
        Ok(())
    }
}
