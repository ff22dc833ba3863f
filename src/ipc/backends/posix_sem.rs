/*!
 * POSIX Named Semaphore Backend
 *
 * The "message" is a single post on a semaphore created with count zero.
 * The server's wait is bounded by `sem_timedwait`.
 */

use crate::core::limits::NAMED_SEMAPHORE_PERMISSIONS;
use crate::core::types::BackendKind;
use crate::ipc::core::traits::TransportBackend;
use crate::ipc::core::types::*;
use crate::ipc::utils::Deadline;
use crate::signals::CancellationToken;
use nix::errno::Errno;
use std::ffi::CString;
use std::ptr::NonNull;
use tracing::{debug, info};

/// Process-local mapping of a named semaphore
#[derive(Debug)]
pub struct NamedSemaphoreHandle {
    sem: NonNull<libc::sem_t>,
    path: CString,
}

/// POSIX named semaphore transport
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedSemaphoreBackend;

impl NamedSemaphoreBackend {
    pub fn new() -> Self {
        Self
    }

    fn path_of(name: &IpcObjectName) -> IpcResult<CString> {
        match name {
            IpcObjectName::Path(path) => CString::new(path.as_str()).map_err(|_| {
                IpcError::InvalidName {
                    name: path.clone(),
                    reason: "contains a NUL byte",
                }
            }),
            other => Err(IpcError::InvalidName {
                name: other.label(),
                reason: "named semaphores are addressed by /name",
            }),
        }
    }
}

impl TransportBackend for NamedSemaphoreBackend {
    type Handle = NamedSemaphoreHandle;

    fn kind(&self) -> BackendKind {
        BackendKind::PosixSem
    }

    fn exchange(&self) -> Exchange {
        Exchange::Signal
    }

    fn create_exclusive(
        &self,
        name: &IpcObjectName,
        _hints: &CapacityHints,
    ) -> IpcResult<CreateOutcome<NamedSemaphoreHandle>> {
        let path = Self::path_of(name)?;
        // SAFETY: valid C string; mode and initial value passed as the
        // variadic arguments sem_open expects with O_CREAT
        let sem = unsafe {
            libc::sem_open(
                path.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                NAMED_SEMAPHORE_PERMISSIONS as libc::mode_t,
                0 as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            return match Errno::last() {
                Errno::EEXIST => Ok(CreateOutcome::AlreadyExists),
                e => Err(IpcError::os("sem_open", e)),
            };
        }
        info!(semaphore = %name, "Created named semaphore");
        match NonNull::new(sem) {
            Some(sem) => Ok(CreateOutcome::Created(NamedSemaphoreHandle { sem, path })),
            None => Err(IpcError::os("sem_open", Errno::EINVAL)),
        }
    }

    fn open_existing(&self, name: &IpcObjectName) -> IpcResult<NamedSemaphoreHandle> {
        let path = Self::path_of(name)?;
        // SAFETY: valid C string, no O_CREAT so no variadic arguments
        let sem = unsafe { libc::sem_open(path.as_ptr(), libc::O_RDWR) };
        if sem == libc::SEM_FAILED {
            return match Errno::last() {
                Errno::ENOENT => Err(IpcError::NotFound(name.label())),
                e => Err(IpcError::os("sem_open", e)),
            };
        }
        NonNull::new(sem)
            .map(|sem| NamedSemaphoreHandle { sem, path })
            .ok_or(IpcError::os("sem_open", Errno::EINVAL))
    }

    fn send(&self, handle: &NamedSemaphoreHandle, _message: &Message) -> IpcResult<()> {
        // SAFETY: handle holds a live mapping from sem_open
        if unsafe { libc::sem_post(handle.sem.as_ptr()) } == -1 {
            return Err(IpcError::last_os("sem_post"));
        }
        debug!("Semaphore posted");
        Ok(())
    }

    fn receive_with_deadline(
        &self,
        handle: &NamedSemaphoreHandle,
        deadline: &Deadline,
        token: &CancellationToken,
    ) -> IpcResult<Received> {
        if token.is_cancelled() {
            return Ok(Received::TimedOut);
        }

        let abstime = deadline.realtime();
        // SAFETY: live mapping and a valid absolute timespec
        let rc = unsafe { libc::sem_timedwait(handle.sem.as_ptr(), abstime.as_ref()) };
        if rc == 0 {
            return Ok(Received::Message(Message::signal()));
        }
        match Errno::last() {
            Errno::ETIMEDOUT => Ok(Received::TimedOut),
            Errno::EINTR => Ok(Received::Interrupted),
            e => Err(IpcError::os("sem_timedwait", e)),
        }
    }

    fn destroy(&self, handle: NamedSemaphoreHandle, name: &IpcObjectName) -> IpcResult<()> {
        let path = handle.path.clone();
        let closed = self.close(handle);
        // SAFETY: valid C string
        if unsafe { libc::sem_unlink(path.as_ptr()) } == -1 {
            return Err(IpcError::last_os("sem_unlink"));
        }
        debug!(semaphore = %name, "Unlinked named semaphore");
        closed
    }

    fn close(&self, handle: NamedSemaphoreHandle) -> IpcResult<()> {
        // SAFETY: the handle is consumed, so the mapping is closed once
        if unsafe { libc::sem_close(handle.sem.as_ptr()) } == -1 {
            return Err(IpcError::last_os("sem_close"));
        }
        Ok(())
    }
}
