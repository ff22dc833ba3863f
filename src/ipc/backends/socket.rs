/*!
 * Abstract Socket Backend
 *
 * "Create exclusive" is a bind to an abstract AF_UNIX address; a bind failing
 * with `EADDRINUSE` means a server already holds the name. The server polls
 * its listening socket until the deadline and accepts one connection; the
 * client only connects. No payload is exchanged.
 */

use crate::core::limits::SOCKET_BACKLOG;
use crate::core::types::BackendKind;
use crate::ipc::core::traits::TransportBackend;
use crate::ipc::core::types::*;
use crate::ipc::utils::Deadline;
use crate::signals::CancellationToken;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::socket::{
    accept, bind, connect, listen, socket, AddressFamily, Backlog, SockFlag, SockType, UnixAddr,
};
use nix::unistd::close;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::time::Duration;
use tracing::{debug, info};

/// Socket end held by one side
#[derive(Debug)]
pub enum SocketHandle {
    /// Bound and listening server socket
    Listener(OwnedFd),
    /// Unconnected client socket and the server address
    Peer { fd: OwnedFd, addr: UnixAddr },
}

/// Abstract-namespace stream socket transport
#[derive(Debug, Clone, Copy, Default)]
pub struct AbstractSocketBackend;

impl AbstractSocketBackend {
    pub fn new() -> Self {
        Self
    }

    fn addr_of(name: &IpcObjectName) -> IpcResult<UnixAddr> {
        match name {
            IpcObjectName::Abstract(n) => {
                UnixAddr::new_abstract(n.as_bytes()).map_err(|e| IpcError::os("sockaddr_un", e))
            }
            other => Err(IpcError::InvalidName {
                name: other.label(),
                reason: "sockets are addressed by an abstract name",
            }),
        }
    }

    fn stream_socket() -> IpcResult<OwnedFd> {
        socket(
            AddressFamily::Unix,
            SockType::Stream,
            SockFlag::SOCK_CLOEXEC,
            None,
        )
        .map_err(|e| IpcError::os("socket", e))
    }

    /// Poll timeout rounded up so the wait never ends before the deadline
    fn poll_timeout(remaining: Duration) -> PollTimeout {
        let millis = remaining.as_micros().div_ceil(1000).min(i32::MAX as u128) as i32;
        PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX)
    }
}

impl TransportBackend for AbstractSocketBackend {
    type Handle = SocketHandle;

    fn kind(&self) -> BackendKind {
        BackendKind::Socket
    }

    fn exchange(&self) -> Exchange {
        Exchange::Connect
    }

    fn create_exclusive(
        &self,
        name: &IpcObjectName,
        _hints: &CapacityHints,
    ) -> IpcResult<CreateOutcome<SocketHandle>> {
        let addr = Self::addr_of(name)?;
        let fd = Self::stream_socket()?;
        match bind(fd.as_raw_fd(), &addr) {
            Ok(()) => {}
            Err(Errno::EADDRINUSE) => return Ok(CreateOutcome::AlreadyExists),
            Err(e) => return Err(IpcError::os("bind", e)),
        }

        let backlog = Backlog::new(SOCKET_BACKLOG).map_err(|e| IpcError::os("listen", e))?;
        listen(&fd, backlog).map_err(|e| IpcError::os("listen", e))?;
        info!(socket = %name, "Bound abstract socket");
        Ok(CreateOutcome::Created(SocketHandle::Listener(fd)))
    }

    fn open_existing(&self, name: &IpcObjectName) -> IpcResult<SocketHandle> {
        let addr = Self::addr_of(name)?;
        let fd = Self::stream_socket()?;
        Ok(SocketHandle::Peer { fd, addr })
    }

    fn send(&self, handle: &SocketHandle, _message: &Message) -> IpcResult<()> {
        match handle {
            SocketHandle::Peer { fd, addr } => {
                connect(fd.as_raw_fd(), addr).map_err(|e| match e {
                    Errno::ECONNREFUSED => IpcError::NotFound(format!("{}", addr)),
                    e => IpcError::os("connect", e),
                })?;
                debug!("Connected to server socket");
                Ok(())
            }
            SocketHandle::Listener(_) => Err(IpcError::Unsupported("connect from a listener")),
        }
    }

    fn receive_with_deadline(
        &self,
        handle: &SocketHandle,
        deadline: &Deadline,
        token: &CancellationToken,
    ) -> IpcResult<Received> {
        let listener = match handle {
            SocketHandle::Listener(fd) => fd,
            SocketHandle::Peer { .. } => return Err(IpcError::Unsupported("accept on a peer")),
        };
        if token.is_cancelled() {
            return Ok(Received::TimedOut);
        }

        let mut fds = [PollFd::new(listener.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, Self::poll_timeout(deadline.remaining())) {
            Ok(0) if deadline.is_expired() => Ok(Received::TimedOut),
            // woke early; let the rendezvous retry against the same deadline
            Ok(0) => Ok(Received::Interrupted),
            Ok(_) => {
                let conn = accept(listener.as_raw_fd()).map_err(|e| IpcError::os("accept", e))?;
                close(conn).map_err(|e| IpcError::os("close", e))?;
                debug!("Accepted client connection");
                Ok(Received::Message(Message::signal()))
            }
            Err(Errno::EINTR) => Ok(Received::Interrupted),
            Err(e) => Err(IpcError::os("poll", e)),
        }
    }

    fn destroy(&self, handle: SocketHandle, name: &IpcObjectName) -> IpcResult<()> {
        // an abstract address disappears with its last descriptor
        drop(handle);
        debug!(socket = %name, "Released abstract socket");
        Ok(())
    }

    fn close(&self, handle: SocketHandle) -> IpcResult<()> {
        drop(handle);
        Ok(())
    }
}
