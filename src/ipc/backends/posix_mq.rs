/*!
 * POSIX Message Queue Backend
 *
 * Server queue created with `O_CREAT | O_EXCL`; the client creates its own
 * reply queue and embeds its name in the request. Receives are bounded by
 * `mq_timedreceive` against the realtime deadline.
 */

use crate::core::limits::QUEUE_PERMISSIONS;
use crate::core::types::BackendKind;
use crate::ipc::core::codec;
use crate::ipc::core::traits::TransportBackend;
use crate::ipc::core::types::*;
use crate::ipc::utils::Deadline;
use crate::signals::CancellationToken;
use nix::errno::Errno;
use nix::mqueue::{
    mq_close, mq_open, mq_send, mq_timedreceive, mq_unlink, MQ_OFlag, MqAttr, MqdT,
};
use nix::sys::stat::Mode;
use tracing::{debug, info};

/// Open POSIX queue descriptor
#[derive(Debug)]
pub struct PosixQueueHandle {
    mqd: MqdT,
    path: String,
    message_size: usize,
}

/// POSIX message queue transport
#[derive(Debug, Clone, Default)]
pub struct PosixQueueBackend {
    hints: CapacityHints,
}

impl PosixQueueBackend {
    pub fn new(hints: CapacityHints) -> Self {
        Self { hints }
    }

    fn path_of(name: &IpcObjectName) -> IpcResult<&str> {
        match name {
            IpcObjectName::Path(path) => Ok(path.as_str()),
            other => Err(IpcError::InvalidName {
                name: other.label(),
                reason: "POSIX queues are addressed by /name",
            }),
        }
    }

    fn attr(hints: &CapacityHints) -> MqAttr {
        MqAttr::new(0, hints.max_messages as _, hints.message_size as _, 0)
    }

    fn create(&self, path: &str, access: MQ_OFlag, hints: &CapacityHints) -> nix::Result<MqdT> {
        mq_open(
            path,
            access | MQ_OFlag::O_CREAT | MQ_OFlag::O_EXCL,
            Mode::from_bits_truncate(QUEUE_PERMISSIONS),
            Some(&Self::attr(hints)),
        )
    }

    fn open(&self, path: &str, access: MQ_OFlag) -> IpcResult<PosixQueueHandle> {
        let mqd = mq_open(path, access, Mode::empty(), None).map_err(|e| match e {
            Errno::ENOENT => IpcError::NotFound(path.to_string()),
            e => IpcError::os("mq_open", e),
        })?;
        Ok(PosixQueueHandle {
            mqd,
            path: path.to_string(),
            message_size: self.hints.message_size,
        })
    }
}

impl TransportBackend for PosixQueueBackend {
    type Handle = PosixQueueHandle;

    fn kind(&self) -> BackendKind {
        BackendKind::PosixMq
    }

    fn exchange(&self) -> Exchange {
        Exchange::RequestReply
    }

    fn create_exclusive(
        &self,
        name: &IpcObjectName,
        hints: &CapacityHints,
    ) -> IpcResult<CreateOutcome<PosixQueueHandle>> {
        let path = Self::path_of(name)?;
        match self.create(path, MQ_OFlag::O_RDONLY, hints) {
            Ok(mqd) => {
                info!(queue = path, "Created POSIX queue");
                Ok(CreateOutcome::Created(PosixQueueHandle {
                    mqd,
                    path: path.to_string(),
                    message_size: hints.message_size,
                }))
            }
            Err(Errno::EEXIST) => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(IpcError::os("mq_open", e)),
        }
    }

    fn open_existing(&self, name: &IpcObjectName) -> IpcResult<PosixQueueHandle> {
        self.open(Self::path_of(name)?, MQ_OFlag::O_WRONLY)
    }

    fn send(&self, handle: &PosixQueueHandle, message: &Message) -> IpcResult<()> {
        let bytes = codec::encode(message)?;
        if bytes.len() > handle.message_size {
            return Err(IpcError::MessageTooLarge {
                size: bytes.len(),
                max: handle.message_size,
            });
        }
        mq_send(&handle.mqd, &bytes, 0).map_err(|e| IpcError::os("mq_send", e))?;
        debug!(queue = handle.path.as_str(), bytes = bytes.len(), "Message sent");
        Ok(())
    }

    fn receive_with_deadline(
        &self,
        handle: &PosixQueueHandle,
        deadline: &Deadline,
        token: &CancellationToken,
    ) -> IpcResult<Received> {
        if token.is_cancelled() {
            return Ok(Received::TimedOut);
        }

        let mut buffer = vec![0u8; handle.message_size];
        let mut priority = 0u32;
        match mq_timedreceive(&handle.mqd, &mut buffer, &mut priority, &deadline.realtime()) {
            Ok(len) => Ok(Received::Message(codec::decode(&buffer[..len])?)),
            Err(Errno::ETIMEDOUT) => Ok(Received::TimedOut),
            Err(Errno::EINTR) => Ok(Received::Interrupted),
            Err(e) => Err(IpcError::os("mq_timedreceive", e)),
        }
    }

    fn destroy(&self, handle: PosixQueueHandle, _name: &IpcObjectName) -> IpcResult<()> {
        let path = handle.path.clone();
        // unlink even when close fails; report the first failure
        let closed = self.close(handle);
        mq_unlink(path.as_str()).map_err(|e| IpcError::os("mq_unlink", e))?;
        debug!(queue = path.as_str(), "Unlinked POSIX queue");
        closed
    }

    fn close(&self, handle: PosixQueueHandle) -> IpcResult<()> {
        mq_close(handle.mqd).map_err(|e| IpcError::os("mq_close", e))
    }

    fn open_reply_channel(
        &self,
        name: &IpcObjectName,
        hints: &CapacityHints,
    ) -> IpcResult<(PosixQueueHandle, ReplyAddress)> {
        let path = format!("{}-reply-{}", Self::path_of(name)?, std::process::id());
        let mqd = self.create(&path, MQ_OFlag::O_RDONLY, hints).map_err(|e| match e {
            Errno::EEXIST => IpcError::AlreadyExists(path.clone()),
            e => IpcError::os("mq_open", e),
        })?;
        debug!(queue = path.as_str(), "Created reply queue");
        Ok((
            PosixQueueHandle {
                mqd,
                path: path.clone(),
                message_size: hints.message_size,
            },
            IpcObjectName::Path(path),
        ))
    }

    fn attach_reply_channel(&self, address: &ReplyAddress) -> IpcResult<PosixQueueHandle> {
        self.open(Self::path_of(address)?, MQ_OFlag::O_WRONLY)
    }
}
