/*!
 * Message Codec
 *
 * Bincode envelope used by the queue backends. A single message is at most
 * `MAX_MESSAGE_SIZE` bytes on the wire; anything larger is rejected before it
 * reaches the kernel.
 */

use super::types::{IpcError, IpcResult, Message};
use crate::core::limits::MAX_MESSAGE_SIZE;

/// Encoded size of a message without allocating
#[inline]
pub fn encoded_len(message: &Message) -> IpcResult<usize> {
    Ok(bincode::serialized_size(message)? as usize)
}

/// Encode a message, enforcing the wire limit
pub fn encode(message: &Message) -> IpcResult<Vec<u8>> {
    let size = encoded_len(message)?;
    if size > MAX_MESSAGE_SIZE {
        return Err(IpcError::MessageTooLarge {
            size,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bincode::serialize(message)?)
}

/// Decode a message received from a queue
pub fn decode(bytes: &[u8]) -> IpcResult<Message> {
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(IpcError::MessageTooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bincode::deserialize(bytes)?)
}

/// Server response to a client request: the request bytes followed by their length
pub fn compose_reply(request: &Message) -> Message {
    let mut payload = request.payload.clone();
    payload.extend_from_slice(format!(" {}", request.payload.len()).as_bytes());
    Message::new(payload)
}
