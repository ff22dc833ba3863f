/*!
 * Role Arbiter
 *
 * Decides Server or Client once per process by racing to exclusively create
 * the named object. Winning the create makes this process the Server;
 * finding the object present makes it the Client, which must then open it.
 * The decision is never retried.
 */

use super::core::traits::TransportBackend;
use super::core::types::{CapacityHints, CreateOutcome, IpcObjectName};
use crate::core::errors::{ProbeError, ProbeResult};
use crate::core::types::Role;
use tracing::{debug, info, instrument};

/// Role decided by the race, with the handle each side proceeds with
#[derive(Debug)]
pub enum Arbitration<H> {
    /// Created the object; owns and later destroys it
    Server(H),
    /// Opened the peer's object; only closes it
    Client(H),
}

impl<H> Arbitration<H> {
    pub fn role(&self) -> Role {
        match self {
            Self::Server(_) => Role::Server,
            Self::Client(_) => Role::Client,
        }
    }

    pub fn into_handle(self) -> H {
        match self {
            Self::Server(h) | Self::Client(h) => h,
        }
    }
}

/// Run the exclusive-create race for `name`
///
/// An open failure after "already exists" is a `Race` error, distinct from a
/// plain creation failure, which carries no role.
#[instrument(skip(backend, name, hints), fields(backend = backend.kind().as_str(), name = %name))]
pub fn arbitrate<B: TransportBackend>(
    backend: &B,
    name: &IpcObjectName,
    hints: &CapacityHints,
) -> ProbeResult<Arbitration<B::Handle>> {
    match backend.create_exclusive(name, hints) {
        Ok(CreateOutcome::Created(handle)) => {
            info!(role = "server", "Won the create race");
            Ok(Arbitration::Server(handle))
        }
        Ok(CreateOutcome::AlreadyExists) => {
            debug!("Object already exists, attaching as client");
            let handle = backend.open_existing(name).map_err(|source| ProbeError::Race {
                name: name.label(),
                source,
            })?;
            info!(role = "client", "Attached to existing object");
            Ok(Arbitration::Client(handle))
        }
        Err(source) => Err(ProbeError::Creation {
            kind: backend.kind(),
            name: name.label(),
            source,
        }),
    }
}
