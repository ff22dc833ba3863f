/*!
 * Probe Driver
 *
 * Server and Client flows written once against `TransportBackend`:
 *
 * - Server: wait (bounded) for the peer; for queues, answer the request on
 *   the client's reply channel; destroy the object on every path.
 * - Client: signal or connect; for queues, send a request carrying the
 *   address of a client-owned reply channel and wait (bounded) for the
 *   answer.
 *
 * Progress is reported through a `ProbeObserver` so the binary can print the
 * familiar banners while tests stay silent.
 */

use crate::config::ProbeConfig;
use crate::core::errors::{ProbeError, ProbeResult};
use crate::core::guard::ObjectGuard;
use crate::core::types::{BackendKind, Role};
use crate::ipc::backends::{
    AbstractSocketBackend, NamedSemaphoreBackend, PosixQueueBackend, SysvQueueBackend,
    SysvSemaphoreBackend,
};
use crate::ipc::codec::compose_reply;
use crate::ipc::{
    arbitrate, Arbitration, CapacityHints, Exchange, IpcError, IpcObjectName, KeyResolver,
    Message, Rendezvous, RendezvousError, TransportBackend,
};
use crate::monitoring::ProbeSpan;
use crate::signals::CancellationToken;
use std::time::Duration;
use tracing::{error, info, warn};

/// Progress of one probe run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEvent<'a> {
    RoleDecided(Role),
    /// Server received the client's request
    RequestReceived(&'a Message),
    /// Server answered on the reply channel
    ReplySent(&'a Message),
    /// Server's wait ended with a signal or connection
    PeerArrived(Exchange),
    /// Client sent its request
    RequestSent(&'a Message),
    /// Client received the server's answer
    ResponseReceived(&'a Message),
    /// Client posted the semaphore or connected
    Signalled(Exchange),
}

/// Receives probe progress events
pub trait ProbeObserver {
    fn on_event(&self, event: &ProbeEvent<'_>);
}

/// Prints human-readable banners to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver;

impl ProbeObserver for ConsoleObserver {
    fn on_event(&self, event: &ProbeEvent<'_>) {
        match event {
            ProbeEvent::RoleDecided(Role::Server) => println!("--- Server mode ---"),
            ProbeEvent::RoleDecided(Role::Client) => println!("--- Client mode ---"),
            ProbeEvent::RequestReceived(msg) => {
                println!("Server: message received: {}", msg.text())
            }
            ProbeEvent::ReplySent(_) => println!("Server: the response sent to client."),
            ProbeEvent::PeerArrived(Exchange::Connect) => println!("Connection successful!"),
            ProbeEvent::PeerArrived(_) => println!("Server: signal received."),
            ProbeEvent::RequestSent(msg) => {
                println!("Client: sent message to server: {}", msg.text())
            }
            ProbeEvent::ResponseReceived(msg) => {
                println!("Client: response received from server: {}", msg.text())
            }
            ProbeEvent::Signalled(Exchange::Connect) => println!("Connection successful!"),
            ProbeEvent::Signalled(_) => println!("Client: Signaled the server."),
        }
    }
}

/// Discards events
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProbeObserver for NullObserver {
    fn on_event(&self, _event: &ProbeEvent<'_>) {}
}

/// Outcome of a successful probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub role: Role,
    /// Request payload (server) or reply payload (client) for queue backends
    pub exchanged: Option<Vec<u8>>,
}

/// Probe flows over one backend
pub struct Probe<B: TransportBackend> {
    backend: B,
    rendezvous: Rendezvous,
    message: Vec<u8>,
    hints: CapacityHints,
}

impl<B: TransportBackend> Probe<B> {
    pub fn new(backend: B, timeout: Duration, message: impl Into<Vec<u8>>) -> Self {
        Self {
            backend,
            rendezvous: Rendezvous::new(timeout),
            message: message.into(),
            hints: CapacityHints::default(),
        }
    }

    pub fn with_hints(mut self, hints: CapacityHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Decide the role for `name` and run the matching flow
    pub fn run(
        &self,
        name: &IpcObjectName,
        observer: &dyn ProbeObserver,
    ) -> ProbeResult<ProbeReport> {
        let arbitration = arbitrate(&self.backend, name, &self.hints)?;
        observer.on_event(&ProbeEvent::RoleDecided(arbitration.role()));
        match arbitration {
            Arbitration::Server(handle) => {
                self.serve(ObjectGuard::owned(&self.backend, handle, name.clone()), observer)
            }
            Arbitration::Client(handle) => {
                self.visit(ObjectGuard::attached(&self.backend, handle, name.clone()), observer)
            }
        }
    }

    fn serve(
        &self,
        guard: ObjectGuard<'_, B>,
        observer: &dyn ProbeObserver,
    ) -> ProbeResult<ProbeReport> {
        // on every early return the guard destroys the object while dropping
        let handle = guard.handle().map_err(|source| ProbeError::Receive {
            what: "client message",
            source,
        })?;
        let received = self.wait(handle, "client", "client message")?;

        let exchange = self.backend.exchange();
        let exchanged = match exchange {
            Exchange::RequestReply => {
                observer.on_event(&ProbeEvent::RequestReceived(&received));
                let reply = self.answer(&received)?;
                observer.on_event(&ProbeEvent::ReplySent(&reply));
                Some(received.payload)
            }
            Exchange::Signal | Exchange::Connect => {
                observer.on_event(&ProbeEvent::PeerArrived(exchange));
                None
            }
        };

        let name = guard.name().label();
        guard
            .finish()
            .map_err(|source| ProbeError::Cleanup { name, source })?;
        Ok(ProbeReport {
            role: Role::Server,
            exchanged,
        })
    }

    /// Send the reply to the channel named in the request
    fn answer(&self, request: &Message) -> ProbeResult<Message> {
        let address = request.reply_to.as_ref().ok_or_else(|| ProbeError::Receive {
            what: "client request",
            source: IpcError::Codec("request carries no reply address".into()),
        })?;
        let handle = self
            .backend
            .attach_reply_channel(address)
            .map_err(|source| ProbeError::Send {
                what: "reply",
                source,
            })?;
        let reply_guard = ObjectGuard::attached(&self.backend, handle, address.clone());

        let reply = compose_reply(request);
        let handle = reply_guard.handle().map_err(|source| ProbeError::Send {
            what: "reply",
            source,
        })?;
        self.backend
            .send(handle, &reply)
            .map_err(|source| ProbeError::Send {
                what: "reply",
                source,
            })?;
        info!(reply_to = %address, bytes = reply.payload.len(), "Reply sent");

        reply_guard.finish().map_err(|source| ProbeError::Cleanup {
            name: address.label(),
            source,
        })?;
        Ok(reply)
    }

    fn visit(
        &self,
        guard: ObjectGuard<'_, B>,
        observer: &dyn ProbeObserver,
    ) -> ProbeResult<ProbeReport> {
        let exchange = self.backend.exchange();
        let exchanged = match exchange {
            Exchange::RequestReply => Some(self.request(&guard, observer)?),
            Exchange::Signal | Exchange::Connect => {
                let handle = guard.handle().map_err(|source| ProbeError::Send {
                    what: "signal",
                    source,
                })?;
                self.backend
                    .send(handle, &Message::signal())
                    .map_err(|source| ProbeError::Send {
                        what: "signal",
                        source,
                    })?;
                observer.on_event(&ProbeEvent::Signalled(exchange));
                None
            }
        };

        let name = guard.name().label();
        guard
            .finish()
            .map_err(|source| ProbeError::Cleanup { name, source })?;
        Ok(ProbeReport {
            role: Role::Client,
            exchanged,
        })
    }

    /// Client side of a request/reply exchange; returns the reply payload
    fn request(
        &self,
        server: &ObjectGuard<'_, B>,
        observer: &dyn ProbeObserver,
    ) -> ProbeResult<Vec<u8>> {
        let (handle, address) = self
            .backend
            .open_reply_channel(server.name(), &self.hints)
            .map_err(|source| ProbeError::Creation {
                kind: self.backend.kind(),
                name: format!("reply channel for {}", server.name()),
                source,
            })?;
        let reply_guard = ObjectGuard::owned(&self.backend, handle, address.clone());

        let request = Message::request(self.message.clone(), address);
        let server_handle = server.handle().map_err(|source| ProbeError::Send {
            what: "request",
            source,
        })?;
        self.backend
            .send(server_handle, &request)
            .map_err(|source| ProbeError::Send {
                what: "request",
                source,
            })?;
        observer.on_event(&ProbeEvent::RequestSent(&request));

        let reply_handle = reply_guard.handle().map_err(|source| ProbeError::Receive {
            what: "server reply",
            source,
        })?;
        let reply = self.wait(reply_handle, "server reply", "server reply")?;
        observer.on_event(&ProbeEvent::ResponseReceived(&reply));

        let name = reply_guard.name().label();
        reply_guard
            .finish()
            .map_err(|source| ProbeError::Cleanup { name, source })?;
        Ok(reply.payload)
    }

    fn wait(
        &self,
        handle: &B::Handle,
        peer: &'static str,
        what: &'static str,
    ) -> ProbeResult<Message> {
        let token = CancellationToken::new();
        self.rendezvous
            .run(&self.backend, handle, &token)
            .map_err(|e| match e {
                RendezvousError::TimedOut { elapsed, timeout } => {
                    warn!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        timeout_ms = timeout.as_millis() as u64,
                        "Timed out waiting for {}",
                        peer
                    );
                    ProbeError::Timeout {
                        what: peer,
                        timeout,
                    }
                }
                RendezvousError::Failed(source) => ProbeError::Receive { what, source },
            })
    }
}

/// Resolve the configured name and run the probe over the configured backend
///
/// The System V marker file lives until this returns.
pub fn run(config: &ProbeConfig, observer: &dyn ProbeObserver) -> ProbeResult<ProbeReport> {
    let span = ProbeSpan::new(config.backend, &config.name);
    let _entered = span.enter();

    let resolver = KeyResolver::new(&config.key_dir);
    let resolved = resolver
        .resolve(config.backend, &config.name)
        .map_err(|source| match source {
            IpcError::InvalidName { .. } => ProbeError::usage(source.to_string()),
            source => ProbeError::Creation {
                kind: config.backend,
                name: config.name.clone(),
                source,
            },
        })?;

    let name = &resolved.name;
    let result = match config.backend {
        BackendKind::PosixMq => {
            probe_with(PosixQueueBackend::new(config.hints), config, name, observer)
        }
        BackendKind::SysvMq => probe_with(SysvQueueBackend::new(), config, name, observer),
        BackendKind::PosixSem => probe_with(NamedSemaphoreBackend::new(), config, name, observer),
        BackendKind::SysvSem => probe_with(SysvSemaphoreBackend::new(), config, name, observer),
        BackendKind::Socket => probe_with(AbstractSocketBackend::new(), config, name, observer),
    };

    match &result {
        Ok(report) => span.record_role(report.role),
        Err(e) => error!(error = %e, exit_code = e.exit_status().code(), "Probe failed"),
    }
    span.record_result(result.is_ok());
    result
}

fn probe_with<B: TransportBackend>(
    backend: B,
    config: &ProbeConfig,
    name: &IpcObjectName,
    observer: &dyn ProbeObserver,
) -> ProbeResult<ProbeReport> {
    Probe::new(backend, config.timeout, config.message.as_bytes())
        .with_hints(config.hints)
        .run(name, observer)
}
