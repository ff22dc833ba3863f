/*!
 * Shared test fixtures
 *
 * `MockBackend` is an in-memory `TransportBackend` with scripted receive
 * outcomes and counters for every destroy and close.
 */

#![allow(dead_code)]

use ipc_probe::core::types::{BackendKind, Role};
use ipc_probe::ipc::{
    CapacityHints, CreateOutcome, Deadline, Exchange, IpcError, IpcObjectName, IpcResult,
    Message, Received, ReplyAddress, TimeoutMechanism, TransportBackend,
};
use ipc_probe::{CancellationToken, ProbeEvent, ProbeObserver};
use nix::errno::Errno;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted outcome of `receive_with_deadline`
#[derive(Debug, Clone)]
pub enum Step {
    Deliver(Message),
    Interrupt,
    Fail(Errno),
}

#[derive(Debug, Default)]
pub struct MockState {
    pub objects: HashSet<String>,
    pub fail_create: Option<Errno>,
    pub fail_open: Option<Errno>,
    pub fail_destroy: Option<Errno>,
    pub script: VecDeque<Step>,
    /// Keep interrupting once the script is exhausted
    pub interrupt_forever: bool,
    pub interrupt_delay: Duration,
    pub created: Vec<String>,
    pub destroyed: Vec<String>,
    pub closed: Vec<String>,
    pub sent: Vec<(String, Message)>,
    pub receive_calls: u32,
}

/// In-memory backend keyed by object label
#[derive(Debug)]
pub struct MockBackend {
    pub exchange: Exchange,
    pub state: RefCell<MockState>,
}

impl MockBackend {
    pub fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            state: RefCell::new(MockState::default()),
        }
    }

    /// Backend where `name` already exists, as if a peer created it
    pub fn with_existing(exchange: Exchange, name: &IpcObjectName) -> Self {
        let backend = Self::new(exchange);
        backend.state.borrow_mut().objects.insert(name.label());
        backend
    }

    pub fn script(&self, steps: impl IntoIterator<Item = Step>) {
        self.state.borrow_mut().script.extend(steps);
    }

    pub fn exists(&self, name: &IpcObjectName) -> bool {
        self.state.borrow().objects.contains(&name.label())
    }
}

impl TransportBackend for MockBackend {
    type Handle = String;

    fn kind(&self) -> BackendKind {
        match self.exchange {
            Exchange::RequestReply => BackendKind::PosixMq,
            Exchange::Signal => BackendKind::PosixSem,
            Exchange::Connect => BackendKind::Socket,
        }
    }

    fn exchange(&self) -> Exchange {
        self.exchange
    }

    fn timeout_mechanism(&self) -> TimeoutMechanism {
        TimeoutMechanism::Native
    }

    fn create_exclusive(
        &self,
        name: &IpcObjectName,
        _hints: &CapacityHints,
    ) -> IpcResult<CreateOutcome<String>> {
        let mut state = self.state.borrow_mut();
        if let Some(errno) = state.fail_create {
            return Err(IpcError::os("create", errno));
        }
        let label = name.label();
        if !state.objects.insert(label.clone()) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        state.created.push(label.clone());
        Ok(CreateOutcome::Created(label))
    }

    fn open_existing(&self, name: &IpcObjectName) -> IpcResult<String> {
        let state = self.state.borrow();
        if let Some(errno) = state.fail_open {
            return Err(IpcError::os("open", errno));
        }
        let label = name.label();
        if state.objects.contains(&label) {
            Ok(label)
        } else {
            Err(IpcError::NotFound(label))
        }
    }

    fn send(&self, handle: &String, message: &Message) -> IpcResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.objects.contains(handle) {
            return Err(IpcError::NotFound(handle.clone()));
        }
        state.sent.push((handle.clone(), message.clone()));
        Ok(())
    }

    fn receive_with_deadline(
        &self,
        _handle: &String,
        deadline: &Deadline,
        token: &CancellationToken,
    ) -> IpcResult<Received> {
        let (step, delay) = {
            let mut state = self.state.borrow_mut();
            state.receive_calls += 1;
            let step = match state.script.pop_front() {
                Some(step) => Some(step),
                None if state.interrupt_forever => Some(Step::Interrupt),
                None => None,
            };
            (step, state.interrupt_delay)
        };

        match step {
            Some(Step::Deliver(message)) => Ok(Received::Message(message)),
            Some(Step::Interrupt) => {
                std::thread::sleep(delay.min(deadline.remaining()));
                Ok(Received::Interrupted)
            }
            Some(Step::Fail(errno)) => Err(IpcError::os("receive", errno)),
            None => {
                while !deadline.is_expired() && !token.is_cancelled() {
                    std::thread::sleep(deadline.remaining().min(Duration::from_millis(5)));
                }
                Ok(Received::TimedOut)
            }
        }
    }

    fn destroy(&self, handle: String, _name: &IpcObjectName) -> IpcResult<()> {
        let mut state = self.state.borrow_mut();
        state.destroyed.push(handle.clone());
        if let Some(errno) = state.fail_destroy {
            return Err(IpcError::os("destroy", errno));
        }
        state.objects.remove(&handle);
        Ok(())
    }

    fn close(&self, handle: String) -> IpcResult<()> {
        self.state.borrow_mut().closed.push(handle);
        Ok(())
    }

    fn open_reply_channel(
        &self,
        name: &IpcObjectName,
        _hints: &CapacityHints,
    ) -> IpcResult<(String, ReplyAddress)> {
        let address = IpcObjectName::Path(format!("{}-reply", name.label()));
        let label = address.label();
        let mut state = self.state.borrow_mut();
        state.objects.insert(label.clone());
        state.created.push(label.clone());
        Ok((label, address))
    }

    fn attach_reply_channel(&self, address: &ReplyAddress) -> IpcResult<String> {
        self.open_existing(address)
    }
}

/// Forwards the decided role over a channel, for two-sided tests
pub struct RoleSignal {
    tx: Mutex<Sender<Role>>,
}

impl RoleSignal {
    pub fn new(tx: Sender<Role>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

impl ProbeObserver for RoleSignal {
    fn on_event(&self, event: &ProbeEvent<'_>) {
        if let ProbeEvent::RoleDecided(role) = event {
            if let Ok(tx) = self.tx.lock() {
                let _ = tx.send(*role);
            }
        }
    }
}

/// Records every event as text
#[derive(Default)]
pub struct Recorder {
    pub events: RefCell<Vec<String>>,
}

impl ProbeObserver for Recorder {
    fn on_event(&self, event: &ProbeEvent<'_>) {
        self.events.borrow_mut().push(format!("{:?}", event));
    }
}

/// Name unique to this test process
pub fn unique_name(tag: &str) -> String {
    format!("ipc-probe-test-{}-{}", std::process::id(), tag)
}

/// Run a probe on a background thread and wait until it has decided its role
pub fn spawn_probe<B, F>(
    make: F,
    name: IpcObjectName,
    timeout: Duration,
) -> (
    std::thread::JoinHandle<ipc_probe::ProbeResult<ipc_probe::ProbeReport>>,
    Role,
)
where
    B: TransportBackend,
    F: FnOnce() -> B + Send + 'static,
{
    let (tx, rx) = std::sync::mpsc::channel();
    let handle = std::thread::spawn(move || {
        let observer = RoleSignal::new(tx);
        ipc_probe::Probe::new(make(), timeout, "").run(&name, &observer)
    });
    let role = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("background probe never decided its role");
    (handle, role)
}
