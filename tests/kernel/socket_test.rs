/*!
 * Abstract Socket Tests
 */

use crate::common::{spawn_probe, unique_name};
use ipc_probe::core::types::{ExitStatus, Role};
use ipc_probe::ipc::backends::{AbstractSocketBackend, SocketHandle};
use ipc_probe::ipc::key::abstract_name;
use ipc_probe::ipc::{
    CapacityHints, CreateOutcome, Deadline, IpcObjectName, Received, TransportBackend,
};
use ipc_probe::CancellationToken;
use std::io::Read;
use std::os::unix::net::UnixStream;
use ipc_probe::{NullObserver, Probe};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

fn assert_name_free(name: &IpcObjectName) {
    let backend = AbstractSocketBackend::new();
    match backend.create_exclusive(name, &CapacityHints::default()).unwrap() {
        CreateOutcome::Created(handle) => backend.destroy(handle, name).unwrap(),
        CreateOutcome::AlreadyExists => panic!("{} still bound", name),
    }
}

#[test]
fn test_client_connects_before_poll_timeout() {
    let name = abstract_name(&unique_name("probeSock")).unwrap();
    let (server, role) = spawn_probe(AbstractSocketBackend::new, name.clone(), Duration::from_secs(2));
    assert_eq!(role, Role::Server);

    let client = Probe::new(AbstractSocketBackend::new(), Duration::from_secs(2), "")
        .run(&name, &NullObserver)
        .unwrap();
    assert_eq!(client.role, Role::Client);

    assert_eq!(server.join().unwrap().unwrap().role, Role::Server);
    assert_name_free(&name);
}

#[test]
fn test_poll_timeout_releases_address() {
    let name = abstract_name(&unique_name("sock-timeout")).unwrap();
    let start = Instant::now();
    let err = Probe::new(AbstractSocketBackend::new(), Duration::from_secs(1), "")
        .run(&name, &NullObserver)
        .unwrap_err();

    assert_eq!(err.exit_status(), ExitStatus::Timeout);
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_name_free(&name);
}

#[test]
fn test_connect_without_server_is_send_error() {
    let name = abstract_name(&unique_name("sock-none")).unwrap();
    let backend = AbstractSocketBackend::new();
    let handle = backend.open_existing(&name).unwrap();
    assert!(backend.send(&handle, &ipc_probe::Message::signal()).is_err());
}

#[test]
fn test_accepted_connection_is_closed() {
    let name = abstract_name(&unique_name("sock-accept")).unwrap();
    let backend = AbstractSocketBackend::new();
    let listener = match backend.create_exclusive(&name, &CapacityHints::default()).unwrap() {
        CreateOutcome::Created(handle) => handle,
        CreateOutcome::AlreadyExists => panic!("{} already bound", name),
    };

    let peer = backend.open_existing(&name).unwrap();
    backend.send(&peer, &ipc_probe::Message::signal()).unwrap();

    let deadline = Deadline::after(Duration::from_secs(2));
    let received = backend
        .receive_with_deadline(&listener, &deadline, &CancellationToken::new())
        .unwrap();
    assert!(matches!(received, Received::Message(ref m) if m.is_signal()));

    // the server end is gone, so the client reads end-of-stream
    let mut stream = match peer {
        SocketHandle::Peer { fd, .. } => UnixStream::from(fd),
        SocketHandle::Listener(_) => unreachable!(),
    };
    let mut buf = Vec::new();
    assert_eq!(stream.read_to_end(&mut buf).unwrap(), 0);

    backend.destroy(listener, &name).unwrap();
}
