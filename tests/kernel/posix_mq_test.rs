/*!
 * POSIX Message Queue Tests
 */

use crate::common::{spawn_probe, unique_name};
use ipc_probe::core::types::{ExitStatus, Role};
use ipc_probe::ipc::backends::PosixQueueBackend;
use ipc_probe::ipc::key::posix_name;
use ipc_probe::ipc::{CapacityHints, CreateOutcome, IpcError, TransportBackend};
use ipc_probe::{NullObserver, Probe};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

#[test]
fn test_request_reply_round_trip() {
    let name = posix_name(&unique_name("pmq-ok")).unwrap();
    let (server, role) = spawn_probe(PosixQueueBackend::default, name.clone(), Duration::from_secs(5));
    assert_eq!(role, Role::Server);

    let client = Probe::new(PosixQueueBackend::default(), Duration::from_secs(5), "ping")
        .run(&name, &NullObserver)
        .unwrap();
    assert_eq!(client.role, Role::Client);
    assert_eq!(client.exchanged, Some(b"ping 4".to_vec()));

    let server = server.join().unwrap().unwrap();
    assert_eq!(server.exchanged, Some(b"ping".to_vec()));

    let backend = PosixQueueBackend::default();
    assert!(matches!(backend.open_existing(&name), Err(IpcError::NotFound(_))));
}

#[test]
fn test_server_timeout_removes_queue() {
    let name = posix_name(&unique_name("pmq-timeout")).unwrap();
    let start = Instant::now();
    let err = Probe::new(PosixQueueBackend::default(), Duration::from_secs(1), "")
        .run(&name, &NullObserver)
        .unwrap_err();

    assert_eq!(err.exit_status(), ExitStatus::Timeout);
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(matches!(
        PosixQueueBackend::default().open_existing(&name),
        Err(IpcError::NotFound(_))
    ));
}

#[test]
fn test_exclusive_create_reports_existing() {
    let name = posix_name(&unique_name("pmq-excl")).unwrap();
    let backend = PosixQueueBackend::default();
    let hints = CapacityHints::default();

    let handle = match backend.create_exclusive(&name, &hints).unwrap() {
        CreateOutcome::Created(handle) => handle,
        CreateOutcome::AlreadyExists => panic!("fresh name already exists"),
    };
    assert!(matches!(
        backend.create_exclusive(&name, &hints).unwrap(),
        CreateOutcome::AlreadyExists
    ));
    backend.destroy(handle, &name).unwrap();
}
