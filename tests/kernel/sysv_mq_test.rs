/*!
 * System V Message Queue Tests
 *
 * Serialized with every other test that arms SIGALRM.
 */

use crate::common::spawn_probe;
use ipc_probe::core::types::{BackendKind, ExitStatus, Role};
use ipc_probe::ipc::backends::SysvQueueBackend;
use ipc_probe::ipc::{IpcError, KeyResolver, TransportBackend};
use ipc_probe::{NullObserver, Probe};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::time::{Duration, Instant};

#[test]
#[serial(sigalrm)]
fn test_request_reply_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let resolved = KeyResolver::new(dir.path())
        .resolve(BackendKind::SysvMq, "probe2")
        .unwrap();
    let name = resolved.name.clone();

    let (server, role) = spawn_probe(SysvQueueBackend::new, name.clone(), Duration::from_secs(5));
    assert_eq!(role, Role::Server);

    let client = Probe::new(SysvQueueBackend::new(), Duration::from_secs(5), "ping")
        .run(&name, &NullObserver)
        .unwrap();
    assert_eq!(client.role, Role::Client);
    assert_eq!(client.exchanged, Some(b"ping 4".to_vec()));

    let server = server.join().unwrap().unwrap();
    assert_eq!(server.exchanged, Some(b"ping".to_vec()));
    assert!(matches!(
        SysvQueueBackend::new().open_existing(&name),
        Err(IpcError::NotFound(_))
    ));
}

#[test]
#[serial(sigalrm)]
fn test_alarm_bounds_server_wait() {
    let dir = tempfile::tempdir().unwrap();
    let resolved = KeyResolver::new(dir.path())
        .resolve(BackendKind::SysvMq, "probe1")
        .unwrap();

    let start = Instant::now();
    let err = Probe::new(SysvQueueBackend::new(), Duration::from_secs(1), "")
        .run(&resolved.name, &NullObserver)
        .unwrap_err();
    let waited = start.elapsed();

    assert_eq!(err.exit_status(), ExitStatus::Timeout);
    assert!(waited >= Duration::from_secs(1));
    assert!(waited < Duration::from_secs(3));
    assert!(matches!(
        SysvQueueBackend::new().open_existing(&resolved.name),
        Err(IpcError::NotFound(_))
    ));
}
