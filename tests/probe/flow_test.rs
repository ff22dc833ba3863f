/*!
 * Probe Flow Tests
 * Server and client paths, including cleanup on every exit
 */

use crate::common::{MockBackend, Recorder, Step};
use ipc_probe::core::types::{ExitStatus, Role};
use ipc_probe::ipc::{Exchange, IpcObjectName, Message};
use ipc_probe::{NullObserver, Probe, ProbeError};
use nix::errno::Errno;
use pretty_assertions::assert_eq;
use std::time::Duration;

fn name() -> IpcObjectName {
    IpcObjectName::Path("/probe2".into())
}

#[test]
fn test_server_answers_request_and_destroys() {
    let probe = Probe::new(MockBackend::new(Exchange::RequestReply), Duration::from_secs(1), "unused");
    {
        let mut state = probe.backend().state.borrow_mut();
        state.objects.insert("/probe2-reply".into());
        state.script.push_back(Step::Deliver(Message::request(
            "ping",
            IpcObjectName::Path("/probe2-reply".into()),
        )));
    }

    let recorder = Recorder::default();
    let report = probe.run(&name(), &recorder).unwrap();
    assert_eq!(report.role, Role::Server);
    assert_eq!(report.exchanged, Some(b"ping".to_vec()));

    let state = probe.backend().state.borrow();
    assert_eq!(state.sent.len(), 1);
    assert_eq!(state.sent[0].0, "/probe2-reply");
    assert_eq!(state.sent[0].1.text(), "ping 4");
    // server destroys its own object and only closes the client's
    assert_eq!(state.destroyed, vec!["/probe2".to_string()]);
    assert_eq!(state.closed, vec!["/probe2-reply".to_string()]);
    assert!(!state.objects.contains("/probe2"));
    assert_eq!(recorder.events.borrow().len(), 3);
}

#[test]
fn test_client_round_trip_destroys_reply_channel_only() {
    let backend = MockBackend::with_existing(Exchange::RequestReply, &name());
    backend.script([Step::Deliver(Message::new("ping 4"))]);
    let probe = Probe::new(backend, Duration::from_secs(1), "ping");

    let report = probe.run(&name(), &NullObserver).unwrap();
    assert_eq!(report.role, Role::Client);
    assert_eq!(report.exchanged, Some(b"ping 4".to_vec()));

    let state = probe.backend().state.borrow();
    let (target, request) = &state.sent[0];
    assert_eq!(target, "/probe2");
    assert_eq!(request.text(), "ping");
    assert_eq!(
        request.reply_to,
        Some(IpcObjectName::Path("/probe2-reply".into()))
    );
    assert_eq!(state.destroyed, vec!["/probe2-reply".to_string()]);
    assert_eq!(state.closed, vec!["/probe2".to_string()]);
    assert!(state.objects.contains("/probe2"));
}

#[test]
fn test_server_timeout_still_destroys() {
    let probe = Probe::new(MockBackend::new(Exchange::Signal), Duration::from_millis(50), "");

    let err = probe.run(&name(), &NullObserver).unwrap_err();
    assert_eq!(err.exit_status(), ExitStatus::Timeout);

    let state = probe.backend().state.borrow();
    assert_eq!(state.destroyed, vec!["/probe2".to_string()]);
    assert!(state.objects.is_empty());
}

#[test]
fn test_cleanup_failure_after_timeout_keeps_timeout_status() {
    let probe = Probe::new(MockBackend::new(Exchange::Signal), Duration::from_millis(20), "");
    probe.backend().state.borrow_mut().fail_destroy = Some(Errno::EPERM);

    let err = probe.run(&name(), &NullObserver).unwrap_err();
    assert_eq!(err.exit_status(), ExitStatus::Timeout);
    assert_eq!(probe.backend().state.borrow().destroyed.len(), 1);
}

#[test]
fn test_cleanup_failure_after_success_is_reported() {
    let probe = Probe::new(MockBackend::new(Exchange::Signal), Duration::from_secs(1), "");
    {
        let mut state = probe.backend().state.borrow_mut();
        state.fail_destroy = Some(Errno::EPERM);
        state.script.push_back(Step::Deliver(Message::signal()));
    }

    let err = probe.run(&name(), &NullObserver).unwrap_err();
    assert!(matches!(err, ProbeError::Cleanup { .. }));
    assert_eq!(err.exit_status(), ExitStatus::Cleanup);
    assert_eq!(probe.backend().state.borrow().destroyed.len(), 1);
}

#[test]
fn test_signal_client_never_destroys() {
    let backend = MockBackend::with_existing(Exchange::Signal, &name());
    let probe = Probe::new(backend, Duration::from_secs(1), "");

    let report = probe.run(&name(), &NullObserver).unwrap();
    assert_eq!(report.role, Role::Client);
    assert_eq!(report.exchanged, None);

    let state = probe.backend().state.borrow();
    assert!(state.destroyed.is_empty());
    assert_eq!(state.closed, vec!["/probe2".to_string()]);
    assert!(state.sent[0].1.is_signal());
}

#[test]
fn test_request_without_reply_address_is_receive_error() {
    let probe = Probe::new(MockBackend::new(Exchange::RequestReply), Duration::from_secs(1), "");
    probe
        .backend()
        .script([Step::Deliver(Message::new("orphan"))]);

    let err = probe.run(&name(), &NullObserver).unwrap_err();
    assert_eq!(err.exit_status(), ExitStatus::Receive);
    assert_eq!(
        probe.backend().state.borrow().destroyed,
        vec!["/probe2".to_string()]
    );
}

#[test]
fn test_client_reply_timeout_destroys_reply_channel() {
    let backend = MockBackend::with_existing(Exchange::RequestReply, &name());
    let probe = Probe::new(backend, Duration::from_millis(30), "ping");

    let err = probe.run(&name(), &NullObserver).unwrap_err();
    assert_eq!(err.exit_status(), ExitStatus::Timeout);

    let state = probe.backend().state.borrow();
    assert_eq!(state.destroyed, vec!["/probe2-reply".to_string()]);
    assert_eq!(state.closed, vec!["/probe2".to_string()]);
}
