/*!
 * Configuration and Usage Tests
 */

use clap::Parser;
use ipc_probe::core::limits::MAX_PAYLOAD_SIZE;
use ipc_probe::core::types::{BackendKind, ExitStatus};
use ipc_probe::ipc::codec;
use ipc_probe::ipc::{IpcObjectName, Message};
use ipc_probe::{parse_timeout, Cli, ProbeConfig};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::time::Duration;

fn config_from(args: &[&str]) -> Result<ProbeConfig, ipc_probe::ProbeError> {
    let cli = Cli::try_parse_from(std::iter::once("ipc-probe").chain(args.iter().copied()))
        .expect("arguments should parse");
    ProbeConfig::from_cli(cli)
}

#[test]
fn test_non_numeric_timeout_is_usage_error() {
    let err = config_from(&["sysv-sem", "probe3", "abc"]).unwrap_err();
    assert_eq!(err.exit_status(), ExitStatus::Usage);
}

#[test]
fn test_zero_and_negative_timeouts_are_usage_errors() {
    for raw in ["0", "-2"] {
        let err = config_from(&["posix-sem", "probe3", raw]).unwrap_err();
        assert_eq!(err.exit_status(), ExitStatus::Usage);
    }
}

#[test]
fn test_defaults_apply() {
    let config = config_from(&["posix-mq"]).unwrap();
    assert_eq!(config.backend, BackendKind::PosixMq);
    assert_eq!(config.name, "server-queue");
    assert_eq!(config.timeout, Duration::from_secs(5));
}

#[test]
fn test_message_and_key_dir_flags() {
    let dir = tempfile::tempdir().unwrap();
    let dir_arg = dir.path().to_str().unwrap();
    let config = config_from(&["sysv-mq", "probe2", "4", "--message", "ping", "--key-dir", dir_arg])
        .unwrap();
    assert_eq!(config.message, "ping");
    assert_eq!(config.key_dir, dir.path());
    assert_eq!(config.timeout, Duration::from_secs(4));
}

proptest! {
    #[test]
    fn prop_positive_timeouts_parse(secs in 1u64..=86_400) {
        prop_assert_eq!(parse_timeout(&secs.to_string()).unwrap(), Duration::from_secs(secs));
    }

    #[test]
    fn prop_non_positive_timeouts_rejected(secs in -1_000_000i64..=0) {
        let err = parse_timeout(&secs.to_string()).unwrap_err();
        prop_assert_eq!(err.exit_status(), ExitStatus::Usage);
    }

    #[test]
    fn prop_any_valid_request_fits_one_message(
        payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        stem in "[a-z0-9_]{1,200}",
    ) {
        let reply_to = IpcObjectName::Path(format!("/{}-reply-{}", stem, u32::MAX));
        let request = Message::request(payload, reply_to);
        let bytes = codec::encode(&request).unwrap();
        prop_assert_eq!(codec::decode(&bytes).unwrap(), request.clone());
        prop_assert!(codec::encode(&codec::compose_reply(&request)).is_ok());
    }
}
