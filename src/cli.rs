/*!
 * Command Line
 *
 * `ipc-probe <BACKEND> [NAME] [TIMEOUT]`. The timeout stays a string here so
 * that zero, negative and non-numeric values are all reported as the same
 * usage error by `ProbeConfig::from_cli`.
 */

use crate::core::limits::KEY_DIR_ENV;
use crate::core::types::BackendKind;
use clap::Parser;
use std::path::PathBuf;

/// Probe whether two processes share a kernel IPC object
///
/// The first invocation creates the object and waits as the server; a second
/// invocation with the same name finds it and acts as the client.
#[derive(Debug, Clone, Parser)]
#[command(name = "ipc-probe", version, about)]
pub struct Cli {
    /// IPC mechanism to probe
    #[arg(value_enum)]
    pub backend: BackendKind,

    /// Object name (defaults per backend)
    pub name: Option<String>,

    /// Rendezvous timeout in whole seconds
    #[arg(allow_negative_numbers = true)]
    pub timeout: Option<String>,

    /// Payload the client sends (queue backends)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Directory for System V key marker files
    #[arg(long, env = KEY_DIR_ENV)]
    pub key_dir: Option<PathBuf>,
}
