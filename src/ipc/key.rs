/*!
 * Key/Name Resolver
 *
 * Maps a command-line object name onto the identifier a backend needs:
 *
 * - POSIX queues and semaphores: `/name`
 * - Abstract sockets: the name itself
 * - System V objects: `ftok(marker, project)` where the marker file lives in a
 *   directory shared by both processes
 *
 * The marker file is kept for the lifetime of the process and removed on
 * drop. `ftok` mixes in the inode number, so the file must not be recreated
 * while a peer may still derive its key from it.
 */

use super::core::types::{IpcError, IpcObjectName, IpcResult};
use crate::core::limits::{MARKER_FILE_EXTENSION, MAX_ABSTRACT_NAME_LEN, MAX_NAME_LEN};
use crate::core::types::BackendKind;
use std::ffi::CString;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `ftok` project identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectId(pub u8);

impl ProjectId {
    pub const QUEUE: ProjectId = ProjectId(b'P');
    pub const SEMAPHORE: ProjectId = ProjectId(b'A');

    pub fn for_backend(kind: BackendKind) -> Option<Self> {
        match kind {
            BackendKind::SysvMq => Some(Self::QUEUE),
            BackendKind::SysvSem => Some(Self::SEMAPHORE),
            _ => None,
        }
    }
}

/// Marker file backing a System V key, removed on drop
#[derive(Debug)]
pub struct MarkerFile {
    path: PathBuf,
    removed: bool,
}

impl MarkerFile {
    /// Create the marker if absent, keeping an existing file (and its inode)
    pub fn create(path: impl Into<PathBuf>) -> IpcResult<Self> {
        let path = path.into();
        OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|e| IpcError::Io(format!("cannot create {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Marker file ready");
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the marker; a file already removed by the peer is not an error
    pub fn remove(&mut self) -> IpcResult<()> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IpcError::Io(format!(
                "cannot remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl Drop for MarkerFile {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!(error = %e, "Marker file cleanup failed");
        }
    }
}

/// Name resolved for one backend, plus the marker keeping its key stable
#[derive(Debug)]
pub struct ResolvedName {
    pub name: IpcObjectName,
    pub marker: Option<MarkerFile>,
}

/// Derives System V keys from marker files in a shared directory
#[derive(Debug, Clone)]
pub struct KeyResolver {
    dir: PathBuf,
}

impl KeyResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn marker_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, MARKER_FILE_EXTENSION))
    }

    /// Create the marker and derive its key
    pub fn derive(&self, name: &str, project: ProjectId) -> IpcResult<ResolvedName> {
        let label = validate_label(name)?;
        let marker = MarkerFile::create(self.marker_path(label))?;
        let path = CString::new(marker.path().as_os_str().as_bytes()).map_err(|_| {
            IpcError::InvalidName {
                name: name.to_string(),
                reason: "contains a NUL byte",
            }
        })?;

        // SAFETY: NUL-terminated path that outlives the call
        let key = unsafe { libc::ftok(path.as_ptr(), project.0 as libc::c_int) };
        if key == -1 {
            // marker drops here and is removed
            return Err(IpcError::last_os("ftok"));
        }

        debug!(name = label, key = %format!("{:#x}", key), "Derived System V key");
        Ok(ResolvedName {
            name: IpcObjectName::Key {
                label: label.to_string(),
                key,
            },
            marker: Some(marker),
        })
    }

    /// Resolve `raw` for `kind`, deriving a key only for System V backends
    pub fn resolve(&self, kind: BackendKind, raw: &str) -> IpcResult<ResolvedName> {
        match ProjectId::for_backend(kind) {
            Some(project) => self.derive(raw, project),
            None => Ok(ResolvedName {
                name: resolve_name(kind, raw)?,
                marker: None,
            }),
        }
    }
}

/// Resolve a name that needs no filesystem side effect
///
/// System V names are only validated here; `KeyResolver::derive` turns them
/// into keys.
pub fn resolve_name(kind: BackendKind, raw: &str) -> IpcResult<IpcObjectName> {
    match kind {
        BackendKind::PosixMq | BackendKind::PosixSem => posix_name(raw),
        BackendKind::Socket => abstract_name(raw),
        BackendKind::SysvMq | BackendKind::SysvSem => validate_label(raw).map(|label| {
            IpcObjectName::Key {
                label: label.to_string(),
                key: 0,
            }
        }),
    }
}

/// `/name` form used by `mq_open` and `sem_open`
pub fn posix_name(raw: &str) -> IpcResult<IpcObjectName> {
    let stem = raw.strip_prefix('/').unwrap_or(raw);
    let stem = validate_label(stem).map_err(|e| match e {
        IpcError::InvalidName { reason, .. } => IpcError::InvalidName {
            name: raw.to_string(),
            reason,
        },
        other => other,
    })?;
    Ok(IpcObjectName::Path(format!("/{}", stem)))
}

/// Abstract-namespace socket name
pub fn abstract_name(raw: &str) -> IpcResult<IpcObjectName> {
    if raw.len() > MAX_ABSTRACT_NAME_LEN {
        return Err(IpcError::InvalidName {
            name: raw.to_string(),
            reason: "longer than an abstract socket address allows",
        });
    }
    let name = validate_label(raw)?;
    Ok(IpcObjectName::Abstract(name.to_string()))
}

fn validate_label(raw: &str) -> IpcResult<&str> {
    let reason = if raw.is_empty() {
        "empty"
    } else if raw.len() > MAX_NAME_LEN {
        "too long"
    } else if raw.contains('/') {
        "contains '/'"
    } else if raw.contains('\0') {
        "contains a NUL byte"
    } else if raw == "." || raw == ".." {
        "reserved"
    } else {
        return Ok(raw);
    };
    Err(IpcError::InvalidName {
        name: raw.to_string(),
        reason,
    })
}
