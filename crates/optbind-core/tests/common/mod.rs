//! In-memory host used to drive the orchestrator without touching the
//! real mount table.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use optbind_common::error::{OptbindError, Result};
use optbind_common::types::{
    CallerIdentity, MountMode, MountPoint, ScratchDirectory, TargetDirectory, TargetState,
};
use optbind_core::filesystem::{DirectoryProvisioner, MountController};
use optbind_core::identity::IdentityResolver;

/// Operation the fake host can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    RemountReadWrite,
    RemountReadOnly,
    /// Fails only the compensating remount, i.e. the first read-only remount.
    CompensatingRemount,
    CreateTarget,
    CreateScratch,
    ChownTarget,
    ChownScratch,
    Bind,
    Inspect,
}

/// Every call the orchestrator made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RemountReadWrite,
    RemountReadOnly,
    Bind {
        source: PathBuf,
        target: PathBuf,
        fs_type: Option<String>,
    },
    Inspect(PathBuf),
    EnsureTarget(PathBuf),
    CreateScratch(PathBuf),
    Chown { path: PathBuf, uid: u32, gid: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Directory { uid: u32, gid: u32, mode: u32 },
    File,
}

#[derive(Debug)]
struct HostState {
    mode: MountMode,
    nodes: BTreeMap<PathBuf, Node>,
    binds: Vec<(PathBuf, PathBuf)>,
    calls: Vec<Call>,
    scratch_seq: u32,
}

/// Fake mount table plus filesystem. The mount point starts read-only.
#[derive(Debug)]
pub struct FakeHost {
    mount_point: PathBuf,
    staging_root: PathBuf,
    state: RefCell<HostState>,
    faults: HashSet<Fault>,
}

fn eperm() -> io::Error {
    io::Error::from_raw_os_error(1)
}

impl FakeHost {
    pub fn new(mount_point: &str, staging_root: &str) -> Self {
        let mut nodes = BTreeMap::new();
        let root_dir = Node::Directory {
            uid: 0,
            gid: 0,
            mode: 0o755,
        };
        let _ = nodes.insert(PathBuf::from(mount_point), root_dir);
        let _ = nodes.insert(
            PathBuf::from(staging_root),
            Node::Directory {
                uid: 0,
                gid: 0,
                mode: 0o1777,
            },
        );
        Self {
            mount_point: PathBuf::from(mount_point),
            staging_root: PathBuf::from(staging_root),
            state: RefCell::new(HostState {
                mode: MountMode::ReadOnly,
                nodes,
                binds: Vec::new(),
                calls: Vec::new(),
                scratch_seq: 0,
            }),
            faults: HashSet::new(),
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        let _ = self.faults.insert(fault);
        self
    }

    pub fn with_directory(self, path: &str) -> Self {
        let _ = self.state.borrow_mut().nodes.insert(
            PathBuf::from(path),
            Node::Directory {
                uid: 0,
                gid: 0,
                mode: 0o755,
            },
        );
        self
    }

    pub fn with_file(self, path: &str) -> Self {
        let _ = self
            .state
            .borrow_mut()
            .nodes
            .insert(PathBuf::from(path), Node::File);
        self
    }

    pub fn mode(&self) -> MountMode {
        self.state.borrow().mode
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.state.borrow().calls.iter().filter(|c| *c == call).count()
    }

    pub fn remount_calls(&self) -> usize {
        self.count(&Call::RemountReadWrite) + self.count(&Call::RemountReadOnly)
    }

    pub fn node(&self, path: &Path) -> Option<Node> {
        self.state.borrow().nodes.get(path).copied()
    }

    pub fn binds(&self) -> Vec<(PathBuf, PathBuf)> {
        self.state.borrow().binds.clone()
    }

    pub fn scratch_dirs(&self) -> Vec<PathBuf> {
        self.state
            .borrow()
            .nodes
            .keys()
            .filter(|p| p.parent() == Some(self.staging_root.as_path()))
            .cloned()
            .collect()
    }

    /// Whether any mutating call was made.
    pub fn mutated(&self) -> bool {
        self.state
            .borrow()
            .calls
            .iter()
            .any(|c| !matches!(c, Call::Inspect(_)))
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn fails(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }
}

impl MountController for FakeHost {
    fn remount_read_write(&self, mount_point: &MountPoint) -> Result<()> {
        self.record(Call::RemountReadWrite);
        assert_eq!(mount_point.path, self.mount_point);
        if self.fails(Fault::RemountReadWrite) {
            return Err(OptbindError::RemountReadWriteFailed {
                mount_point: mount_point.path.clone(),
                source: eperm(),
            });
        }
        self.state.borrow_mut().mode = MountMode::ReadWrite;
        Ok(())
    }

    fn remount_read_only(&self, mount_point: &MountPoint) -> Result<()> {
        let first = self.count(&Call::RemountReadOnly) == 0;
        self.record(Call::RemountReadOnly);
        let fail = self.fails(Fault::RemountReadOnly)
            || (first && self.fails(Fault::CompensatingRemount));
        if fail {
            return Err(OptbindError::RemountReadOnlyFailed {
                mount_point: mount_point.path.clone(),
                source: io::Error::from_raw_os_error(16),
            });
        }
        self.state.borrow_mut().mode = MountMode::ReadOnly;
        Ok(())
    }

    fn bind_mount(&self, source: &Path, target: &Path, fs_type: Option<&str>) -> Result<()> {
        self.record(Call::Bind {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            fs_type: fs_type.map(str::to_owned),
        });
        if self.fails(Fault::Bind) {
            return Err(OptbindError::BindMountFailed {
                source_path: source.to_path_buf(),
                target: target.to_path_buf(),
                source: eperm(),
            });
        }
        self.state
            .borrow_mut()
            .binds
            .push((source.to_path_buf(), target.to_path_buf()));
        Ok(())
    }
}

impl DirectoryProvisioner for FakeHost {
    fn inspect_target(&self, path: &Path) -> Result<TargetState> {
        self.record(Call::Inspect(path.to_path_buf()));
        if self.fails(Fault::Inspect) {
            return Err(OptbindError::TargetInspectFailed {
                path: path.to_path_buf(),
                source: io::Error::from_raw_os_error(13),
            });
        }
        Ok(match self.node(path) {
            None => TargetState::Absent,
            Some(Node::Directory { .. }) => TargetState::Directory,
            Some(Node::File) => TargetState::NotADirectory,
        })
    }

    fn ensure_target_directory(&self, path: &Path, mode: u32) -> Result<TargetDirectory> {
        self.record(Call::EnsureTarget(path.to_path_buf()));
        let read_only = path.starts_with(&self.mount_point) && self.mode() != MountMode::ReadWrite;
        if self.fails(Fault::CreateTarget) || read_only {
            let source = if read_only {
                io::Error::from_raw_os_error(30)
            } else {
                io::Error::from_raw_os_error(13)
            };
            return Err(OptbindError::DirectoryCreateFailed {
                path: path.to_path_buf(),
                source,
            });
        }
        let _ = self
            .state
            .borrow_mut()
            .nodes
            .insert(path.to_path_buf(), Node::Directory { uid: 0, gid: 0, mode });
        Ok(TargetDirectory {
            path: path.to_path_buf(),
            preexisted: false,
            mode,
            owner: None,
        })
    }

    fn create_scratch_directory(&self, staging_root: &Path) -> Result<ScratchDirectory> {
        self.record(Call::CreateScratch(staging_root.to_path_buf()));
        if self.fails(Fault::CreateScratch) {
            return Err(OptbindError::ScratchCreateFailed {
                staging_root: staging_root.to_path_buf(),
                source: io::Error::from_raw_os_error(28),
            });
        }
        let mut state = self.state.borrow_mut();
        state.scratch_seq += 1;
        let path = staging_root.join(format!("mntdir.fake{:02}", state.scratch_seq));
        let _ = state.nodes.insert(
            path.clone(),
            Node::Directory {
                uid: 0,
                gid: 0,
                mode: 0o700,
            },
        );
        Ok(ScratchDirectory::new(path))
    }

    fn assign_ownership(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        self.record(Call::Chown {
            path: path.to_path_buf(),
            uid,
            gid,
        });
        let fault = if path.starts_with(&self.staging_root) {
            Fault::ChownScratch
        } else {
            Fault::ChownTarget
        };
        if self.fails(fault) {
            return Err(OptbindError::OwnershipChangeFailed {
                path: path.to_path_buf(),
                uid,
                gid,
                source: eperm(),
            });
        }
        let mut state = self.state.borrow_mut();
        match state.nodes.get_mut(path) {
            Some(Node::Directory {
                uid: owner,
                gid: group,
                ..
            }) => {
                *owner = uid;
                *group = gid;
                Ok(())
            }
            _ => Err(OptbindError::OwnershipChangeFailed {
                path: path.to_path_buf(),
                uid,
                gid,
                source: io::Error::from_raw_os_error(2),
            }),
        }
    }
}

/// Identity resolver with a fixed answer.
#[derive(Debug)]
pub struct FixedIdentity {
    pub identity: Option<CallerIdentity>,
    pub elevation_fails: bool,
}

impl FixedIdentity {
    pub const fn caller(uid: u32, gid: u32) -> Self {
        Self {
            identity: Some(CallerIdentity::new(uid, gid)),
            elevation_fails: false,
        }
    }
}

impl IdentityResolver for FixedIdentity {
    fn resolve(&self) -> Result<CallerIdentity> {
        self.identity.ok_or_else(|| OptbindError::IdentityUnavailable {
            reason: "no caller".into(),
        })
    }

    fn elevate(&self) -> Result<()> {
        if self.elevation_fails {
            return Err(OptbindError::ElevationFailed { source: eperm() });
        }
        Ok(())
    }
}
