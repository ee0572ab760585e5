//! In-memory filesystem backend.
//!
//! The tree is a flat map from normalised absolute-or-relative paths to nodes. The root (`/`,
//! or the empty path for relative trees) always exists and is never stored in the map.
//! Every other directory is an explicit entry, so "parent exists" checks are single lookups.

use crate::{BackendKind, FileInfo, FileSystem, FsError, FsResult, DEFAULT_DIR_MODE};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Node {
    Dir { mode: u32 },
    File { data: Vec<u8>, mode: u32 },
}

/// A filesystem held entirely in process memory.
///
/// Cloning a `MemFs` yields a handle to the same tree. Use [`MemFs::new`] for an independent,
/// empty tree.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    nodes: Arc<Mutex<BTreeMap<PathBuf, Node>>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        // A panic while holding the lock cannot leave a node half-written, so the map is
        // still consistent.
        self.nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Lexically normalises a path: drops `.`, resolves `..` without climbing above the root.
fn normalise(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                }
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

fn is_root(path: &Path) -> bool {
    path.file_name().is_none()
}

/// Checks that `dir` exists and is a directory, as seen from an operation on `target`.
fn require_dir(nodes: &BTreeMap<PathBuf, Node>, dir: &Path, target: &Path) -> FsResult<()> {
    if is_root(dir) {
        return Ok(());
    }
    match nodes.get(dir) {
        Some(Node::Dir { .. }) => Ok(()),
        Some(Node::File { .. }) => Err(FsError::NotADirectory(target.to_path_buf())),
        None => Err(FsError::NotFound(target.to_path_buf())),
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(path)
}

impl FileSystem for MemFs {
    fn kind(&self) -> BackendKind {
        BackendKind::InMemory
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> FsResult<()> {
        let path = normalise(path);
        let mut nodes = self.lock();

        let mut ancestors: Vec<&Path> = path.ancestors().filter(|a| !is_root(a)).collect();
        ancestors.reverse();

        // Validate the whole chain before inserting anything.
        for ancestor in &ancestors {
            if let Some(Node::File { .. }) = nodes.get(*ancestor) {
                return Err(FsError::NotADirectory(path.clone()));
            }
        }
        for ancestor in ancestors {
            nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Dir { mode });
        }
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> FsResult<()> {
        let path = normalise(path);
        let mut nodes = self.lock();
        let before = nodes.len();
        nodes.retain(|key, _| !key.starts_with(&path));
        tracing::trace!(
            path = %path.display(),
            removed = before - nodes.len(),
            "memfs remove_all"
        );
        Ok(())
    }

    fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> FsResult<()> {
        let path = normalise(path);
        if is_root(&path) {
            return Err(FsError::IsADirectory(path));
        }
        let mut nodes = self.lock();
        require_dir(&nodes, parent_of(&path), &path)?;

        match nodes.get_mut(&path) {
            Some(Node::Dir { .. }) => Err(FsError::IsADirectory(path)),
            Some(Node::File { data: existing, .. }) => {
                *existing = data.to_vec();
                Ok(())
            }
            None => {
                nodes.insert(
                    path,
                    Node::File {
                        data: data.to_vec(),
                        mode,
                    },
                );
                Ok(())
            }
        }
    }

    fn read_file(&self, path: &Path) -> FsResult<Vec<u8>> {
        let path = normalise(path);
        if is_root(&path) {
            return Err(FsError::IsADirectory(path));
        }
        let nodes = self.lock();
        match nodes.get(&path) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Dir { .. }) => Err(FsError::IsADirectory(path)),
            None => Err(FsError::NotFound(path)),
        }
    }

    fn stat(&self, path: &Path) -> FsResult<FileInfo> {
        let path = normalise(path);
        if is_root(&path) {
            return Ok(FileInfo {
                is_dir: true,
                len: 0,
                mode: DEFAULT_DIR_MODE,
            });
        }
        let nodes = self.lock();
        match nodes.get(&path) {
            Some(Node::Dir { mode }) => Ok(FileInfo {
                is_dir: true,
                len: 0,
                mode: *mode,
            }),
            Some(Node::File { data, mode }) => Ok(FileInfo {
                is_dir: false,
                len: data.len() as u64,
                mode: *mode,
            }),
            None => Err(FsError::NotFound(path)),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        let from = normalise(from);
        let to = normalise(to);
        if from == to {
            return Ok(());
        }
        let mut nodes = self.lock();

        let source = nodes
            .get(&from)
            .cloned()
            .ok_or_else(|| FsError::NotFound(from.clone()))?;
        require_dir(&nodes, parent_of(&to), &to)?;

        match (source, nodes.get(&to)) {
            (Node::File { .. }, Some(Node::Dir { .. })) => Err(FsError::IsADirectory(to)),
            (Node::File { .. }, _) => {
                if let Some(node) = nodes.remove(&from) {
                    nodes.insert(to, node);
                }
                Ok(())
            }
            (Node::Dir { .. }, Some(_)) => Err(FsError::AlreadyExists(to)),
            (Node::Dir { .. }, None) => {
                if to.starts_with(&from) {
                    return Err(FsError::Io {
                        path: to,
                        source: std::io::Error::new(
                            std::io::ErrorKind::InvalidInput,
                            "cannot move a directory inside itself",
                        ),
                    });
                }
                let moved: Vec<PathBuf> = nodes
                    .keys()
                    .filter(|key| key.starts_with(&from))
                    .cloned()
                    .collect();
                for key in moved {
                    if let Some(node) = nodes.remove(&key) {
                        let rest = key.strip_prefix(&from).unwrap_or(Path::new(""));
                        nodes.insert(to.join(rest), node);
                    }
                }
                Ok(())
            }
        }
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<String>> {
        let path = normalise(path);
        let nodes = self.lock();
        require_dir(&nodes, &path, &path)?;

        Ok(nodes
            .keys()
            .filter(|key| key.parent() == Some(path.as_path()))
            .filter_map(|key| key.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }
}
