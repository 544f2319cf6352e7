//! Hierarchical container store.
//!
//! A container is one file holding a tree of groups and datasets, each carrying its own
//! attributes. Opening reads only the header and the link index; dataset content is read
//! on demand. Mutations append to the file and become durable at the next commit
//! (`flush`, `close`, or drop of a handle with pending changes).
//!
//! `Container` is the file-scope handle. `Group` is a sub-scope handle bound to a group
//! inside an open container. Both are released exactly once: explicitly via
//! `Container::close`, otherwise when dropped.

mod format;
mod node;
pub mod types;

use std::cell::RefCell;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use crate::errors::{LinkError, Result};
use crate::links::normalize::{normalize, parent_of};
use node::{Body, DatasetEntry, Node, segments};

pub use types::{AttrValue, Attributes, DataType, Element, LinkKind, OpenMode, RawData};

struct State {
    file: File,
    root: Node,
    end: u64,
    dirty: bool,
    released: bool,
}

impl State {
    fn append(&mut self, path: &Path, bytes: &[u8]) -> Result<u64> {
        let offset = self.end;
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(bytes))
            .map_err(|e| LinkError::io("write dataset blob", path, e))?;
        self.end += bytes.len() as u64;
        self.dirty = true;
        Ok(offset)
    }

    fn read(&mut self, path: &Path, offset: u64, len: u64) -> Result<Vec<u8>> {
        if offset.checked_add(len).is_none_or(|e| e > self.end) {
            return Err(LinkError::Corrupt {
                file: path.to_path_buf(),
                reason: format!("blob at {offset}+{len} lies outside the file"),
            });
        }
        let mut buf = vec![0u8; len as usize];
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(&mut buf))
            .map_err(|e| LinkError::io("read dataset blob", path, e))?;
        Ok(buf)
    }
}

/// File-scope handle to an open container.
pub struct Container {
    path: PathBuf,
    mode: OpenMode,
    state: RefCell<State>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Container {
    /// Open (or create, per `mode`) the container at `path`, once, without retrying.
    /// A lock held by another handle surfaces as `LinkError::Locked`.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Container> {
        let path = path.as_ref();

        let mut opts = OpenOptions::new();
        opts.read(true).write(!mode.is_read_only());
        match mode {
            OpenMode::Append | OpenMode::Truncate => {
                opts.create(true).truncate(false);
            }
            OpenMode::Exclusive => {
                opts.create_new(true);
            }
            OpenMode::ReadOnly | OpenMode::ReadWrite => {}
        }

        let mut file = opts.open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound if mode.requires_existing() => {
                LinkError::FileNotFound(path.to_path_buf())
            }
            io::ErrorKind::AlreadyExists => LinkError::FileExists(path.to_path_buf()),
            _ => LinkError::io("open container", path, e),
        })?;

        let locked = if mode.is_read_only() {
            fs2::FileExt::try_lock_shared(&file)
        } else {
            fs2::FileExt::try_lock_exclusive(&file)
        };
        if let Err(e) = locked {
            trace!(file = %path.display(), error = %e, "container lock unavailable");
            return Err(LinkError::Locked(path.to_path_buf()));
        }

        let len = file
            .metadata()
            .map_err(|e| LinkError::io("stat container", path, e))?
            .len();
        let fresh = match mode {
            OpenMode::Truncate => true,
            OpenMode::Append | OpenMode::Exclusive => len == 0,
            OpenMode::ReadOnly | OpenMode::ReadWrite => false,
        };
        let (root, end) = if fresh {
            (Node::group(), format::initialize(&mut file, path)?)
        } else {
            format::load(&mut file, path)?
        };

        let path = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        trace!(file = %path.display(), %mode, "container opened");
        Ok(Container {
            path,
            mode,
            state: RefCell::new(State {
                file,
                root,
                end,
                dirty: false,
                released: false,
            }),
        })
    }

    /// Absolute filesystem path of the container (its canonical identity).
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn is_read_only(&self) -> bool {
        self.mode.is_read_only()
    }

    fn missing(&self, name: &str) -> LinkError {
        LinkError::Missing {
            file: self.path.clone(),
            name: name.to_string(),
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_read_only() {
            return Err(LinkError::ReadOnly(self.path.clone()));
        }
        Ok(())
    }

    /// Kind of the link at `name`, or `None` if it cannot be reached.
    pub fn kind_of(&self, name: &str) -> Option<LinkKind> {
        let state = self.state.borrow();
        let segs = segments(name);
        if segs.is_empty() {
            return Some(LinkKind::Root);
        }
        state.root.get(&segs).map(Node::kind)
    }

    /// Kind of the link at `name`; a typed "missing object" failure if absent.
    pub fn link_kind(&self, name: &str) -> Result<LinkKind> {
        self.kind_of(name)
            .ok_or_else(|| self.missing(&normalize(name)))
    }

    /// Immediate children of a group in stable (lexical) order.
    pub fn child_kinds(&self, name: &str) -> Result<Vec<(String, LinkKind)>> {
        let name = normalize(name);
        let state = self.state.borrow();
        let node = state
            .root
            .get(&segments(&name))
            .ok_or_else(|| self.missing(&name))?;
        let children = node.children().ok_or_else(|| LinkError::NotAGroup {
            file: self.path.clone(),
            name: name.clone(),
        })?;
        Ok(children
            .iter()
            .map(|(k, n)| (k.clone(), n.kind()))
            .collect())
    }

    fn with_dataset<T>(&self, name: &str, f: impl FnOnce(&DatasetEntry) -> T) -> Result<T> {
        let name = normalize(name);
        let state = self.state.borrow();
        let node = state
            .root
            .get(&segments(&name))
            .ok_or_else(|| self.missing(&name))?;
        match &node.body {
            Body::Dataset(d) => Ok(f(d)),
            Body::Group(_) => Err(LinkError::NotADataset {
                file: self.path.clone(),
                name,
            }),
        }
    }

    /// Current shape of a dataset.
    pub fn shape(&self, name: &str) -> Result<Vec<u64>> {
        self.with_dataset(name, |d| d.shape.clone())
    }

    /// Maximum shape of a dataset; `None` entries are unlimited.
    pub fn max_shape(&self, name: &str) -> Result<Vec<Option<u64>>> {
        self.with_dataset(name, |d| d.max_shape.clone())
    }

    /// Why `segs` cannot receive a new link, if it cannot.
    fn slot_error(&self, root: &Node, name: &str) -> Option<LinkError> {
        let segs = segments(name);
        if segs.is_empty() || root.get(&segs).is_some() {
            return Some(LinkError::AlreadyExists {
                file: self.path.clone(),
                name: name.to_string(),
            });
        }
        let parent = parent_of(name);
        match root.get(&segments(&parent)) {
            None => Some(self.missing(&parent)),
            Some(n) if n.kind() != LinkKind::Group => Some(LinkError::NotAGroup {
                file: self.path.clone(),
                name: parent,
            }),
            Some(_) => None,
        }
    }

    fn place(&self, state: &mut State, name: &str, node: Node) -> Result<()> {
        if let Some(e) = self.slot_error(&state.root, name) {
            return Err(e);
        }
        state
            .root
            .insert(&segments(name), node)
            .map_err(|_| self.missing(&parent_of(name)))?;
        state.dirty = true;
        Ok(())
    }

    /// Create an empty group; its parent must already be a group.
    pub fn create_group(&self, name: &str) -> Result<()> {
        self.ensure_writable()?;
        let name = normalize(name);
        let mut state = self.state.borrow_mut();
        self.place(&mut state, &name, Node::group())
    }

    /// Delete a link together with its subtree.
    pub fn delete_link(&self, name: &str) -> Result<()> {
        self.ensure_writable()?;
        let name = normalize(name);
        let segs = segments(&name);
        if segs.is_empty() {
            return Err(LinkError::Malformed {
                file: self.path.clone(),
                name,
                reason: "the root cannot be deleted".into(),
            });
        }
        let mut state = self.state.borrow_mut();
        state.root.remove(&segs).ok_or_else(|| self.missing(&name))?;
        state.dirty = true;
        Ok(())
    }

    /// Relink `src` as `dst` in one step; the node keeps its content and attributes.
    pub fn rename_link(&self, src: &str, dst: &str) -> Result<()> {
        self.ensure_writable()?;
        let src = normalize(src);
        let dst = normalize(dst);
        let src_segs = segments(&src);
        let dst_segs = segments(&dst);
        if src_segs.is_empty() {
            return Err(LinkError::Malformed {
                file: self.path.clone(),
                name: src,
                reason: "the root cannot be renamed".into(),
            });
        }
        if dst_segs.starts_with(&src_segs) {
            return Err(LinkError::Malformed {
                file: self.path.clone(),
                name: dst,
                reason: format!("cannot move '{src}' into its own subtree"),
            });
        }

        let mut state = self.state.borrow_mut();
        if state.root.get(&src_segs).is_none() {
            return Err(self.missing(&src));
        }
        if let Some(e) = self.slot_error(&state.root, &dst) {
            return Err(e);
        }
        let node = state
            .root
            .remove(&src_segs)
            .ok_or_else(|| self.missing(&src))?;
        if let Err(node) = state.root.insert(&dst_segs, node) {
            // Put it back where it was; the slot was just vacated.
            let _ = state.root.insert(&src_segs, node);
            return Err(self.missing(&parent_of(&dst)));
        }
        state.dirty = true;
        Ok(())
    }

    /// The link's own attributes.
    pub fn read_attributes(&self, name: &str) -> Result<Attributes> {
        let name = normalize(name);
        let state = self.state.borrow();
        state
            .root
            .get(&segments(&name))
            .map(|n| n.attrs.clone())
            .ok_or_else(|| self.missing(&name))
    }

    /// Set (or replace) one attribute on a link.
    pub fn write_attribute(&self, name: &str, key: &str, value: impl Into<AttrValue>) -> Result<()> {
        self.ensure_writable()?;
        let name = normalize(name);
        let mut state = self.state.borrow_mut();
        let node = state
            .root
            .get_mut(&segments(&name))
            .ok_or_else(|| self.missing(&name))?;
        node.attrs.insert(key.to_string(), value.into());
        state.dirty = true;
        Ok(())
    }

    /// Write a new dataset from raw content. The parent group must exist.
    pub fn write_raw(&self, name: &str, data: &RawData) -> Result<()> {
        self.ensure_writable()?;
        let name = normalize(name);
        data.check().map_err(|reason| LinkError::DataMismatch {
            name: name.clone(),
            reason,
        })?;
        let mut state = self.state.borrow_mut();
        if let Some(e) = self.slot_error(&state.root, &name) {
            return Err(e);
        }
        let offset = state.append(&self.path, &data.bytes)?;
        let entry = DatasetEntry {
            dtype: data.dtype,
            shape: data.shape.clone(),
            max_shape: data.max_shape.clone(),
            offset,
            len: data.bytes.len() as u64,
        };
        self.place(&mut state, &name, Node::dataset(entry))
    }

    /// Read a dataset's raw content and layout.
    pub fn read_raw(&self, name: &str) -> Result<RawData> {
        let name = normalize(name);
        let entry = self.with_dataset(&name, Clone::clone)?;
        let bytes = self
            .state
            .borrow_mut()
            .read(&self.path, entry.offset, entry.len)?;
        Ok(RawData {
            dtype: entry.dtype,
            shape: entry.shape,
            max_shape: entry.max_shape,
            bytes,
        })
    }

    /// Write a fixed-size numeric dataset.
    pub fn write_array<T: Element>(&self, name: &str, values: &[T], shape: &[u64]) -> Result<()> {
        self.write_raw(
            name,
            &RawData {
                dtype: T::DTYPE,
                shape: shape.to_vec(),
                max_shape: shape.iter().copied().map(Some).collect(),
                bytes: types::pack(values),
            },
        )
    }

    /// Read a numeric dataset, flattened in row-major order.
    pub fn read_array<T: Element>(&self, name: &str) -> Result<Vec<T>> {
        let raw = self.read_raw(name)?;
        if raw.dtype != T::DTYPE {
            return Err(LinkError::DataMismatch {
                name: normalize(name),
                reason: format!("stored as {:?}, requested {:?}", raw.dtype, T::DTYPE),
            });
        }
        Ok(types::unpack(&raw.bytes))
    }

    /// Write a one-dimensional string dataset.
    pub fn write_strings<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<()> {
        let n = values.len() as u64;
        self.write_raw(
            name,
            &RawData {
                dtype: DataType::Str,
                shape: vec![n],
                max_shape: vec![Some(n)],
                bytes: types::pack_strings(values),
            },
        )
    }

    pub fn read_strings(&self, name: &str) -> Result<Vec<String>> {
        let raw = self.read_raw(name)?;
        if raw.dtype != DataType::Str {
            return Err(LinkError::DataMismatch {
                name: normalize(name),
                reason: format!("stored as {:?}, requested strings", raw.dtype),
            });
        }
        types::unpack_strings(&raw.bytes).map_err(|reason| LinkError::DataMismatch {
            name: normalize(name),
            reason,
        })
    }

    /// Duplicate the subtree at `src_name` into `dst` as `dst_name`.
    ///
    /// Structure, content and the attributes of every descendant are copied; the copied
    /// link itself starts with no attributes of its own. The destination parent group
    /// must exist. `dst` may be this same container.
    pub fn copy_object(&self, src_name: &str, dst: &Container, dst_name: &str) -> Result<()> {
        dst.ensure_writable()?;
        let src_name = normalize(src_name);
        let dst_name = normalize(dst_name);
        let src_segs = segments(&src_name);
        if src_segs.is_empty() {
            return Err(LinkError::Malformed {
                file: self.path.clone(),
                name: src_name,
                reason: "the root cannot be copied as an object".into(),
            });
        }

        let mut node = self
            .state
            .borrow()
            .root
            .get(&src_segs)
            .cloned()
            .ok_or_else(|| self.missing(&src_name))?;
        node.attrs.clear();

        if std::ptr::eq(self, dst) {
            // Blobs are immutable, so an in-container copy shares them.
            let mut state = self.state.borrow_mut();
            return self.place(&mut state, &dst_name, node);
        }

        let mut src_state = self.state.borrow_mut();
        let mut dst_state = dst.state.borrow_mut();
        if let Some(e) = dst.slot_error(&dst_state.root, &dst_name) {
            return Err(e);
        }
        for entry in node.datasets_mut() {
            let bytes = src_state.read(&self.path, entry.offset, entry.len)?;
            entry.offset = dst_state.append(&dst.path, &bytes)?;
        }
        dst.place(&mut dst_state, &dst_name, node)
    }

    /// Sub-scope handle bound to the (non-root) group at `name`.
    pub fn group(&self, name: &str) -> Result<Group<'_>> {
        let name = normalize(name);
        match self.link_kind(&name)? {
            LinkKind::Group => Ok(Group {
                container: self,
                path: name,
            }),
            LinkKind::Root => Err(LinkError::RootFromSubScope { scope: name }),
            LinkKind::Dataset => Err(LinkError::NotAGroup {
                file: self.path.clone(),
                name,
            }),
        }
    }

    /// Commit pending changes to disk.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.dirty || self.is_read_only() {
            return Ok(());
        }
        let State { file, root, end, .. } = &mut *state;
        *end = format::commit(file, &self.path, root, *end)?;
        state.dirty = false;
        Ok(())
    }

    fn release(&self) -> Result<()> {
        if self.state.borrow().released {
            return Ok(());
        }
        let committed = self.flush();
        let mut state = self.state.borrow_mut();
        let _ = fs2::FileExt::unlock(&state.file);
        state.released = true;
        trace!(file = %self.path.display(), "container released");
        committed
    }

    /// Commit and release the handle, reporting any commit failure.
    pub fn close(self) -> Result<()> {
        self.release()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(file = %self.path.display(), error = %e, "failed to commit container on drop");
        }
    }
}

/// Sub-scope handle: names resolve relative to `path`.
#[derive(Debug, Clone)]
pub struct Group<'c> {
    container: &'c Container,
    path: String,
}

impl<'c> Group<'c> {
    pub fn container(&self) -> &'c Container {
        self.container
    }

    /// Absolute path of the bound group.
    pub fn path(&self) -> &str {
        &self.path
    }
}
