//! On-disk layout: a fixed 32-byte header pointing at the committed index.
//!
//! ```text
//! [0..8)   magic  b"ADXLINK\0"
//! [8..12)  format version (u32 LE)
//! [12..16) reserved
//! [16..24) index offset (u64 LE)
//! [24..32) index length (u64 LE)
//! [32..)   dataset blobs and index generations
//! ```
//!
//! The index is the link tree encoded with bincode. A commit appends a new index
//! generation and only then rewrites the header, so an interrupted commit leaves the
//! previous generation in force.

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::node::Node;
use crate::errors::{LinkError, Result};

pub(crate) const MAGIC: &[u8; 8] = b"ADXLINK\0";
pub(crate) const VERSION: u32 = 1;
pub(crate) const HEADER_LEN: u64 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub index_offset: u64,
    pub index_len: u64,
}

#[derive(Deserialize)]
struct Index {
    root: Node,
}

/// Borrowing twin of `Index`; encodes identically.
#[derive(Serialize)]
struct IndexRef<'a> {
    root: &'a Node,
}

impl Header {
    fn encode(&self) -> [u8; HEADER_LEN as usize] {
        let mut buf = [0u8; HEADER_LEN as usize];
        buf[0..8].copy_from_slice(MAGIC);
        buf[8..12].copy_from_slice(&VERSION.to_le_bytes());
        buf[16..24].copy_from_slice(&self.index_offset.to_le_bytes());
        buf[24..32].copy_from_slice(&self.index_len.to_le_bytes());
        buf
    }

    fn decode(buf: &[u8; HEADER_LEN as usize], path: &Path) -> Result<Self> {
        if &buf[0..8] != MAGIC {
            return Err(corrupt(path, "bad magic"));
        }
        let mut v = [0u8; 4];
        v.copy_from_slice(&buf[8..12]);
        let version = u32::from_le_bytes(v);
        if version != VERSION {
            return Err(corrupt(path, &format!("unsupported format version {version}")));
        }
        let mut o = [0u8; 8];
        o.copy_from_slice(&buf[16..24]);
        let mut l = [0u8; 8];
        l.copy_from_slice(&buf[24..32]);
        Ok(Header {
            index_offset: u64::from_le_bytes(o),
            index_len: u64::from_le_bytes(l),
        })
    }
}

fn corrupt(path: &Path, reason: &str) -> LinkError {
    LinkError::Corrupt {
        file: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Read header and index; returns the tree and the current end of file.
pub(crate) fn load(file: &mut File, path: &Path) -> Result<(Node, u64)> {
    let end = file
        .metadata()
        .map_err(|e| LinkError::io("stat container", path, e))?
        .len();
    if end < HEADER_LEN {
        return Err(corrupt(path, "file is shorter than the header"));
    }

    let mut buf = [0u8; HEADER_LEN as usize];
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_exact(&mut buf))
        .map_err(|e| LinkError::io("read container header", path, e))?;
    let header = Header::decode(&buf, path)?;

    let index_end = header
        .index_offset
        .checked_add(header.index_len)
        .ok_or_else(|| corrupt(path, "index extent overflows"))?;
    if header.index_offset < HEADER_LEN || index_end > end {
        return Err(corrupt(path, "index lies outside the file"));
    }

    let mut raw = vec![0u8; header.index_len as usize];
    file.seek(SeekFrom::Start(header.index_offset))
        .and_then(|_| file.read_exact(&mut raw))
        .map_err(|e| LinkError::io("read container index", path, e))?;
    let (index, _): (Index, usize) = decode_from_slice(&raw, standard())
        .map_err(|e| corrupt(path, &format!("index does not decode: {e}")))?;
    Ok((index.root, end))
}

/// Append an index generation at `end`, then point the header at it.
/// Returns the new end of file.
pub(crate) fn commit(file: &mut File, path: &Path, root: &Node, end: u64) -> Result<u64> {
    let raw = encode_to_vec(IndexRef { root }, standard())
        .map_err(|e| corrupt(path, &format!("index does not encode: {e}")))?;

    file.seek(SeekFrom::Start(end))
        .and_then(|_| file.write_all(&raw))
        .and_then(|_| file.sync_data())
        .map_err(|e| LinkError::io("write container index", path, e))?;

    let header = Header {
        index_offset: end,
        index_len: raw.len() as u64,
    };
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.write_all(&header.encode()))
        .and_then(|_| file.sync_all())
        .map_err(|e| LinkError::io("write container header", path, e))?;

    Ok(end + raw.len() as u64)
}

/// Lay down an empty container (header + empty root index) in a zero-length file.
pub(crate) fn initialize(file: &mut File, path: &Path) -> Result<u64> {
    file.set_len(0)
        .and_then(|_| file.seek(SeekFrom::Start(0)))
        .and_then(|_| file.write_all(&[0u8; HEADER_LEN as usize]))
        .map_err(|e| LinkError::io("initialize container", path, e))?;
    commit(file, path, &Node::group(), HEADER_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use tempfile::tempdir;

    fn rw(path: &Path) -> File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .unwrap()
    }

    #[test]
    fn fresh_container_loads_as_empty_root() {
        let td = tempdir().unwrap();
        let p = td.path().join("empty.adx");
        let mut f = rw(&p);
        let end = initialize(&mut f, &p).unwrap();
        let (root, len) = load(&mut f, &p).unwrap();
        assert_eq!(len, end);
        assert!(root.children().unwrap().is_empty());
    }

    #[test]
    fn later_generation_wins() {
        let td = tempdir().unwrap();
        let p = td.path().join("gen.adx");
        let mut f = rw(&p);
        let end = initialize(&mut f, &p).unwrap();
        let mut root = Node::group();
        root.insert(&["obs"], Node::group()).unwrap();
        commit(&mut f, &p, &root, end).unwrap();
        let (loaded, _) = load(&mut f, &p).unwrap();
        assert!(loaded.get(&["obs"]).is_some());
    }

    #[test]
    fn rejects_foreign_files() {
        let td = tempdir().unwrap();
        let p = td.path().join("notes.txt");
        std::fs::write(&p, b"definitely not a container, just some text").unwrap();
        let mut f = rw(&p);
        let err = load(&mut f, &p).unwrap_err();
        assert!(matches!(err, LinkError::Corrupt { .. }), "got {err}");

        let short = td.path().join("short.adx");
        std::fs::write(&short, b"ADX").unwrap();
        let mut f = rw(&short);
        assert!(matches!(load(&mut f, &short), Err(LinkError::Corrupt { .. })));
    }
}
