//! Value types stored in a container: link kinds, element types, attributes and raw dataset content.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Classification of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    Root,
    Group,
    Dataset,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkKind::Root => "root",
            LinkKind::Group => "group",
            LinkKind::Dataset => "dataset",
        };
        f.write_str(s)
    }
}

/// How a container file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open read-write, creating an empty container if missing ("a").
    Append,
    /// Open an existing container read-only ("r").
    ReadOnly,
    /// Open an existing container read-write ("r+").
    ReadWrite,
    /// Create, or truncate an existing file to an empty container ("w").
    Truncate,
    /// Create; fail if the file exists ("w-" / "x").
    Exclusive,
}

impl OpenMode {
    pub fn is_read_only(self) -> bool {
        matches!(self, OpenMode::ReadOnly)
    }

    /// Modes that require the file to exist already.
    pub fn requires_existing(self) -> bool {
        matches!(self, OpenMode::ReadOnly | OpenMode::ReadWrite)
    }
}

impl FromStr for OpenMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "a" => Ok(OpenMode::Append),
            "r" => Ok(OpenMode::ReadOnly),
            "r+" => Ok(OpenMode::ReadWrite),
            "w" => Ok(OpenMode::Truncate),
            "w-" | "x" => Ok(OpenMode::Exclusive),
            other => Err(format!("invalid open mode: '{other}'")),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpenMode::Append => "a",
            OpenMode::ReadOnly => "r",
            OpenMode::ReadWrite => "r+",
            OpenMode::Truncate => "w",
            OpenMode::Exclusive => "w-",
        };
        f.write_str(s)
    }
}

/// Element type of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    U8,
    I32,
    I64,
    F32,
    F64,
    /// Variable-length UTF-8 strings.
    Str,
}

impl DataType {
    /// Fixed element width in bytes; `None` for variable-length strings.
    pub fn width(self) -> Option<usize> {
        match self {
            DataType::U8 => Some(1),
            DataType::I32 | DataType::F32 => Some(4),
            DataType::I64 | DataType::F64 => Some(8),
            DataType::Str => None,
        }
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    StrArray(Vec<String>),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Float(x) => write!(f, "{x}"),
            AttrValue::Str(s) => write!(f, "{s:?}"),
            AttrValue::IntArray(v) => write!(f, "{v:?}"),
            AttrValue::FloatArray(v) => write!(f, "{v:?}"),
            AttrValue::StrArray(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<f64> for AttrValue {
    fn from(x: f64) -> Self {
        AttrValue::Float(x)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

/// Attributes of one link, keyed uniquely.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Dataset content plus its layout, as moved between containers.
#[derive(Debug, Clone, PartialEq)]
pub struct RawData {
    pub dtype: DataType,
    pub shape: Vec<u64>,
    /// Same arity as `shape`; `None` marks an unlimited dimension.
    pub max_shape: Vec<Option<u64>>,
    pub bytes: Vec<u8>,
}

impl RawData {
    pub fn element_count(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Check arity, bounds and (for numeric types) byte length.
    pub fn check(&self) -> Result<(), String> {
        if self.shape.len() != self.max_shape.len() {
            return Err(format!(
                "shape has {} dimensions but max shape has {}",
                self.shape.len(),
                self.max_shape.len()
            ));
        }
        for (i, (cur, max)) in self.shape.iter().zip(&self.max_shape).enumerate() {
            if let Some(m) = max
                && cur > m
            {
                return Err(format!("dimension {i} is {cur}, above its maximum {m}"));
            }
        }
        if let Some(w) = self.dtype.width() {
            let expected = self.element_count() as usize * w;
            if expected != self.bytes.len() {
                return Err(format!(
                    "expected {expected} bytes for {:?}{:?}, got {}",
                    self.dtype,
                    self.shape,
                    self.bytes.len()
                ));
            }
        }
        Ok(())
    }
}

/// Fixed-width numeric element that can be packed little-endian.
pub trait Element: Copy {
    const DTYPE: DataType;
    fn put(self, out: &mut Vec<u8>);
    fn take(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($t:ty, $dt:expr) => {
        impl Element for $t {
            const DTYPE: DataType = $dt;
            fn put(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
            fn take(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }
        }
    };
}

impl_element!(u8, DataType::U8);
impl_element!(i32, DataType::I32);
impl_element!(i64, DataType::I64);
impl_element!(f32, DataType::F32);
impl_element!(f64, DataType::F64);

pub(crate) fn pack<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * std::mem::size_of::<T>());
    for v in values {
        v.put(&mut out);
    }
    out
}

pub(crate) fn unpack<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(T::take)
        .collect()
}

/// Strings are stored as `u32` length + UTF-8 bytes, back to back.
pub(crate) fn pack_strings<S: AsRef<str>>(values: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for s in values {
        let b = s.as_ref().as_bytes();
        out.extend_from_slice(&(b.len() as u32).to_le_bytes());
        out.extend_from_slice(b);
    }
    out
}

pub(crate) fn unpack_strings(bytes: &[u8]) -> Result<Vec<String>, String> {
    let mut out = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        if rest.len() < 4 {
            return Err("truncated string length".into());
        }
        let (len, tail) = rest.split_at(4);
        let n = u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize;
        if tail.len() < n {
            return Err("truncated string payload".into());
        }
        let (s, tail) = tail.split_at(n);
        out.push(String::from_utf8(s.to_vec()).map_err(|e| e.to_string())?);
        rest = tail;
    }
    Ok(out)
}
