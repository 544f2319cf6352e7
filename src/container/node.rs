//! In-memory link tree loaded from the container index.
//! Paths handed to these helpers are already split into non-empty segments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{Attributes, DataType, LinkKind};

/// Location and layout of a dataset blob inside the container file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DatasetEntry {
    pub dtype: DataType,
    pub shape: Vec<u64>,
    pub max_shape: Vec<Option<u64>>,
    pub offset: u64,
    pub len: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum Body {
    Group(BTreeMap<String, Node>),
    Dataset(DatasetEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Node {
    pub attrs: Attributes,
    pub body: Body,
}

pub(crate) fn segments(name: &str) -> Vec<&str> {
    name.split('/').filter(|s| !s.is_empty()).collect()
}

impl Node {
    pub fn group() -> Self {
        Node {
            attrs: Attributes::new(),
            body: Body::Group(BTreeMap::new()),
        }
    }

    pub fn dataset(entry: DatasetEntry) -> Self {
        Node {
            attrs: Attributes::new(),
            body: Body::Dataset(entry),
        }
    }

    pub fn kind(&self) -> LinkKind {
        match self.body {
            Body::Group(_) => LinkKind::Group,
            Body::Dataset(_) => LinkKind::Dataset,
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match &self.body {
            Body::Group(c) => Some(c),
            Body::Dataset(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match &mut self.body {
            Body::Group(c) => Some(c),
            Body::Dataset(_) => None,
        }
    }

    /// Walk `segs`; traversing through a dataset yields `None`.
    pub fn get(&self, segs: &[&str]) -> Option<&Node> {
        let mut cur = self;
        for s in segs {
            cur = cur.children()?.get(*s)?;
        }
        Some(cur)
    }

    pub fn get_mut(&mut self, segs: &[&str]) -> Option<&mut Node> {
        let mut cur = self;
        for s in segs {
            cur = cur.children_mut()?.get_mut(*s)?;
        }
        Some(cur)
    }

    /// Detach the node at `segs` (never the root).
    pub fn remove(&mut self, segs: &[&str]) -> Option<Node> {
        let (last, parent) = segs.split_last()?;
        self.get_mut(parent)?.children_mut()?.remove(*last)
    }

    /// Attach `node` under an existing parent group; the slot must be free.
    /// Returns the node back when the parent is missing, not a group, or occupied.
    pub fn insert(&mut self, segs: &[&str], node: Node) -> Result<(), Node> {
        let Some((last, parent)) = segs.split_last() else {
            return Err(node);
        };
        let Some(children) = self.get_mut(parent).and_then(Node::children_mut) else {
            return Err(node);
        };
        if children.contains_key(*last) {
            return Err(node);
        }
        children.insert((*last).to_string(), node);
        Ok(())
    }

    /// Every dataset entry in this subtree, depth-first.
    pub fn datasets_mut(&mut self) -> Vec<&mut DatasetEntry> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(n) = stack.pop() {
            match &mut n.body {
                Body::Dataset(d) => out.push(d),
                Body::Group(children) => stack.extend(children.values_mut()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> Node {
        Node::dataset(DatasetEntry {
            dtype: DataType::F64,
            shape: vec![1],
            max_shape: vec![Some(1)],
            offset: 32,
            len: 8,
        })
    }

    #[test]
    fn insert_requires_existing_group_parent() {
        let mut root = Node::group();
        assert!(root.insert(&["obsm", "pca"], leaf()).is_err());
        root.insert(&["obsm"], Node::group()).unwrap();
        root.insert(&["obsm", "pca"], leaf()).unwrap();
        // occupied slot
        assert!(root.insert(&["obsm", "pca"], leaf()).is_err());
        // parent is a dataset
        assert!(root.insert(&["obsm", "pca", "x"], leaf()).is_err());
        assert_eq!(root.get(&["obsm", "pca"]).map(Node::kind), Some(LinkKind::Dataset));
    }

    #[test]
    fn get_does_not_traverse_datasets() {
        let mut root = Node::group();
        root.insert(&["X"], leaf()).unwrap();
        assert!(root.get(&["X", "anything"]).is_none());
        assert!(root.get(&[]).is_some());
    }

    #[test]
    fn remove_detaches_subtree() {
        let mut root = Node::group();
        root.insert(&["layers"], Node::group()).unwrap();
        root.insert(&["layers", "counts"], leaf()).unwrap();
        let taken = root.remove(&["layers"]).unwrap();
        assert_eq!(taken.children().unwrap().len(), 1);
        assert!(root.get(&["layers"]).is_none());
        assert!(root.remove(&[]).is_none());
    }
}
