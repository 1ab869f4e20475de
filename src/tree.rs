//! Directory tree reconstruction from flat path lists.
//!
//! Mod and DLC packagers routinely omit directory records, so the tree is
//! rebuilt from the paths themselves: every ancestor of every path gets a
//! node and is linked into its own parent, up to the root (`""`).

use std::collections::{BTreeMap, BTreeSet};

use crate::hash::split_path;

/// Immediate children of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryNode {
    pub subdirectories: BTreeSet<String>,
    pub files: BTreeSet<String>,
}

/// Mapping from normalized directory path to its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTree {
    nodes: BTreeMap<String, DirectoryNode>,
}

impl DirectoryTree {
    pub fn get(&self, path: &str) -> Option<&DirectoryNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DirectoryNode)> {
        self.nodes.iter()
    }

    pub fn into_nodes(self) -> BTreeMap<String, DirectoryNode> {
        self.nodes
    }
}

/// Builds a [`DirectoryTree`] one path at a time.
///
/// All insertions are idempotent. The root node exists from the start.
#[derive(Debug)]
pub struct DirectoryTreeBuilder {
    nodes: BTreeMap<String, DirectoryNode>,
}

impl Default for DirectoryTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTreeBuilder {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(String::new(), DirectoryNode::default());
        Self { nodes }
    }

    /// Register a file at a normalized path.
    pub fn add_file(&mut self, path: &str) {
        if path.is_empty() {
            return;
        }
        let (parent, leaf) = split_path(path);
        self.ensure_directory(parent);
        if let Some(node) = self.nodes.get_mut(parent) {
            node.files.insert(leaf.to_string());
        }
    }

    /// Register a directory at a normalized path, along with its ancestors.
    pub fn add_directory(&mut self, path: &str) {
        self.ensure_directory(path);
    }

    /// Make sure `path` and every ancestor has a node linked to its parent.
    fn ensure_directory(&mut self, path: &str) {
        // Walk up until an existing node is found, then link downward.
        let mut missing = Vec::new();
        let mut current = path;
        while !self.nodes.contains_key(current) {
            missing.push(current);
            current = split_path(current).0;
        }

        for dir in missing.into_iter().rev() {
            let (parent, leaf) = split_path(dir);
            self.nodes.insert(dir.to_string(), DirectoryNode::default());
            if let Some(node) = self.nodes.get_mut(parent) {
                node.subdirectories.insert(leaf.to_string());
            }
        }
    }

    pub fn build(self) -> DirectoryTree {
        DirectoryTree { nodes: self.nodes }
    }
}
