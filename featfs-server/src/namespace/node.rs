use featfs_utils::{FeatfsError, Result};
use serde::Serialize;

use crate::model::ConfigId;

/// Model object a node exposes
///
/// Bindings never own what they point at: configs are looked up by id in the
/// config list, entries by index inside their config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Plain directory with no backing object
    None,
    /// `available_features`
    AvailableFeatures,
    /// `configs/`
    ConfigsDir,
    /// Directory of one config
    ConfigRoot(ConfigId),
    /// Per-feature parameter directory inside a config
    FeatureDir { config: ConfigId, feature: usize },
    /// `activate`
    Activate(ConfigId),
    /// `set_features` or a feature parameter file
    Param { config: ConfigId, entry: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Dir,
    File,
}

/// Entry of the namespace tree
#[derive(Debug)]
pub struct Node {
    name: String,
    kind: NodeKind,
    writable: bool,
    binding: Binding,
    children: Vec<Node>,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self {
            name: String::new(),
            kind: NodeKind::Dir,
            writable: false,
            binding: Binding::None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Dir
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    pub(crate) fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub(crate) fn take_child(&mut self, name: &str) -> Option<Node> {
        let index = self.children.iter().position(|c| c.name == name)?;
        Some(self.children.remove(index))
    }

    /// Number of nodes in this subtree, itself included
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

/// Hands out nodes against a fixed budget
///
/// A subtree is built detached from the tree; if the budget runs out half
/// way, dropping what was built so far is the whole cleanup.
#[derive(Debug)]
pub struct NodeAllocator {
    remaining: usize,
}

impl NodeAllocator {
    pub(crate) fn new(remaining: usize) -> Self {
        Self { remaining }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn dir(&mut self, name: &str, binding: Binding) -> Result<Node> {
        self.alloc(name, NodeKind::Dir, false, binding)
    }

    pub fn file(&mut self, name: &str, writable: bool, binding: Binding) -> Result<Node> {
        self.alloc(name, NodeKind::File, writable, binding)
    }

    fn alloc(&mut self, name: &str, kind: NodeKind, writable: bool, binding: Binding) -> Result<Node> {
        if self.remaining == 0 {
            return Err(FeatfsError::OutOfResources(format!(
                "no node left for {}",
                name
            )));
        }
        self.remaining -= 1;
        Ok(Node {
            name: name.to_string(),
            kind,
            writable,
            binding,
            children: Vec::new(),
        })
    }
}
