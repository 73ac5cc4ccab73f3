use featfs_utils::{FeatfsError, Result};

use super::{Node, NodeAllocator, NsPath};

/// The node tree of one mounted service
///
/// Guarded by its own lock inside the service, always taken after the
/// interface lock.
#[derive(Debug)]
pub struct Tree {
    root: Node,
    nodes: usize,
    max_nodes: usize,
}

impl Tree {
    pub fn new(max_nodes: usize) -> Self {
        Self {
            root: Node::root(),
            nodes: 1,
            max_nodes,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    /// Allocator limited to what the tree can still take
    pub fn allocator(&self) -> NodeAllocator {
        NodeAllocator::new(self.max_nodes.saturating_sub(self.nodes))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn lookup(&self, path: &NsPath) -> Option<&Node> {
        path.components()
            .iter()
            .try_fold(&self.root, |node, name| node.child(name))
    }

    fn lookup_mut(&mut self, path: &NsPath) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for name in path.components() {
            node = node.child_mut(name)?;
        }
        Some(node)
    }

    /// Attach detached nodes under `parent`, all or none
    pub fn attach(&mut self, parent: &NsPath, nodes: Vec<Node>) -> Result<()> {
        let added: usize = nodes.iter().map(Node::count).sum();
        if self.nodes + added > self.max_nodes {
            return Err(FeatfsError::OutOfResources(format!(
                "namespace is limited to {} nodes",
                self.max_nodes
            )));
        }

        let dir = self
            .lookup_mut(parent)
            .ok_or_else(|| FeatfsError::NotFound(parent.to_string()))?;
        if !dir.is_dir() {
            return Err(FeatfsError::NotADirectory(parent.to_string()));
        }
        for (i, node) in nodes.iter().enumerate() {
            let clash = dir.child(node.name()).is_some()
                || nodes[..i].iter().any(|n| n.name() == node.name());
            if clash {
                return Err(FeatfsError::AlreadyExists(
                    parent.join(node.name()).to_string(),
                ));
            }
        }

        for node in nodes {
            dir.push_child(node);
        }
        self.nodes += added;
        Ok(())
    }

    /// Unlink the subtree at `path` and hand it back
    pub fn detach(&mut self, path: &NsPath) -> Result<Node> {
        let (parent, name) = path
            .split_last()
            .ok_or_else(|| FeatfsError::PermissionDenied("cannot remove the root".into()))?;
        let dir = self
            .lookup_mut(&parent)
            .ok_or_else(|| FeatfsError::NotFound(path.to_string()))?;
        let node = dir
            .take_child(name)
            .ok_or_else(|| FeatfsError::NotFound(path.to_string()))?;
        self.nodes -= node.count();
        Ok(node)
    }

    /// Unlink everything below the root
    pub fn clear(&mut self) -> Vec<Node> {
        let children: Vec<String> = self
            .root
            .children()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let detached: Vec<Node> = children
            .iter()
            .filter_map(|name| self.root.take_child(name))
            .collect();
        self.nodes = 1;
        detached
    }
}
