// The node graph. Every node lives in one map keyed by its uuid; directories
// refer to their children by id and children refer back to their parent by
// id, so there is exactly one owner (the map) and no reference cycle.

use std::collections::HashMap;

use crate::errors::{FsError, FsErrorType, Result};
use crate::fsystem::node::{Node, NodeId};

#[derive(Debug)]
pub struct Tree {
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
}

impl Tree {
    pub fn new(owner: &str) -> Tree {
        let root = Node::new_directory("/", owner, None);
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Tree {
            root: root_id,
            nodes,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, the root included. Never zero.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or_else(|| stale(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or_else(|| stale(id))
    }

    /// Insert a freshly built node under `parent`.
    pub(crate) fn attach(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId> {
        let id = node.id;
        node.parent = Some(parent);
        let name = node.name.clone();
        self.link(parent, &name, id)?;
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Unlink a node from its parent. The node and its subtree stay in the
    /// arena so it can be reattached somewhere else.
    pub(crate) fn detach(&mut self, id: NodeId) -> Result<()> {
        let (parent, name) = {
            let node = self.node(id)?;
            match node.parent {
                Some(p) => (p, node.name.clone()),
                None => {
                    return Err(FsError::invalid_argument(
                        "the root directory cannot be detached",
                    ))
                }
            }
        };
        let parent_node = self.node_mut(parent)?;
        if let Some(children) = parent_node.children_mut() {
            children.remove(&name);
        }
        parent_node.touch();
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    /// Link an already detached node under a new parent.
    pub(crate) fn reattach(&mut self, id: NodeId, parent: NodeId) -> Result<()> {
        let name = self.node(id)?.name.clone();
        self.link(parent, &name, id)?;
        self.node_mut(id)?.parent = Some(parent);
        Ok(())
    }

    /// Detach `id` and drop it together with everything below it.
    pub(crate) fn remove(&mut self, id: NodeId) -> Result<usize> {
        self.detach(id)?;
        Ok(self.drop_subtree(id))
    }

    fn drop_subtree(&mut self, id: NodeId) -> usize {
        let mut dropped = 0;
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                if let Some(children) = node.children() {
                    pending.extend(children.values().copied());
                }
                dropped += 1;
            }
        }
        dropped
    }

    /// Change the name of a node, keeping its parent's map key in step.
    pub(crate) fn rename(&mut self, id: NodeId, new_name: &str) -> Result<()> {
        let parent = self.node(id)?.parent;
        match parent {
            None => {
                return Err(FsError::invalid_argument("the root directory cannot be renamed"));
            }
            Some(parent) => {
                self.detach(id)?;
                let node = self.node_mut(id)?;
                let old_name = std::mem::replace(&mut node.name, new_name.to_string());
                node.touch();
                if let Err(e) = self.reattach(id, parent) {
                    // Put things back the way they were.
                    self.node_mut(id)?.name = old_name;
                    self.reattach(id, parent)?;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn link(&mut self, parent: NodeId, name: &str, id: NodeId) -> Result<()> {
        let parent_path = self.path_of(parent);
        let parent_node = self.node_mut(parent)?;
        let children = match parent_node.children_mut() {
            Some(c) => c,
            None => return Err(FsError::not_a_directory(&parent_path)),
        };
        if children.contains_key(name) {
            return Err(FsError::new(
                FsErrorType::NameCollision,
                format!("'{}'", join(&parent_path, name)),
            ));
        }
        children.insert(name.to_string(), id);
        parent_node.touch();
        Ok(())
    }

    /// Absolute path of a node, rebuilt by walking up the parent links.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = self.nodes.get(&id);
        while let Some(node) = current {
            match node.parent {
                Some(parent) => {
                    parts.push(node.name.as_str());
                    current = self.nodes.get(&parent);
                }
                None => break,
            }
        }
        if parts.is_empty() {
            return "/".to_string();
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// True when `ancestor` is `id` itself or lies on its parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.nodes.get(&c).and_then(|n| n.parent);
        }
        false
    }
}

pub(crate) fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

fn stale(id: NodeId) -> FsError {
    tracing::error!("Node {} is referenced but not present in the tree", id);
    FsError::new(FsErrorType::PathNotFound, format!("node {}", id))
}
