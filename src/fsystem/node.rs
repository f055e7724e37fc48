// Entries of the virtual tree. Shared metadata lives on `Node`, the variant
// specific parts (children or content) live in `NodeKind`.

use chrono::{DateTime, Local};
use std::collections::HashMap;
use uuid::Uuid;

pub type NodeId = Uuid;

pub const DIRECTORY_PERMISSIONS: &str = "drwxr-xr-x";
pub const FILE_PERMISSIONS: &str = "-rw-r--r--";
/// Size reported for every directory, regardless of what it contains.
pub const DIRECTORY_SIZE: usize = 4096;

#[derive(Debug, Clone)]
pub enum NodeKind {
    Directory { children: HashMap<String, NodeId> },
    File { content: String },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) owner: String,
    pub(crate) permissions: String,
    pub(crate) modified_at: DateTime<Local>,
    // Back-reference only. The node itself is owned by the tree's map.
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new_directory(name: &str, owner: &str, parent: Option<NodeId>) -> Node {
        Node {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner: owner.to_string(),
            permissions: DIRECTORY_PERMISSIONS.to_string(),
            modified_at: Local::now(),
            parent,
            kind: NodeKind::Directory {
                children: HashMap::new(),
            },
        }
    }

    pub(crate) fn new_file(name: &str, owner: &str, parent: Option<NodeId>) -> Node {
        Node {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner: owner.to_string(),
            permissions: FILE_PERMISSIONS.to_string(),
            modified_at: Local::now(),
            parent,
            kind: NodeKind::File {
                content: String::new(),
            },
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn permissions(&self) -> &str {
        &self.permissions
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn modified_at(&self) -> DateTime<Local> {
        self.modified_at
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Directory { .. } => "directory",
            NodeKind::File { .. } => "regular file",
        }
    }

    pub fn size(&self) -> usize {
        match &self.kind {
            NodeKind::Directory { .. } => DIRECTORY_SIZE,
            NodeKind::File { content } => content.len(),
        }
    }

    /// `None` for files.
    pub fn children(&self) -> Option<&HashMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut HashMap<String, NodeId>> {
        match &mut self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children().and_then(|c| c.get(name).copied())
    }

    /// Child ids ordered by name.
    pub fn sorted_children(&self) -> Vec<(&str, NodeId)> {
        let mut children: Vec<(&str, NodeId)> = match self.children() {
            Some(c) => c.iter().map(|(name, id)| (name.as_str(), *id)).collect(),
            None => Vec::new(),
        };
        children.sort_by(|a, b| a.0.cmp(b.0));
        children
    }

    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    pub(crate) fn set_content(&mut self, text: &str) {
        if let NodeKind::File { content } = &mut self.kind {
            *content = text.to_string();
            self.modified_at = Local::now();
        }
    }

    /// Appends `text`, first adding a newline if the buffer has content that
    /// does not already end with one.
    pub(crate) fn append_content(&mut self, text: &str) {
        if let NodeKind::File { content } = &mut self.kind {
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(text);
            self.modified_at = Local::now();
        }
    }

    pub(crate) fn touch(&mut self) {
        self.modified_at = Local::now();
    }

    /// Modification time the way `ls -l` shows it, e.g. `Mar 04 17:21`.
    pub fn formatted_mtime(&self) -> String {
        self.modified_at.format("%b %d %H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_kind() {
        let dir = Node::new_directory("docs", "user", None);
        assert_eq!(dir.permissions(), "drwxr-xr-x");
        assert_eq!(dir.size(), 4096);
        assert!(dir.is_dir());

        let file = Node::new_file("notes.txt", "user", None);
        assert_eq!(file.permissions(), "-rw-r--r--");
        assert_eq!(file.size(), 0);
        assert!(file.content().is_some());
    }

    #[test]
    fn append_inserts_separator_only_when_needed() {
        let mut file = Node::new_file("log", "user", None);
        file.append_content("one");
        assert_eq!(file.content(), Some("one"));
        file.append_content("two");
        assert_eq!(file.content(), Some("one\ntwo"));
        file.set_content("three\n");
        file.append_content("four");
        assert_eq!(file.content(), Some("three\nfour"));
        assert_eq!(file.size(), 10);
    }
}
