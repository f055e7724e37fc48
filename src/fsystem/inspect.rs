// Read-only operations: listing, searching and reporting on the tree.

use std::fmt;

use tracing::instrument;

use crate::errors::{FsError, Result};
use crate::fsystem::engine::FileSystem;
use crate::fsystem::node::{Node, NodeId, DIRECTORY_SIZE};
use crate::fsystem::permissions::{permissions_to_octal, Access};

pub const DEFAULT_LINE_COUNT: usize = 10;

/// Metadata dump produced by `stat`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub id: NodeId,
    pub name: String,
    pub path: String,
    pub kind: &'static str,
    pub size: usize,
    pub owner: String,
    pub permissions: String,
    pub modified: String,
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  File: {}", self.name)?;
        writeln!(f, "  Path: {}", self.path)?;
        writeln!(f, "  Type: {}", self.kind)?;
        writeln!(f, "  Size: {}", self.size)?;
        writeln!(f, " Owner: {}", self.owner)?;
        writeln!(
            f,
            "Access: ({}/{})",
            permissions_to_octal(&self.permissions),
            self.permissions
        )?;
        writeln!(f, "Modify: {}", self.modified)?;
        write!(f, "    Id: {}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCount {
    pub lines: usize,
    pub words: usize,
    pub bytes: usize,
    pub name: String,
}

impl fmt::Display for WordCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.lines, self.words, self.bytes, self.name)
    }
}

/// Newline separated segments of a buffer, without trailing empty ones.
/// An empty buffer has no lines.
fn content_lines(content: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = content.split('\n').collect();
    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }
    lines
}

fn long_entry(node: &Node) -> String {
    format!(
        "{} {:<8} {:>6} {} {}",
        node.permissions(),
        node.owner(),
        node.size(),
        node.formatted_mtime(),
        node.name()
    )
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{} {}", count, one)
    } else {
        format!("{} {}", count, many)
    }
}

impl FileSystem {
    fn target(&self, path: Option<&str>) -> Result<NodeId> {
        match path {
            Some(p) => self.resolve(p),
            None => Ok(self.cwd),
        }
    }

    /// Resolve a path that must name a readable file.
    fn readable_file(&self, path: &str) -> Result<&Node> {
        let id = self.resolve(path)?;
        let node = self.tree.node(id)?;
        if node.is_dir() {
            return Err(FsError::is_a_directory(path));
        }
        self.require(id, Access::Read)?;
        Ok(node)
    }

    #[instrument(skip(self))]
    pub fn ls(&self, path: Option<&str>, show_hidden: bool, long: bool) -> Result<String> {
        let target = self.target(path)?;
        let node = self.tree.node(target)?;
        if node.is_file() {
            return Ok(if long {
                long_entry(node)
            } else {
                node.name().to_string()
            });
        }
        self.require(target, Access::Read)?;
        let mut entries = Vec::new();
        for (name, id) in node.sorted_children() {
            if !show_hidden && is_hidden(name) {
                continue;
            }
            let child = self.tree.node(id)?;
            entries.push(if long {
                long_entry(child)
            } else {
                name.to_string()
            });
        }
        Ok(if long {
            entries.join("\n")
        } else {
            entries.join("  ")
        })
    }

    #[instrument(skip(self))]
    pub fn tree(&self, path: Option<&str>, show_hidden: bool) -> Result<String> {
        let target = self.target(path)?;
        let node = self.tree.node(target)?;
        if node.is_file() {
            return Ok(node.name().to_string());
        }
        let mut lines = vec![path.unwrap_or(".").to_string()];
        self.require(target, Access::Read)?;
        let mut counts = (0, 0);
        self.render_tree(target, "", show_hidden, &mut lines, &mut counts)?;
        lines.push(String::new());
        lines.push(format!(
            "{}, {}",
            plural(counts.0, "directory", "directories"),
            plural(counts.1, "file", "files")
        ));
        Ok(lines.join("\n"))
    }

    fn render_tree(
        &self,
        dir: NodeId,
        prefix: &str,
        show_hidden: bool,
        lines: &mut Vec<String>,
        counts: &mut (usize, usize),
    ) -> Result<()> {
        let children: Vec<(&str, NodeId)> = self
            .tree
            .node(dir)?
            .sorted_children()
            .into_iter()
            .filter(|(name, _)| show_hidden || !is_hidden(name))
            .collect();
        let last_index = children.len().saturating_sub(1);
        for (i, (name, id)) in children.into_iter().enumerate() {
            let last = i == last_index;
            let connector = if last { "└── " } else { "├── " };
            let child = self.tree.node(id)?;
            if child.is_file() {
                counts.1 += 1;
                lines.push(format!("{}{}{}", prefix, connector, name));
                continue;
            }
            counts.0 += 1;
            if !self.can(id, Access::Read) {
                lines.push(format!(
                    "{}{}{} [permission denied]",
                    prefix, connector, name
                ));
                continue;
            }
            lines.push(format!("{}{}{}", prefix, connector, name));
            let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
            self.render_tree(id, &next, show_hidden, lines, counts)?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn cat(&self, path: &str) -> Result<String> {
        let node = self.readable_file(path)?;
        Ok(node.content().unwrap_or_default().to_string())
    }

    /// Every node below `path` (inclusive) whose name is exactly `name`,
    /// as absolute paths. Unreadable directories are reported inline.
    #[instrument(skip(self))]
    pub fn find(&self, path: Option<&str>, name: &str) -> Result<String> {
        let start = self.target(path)?;
        let mut lines = Vec::new();
        self.find_walk(start, name, &mut lines)?;
        Ok(lines.join("\n"))
    }

    fn find_walk(&self, id: NodeId, name: &str, lines: &mut Vec<String>) -> Result<()> {
        let node = self.tree.node(id)?;
        if node.name() == name {
            lines.push(self.tree.path_of(id));
        }
        if node.is_file() {
            return Ok(());
        }
        if !self.can(id, Access::Read) {
            lines.push(format!(
                "find: '{}': Permission denied",
                self.tree.path_of(id)
            ));
            return Ok(());
        }
        for (_, child) in node.sorted_children() {
            self.find_walk(child, name, lines)?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn grep(&self, term: &str, path: &str) -> Result<String> {
        let node = self.readable_file(path)?;
        let matches: Vec<&str> = content_lines(node.content().unwrap_or_default())
            .into_iter()
            .filter(|line| line.contains(term))
            .collect();
        Ok(matches.join("\n"))
    }

    /// Disk usage, one line per directory in post-order. A directory's total
    /// is its own fixed size plus everything below it.
    #[instrument(skip(self))]
    pub fn du(&self, path: Option<&str>) -> Result<String> {
        let target = self.target(path)?;
        let node = self.tree.node(target)?;
        if node.is_file() {
            return Ok(format!("{}\t{}", node.size(), self.tree.path_of(target)));
        }
        let mut lines = Vec::new();
        self.du_walk(target, &mut lines)?;
        Ok(lines.join("\n"))
    }

    fn du_walk(&self, dir: NodeId, lines: &mut Vec<String>) -> Result<usize> {
        let path = self.tree.path_of(dir);
        if !(self.can(dir, Access::Read) && self.can(dir, Access::Execute)) {
            lines.push(format!("du: cannot read directory '{}': Permission denied", path));
            return Ok(DIRECTORY_SIZE);
        }
        let mut total = DIRECTORY_SIZE;
        for (_, child) in self.tree.node(dir)?.sorted_children() {
            let node = self.tree.node(child)?;
            if node.is_dir() {
                total += self.du_walk(child, lines)?;
            } else {
                total += node.size();
            }
        }
        lines.push(format!("{}\t{}", total, path));
        Ok(total)
    }

    #[instrument(skip(self))]
    pub fn stat(&self, path: &str) -> Result<Stat> {
        let id = self.resolve(path)?;
        let node = self.tree.node(id)?;
        Ok(Stat {
            id,
            name: node.name().to_string(),
            path: self.tree.path_of(id),
            kind: node.type_name(),
            size: node.size(),
            owner: node.owner().to_string(),
            permissions: node.permissions().to_string(),
            modified: node.modified_at().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }

    #[instrument(skip(self))]
    pub fn wc(&self, path: &str) -> Result<WordCount> {
        let node = self.readable_file(path)?;
        let content = node.content().unwrap_or_default();
        Ok(WordCount {
            lines: content_lines(content).len(),
            words: content.split_whitespace().count(),
            bytes: content.len(),
            name: node.name().to_string(),
        })
    }

    #[instrument(skip(self))]
    pub fn head(&self, path: &str, count: usize) -> Result<String> {
        let node = self.readable_file(path)?;
        let lines = content_lines(node.content().unwrap_or_default());
        Ok(lines.into_iter().take(count).collect::<Vec<&str>>().join("\n"))
    }

    #[instrument(skip(self))]
    pub fn tail(&self, path: &str, count: usize) -> Result<String> {
        let node = self.readable_file(path)?;
        let lines = content_lines(node.content().unwrap_or_default());
        let skip = lines.len().saturating_sub(count);
        Ok(lines[skip..].join("\n"))
    }
}
