// The operation surface of the virtual filesystem. A `FileSystem` owns the
// tree together with the two pieces of session state every operation reads:
// the current directory and the acting user.

use tracing::instrument;

use crate::config::Config;
use crate::errors::{FsError, FsErrorType, Result};
use crate::fsystem::node::{Node, NodeId};
use crate::fsystem::permissions::{authorized, octal_to_permissions, Access, ROOT_USER};
use crate::fsystem::resolver::{resolve, split_parent, validate_name};
use crate::fsystem::tree::{join, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touched {
    Created(NodeId),
    Updated(NodeId),
}

#[derive(Debug)]
pub struct FileSystem {
    pub(crate) tree: Tree,
    pub(crate) cwd: NodeId,
    pub(crate) user: String,
}

impl FileSystem {
    /// A filesystem containing only the root directory, owned by `user`.
    pub fn new(user: &str) -> FileSystem {
        let tree = Tree::new(user);
        let cwd = tree.root();
        FileSystem {
            tree,
            cwd,
            user: user.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> FileSystem {
        FileSystem::new(&config.user)
    }

    pub fn nodes(&self) -> &Tree {
        &self.tree
    }

    pub fn cwd(&self) -> NodeId {
        self.cwd
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn whoami(&self) -> String {
        self.user.clone()
    }

    #[instrument(skip(self))]
    pub fn su(&mut self, user: &str) -> Result<()> {
        validate_name(user)?;
        tracing::info!("Acting user changed from {} to {}", self.user, user);
        self.user = user.to_string();
        Ok(())
    }

    /// Resolve `path` relative to the current directory.
    pub fn resolve(&self, path: &str) -> Result<NodeId> {
        resolve(&self.tree, path, self.cwd)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.tree.node(id)
    }

    pub fn path_of(&self, id: NodeId) -> String {
        self.tree.path_of(id)
    }

    pub fn can(&self, id: NodeId, access: Access) -> bool {
        match self.tree.get(id) {
            Some(node) => authorized(node, &self.user, access),
            None => false,
        }
    }

    pub(crate) fn require(&self, id: NodeId, access: Access) -> Result<()> {
        if self.can(id, access) {
            return Ok(());
        }
        let path = self.tree.path_of(id);
        tracing::debug!("User {} denied {:?} on {}", self.user, access, path);
        Err(FsError::permission_denied(&path))
    }

    /// Resolve the directory a new entry would be created in, and validate
    /// the entry's name.
    pub(crate) fn resolve_parent(&self, path: &str) -> Result<(NodeId, String)> {
        let (parent_path, name) = split_parent(path)?;
        let parent = self.resolve(&parent_path)?;
        if !self.tree.node(parent)?.is_dir() {
            return Err(FsError::not_a_directory(&parent_path));
        }
        validate_name(&name)?;
        Ok((parent, name))
    }

    pub fn pwd(&self) -> String {
        self.tree.path_of(self.cwd)
    }

    /// Change directory. Without a path this goes to `/`.
    #[instrument(skip(self))]
    pub fn cd(&mut self, path: Option<&str>) -> Result<()> {
        let target = match path {
            None => self.tree.root(),
            Some(p) => self.resolve(p)?,
        };
        if !self.tree.node(target)?.is_dir() {
            return Err(FsError::not_a_directory(path.unwrap_or("/")));
        }
        self.require(target, Access::Execute)?;
        self.cwd = target;
        Ok(())
    }

    /// Create a directory. Missing intermediate directories are never created.
    #[instrument(skip(self))]
    pub fn mkdir(&mut self, path: &str) -> Result<NodeId> {
        let (parent, name) = self.resolve_parent(path)?;
        self.require(parent, Access::Write)?;
        if self.tree.node(parent)?.child(&name).is_some() {
            return Err(FsError::new(
                FsErrorType::NameCollision,
                format!("'{}'", path),
            ));
        }
        let id = self
            .tree
            .attach(parent, Node::new_directory(&name, &self.user, None))?;
        tracing::info!("Created directory {}", self.tree.path_of(id));
        Ok(id)
    }

    /// Create an empty file, or bump the timestamp of an existing one.
    #[instrument(skip(self))]
    pub fn touch(&mut self, path: &str) -> Result<Touched> {
        let (parent, name) = self.resolve_parent(path)?;
        if let Some(existing) = self.tree.node(parent)?.child(&name) {
            if self.tree.node(existing)?.is_dir() {
                return Err(FsError::is_a_directory(path));
            }
            self.require(existing, Access::Write)?;
            self.tree.node_mut(existing)?.touch();
            return Ok(Touched::Updated(existing));
        }
        self.require(parent, Access::Write)?;
        let id = self
            .tree
            .attach(parent, Node::new_file(&name, &self.user, None))?;
        tracing::info!("Created file {}", self.tree.path_of(id));
        Ok(Touched::Created(id))
    }

    /// Remove a node. Non-empty directories need `recursive`. Returns the
    /// number of nodes dropped.
    #[instrument(skip(self))]
    pub fn rm(&mut self, path: &str, recursive: bool) -> Result<usize> {
        let target = self.resolve(path)?;
        if self.tree.is_ancestor_or_self(target, self.cwd) {
            return Err(FsError::new(
                FsErrorType::SelfOrAncestorRemoval,
                format!("'{}'", self.tree.path_of(target)),
            ));
        }
        let node = self.tree.node(target)?;
        if let Some(parent) = node.parent() {
            self.require(parent, Access::Write)?;
        }
        if let Some(children) = node.children() {
            if !children.is_empty() && !recursive {
                return Err(FsError::new(
                    FsErrorType::NotEmpty,
                    format!("'{}'", self.tree.path_of(target)),
                ));
            }
        }
        let full_path = self.tree.path_of(target);
        let dropped = self.tree.remove(target)?;
        tracing::info!("Removed {} ({} nodes)", full_path, dropped);
        Ok(dropped)
    }

    /// Move a node into the directory `dest`, keeping its identity.
    #[instrument(skip(self))]
    pub fn mv(&mut self, src: &str, dest: &str) -> Result<NodeId> {
        let source = self.resolve(src)?;
        let destination = self.resolve(dest)?;
        let source_parent = match self.tree.node(source)?.parent() {
            Some(p) => p,
            None => {
                return Err(FsError::invalid_argument(
                    "cannot move the root directory",
                ))
            }
        };
        if !self.tree.node(destination)?.is_dir() {
            return Err(FsError::not_a_directory(dest));
        }
        if self.tree.is_ancestor_or_self(source, destination) {
            return Err(FsError::invalid_argument(format!(
                "cannot move '{}' into itself",
                self.tree.path_of(source)
            )));
        }
        self.require(source_parent, Access::Write)?;
        self.require(destination, Access::Write)?;
        let name = self.tree.node(source)?.name().to_string();
        if self.tree.node(destination)?.child(&name).is_some() {
            return Err(FsError::new(
                FsErrorType::NameCollision,
                format!("'{}'", join(&self.tree.path_of(destination), &name)),
            ));
        }
        let from = self.tree.path_of(source);
        self.tree.detach(source)?;
        self.tree.reattach(source, destination)?;
        tracing::info!("Moved {} to {}", from, self.tree.path_of(source));
        Ok(source)
    }

    /// Deep copy a node into the directory `dest`. Copies are owned by the
    /// acting user, who must be able to read every node being copied.
    #[instrument(skip(self))]
    pub fn cp(&mut self, src: &str, dest: &str) -> Result<NodeId> {
        let source = self.resolve(src)?;
        let destination = self.resolve(dest)?;
        if source == self.tree.root() {
            return Err(FsError::invalid_argument("cannot copy the root directory"));
        }
        self.require_readable(source)?;
        if !self.tree.node(destination)?.is_dir() {
            return Err(FsError::not_a_directory(dest));
        }
        if self.tree.is_ancestor_or_self(source, destination) {
            return Err(FsError::invalid_argument(format!(
                "cannot copy '{}' into itself",
                self.tree.path_of(source)
            )));
        }
        self.require(destination, Access::Write)?;
        let name = self.tree.node(source)?.name().to_string();
        if self.tree.node(destination)?.child(&name).is_some() {
            return Err(FsError::new(
                FsErrorType::NameCollision,
                format!("'{}'", join(&self.tree.path_of(destination), &name)),
            ));
        }
        let copy = self.copy_into(source, destination)?;
        tracing::info!(
            "Copied {} to {}",
            self.tree.path_of(source),
            self.tree.path_of(copy)
        );
        Ok(copy)
    }

    /// Read access on `id` and, for directories, on everything below it.
    fn require_readable(&self, id: NodeId) -> Result<()> {
        self.require(id, Access::Read)?;
        for (_, child) in self.tree.node(id)?.sorted_children() {
            self.require_readable(child)?;
        }
        Ok(())
    }

    fn copy_into(&mut self, source: NodeId, parent: NodeId) -> Result<NodeId> {
        let original = self.tree.node(source)?;
        let mut copy = if original.is_dir() {
            Node::new_directory(original.name(), &self.user, None)
        } else {
            let mut file = Node::new_file(original.name(), &self.user, None);
            file.set_content(original.content().unwrap_or_default());
            file
        };
        copy.permissions = original.permissions().to_string();
        let children: Vec<NodeId> = original
            .sorted_children()
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        let copy_id = self.tree.attach(parent, copy)?;
        for child in children {
            self.copy_into(child, copy_id)?;
        }
        Ok(copy_id)
    }

    /// Give a node a new name inside the same directory.
    #[instrument(skip(self))]
    pub fn rename(&mut self, path: &str, new_name: &str) -> Result<NodeId> {
        if new_name.contains('/') {
            return Err(FsError::new(
                FsErrorType::InvalidName,
                format!("'{}' must not contain '/'", new_name),
            ));
        }
        validate_name(new_name)?;
        let target = self.resolve(path)?;
        let parent = match self.tree.node(target)?.parent() {
            Some(p) => p,
            None => {
                return Err(FsError::invalid_argument(
                    "cannot rename the root directory",
                ))
            }
        };
        self.require(parent, Access::Write)?;
        let from = self.tree.path_of(target);
        self.tree.rename(target, new_name)?;
        tracing::info!("Renamed {} to {}", from, self.tree.path_of(target));
        Ok(target)
    }

    fn require_owner(&self, id: NodeId) -> Result<()> {
        let node = self.tree.node(id)?;
        if self.user == ROOT_USER || node.owner() == self.user {
            return Ok(());
        }
        Err(FsError::new(
            FsErrorType::PermissionDenied,
            format!("'{}' is owned by {}", self.tree.path_of(id), node.owner()),
        ))
    }

    #[instrument(skip(self))]
    pub fn chmod(&mut self, code: &str, path: &str) -> Result<String> {
        let target = self.resolve(path)?;
        self.require_owner(target)?;
        let permissions = octal_to_permissions(code, self.tree.node(target)?.is_dir())?;
        let node = self.tree.node_mut(target)?;
        node.permissions = permissions.clone();
        node.touch();
        tracing::info!(
            "Permissions of {} set to {}",
            self.tree.path_of(target),
            permissions
        );
        Ok(permissions)
    }

    #[instrument(skip(self))]
    pub fn chown(&mut self, owner: &str, path: &str) -> Result<()> {
        validate_name(owner)?;
        let target = self.resolve(path)?;
        self.require_owner(target)?;
        let node = self.tree.node_mut(target)?;
        node.owner = owner.to_string();
        node.touch();
        tracing::info!("Owner of {} set to {}", self.tree.path_of(target), owner);
        Ok(())
    }

    /// Overwrite or append to a file, creating it when it does not exist.
    #[instrument(skip(self, text))]
    pub fn write(&mut self, path: &str, text: &str, append: bool) -> Result<NodeId> {
        let (parent, name) = self.resolve_parent(path)?;
        let target = match self.tree.node(parent)?.child(&name) {
            Some(existing) => {
                if self.tree.node(existing)?.is_dir() {
                    return Err(FsError::is_a_directory(path));
                }
                self.require(existing, Access::Write)?;
                existing
            }
            None => {
                self.require(parent, Access::Write)?;
                self.tree
                    .attach(parent, Node::new_file(&name, &self.user, None))?
            }
        };
        let node = self.tree.node_mut(target)?;
        if append {
            node.append_content(text);
        } else {
            node.set_content(text);
        }
        tracing::info!(
            "Wrote {} bytes to {} (append: {})",
            text.len(),
            self.tree.path_of(target),
            append
        );
        Ok(target)
    }
}
