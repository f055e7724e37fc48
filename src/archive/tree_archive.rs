// Text archives of a subtree. The first line is a fixed marker, then one
// `|`-separated line per node in pre-order:
//
//   DIR|<relative path>|<permissions>|<owner>
//   FILE|<relative path>|<permissions>|<owner>|<base64(deflate(content))>
//
// Relative paths start with the archived node's own name.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::instrument;

use crate::errors::{FsError, Result};
use crate::fsystem::node::NodeId;
use crate::fsystem::permissions::Access;
use crate::fsystem::resolver::validate_name;
use crate::fsystem::tree::join;
use crate::fsystem::{FileSystem, Touched};

pub const ARCHIVE_MARKER: &str = "ARCHIVE_MARKER";

static PERMISSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[d-]([r-][w-][x-]){3}$").expect("permission pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveEntry {
    Dir {
        path: String,
        permissions: String,
        owner: String,
    },
    File {
        path: String,
        permissions: String,
        owner: String,
        content: String,
    },
}

impl ArchiveEntry {
    pub fn path(&self) -> &str {
        match self {
            ArchiveEntry::Dir { path, .. } | ArchiveEntry::File { path, .. } => {
                path.as_str()
            }
        }
    }

    fn metadata(&self) -> (&str, &str) {
        match self {
            ArchiveEntry::Dir {
                permissions, owner, ..
            }
            | ArchiveEntry::File {
                permissions, owner, ..
            } => (permissions.as_str(), owner.as_str()),
        }
    }
}

/// Deflate then base64. Empty content stays empty.
pub fn compress_content(content: &str) -> Result<String> {
    if content.is_empty() {
        return Ok(String::new());
    }
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

pub fn decompress_content(encoded: &str) -> Result<String> {
    if encoded.is_empty() {
        return Ok(String::new());
    }
    let compressed = STANDARD.decode(encoded)?;
    let mut content = String::new();
    DeflateDecoder::new(&compressed[..])
        .read_to_string(&mut content)
        .map_err(|e| FsError::corrupt(format!("cannot inflate content: {}", e)))?;
    Ok(content)
}

fn check_path(path: &str) -> Result<()> {
    if path.is_empty() || path.starts_with('/') {
        return Err(FsError::corrupt(format!("bad entry path '{}'", path)));
    }
    for segment in path.split('/') {
        validate_name(segment)
            .map_err(|_| FsError::corrupt(format!("bad entry path '{}'", path)))?;
    }
    Ok(())
}

fn check_metadata(path: &str, permissions: &str, owner: &str, is_dir: bool) -> Result<()> {
    let marker_ok = permissions.starts_with('d') == is_dir;
    if !marker_ok || !PERMISSION_PATTERN.is_match(permissions) {
        return Err(FsError::corrupt(format!(
            "bad permissions '{}' for '{}'",
            permissions, path
        )));
    }
    validate_name(owner)
        .map_err(|_| FsError::corrupt(format!("bad owner '{}' for '{}'", owner, path)))
}

/// Parse archive text into entries. Lines with fewer than four fields, or an
/// unknown entry kind, are skipped. A wrong header or undecodable content
/// fails the whole archive.
pub fn parse_archive(text: &str) -> Result<Vec<ArchiveEntry>> {
    let mut lines = text.lines();
    match lines.next() {
        Some(header) if header.trim_end() == ARCHIVE_MARKER => {}
        _ => return Err(FsError::corrupt("missing archive header")),
    }
    let mut entries = Vec::new();
    for (number, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.trim_end().split('|').collect();
        if fields.len() < 4 {
            tracing::warn!("Skipping malformed archive line {}", number + 2);
            continue;
        }
        let (path, permissions, owner) = (fields[1], fields[2], fields[3]);
        let entry = match fields[0] {
            "DIR" => ArchiveEntry::Dir {
                path: path.to_string(),
                permissions: permissions.to_string(),
                owner: owner.to_string(),
            },
            "FILE" => ArchiveEntry::File {
                path: path.to_string(),
                permissions: permissions.to_string(),
                owner: owner.to_string(),
                content: decompress_content(fields.get(4).copied().unwrap_or_default())
                    .map_err(|e| e.context(format!("'{}':", path)))?,
            },
            other => {
                tracing::warn!(
                    "Skipping archive line {} with unknown kind {}",
                    number + 2,
                    other
                );
                continue;
            }
        };
        check_path(path)?;
        let is_dir = matches!(entry, ArchiveEntry::Dir { .. });
        check_metadata(path, permissions, owner, is_dir)?;
        entries.push(entry);
    }
    Ok(entries)
}

impl FileSystem {
    /// Serialize the subtree at `src`. Returns the archive text and a note
    /// for every node that was skipped because it could not be read.
    #[instrument(skip(self))]
    pub fn archive_text(&self, src: &str) -> Result<(String, Vec<String>)> {
        let start = self.resolve(src)?;
        if start == self.tree.root() {
            return Err(FsError::invalid_argument("cannot archive the root directory"));
        }
        let mut lines = vec![ARCHIVE_MARKER.to_string()];
        let mut notes = Vec::new();
        let name = self.node(start)?.name().to_string();
        self.archive_node(start, &name, &mut lines, &mut notes)?;
        let mut text = lines.join("\n");
        text.push('\n');
        Ok((text, notes))
    }

    fn archive_node(
        &self,
        id: NodeId,
        relative: &str,
        lines: &mut Vec<String>,
        notes: &mut Vec<String>,
    ) -> Result<()> {
        let node = self.node(id)?;
        if !self.can(id, Access::Read) {
            notes.push(format!(
                "zip: '{}': Permission denied, skipped",
                self.path_of(id)
            ));
            // the directory itself is still recorded, only its contents are lost
            if node.is_dir() {
                lines.push(format!(
                    "DIR|{}|{}|{}",
                    relative,
                    node.permissions(),
                    node.owner()
                ));
            }
            return Ok(());
        }
        match node.content() {
            Some(content) => lines.push(format!(
                "FILE|{}|{}|{}|{}",
                relative,
                node.permissions(),
                node.owner(),
                compress_content(content)?
            )),
            None => {
                lines.push(format!(
                    "DIR|{}|{}|{}",
                    relative,
                    node.permissions(),
                    node.owner()
                ));
                for (name, child) in node.sorted_children() {
                    let child_path = format!("{}/{}", relative, name);
                    self.archive_node(child, &child_path, lines, notes)?;
                }
            }
        }
        Ok(())
    }

    /// Archive `src` into the file `archive`, creating or overwriting it.
    #[instrument(skip(self))]
    pub fn zip(&mut self, src: &str, archive: &str) -> Result<String> {
        let (text, notes) = self.archive_text(src)?;
        let entries = text.lines().count() - 1;
        let id = self.write(archive, &text, false)?;
        tracing::info!(
            "Archived {} into {} ({} entries, {} skipped)",
            src,
            self.path_of(id),
            entries,
            notes.len()
        );
        let mut out = notes;
        out.push(format!(
            "'{}' archived to '{}' ({} entries)",
            src,
            self.path_of(id),
            entries
        ));
        Ok(out.join("\n"))
    }

    /// Restore the archive stored in the file `archive` under `dest`, or the
    /// current directory.
    #[instrument(skip(self))]
    pub fn unzip(&mut self, archive: &str, dest: Option<&str>) -> Result<String> {
        let text = self.cat(archive)?;
        let restored = self.restore(&text, dest)?;
        Ok(format!("{} entries restored from '{}'", restored, archive))
    }

    /// Rebuild the nodes described by `text` under `dest`. Nodes are created
    /// with the acting user's rights, then permissions and owners from the
    /// archive are written straight onto the nodes this call created, without
    /// any ownership check. Existing directories are merged and keep their
    /// metadata; existing files get the archived content only.
    ///
    /// If any entry fails, everything created so far is removed and
    /// overwritten files get their previous content back.
    pub fn restore(&mut self, text: &str, dest: Option<&str>) -> Result<usize> {
        let entries = parse_archive(text)?;
        let base = match dest {
            Some(path) => self.resolve(path)?,
            None => self.cwd,
        };
        if !self.node(base)?.is_dir() {
            return Err(FsError::not_a_directory(dest.unwrap_or(".")));
        }
        let base_path = self.path_of(base);

        let mut created: Vec<(NodeId, &ArchiveEntry)> = Vec::new();
        let mut overwritten: Vec<(NodeId, String)> = Vec::new();
        for entry in &entries {
            let applied = self.restore_entry(&base_path, entry, &mut created, &mut overwritten);
            if let Err(e) = applied {
                tracing::warn!("Restore under {} failed, rolling back: {}", base_path, e);
                self.roll_back(&created, overwritten);
                return Err(e);
            }
        }

        for (id, entry) in &created {
            let (permissions, owner) = entry.metadata();
            let node = self.tree.node_mut(*id)?;
            if node.owner() != owner {
                tracing::warn!(
                    "Restoring owner {} on {} without an ownership check",
                    owner,
                    entry.path()
                );
            }
            node.permissions = permissions.to_string();
            node.owner = owner.to_string();
        }
        tracing::info!(
            "Restored {} entries under {} ({} created)",
            entries.len(),
            base_path,
            created.len()
        );
        Ok(entries.len())
    }

    fn restore_entry<'a>(
        &mut self,
        base_path: &str,
        entry: &'a ArchiveEntry,
        created: &mut Vec<(NodeId, &'a ArchiveEntry)>,
        overwritten: &mut Vec<(NodeId, String)>,
    ) -> Result<()> {
        let target = join(base_path, entry.path());
        let existing = self
            .resolve(&target)
            .ok()
            .and_then(|id| self.nodes().get(id))
            .map(|node| (node.id(), node.content().map(str::to_string)));
        match (entry, existing) {
            // merged into what is already there
            (ArchiveEntry::Dir { .. }, Some((_, None))) => {}
            (ArchiveEntry::Dir { .. }, _) => {
                let id = self.mkdir(&target)?;
                created.push((id, entry));
            }
            (ArchiveEntry::File { content, .. }, Some((id, Some(previous)))) => {
                self.write(&target, content, false)?;
                overwritten.push((id, previous));
            }
            (ArchiveEntry::File { content, .. }, _) => {
                let id = match self.touch(&target)? {
                    Touched::Created(id) | Touched::Updated(id) => id,
                };
                created.push((id, entry));
                self.write(&target, content, false)?;
            }
        }
        Ok(())
    }

    fn roll_back(
        &mut self,
        created: &[(NodeId, &ArchiveEntry)],
        overwritten: Vec<(NodeId, String)>,
    ) {
        for (id, previous) in overwritten.into_iter().rev() {
            if let Ok(node) = self.tree.node_mut(id) {
                node.set_content(&previous);
            }
        }
        // newest first, so children go before their parents
        for (id, _) in created.iter().rev() {
            if self.tree.get(*id).is_none() {
                continue;
            }
            if let Err(e) = self.tree.remove(*id) {
                tracing::error!("Could not roll back {}: {}", id, e);
            }
        }
    }
}
