use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{FsError, FsErrorType, Result};
use crate::fsystem::node::NodeId;
use crate::fsystem::tree::Tree;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+$").expect("name pattern is a valid regex")
});

/// Turn a path into the node it names. Absolute paths start at the root,
/// everything else at `start`.
pub fn resolve(tree: &Tree, path: &str, start: NodeId) -> Result<NodeId> {
    let mut current = if path.starts_with('/') {
        tree.root()
    } else {
        start
    };
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    for (i, segment) in segments.iter().enumerate() {
        if *segment == ".." {
            // `..` at the root stays at the root
            if let Some(parent) = tree.node(current)?.parent() {
                current = parent;
            }
            continue;
        }
        let node = tree.node(current)?;
        let child = match node.child(segment) {
            Some(c) => c,
            None => {
                tracing::debug!("Segment {} of path {} does not exist", segment, path);
                return Err(FsError::not_found(segment));
            }
        };
        let is_last = i + 1 == segments.len();
        if tree.node(child)?.is_file() && !is_last {
            tracing::debug!("Segment {} of path {} is a file", segment, path);
            return Err(FsError::not_a_directory(segment));
        }
        current = child;
    }
    Ok(current)
}

/// Split a path into the part naming the parent directory and the final
/// name. Trailing slashes are dropped first. An empty parent means "the
/// current directory".
pub fn split_parent(path: &str) -> Result<(String, String)> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(FsError::new(
            FsErrorType::InvalidName,
            format!("'{}'", path),
        ));
    }
    match trimmed.rsplit_once('/') {
        Some(("", name)) => Ok(("/".to_string(), name.to_string())),
        Some((parent, name)) => Ok((parent.to_string(), name.to_string())),
        None => Ok((String::new(), trimmed.to_string())),
    }
}

pub fn validate_name(name: &str) -> Result<()> {
    if name == "." || name == ".." || !NAME_PATTERN.is_match(name) {
        return Err(FsError::new(
            FsErrorType::InvalidName,
            format!("'{}'", name),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsystem::node::Node;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new("user");
        let root = tree.root();
        let a = tree
            .attach(root, Node::new_directory("a", "user", None))
            .unwrap();
        let b = tree.attach(a, Node::new_directory("b", "user", None)).unwrap();
        let f = tree.attach(b, Node::new_file("f.txt", "user", None)).unwrap();
        (tree, a, b, f)
    }

    #[test]
    fn empty_dot_and_root() {
        let (tree, a, _, _) = sample();
        assert_eq!(resolve(&tree, "", a).unwrap(), a);
        assert_eq!(resolve(&tree, ".", a).unwrap(), a);
        assert_eq!(resolve(&tree, "/", a).unwrap(), tree.root());
    }

    #[test]
    fn absolute_relative_and_parent_segments() {
        let (tree, a, b, f) = sample();
        assert_eq!(resolve(&tree, "/a/b/f.txt", tree.root()).unwrap(), f);
        assert_eq!(resolve(&tree, "b", a).unwrap(), b);
        assert_eq!(resolve(&tree, "b/../b/./f.txt", a).unwrap(), f);
        assert_eq!(resolve(&tree, "//a///b/", tree.root()).unwrap(), b);
        assert_eq!(resolve(&tree, "../../../..", b).unwrap(), tree.root());
    }

    #[test]
    fn missing_segment_is_named() {
        let (tree, _, _, _) = sample();
        let err = resolve(&tree, "/a/nope/f.txt", tree.root()).unwrap_err();
        assert_eq!(err.error_type, FsErrorType::PathNotFound);
        assert!(err.message.contains("nope"));
    }

    #[test]
    fn file_in_the_middle_is_not_a_directory() {
        let (tree, _, _, _) = sample();
        let err = resolve(&tree, "/a/b/f.txt/x", tree.root()).unwrap_err();
        assert_eq!(err.error_type, FsErrorType::NotADirectory);
    }

    #[test]
    fn resolved_paths_round_trip_normalised() {
        let (tree, _, _, _) = sample();
        for (input, normal) in [
            ("/a/b/f.txt", "/a/b/f.txt"),
            ("//a/./b//", "/a/b"),
            ("/a/b/../b/./f.txt", "/a/b/f.txt"),
            ("/./", "/"),
        ] {
            let id = resolve(&tree, input, tree.root()).unwrap();
            assert_eq!(tree.path_of(id), normal);
        }
    }

    #[test]
    fn split_parent_cases() {
        assert_eq!(
            split_parent("/a/b/").unwrap(),
            ("/a".to_string(), "b".to_string())
        );
        assert_eq!(split_parent("/a").unwrap(), ("/".to_string(), "a".to_string()));
        assert_eq!(split_parent("a").unwrap(), (String::new(), "a".to_string()));
        assert_eq!(
            split_parent("x/y").unwrap(),
            ("x".to_string(), "y".to_string())
        );
        assert!(split_parent("/").is_err());
    }

    #[test]
    fn name_charset() {
        assert!(validate_name("report_v1.2-final").is_ok());
        assert!(validate_name(".hidden").is_ok());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("semi;colon").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("").is_err());
    }
}
