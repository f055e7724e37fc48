use crate::errors::{FsError, FsErrorType, Result};
use crate::fsystem::node::Node;

/// The user that every permission check lets through.
pub const ROOT_USER: &str = "root";

const OWNER_BASE: usize = 1;
const OTHER_BASE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Execute,
}

impl Access {
    fn offset(&self) -> usize {
        match self {
            Access::Read => 0,
            Access::Write => 1,
            Access::Execute => 2,
        }
    }

    fn letter(&self) -> char {
        match self {
            Access::Read => 'r',
            Access::Write => 'w',
            Access::Execute => 'x',
        }
    }
}

/// Only the owner and "other" triplets are consulted; the group triplet is
/// carried in the string but never checked.
pub fn authorized(node: &Node, user: &str, access: Access) -> bool {
    if user == ROOT_USER {
        return true;
    }
    let base = if node.owner() == user {
        OWNER_BASE
    } else {
        OTHER_BASE
    };
    node.permissions().chars().nth(base + access.offset()) == Some(access.letter())
}

/// Expand a three digit octal code such as `754` into a full permission
/// string, `d` or `-` prefixed depending on the node type.
pub fn octal_to_permissions(code: &str, is_dir: bool) -> Result<String> {
    if code.len() != 3 || !code.chars().all(|c| ('0'..='7').contains(&c)) {
        return Err(FsError::new(
            FsErrorType::InvalidArgument,
            format!("invalid mode '{}'", code),
        ));
    }
    let mut permissions = String::with_capacity(10);
    permissions.push(if is_dir { 'd' } else { '-' });
    for digit in code.chars() {
        let bits = digit as u8 - b'0';
        permissions.push(if bits & 4 != 0 { 'r' } else { '-' });
        permissions.push(if bits & 2 != 0 { 'w' } else { '-' });
        permissions.push(if bits & 1 != 0 { 'x' } else { '-' });
    }
    Ok(permissions)
}

/// The inverse of [`octal_to_permissions`], used by `stat`.
pub fn permissions_to_octal(permissions: &str) -> String {
    permissions
        .chars()
        .skip(1)
        .collect::<Vec<char>>()
        .chunks(3)
        .map(|triplet| {
            let mut value = 0;
            for (c, bit) in triplet.iter().zip([4, 2, 1]) {
                if *c != '-' {
                    value += bit;
                }
            }
            char::from(b'0' + value)
        })
        .collect()
}
