// Two unrelated codecs: a run-length coder for raw bytes, and the text
// archive format used by zip/unzip on the virtual tree.

pub mod rle;
pub mod tree_archive;

pub use tree_archive::{parse_archive, ArchiveEntry, ARCHIVE_MARKER};
