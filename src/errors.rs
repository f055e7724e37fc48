use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorType {
    PathNotFound,
    NotADirectory,
    IsADirectory,
    NotEmpty,
    NameCollision,
    InvalidName,
    PermissionDenied,
    SelfOrAncestorRemoval,
    ArchiveCorrupt,
    InvalidArgument,
    IOError,
}

impl FsErrorType {
    /// The short, coreutils-style reason appended to every error message.
    pub fn reason(&self) -> &'static str {
        match self {
            FsErrorType::PathNotFound => "No such file or directory",
            FsErrorType::NotADirectory => "Not a directory",
            FsErrorType::IsADirectory => "Is a directory",
            FsErrorType::NotEmpty => "Directory not empty",
            FsErrorType::NameCollision => "File exists",
            FsErrorType::InvalidName => "Invalid name",
            FsErrorType::PermissionDenied => "Permission denied",
            FsErrorType::SelfOrAncestorRemoval => {
                "Refusing to remove the current directory or one of its ancestors"
            }
            FsErrorType::ArchiveCorrupt => "Archive is corrupt",
            FsErrorType::InvalidArgument => "Invalid argument",
            FsErrorType::IOError => "I/O error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FsError {
    pub error_type: FsErrorType,
    pub message: String,
}

impl FsError {
    pub fn new(error_type: FsErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
        }
    }

    pub(crate) fn not_found(path: &str) -> Self {
        Self::new(FsErrorType::PathNotFound, format!("'{}'", path))
    }

    pub(crate) fn not_a_directory(path: &str) -> Self {
        Self::new(FsErrorType::NotADirectory, format!("'{}'", path))
    }

    pub(crate) fn is_a_directory(path: &str) -> Self {
        Self::new(FsErrorType::IsADirectory, format!("'{}'", path))
    }

    pub(crate) fn permission_denied(path: &str) -> Self {
        Self::new(FsErrorType::PermissionDenied, format!("'{}'", path))
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(FsErrorType::InvalidArgument, message.into())
    }

    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::new(FsErrorType::ArchiveCorrupt, message.into())
    }

    /// Prefix the message with the object the failing operation was acting on.
    pub(crate) fn context(mut self, context: impl AsRef<str>) -> Self {
        self.message = format!("{} {}", context.as_ref(), self.message);
        self
    }
}

impl std::fmt::Display for FsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            return write!(f, "{}", self.error_type.reason());
        }
        write!(f, "{}: {}", self.message, self.error_type.reason())
    }
}

impl From<std::io::Error> for FsError {
    fn from(error: std::io::Error) -> Self {
        Self {
            error_type: FsErrorType::IOError,
            message: error.to_string(),
        }
    }
}

impl From<base64::DecodeError> for FsError {
    fn from(error: base64::DecodeError) -> Self {
        Self {
            error_type: FsErrorType::ArchiveCorrupt,
            message: error.to_string(),
        }
    }
}

impl Error for FsError {}

pub type Result<T> = std::result::Result<T, FsError>;
