pub mod archive;
pub mod commands;
pub mod config;
pub mod errors;
pub mod fsystem;
mod locations;
pub mod log;

pub use commands::{run, Command, CommandOutput};
pub use config::Config;
pub use errors::{FsError, FsErrorType, Result};
pub use fsystem::FileSystem;
