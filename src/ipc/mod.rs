//! Unix socket control protocol between the CLI and the daemon.

pub mod client;
pub mod protocol;
pub mod server;

pub use protocol::{Command, RecordingStatus, Response};
pub use server::{CommandHandler, IpcServer};
