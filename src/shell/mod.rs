mod commands;
mod dialogs;
mod server;
mod window;

pub use commands::{Shell, ShellRequest};
pub use dialogs::{FileDialogs, FileFilter, NativeDialogs};
pub use server::{ControlAccess, ControlEndpoint, ControlServer, TOKEN_HEADER};
pub use window::{HeadlessWindow, ShellWindow};
