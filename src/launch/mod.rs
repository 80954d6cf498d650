mod coordinator;
mod options;
mod process;
mod sdk;
mod session;
mod versions;

pub use coordinator::{Coordinator, LaunchStarted};
pub use options::{
    normalize_memory, LaunchDefaults, LaunchOptions, LaunchRequest, MemorySpec, NumberOrText,
    RawLaunchOptions, VersionSpec, WindowSpec, DEFAULT_MAX_MEMORY, MIN_MEMORY,
};
pub use process::JavaLauncher;
pub use sdk::{LaunchAck, LaunchEvent, LaunchEvents, LaunchSdk};
pub use session::{Session, SessionContext, SessionState};
pub use versions::{VersionEntry, VersionManifestClient, VERSION_LIST_LIMIT};
