mod activity;
mod hub;
mod traits;

pub use activity::{level_for, level_text, presence_for, LEVEL_PERCENTAGE};
pub use hub::PresenceHub;
pub use traits::{PresencePublisher, PresenceState};
