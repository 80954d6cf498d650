use chrono::{DateTime, Utc};

/// What the presence network should show right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceState {
    pub details: String,
    pub state: String,
    pub started_at: DateTime<Utc>,
    pub icon_key: String,
    pub icon_text: String,
}

/// Trait for presence networks (Discord, ...)
///
/// Publishing is best-effort: implementations log failures and never report
/// them back to the caller.
pub trait PresencePublisher: Send + Sync {
    /// Returns the name of this publisher (for logging)
    fn name(&self) -> &'static str;

    fn publish(&self, state: &PresenceState);

    /// Remove any presence currently shown
    fn clear(&self);
}
