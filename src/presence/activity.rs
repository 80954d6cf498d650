//! Presence text derived from the session state.

use chrono::Utc;

use super::PresenceState;
use crate::launch::SessionState;

/// Fixed compatibility rating shown in the icon tooltip
pub const LEVEL_PERCENTAGE: u8 = 83;

/// Asset uploaded to the Discord application
const ICON_KEY: &str = "tool-icon";

pub fn level_for(percentage: u8) -> u8 {
    match percentage {
        90..=u8::MAX => 10,
        80..=89 => 9,
        60..=79 => 8,
        40..=59 => 7,
        20..=39 => 6,
        _ => 5,
    }
}

pub fn level_text(percentage: u8) -> String {
    format!(
        "Level {} | Compatibility: {}%",
        level_for(percentage),
        percentage
    )
}

/// Project a session state onto what the presence network should display
pub fn presence_for(app_label: &str, state: SessionState, version: Option<&str>) -> PresenceState {
    let version = version.unwrap_or("unknown version");
    let text = match state {
        SessionState::Launching => format!("Launching {}", version),
        SessionState::Running => format!("Playing {}", version),
        SessionState::Idle | SessionState::Authenticating | SessionState::Closed(_) => {
            "Idle - ready to play".to_string()
        }
    };

    PresenceState {
        details: app_label.to_string(),
        state: text,
        started_at: Utc::now(),
        icon_key: ICON_KEY.to_string(),
        icon_text: level_text(LEVEL_PERCENTAGE),
    }
}
