//! Fans presence updates out to every registered publisher

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::traits::{PresencePublisher, PresenceState};

pub struct PresenceHub {
    publishers: Vec<Box<dyn PresencePublisher>>,
    enabled: AtomicBool,
    last: Mutex<Option<PresenceState>>,
}

impl PresenceHub {
    pub fn new(enabled: bool) -> Self {
        Self {
            publishers: Vec::new(),
            enabled: AtomicBool::new(enabled),
            last: Mutex::new(None),
        }
    }

    pub fn add_publisher(&mut self, publisher: Box<dyn PresencePublisher>) {
        tracing::info!("Adding presence publisher: {}", publisher.name());
        self.publishers.push(publisher);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Toggle publishing. Disabling clears what is shown, enabling restores
    /// the most recent state.
    pub fn set_enabled(&self, enabled: bool) {
        if self.enabled.swap(enabled, Ordering::SeqCst) == enabled {
            return;
        }

        tracing::info!("Presence {}", if enabled { "enabled" } else { "disabled" });

        if enabled {
            let last = self.last.lock().unwrap().clone();
            if let Some(state) = last {
                self.publish_all(&state);
            }
        } else {
            for publisher in &self.publishers {
                publisher.clear();
            }
        }
    }

    pub fn update(&self, state: PresenceState) {
        tracing::debug!("Updating presence: {:?}", state);
        *self.last.lock().unwrap() = Some(state.clone());

        if self.is_enabled() {
            self.publish_all(&state);
        }
    }

    pub fn last(&self) -> Option<PresenceState> {
        self.last.lock().unwrap().clone()
    }

    fn publish_all(&self, state: &PresenceState) {
        for publisher in &self.publishers {
            publisher.publish(state);
        }
    }
}

impl Default for PresenceHub {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        published: Mutex<Vec<String>>,
        clears: Mutex<usize>,
    }

    struct RecordingPublisher(Arc<Recorder>);

    impl PresencePublisher for RecordingPublisher {
        fn name(&self) -> &'static str {
            "Recording"
        }

        fn publish(&self, state: &PresenceState) {
            self.0.published.lock().unwrap().push(state.state.clone());
        }

        fn clear(&self) {
            *self.0.clears.lock().unwrap() += 1;
        }
    }

    fn state(text: &str) -> PresenceState {
        PresenceState {
            details: "Fusion".to_string(),
            state: text.to_string(),
            started_at: chrono::Utc::now(),
            icon_key: "icon".to_string(),
            icon_text: "tip".to_string(),
        }
    }

    #[test]
    fn updates_reach_every_publisher() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let mut hub = PresenceHub::new(true);
        hub.add_publisher(Box::new(RecordingPublisher(first.clone())));
        hub.add_publisher(Box::new(RecordingPublisher(second.clone())));

        hub.update(state("Playing 1.20.1"));

        assert_eq!(*first.published.lock().unwrap(), vec!["Playing 1.20.1"]);
        assert_eq!(*second.published.lock().unwrap(), vec!["Playing 1.20.1"]);
    }

    #[test]
    fn disabled_hub_remembers_but_does_not_publish() {
        let recorder = Arc::new(Recorder::default());
        let mut hub = PresenceHub::new(false);
        hub.add_publisher(Box::new(RecordingPublisher(recorder.clone())));

        hub.update(state("Idle"));
        assert!(recorder.published.lock().unwrap().is_empty());
        assert_eq!(hub.last().map(|s| s.state), Some("Idle".to_string()));

        hub.set_enabled(true);
        assert_eq!(*recorder.published.lock().unwrap(), vec!["Idle"]);
    }

    #[test]
    fn disabling_clears_once() {
        let recorder = Arc::new(Recorder::default());
        let mut hub = PresenceHub::new(true);
        hub.add_publisher(Box::new(RecordingPublisher(recorder.clone())));

        hub.set_enabled(false);
        hub.set_enabled(false);
        assert_eq!(*recorder.clears.lock().unwrap(), 1);
    }
}
