use std::fmt;
use std::sync::Mutex;

use tokio::sync::watch;

use crate::auth::Credential;

/// Lifecycle of the single game session a coordinator owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Authenticating,
    Launching,
    Running,
    Closed(i32),
}

impl SessionState {
    /// Whether a new launch or sign-in may start from this state
    pub fn is_available(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Closed(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Authenticating => write!(f, "authenticating"),
            SessionState::Launching => write!(f, "launching"),
            SessionState::Running => write!(f, "running"),
            SessionState::Closed(code) => write!(f, "closed with code {}", code),
        }
    }
}

/// Everything that would otherwise be process-wide mutable state
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub credential: Option<Credential>,
    pub state: SessionState,
    /// Version of the current or most recent launch
    pub version: Option<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            credential: None,
            state: SessionState::Idle,
            version: None,
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The session context behind a lock, with change notifications.
///
/// The lock is never held across an await, so every check-and-transition
/// made inside [`Session::update`] is atomic with respect to other callers.
pub struct Session {
    context: Mutex<SessionContext>,
    changes: watch::Sender<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(SessionState::Idle);
        Self {
            context: Mutex::new(SessionContext::new()),
            changes,
        }
    }

    pub fn snapshot(&self) -> SessionContext {
        self.context.lock().unwrap().clone()
    }

    pub fn state(&self) -> SessionState {
        self.context.lock().unwrap().state
    }

    /// Run `f` under the lock and notify subscribers of the resulting state
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionContext) -> R) -> R {
        let mut context = self.context.lock().unwrap();
        let result = f(&mut context);
        let state = context.state;

        // Notify under the lock so subscribers see transitions in order
        self.changes.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
        result
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.changes.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
