//! Bounded, in-process conversation history.
//!
//! Sessions live only as long as the store. History is rendered as plain
//! text for the system prompt, never replayed as provider messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default number of exchanges kept per session.
pub const DEFAULT_MAX_HISTORY: usize = 2;

/// One user/assistant turn pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct SessionState {
    sessions: HashMap<String, VecDeque<Exchange>>,
    counter: u64,
}

/// Per-session exchange history, truncated to the most recent
/// `max_history` exchanges.
#[derive(Debug)]
pub struct SessionStore {
    state: Mutex<SessionState>,
    max_history: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            max_history,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    // Every mutation leaves the map valid; poisoning is ignored.
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start an empty session and return its id (`session_1`, `session_2`, ...).
    pub fn create_session(&self) -> String {
        let mut state = self.state();
        loop {
            state.counter += 1;
            let id = format!("session_{}", state.counter);
            if !state.sessions.contains_key(&id) {
                state.sessions.insert(id.clone(), VecDeque::new());
                tracing::debug!("Created session {}", id);
                return id;
            }
        }
    }

    /// Append an exchange, dropping the oldest beyond the limit.
    ///
    /// An unknown id starts a new session under that id.
    pub fn add_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        let mut state = self.state();
        let exchanges = state.sessions.entry(session_id.to_string()).or_default();

        exchanges.push_back(Exchange {
            user: user.to_string(),
            assistant: assistant.to_string(),
            at: Utc::now(),
        });

        let mut dropped = 0;
        while exchanges.len() > self.max_history {
            exchanges.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(session = session_id, dropped, "Truncated session history");
        }
    }

    /// History as `User: ...\nAssistant: ...` lines, oldest first.
    ///
    /// `None` for unknown or empty sessions.
    pub fn get_history(&self, session_id: &str) -> Option<String> {
        let state = self.state();
        let exchanges = state.sessions.get(session_id)?;
        if exchanges.is_empty() {
            return None;
        }

        let lines: Vec<String> = exchanges
            .iter()
            .map(|e| format!("User: {}\nAssistant: {}", e.user, e.assistant))
            .collect();
        Some(lines.join("\n"))
    }

    /// Stored exchanges, oldest first.
    pub fn exchanges(&self, session_id: &str) -> Vec<Exchange> {
        self.state()
            .sessions
            .get(session_id)
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.state().sessions.contains_key(session_id)
    }

    /// Forget a session's exchanges. Returns whether it existed.
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.state().sessions.remove(session_id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.state().sessions.len()
    }
}
