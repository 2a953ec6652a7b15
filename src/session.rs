//! Process-wide session state: session id, install counter, agent identity.
//!
//! One process run is one session. The install counter feeds the
//! `auto_install.max_per_session` policy limit; it is process-local and never
//! shared across processes.

use std::sync::Mutex;

use uuid::Uuid;

struct SessionState {
    id: String,
    install_count: u32,
}

static SESSION: Mutex<Option<SessionState>> = Mutex::new(None);

fn with_state<T>(f: impl FnOnce(&mut SessionState) -> T) -> T {
    let mut guard = SESSION.lock().expect("session state poisoned");
    let state = guard.get_or_insert_with(|| SessionState {
        id: Uuid::new_v4().to_string(),
        install_count: 0,
    });
    f(state)
}

/// The session UUID, generated on first use.
pub fn session_id() -> String {
    with_state(|s| s.id.clone())
}

/// Installs performed so far in this session.
pub fn install_count() -> u32 {
    with_state(|s| s.install_count)
}

/// Record a completed install; returns the new count.
pub fn record_install() -> u32 {
    with_state(|s| {
        s.install_count += 1;
        s.install_count
    })
}

/// Reset session state. Intended for tests only: gives each test a fresh
/// session id and a zeroed install counter.
pub fn reset_session() {
    *SESSION.lock().expect("session state poisoned") = None;
}

/// Agent identity string carried in provenance entries.
///
/// Resolution order: `SKILLPORT_AGENT` (explicit value), `SKILLPORT_MCP`,
/// `CLAUDE_CODE`, then "cli".
pub fn agent_identity() -> String {
    if let Ok(agent) = std::env::var("SKILLPORT_AGENT")
        && !agent.trim().is_empty()
    {
        return agent;
    }
    if std::env::var("SKILLPORT_MCP").is_ok_and(|v| !v.is_empty()) {
        return "mcp".into();
    }
    if std::env::var("CLAUDE_CODE").is_ok_and(|v| !v.is_empty()) {
        return "claude-code".into();
    }
    "cli".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_stable_within_session() {
        reset_session();
        let a = session_id();
        let b = session_id();
        assert_eq!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn install_counter_increments() {
        reset_session();
        assert_eq!(install_count(), 0);
        assert_eq!(record_install(), 1);
        assert_eq!(record_install(), 2);
        assert_eq!(install_count(), 2);
    }

    #[test]
    fn reset_clears_counter_and_rotates_id() {
        reset_session();
        let first = session_id();
        record_install();
        reset_session();
        assert_eq!(install_count(), 0);
        assert_ne!(session_id(), first);
    }
}
