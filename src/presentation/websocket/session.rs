//! WebSocket Session Management

use std::time::{Duration, Instant};

use crate::domain::{ConnectionId, Identity};

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Authenticated,
    Active,
    Closed,
}

/// Per-connection state, owned by the connection's socket loop
#[derive(Debug)]
pub struct SessionState {
    pub connection_id: ConnectionId,
    pub identity: Option<Identity>,
    pub phase: ConnectionPhase,
    pub last_seen: Instant,
}

impl SessionState {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            identity: None,
            phase: ConnectionPhase::Connecting,
            last_seen: Instant::now(),
        }
    }

    pub fn authenticate(&mut self, identity: Identity) {
        if self.phase == ConnectionPhase::Connecting {
            self.identity = Some(identity);
            self.phase = ConnectionPhase::Authenticated;
        }
    }

    pub fn activate(&mut self) {
        if self.phase == ConnectionPhase::Authenticated {
            self.phase = ConnectionPhase::Active;
            self.touch();
        }
    }

    /// Move to `Closed`, returning the phase the session was in.
    pub fn close(&mut self) -> ConnectionPhase {
        std::mem::replace(&mut self.phase, ConnectionPhase::Closed)
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_alive(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() < timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_advance_in_order() {
        let mut session = SessionState::new(ConnectionId::new());

        session.activate();
        assert_eq!(session.phase, ConnectionPhase::Connecting);

        session.authenticate(Identity::new("u1"));
        assert_eq!(session.phase, ConnectionPhase::Authenticated);
        session.activate();
        assert_eq!(session.phase, ConnectionPhase::Active);

        assert_eq!(session.close(), ConnectionPhase::Active);
        assert_eq!(session.close(), ConnectionPhase::Closed);

        session.authenticate(Identity::new("u2"));
        assert_eq!(session.phase, ConnectionPhase::Closed);
        assert_eq!(session.identity, Some(Identity::new("u1")));
    }

    #[test]
    fn test_idle_detection() {
        let mut session = SessionState::new(ConnectionId::new());
        assert!(!session.is_alive(Duration::ZERO));
        assert!(session.is_alive(Duration::from_secs(60)));

        session.touch();
        assert!(session.is_alive(Duration::from_secs(60)));
    }
}
