//! Handshake state machine
//!
//! `Uninitialized -> Ready -> Closed`. Only the server loop holds a mutable
//! session; the dispatcher reads it and hands back a [`Transition`] to apply.

use tracing::{info, warn};

use crate::protocol::{Implementation, InitializeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Closed => "closed",
        }
    }
}

/// A state change requested by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Ready {
        result: InitializeResult,
        client: Option<Implementation>,
    },
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    negotiated: Option<InitializeResult>,
    client: Option<Implementation>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            negotiated: None,
            client: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Result of the first successful handshake, returned again on retries.
    pub fn negotiated(&self) -> Option<&InitializeResult> {
        self.negotiated.as_ref()
    }

    pub fn client(&self) -> Option<&Implementation> {
        self.client.as_ref()
    }

    pub(crate) fn apply(&mut self, transition: Transition) {
        match (self.state, transition) {
            (SessionState::Uninitialized, Transition::Ready { result, client }) => {
                info!(
                    client = client.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
                    protocol_version = %result.protocol_version,
                    "Session ready"
                );
                self.negotiated = Some(result);
                self.client = client;
                self.state = SessionState::Ready;
            }
            // A retried handshake keeps the original negotiation.
            (SessionState::Ready, Transition::Ready { .. }) => {}
            (SessionState::Closed, transition) => {
                warn!(?transition, "Ignoring transition on closed session");
            }
        }
    }

    pub(crate) fn close(&mut self) {
        if self.state != SessionState::Closed {
            info!(from = self.state.as_str(), "Session closed");
            self.state = SessionState::Closed;
        }
    }
}
