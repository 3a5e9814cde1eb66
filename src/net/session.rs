//! Client session tracking and claiming.
//!
//! # Responsibilities
//! - Identify clients across requests
//! - Record which version controls each session
//! - Hand every open session to a newly activated version
//!
//! # Design Decisions
//! - A session opened while no instance is active stays uncontrolled until a claim
//! - Every request refreshes its session; sessions idle past the TTL are dropped,
//!   which is how a controlling version loses its clients
//! - Claiming is all-or-nothing per call and never blocks request handling
//! - A closed registry refuses claims so shutdown cannot race an activation

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::HeaderMap;
use dashmap::DashMap;

use crate::error::ClaimError;

/// Header a client may send to keep a stable session across connections.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Host registry of connected client sessions.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Make `version` the controller of every open session.
    ///
    /// Returns the number of sessions claimed.
    async fn claim_all(&self, version: &str) -> Result<usize, ClaimError>;
}

/// Identifier of one client session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Session of a request: the client-id header, else the peer IP.
    pub fn from_request(headers: &HeaderMap, peer: SocketAddr) -> Self {
        headers
            .get(CLIENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(format!("client:{}", v)))
            .unwrap_or_else(|| Self(format!("peer:{}", peer.ip())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct Session {
    /// `None` = uncontrolled.
    controller: Option<String>,
    last_seen: Instant,
}

/// In-process session registry.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Session>,
    closed: AtomicBool,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the controller of `id`, opening the session if it is new.
    ///
    /// New sessions are controlled by `active`, when there is one. An
    /// existing session is marked as seen now.
    pub fn open(&self, id: SessionId, active: Option<&str>) -> Option<String> {
        let now = Instant::now();
        let mut session = self.sessions.entry(id).or_insert_with(|| Session {
            controller: active.map(str::to_string),
            last_seen: now,
        });
        session.last_seen = now;
        session.controller.clone()
    }

    pub fn controller(&self, id: &SessionId) -> Option<String> {
        self.sessions.get(id).and_then(|r| r.controller.clone())
    }

    /// Drop every session not seen for `idle` or longer.
    ///
    /// Returns the number of sessions removed.
    pub fn expire_idle(&self, idle: Duration) -> usize {
        let mut expired = 0;
        self.sessions.retain(|_, session| {
            let keep = session.last_seen.elapsed() < idle;
            if !keep {
                expired += 1;
            }
            keep
        });
        if expired > 0 {
            tracing::debug!(expired, remaining = self.sessions.len(), "Expired idle sessions");
        }
        expired
    }

    pub fn close_session(&self, id: &SessionId) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Refuse further claims.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions controlled by `version`.
    pub fn controlled_by(&self, version: &str) -> usize {
        self.sessions
            .iter()
            .filter(|r| r.controller.as_deref() == Some(version))
            .count()
    }
}

#[async_trait]
impl ClientRegistry for SessionRegistry {
    async fn claim_all(&self, version: &str) -> Result<usize, ClaimError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClaimError("session registry is closed".into()));
        }

        let mut claimed = 0;
        for mut session in self.sessions.iter_mut() {
            session.controller = Some(version.to_string());
            claimed += 1;
        }
        tracing::info!(version = %version, sessions = claimed, "Claimed client sessions");
        Ok(claimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "10.0.0.7:51234".parse().unwrap()
    }

    #[test]
    fn test_session_id_from_header_or_peer() {
        let mut headers = HeaderMap::new();
        assert_eq!(SessionId::from_request(&headers, peer()).as_str(), "peer:10.0.0.7");

        headers.insert(CLIENT_ID_HEADER, HeaderValue::from_static("tab-1"));
        assert_eq!(SessionId::from_request(&headers, peer()).as_str(), "client:tab-1");
    }

    #[test]
    fn test_open_records_controller_once() {
        let registry = SessionRegistry::new();
        let early = SessionId::new("early");
        let late = SessionId::new("late");

        assert_eq!(registry.open(early.clone(), None), None);
        assert_eq!(registry.open(late.clone(), Some("v1")), Some("v1".to_string()));
        // Reopening does not change the controller.
        assert_eq!(registry.open(early.clone(), Some("v1")), None);
        assert_eq!(registry.controlled_by("v1"), 1);
    }

    #[tokio::test]
    async fn test_claim_all_controls_every_session() {
        let registry = SessionRegistry::new();
        registry.open(SessionId::new("a"), None);
        registry.open(SessionId::new("b"), Some("v1"));

        assert_eq!(registry.claim_all("v2").await.unwrap(), 2);
        assert_eq!(registry.controlled_by("v2"), 2);
        assert_eq!(registry.controller(&SessionId::new("a")), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_closed_registry_refuses_claim() {
        let registry = SessionRegistry::new();
        registry.close();
        assert!(registry.claim_all("v2").await.is_err());
    }

    #[test]
    fn test_idle_sessions_expire() {
        let registry = SessionRegistry::new();
        registry.open(SessionId::new("a"), Some("v1"));
        registry.open(SessionId::new("b"), None);

        assert_eq!(registry.expire_idle(Duration::from_secs(60)), 0);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.expire_idle(Duration::ZERO), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.controlled_by("v1"), 0);
    }
}
