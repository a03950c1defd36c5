//! Request dispatcher: one USSD round trip from raw fields to a directive.
//!
//! Order of work per request, all under the session's lock:
//! decode → get-or-create session → stage engine → save or delete.
//! Registry I/O happens inside the engine while only the per-session lock
//! is held; the session map itself is only locked for single operations.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use shamba_core::{Directive, PendingRegistration, Registry, Session, Stage, decode};
use shamba_store::SessionStore;
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::{Disposition, StageEngine};

/// The fields the core needs from an inbound call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UssdRequest {
    pub session_id: String,
    pub end_user_id: String,
    /// Cumulative `*`-delimited input; empty on the first request
    #[serde(default)]
    pub text: String,
}

/// Operator view of one live session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub end_user_id: String,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Milliseconds since the session was created
    pub age_ms: i64,
    /// Milliseconds since the last request
    pub idle_ms: i64,
    pub pending_data: PendingRegistration,
}

impl SessionView {
    fn of(session: Session, now: DateTime<Utc>) -> Self {
        Self {
            age_ms: session.age_ms(now),
            idle_ms: session.idle_ms(now),
            id: session.session_id,
            end_user_id: session.end_user_id,
            stage: session.stage,
            created_at: session.created_at,
            last_activity_at: session.last_activity_at,
            pending_data: session.pending,
        }
    }
}

/// Counts for the operator surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherStats {
    pub sessions: usize,
    pub registrations: usize,
}

/// Ties the session store, registry and stage engine together.
pub struct Dispatcher {
    store: Arc<SessionStore>,
    registry: Arc<dyn Registry>,
    engine: StageEngine,
}

impl Dispatcher {
    pub fn new(store: Arc<SessionStore>, registry: Arc<dyn Registry>, timezone: FixedOffset) -> Self {
        Self {
            engine: StageEngine::new(registry.clone(), timezone),
            store,
            registry,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    /// Handle one round trip and commit the resulting session state.
    pub async fn dispatch(&self, request: &UssdRequest) -> Directive {
        let _guard = self.store.lock(&request.session_id).await;

        let input = decode(&request.text);
        let mut session = self.store.get_or_create(&request.session_id, &request.end_user_id);
        let from = session.stage;

        let outcome = self.engine.advance(&mut session, &input, &request.text).await;

        match outcome.disposition {
            Disposition::Save => {
                debug!(
                    session_id = %request.session_id,
                    level = input.level,
                    from = %from,
                    to = %session.stage,
                    "Session advanced"
                );
                self.store.save(session);
            }
            Disposition::Delete => {
                self.store.delete(&request.session_id);
                info!(
                    session_id = %request.session_id,
                    level = input.level,
                    last_stage = %from,
                    "Session closed"
                );
            }
        }

        outcome.directive
    }

    /// Every live session, oldest first.
    pub fn sessions(&self) -> Vec<SessionView> {
        let now = Utc::now();
        let mut sessions = self.store.snapshot();
        sessions.sort_by_key(|s| s.created_at);
        sessions.into_iter().map(|s| SessionView::of(s, now)).collect()
    }

    pub async fn stats(&self) -> shamba_core::Result<DispatcherStats> {
        Ok(DispatcherStats {
            sessions: self.store.len(),
            registrations: self.registry.count().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shamba_core::DirectiveKind;
    use shamba_store::InMemoryRegistry;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(SessionStore::new()),
            Arc::new(InMemoryRegistry::new()),
            FixedOffset::east_opt(3 * 3600).unwrap(),
        )
    }

    fn request(session_id: &str, text: &str) -> UssdRequest {
        UssdRequest {
            session_id: session_id.into(),
            end_user_id: "+254722000111".into(),
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn continue_directives_keep_the_session() {
        let d = dispatcher();
        let directive = d.dispatch(&request("s1", "")).await;
        assert_eq!(directive.kind, DirectiveKind::Continue);
        assert_eq!(d.store().len(), 1);

        d.dispatch(&request("s1", "1")).await;
        assert_eq!(d.store().get("s1").unwrap().stage, Stage::EnterName);
    }

    #[tokio::test]
    async fn terminal_directives_delete_the_session() {
        let d = dispatcher();
        d.dispatch(&request("s1", "")).await;
        let directive = d.dispatch(&request("s1", "3")).await;
        assert!(directive.is_terminal());
        assert!(d.store().get("s1").is_none());
    }

    #[tokio::test]
    async fn full_registration_updates_stats() {
        let d = dispatcher();
        for text in ["", "1", "1*Jane Wanjiru", "1*Jane Wanjiru*1", "1*Jane Wanjiru*1*1", "1*Jane Wanjiru*1*1*3.5"] {
            let directive = d.dispatch(&request("s1", text)).await;
            assert_eq!(directive.kind, DirectiveKind::Continue);
        }
        let directive = d.dispatch(&request("s1", "1*Jane Wanjiru*1*1*3.5*1")).await;
        assert!(directive.render().starts_with("END Registration successful"));

        let stats = d.stats().await.unwrap();
        assert_eq!(stats, DispatcherStats { sessions: 0, registrations: 1 });
    }

    #[tokio::test]
    async fn sessions_view_exposes_pending_data() {
        let d = dispatcher();
        d.dispatch(&request("s1", "")).await;
        d.dispatch(&request("s1", "1")).await;
        d.dispatch(&request("s1", "1*Jane")).await;

        let views = d.sessions();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, "s1");
        assert_eq!(views[0].stage, Stage::SelectCounty);
        assert_eq!(views[0].pending_data.name.as_deref(), Some("Jane"));

        let json = serde_json::to_value(&views[0]).unwrap();
        assert_eq!(json["endUserId"], "+254722000111");
        assert_eq!(json["stage"], "SELECT_COUNTY");
        assert_eq!(json["pendingData"]["name"], "Jane");
        assert!(json["ageMs"].is_i64());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_for_one_session_are_serialized() {
        let d = Arc::new(dispatcher());
        d.dispatch(&request("s1", "")).await;
        d.dispatch(&request("s1", "1")).await;

        // Two copies of the same turn race; exactly one may consume the name
        // stage, the other then sees SELECT_COUNTY at level 2 and ends.
        let a = {
            let d = d.clone();
            tokio::spawn(async move { d.dispatch(&request("s1", "1*Jane")).await })
        };
        let b = {
            let d = d.clone();
            tokio::spawn(async move { d.dispatch(&request("s1", "1*Jane")).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        let continued = [&a, &b].iter().filter(|d| !d.is_terminal()).count();
        assert_eq!(continued, 1);
        assert!(d.store().get("s1").is_none());
    }

    #[tokio::test]
    async fn different_sessions_are_independent() {
        let d = dispatcher();
        d.dispatch(&request("a", "")).await;
        d.dispatch(&request("b", "")).await;
        d.dispatch(&request("a", "1")).await;

        assert_eq!(d.store().get("a").unwrap().stage, Stage::EnterName);
        assert_eq!(d.store().get("b").unwrap().stage, Stage::MainMenu);
    }
}
