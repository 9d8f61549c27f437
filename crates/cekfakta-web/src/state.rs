//! Shared application state and the per-tab session registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cekfakta_core::answer::invoke_agent;
use cekfakta_core::{Bootstrapper, ChatMessage, Session, TurnError, TurnState};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::render::Pages;

pub type SharedSession = Arc<Mutex<Session>>;

/// State handed to every handler.
pub struct AppState {
    pub bootstrapper: Bootstrapper,
    pub sessions: Arc<SessionRegistry>,
    pub pages: Pages,
}

impl AppState {
    pub fn new(config: &Config, bootstrapper: Bootstrapper) -> anyhow::Result<Self> {
        Ok(Self {
            bootstrapper,
            sessions: Arc::new(SessionRegistry::new(config.session_ttl)),
            pages: Pages::new()?,
        })
    }
}

struct Slot {
    session: SharedSession,
    last_seen: Instant,
}

/// Live sessions keyed by id. Each session sits behind its own lock so one
/// tab waiting on the model never blocks another.
pub struct SessionRegistry {
    slots: RwLock<HashMap<Uuid, Slot>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn insert(&self, session: Session) -> Uuid {
        let id = Uuid::new_v4();
        let slot = Slot {
            session: Arc::new(Mutex::new(session)),
            last_seen: Instant::now(),
        };
        self.slots.write().await.insert(id, slot);
        info!(session_id = %id, "session created");
        id
    }

    /// Look a session up and mark it as recently used.
    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        let mut slots = self.slots.write().await;
        let slot = slots.get_mut(id)?;
        slot.last_seen = Instant::now();
        Some(Arc::clone(&slot.session))
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        let removed = self.slots.write().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "session closed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Drop sessions idle for at least the TTL as of `now`. Sessions that
    /// are locked or waiting for an answer are kept.
    pub async fn evict_idle(&self, now: Instant) -> usize {
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|id, slot| {
            if now.saturating_duration_since(slot.last_seen) < self.ttl {
                return true;
            }
            let busy = match slot.session.try_lock() {
                Ok(session) => session.state() == TurnState::AwaitingResponse,
                Err(_) => true,
            };
            if !busy {
                debug!(session_id = %id, "evicting idle session");
            }
            busy
        });
        before - slots.len()
    }

    /// Run [`evict_idle`](Self::evict_idle) periodically until the registry
    /// is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let period = (self.ttl / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else { break };
                let evicted = registry.evict_idle(Instant::now()).await;
                if evicted > 0 {
                    let remaining = registry.len().await;
                    info!(evicted, remaining, "swept idle sessions");
                }
            }
        })
    }
}

/// One turn against a shared session. The lock is released while the agent
/// runs, so a concurrent submit sees [`TurnError::Busy`] instead of queueing.
///
/// The agent call and the answer bookkeeping run in their own task, so the
/// turn still completes when the request that started it is dropped.
pub async fn run_turn(session: &SharedSession, text: &str) -> Result<(ChatMessage, usize), TurnError> {
    let (agent, messages) = {
        let mut guard = session.lock().await;
        let messages = guard.begin_turn(text)?;
        (guard.agent(), messages)
    };

    let shared = Arc::clone(session);
    let task = tokio::spawn(async move {
        let outcome = invoke_agent(agent.as_ref(), messages).await;
        let mut guard = shared.lock().await;
        let reply = guard.complete_turn(outcome).clone();
        (reply, guard.transcript().len())
    });

    match task.await {
        Ok(done) => Ok(done),
        Err(e) => {
            warn!(error = %e, "turn task failed");
            // The task died before recording an answer
            let mut guard = session.lock().await;
            let reply = guard.complete_turn(Err(format!("An error occurred: {}", e))).clone();
            Ok((reply, guard.transcript().len()))
        }
    }
}
