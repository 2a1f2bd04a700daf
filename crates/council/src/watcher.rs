//! Orchestration loop: watch an external session, debate, feed back guidance.
//!
//! Each watched session gets one [`SessionWatcher`], a polling state machine
//! (`Stopped → Starting → Running`) driven by a cancellable interval task.
//! A tick inspects the session history; when the external agent has just
//! finished a turn, the watcher derives a task from the latest user message,
//! runs a council debate, and posts either structured guidance or a canned
//! fallback message back into the session. Every failure is contained to
//! its tick — the loop itself never crashes.
//!
//! [`WatcherSet`] owns the running watchers; add/remove is guarded so a
//! removal cancels the watcher and joins it rather than racing a mid-flight
//! tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::IndexedRandom;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::advisor::Role;
use crate::debate::{DebateConfig, DebateEngine, Decision, Task};
use crate::error::CouncilError;
use crate::registry::AdvisorRegistry;
use crate::session::{SessionClient, SessionMessage};

/// Goal used when the history has no user message to derive a task from.
const PLACEHOLDER_GOAL: &str = "Review the current project state and suggest improvements";

/// How many trailing messages are quoted as task context.
const CONTEXT_WINDOW: usize = 6;

/// Tunables for one watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Interval between polls.
    pub poll_interval: Duration,
    /// Hold-off after posting guidance, so the injected message cannot
    /// immediately re-trigger a debate.
    pub cooldown: Duration,
    /// How long Starting may wait for attachment confirmation before
    /// optimistically entering Running.
    pub start_timeout: Duration,
    /// When enabled and the council approves, synthesize guidance; when
    /// disabled (or on rejection) fall back to the canned pool.
    pub autonomous_guidance: bool,
    /// Canned messages sent when autonomous guidance does not apply.
    pub fallback_messages: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            cooldown: Duration::from_secs(10),
            start_timeout: Duration::from_secs(30),
            autonomous_guidance: true,
            fallback_messages: Vec::new(),
        }
    }
}

/// Lifecycle phase of a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherPhase {
    Stopped,
    Starting,
    Running,
}

impl std::fmt::Display for WatcherPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Polling state machine for one watched external session.
pub struct SessionWatcher {
    id: String,
    /// External session id; None until discovered.
    target: Option<String>,
    client: Arc<dyn SessionClient>,
    registry: Arc<AdvisorRegistry>,
    engine: DebateEngine,
    config: WatcherConfig,
    phase: WatcherPhase,
    started_at: Option<Instant>,
    /// Id of the newest assistant message that already triggered a debate.
    last_processed: Option<String>,
    /// Earliest instant the next debate may trigger.
    cooldown_until: Option<Instant>,
    debate_in_progress: bool,
}

impl SessionWatcher {
    pub fn new(
        id: impl Into<String>,
        target: Option<String>,
        client: Arc<dyn SessionClient>,
        registry: Arc<AdvisorRegistry>,
        engine: DebateEngine,
        config: WatcherConfig,
    ) -> Self {
        Self {
            id: id.into(),
            target,
            client,
            registry,
            engine,
            config,
            phase: WatcherPhase::Stopped,
            started_at: None,
            last_processed: None,
            cooldown_until: None,
            debate_in_progress: false,
        }
    }

    pub fn phase(&self) -> WatcherPhase {
        self.phase
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Drive the watcher until cancelled. Tick errors are logged and the
    /// loop continues; cancellation waits for the current tick to finish,
    /// so a removal never observes a half-applied state.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(watcher = %self.id, "watcher started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.phase = WatcherPhase::Stopped;
                    info!(watcher = %self.id, "watcher stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(watcher = %self.id, error = %e, "tick failed; retrying next interval");
                    }
                }
            }
        }
    }

    /// One poll cycle. Public so tests (and one-shot CLI runs) can drive
    /// the state machine without real timers.
    pub async fn tick(&mut self) -> Result<(), CouncilError> {
        if self.phase == WatcherPhase::Stopped {
            self.phase = WatcherPhase::Starting;
            self.started_at = Some(Instant::now());
        }

        if self.phase == WatcherPhase::Starting {
            self.try_attach().await;
            if self.phase != WatcherPhase::Running {
                return Ok(());
            }
        }

        self.inspect().await
    }

    /// Attach to the target session, discovering one if none was configured.
    /// After the start timeout, promote optimistically — inspection failures
    /// keep retrying on later ticks without ever failing the loop.
    async fn try_attach(&mut self) {
        if self.target.is_none() {
            match self.client.list_sessions().await {
                Ok(sessions) => match sessions.first() {
                    Some(session) => {
                        info!(watcher = %self.id, session = %session.id, title = %session.title, "attached to session");
                        self.target = Some(session.id.clone());
                    }
                    None => debug!(watcher = %self.id, "no sessions to attach to yet"),
                },
                Err(e) => warn!(watcher = %self.id, error = %e, "session discovery failed; will retry"),
            }
        }

        if self.target.is_some() {
            self.phase = WatcherPhase::Running;
        } else if self
            .started_at
            .is_some_and(|t| t.elapsed() >= self.config.start_timeout)
        {
            if self.phase != WatcherPhase::Running {
                info!(watcher = %self.id, "attachment unconfirmed; entering running optimistically");
            }
            self.phase = WatcherPhase::Running;
        }
    }

    /// The Running-phase body of a tick.
    async fn inspect(&mut self) -> Result<(), CouncilError> {
        if self
            .cooldown_until
            .is_some_and(|deadline| Instant::now() < deadline)
        {
            debug!(watcher = %self.id, "in cooldown; skipping tick");
            return Ok(());
        }

        // Overlapping ticks must not launch concurrent debates over the
        // same session.
        if self.debate_in_progress {
            debug!(watcher = %self.id, "debate already in flight; skipping tick");
            return Ok(());
        }

        let session_id = match self.target.clone() {
            Some(id) => id,
            None => {
                // Promoted optimistically before discovery succeeded.
                self.try_attach().await;
                match self.target.clone() {
                    Some(id) => id,
                    None => return Ok(()),
                }
            }
        };

        let history = self.client.get_messages(&session_id).await?;
        let Some(newest) = history.last() else {
            return Ok(());
        };
        if newest.role != Role::Assistant {
            return Ok(());
        }
        if self.last_processed.as_deref() == Some(newest.id.as_str()) {
            return Ok(());
        }

        // Mark the turn processed before debating: even a failed post must
        // not re-trigger a debate for the same turn.
        self.last_processed = Some(newest.id.clone());

        let task = derive_task(&history);
        let roster = self.registry.available();

        self.debate_in_progress = true;
        let outcome = self.engine.run(&roster, &task).await;
        self.debate_in_progress = false;

        let decision = match outcome {
            Ok(decision) => decision,
            Err(CouncilError::NoAdvisorsAvailable) => {
                warn!(watcher = %self.id, "no advisors available; skipping this turn");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match self.compose_guidance(&decision) {
            Some(text) => {
                self.client.post_message(&session_id, &text).await?;
                self.cooldown_until = Some(Instant::now() + self.config.cooldown);
                info!(
                    watcher = %self.id,
                    approved = decision.approved,
                    consensus = decision.consensus,
                    "guidance posted"
                );
            }
            None => {
                debug!(watcher = %self.id, approved = decision.approved, "no guidance to send; skipping");
            }
        }

        Ok(())
    }

    /// Decide the outbound text: structured guidance on an autonomous
    /// approval, otherwise a random pick from the fallback pool (if any).
    fn compose_guidance(&self, decision: &Decision) -> Option<String> {
        if self.config.autonomous_guidance && decision.approved {
            let mut text = String::from("## Advisor Council Guidance\n\n");
            text.push_str(&format!(
                "**Verdict:** approved ({:.0}% consensus)\n\n",
                decision.consensus * 100.0
            ));
            text.push_str("### Council feedback\n\n");
            text.push_str(&decision.reasoning);
            text.push_str(
                "\n### Suggested next steps\n\n\
                 - Address the council feedback above before moving on.\n\
                 - Continue with the current approach; the council sees no blocking risk.\n",
            );
            return Some(text);
        }
        self.config
            .fallback_messages
            .choose(&mut rand::rng())
            .cloned()
    }
}

/// Derive a debate task from the session history: the most recent user
/// message becomes the goal, the trailing window becomes the context.
fn derive_task(history: &[SessionMessage]) -> Task {
    let goal = history
        .iter()
        .rev()
        .filter(|m| m.role == Role::User)
        .map(|m| m.text())
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_GOAL.to_string());

    let context = history
        .iter()
        .rev()
        .take(CONTEXT_WINDOW)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|m| format!("[{}] {}", m.role, m.text()))
        .collect::<Vec<_>>()
        .join("\n");

    Task::new(goal, context, vec![])
}

struct WatcherHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Owns the running watchers. All mutation goes through the async mutex,
/// so adding and removing sessions never races a watcher mid-tick.
pub struct WatcherSet {
    client: Arc<dyn SessionClient>,
    registry: Arc<AdvisorRegistry>,
    debate: DebateConfig,
    config: WatcherConfig,
    handles: tokio::sync::Mutex<HashMap<String, WatcherHandle>>,
}

impl WatcherSet {
    pub fn new(
        client: Arc<dyn SessionClient>,
        registry: Arc<AdvisorRegistry>,
        debate: DebateConfig,
        config: WatcherConfig,
    ) -> Self {
        Self {
            client,
            registry,
            debate,
            config,
            handles: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Start watching. A second watch for the same id is ignored.
    pub async fn watch(&self, id: &str, target: Option<String>) {
        let mut handles = self.handles.lock().await;
        if handles.contains_key(id) {
            warn!(watcher = id, "already watching; ignoring duplicate watch");
            return;
        }

        let watcher = SessionWatcher::new(
            id,
            target,
            self.client.clone(),
            self.registry.clone(),
            DebateEngine::new(self.debate.clone()),
            self.config.clone(),
        );
        let cancel = CancellationToken::new();
        let join = tokio::spawn(watcher.run(cancel.clone()));
        handles.insert(id.to_string(), WatcherHandle { cancel, join });
    }

    /// Stop watching and wait for the watcher's current tick to finish.
    /// Returns whether a watcher existed.
    pub async fn unwatch(&self, id: &str) -> bool {
        let handle = self.handles.lock().await.remove(id);
        match handle {
            Some(handle) => {
                handle.cancel.cancel();
                let _ = handle.join.await;
                true
            }
            None => false,
        }
    }

    /// Ids of currently watched sessions.
    pub async fn watched(&self) -> Vec<String> {
        self.handles.lock().await.keys().cloned().collect()
    }

    /// Cancel and join every watcher.
    pub async fn shutdown(&self) {
        let handles: Vec<(String, WatcherHandle)> =
            self.handles.lock().await.drain().collect();
        for (id, handle) in handles {
            handle.cancel.cancel();
            let _ = handle.join.await;
            debug!(watcher = %id, "watcher joined");
        }
    }
}
