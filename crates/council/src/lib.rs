//! Advisor council — multi-advisor debate and consensus over a watched
//! development session.
//!
//! This library coordinates several independent "advisor" agents (remote
//! LLM endpoints) to jointly evaluate a task and converge on an
//! approve/reject decision, then feeds that guidance back into an external
//! development session.
//!
//! # Components
//!
//! - [`advisor`]: the uniform capability (`chat` over role-tagged
//!   messages) with per-provider adapters behind one trait.
//! - [`registry`]: the configured roster and its availability filter.
//! - [`debate`]: the multi-round opinion/deliberation/vote protocol, the
//!   reject-biased vote interpreter, and the tally into a [`Decision`].
//! - [`session`]: the narrow boundary to the external session (list, read
//!   history, post message).
//! - [`watcher`]: the polling orchestration loop that triggers debates on
//!   turn completion and relays guidance.
//! - [`config`]: the TOML settings surface.
//!
//! "Consensus" here is a weighted majority vote among a handful of
//! cooperating, trusted, unreliable responders — not Byzantine agreement.

pub mod advisor;
pub mod config;
pub mod debate;
pub mod error;
pub mod registry;
pub mod session;
pub mod watcher;

pub use advisor::{build_advisor, Advisor, AdvisorConfig, Message, ProviderKind, Role};
pub use config::Settings;
pub use debate::{DebateConfig, DebateEngine, Decision, Task, Vote};
pub use error::{AdvisorError, CouncilError};
pub use registry::AdvisorRegistry;
pub use session::{HttpSessionClient, MessagePart, SessionClient, SessionInfo, SessionMessage};
pub use watcher::{SessionWatcher, WatcherConfig, WatcherPhase, WatcherSet};
