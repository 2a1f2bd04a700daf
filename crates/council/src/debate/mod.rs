//! Debate-and-consensus protocol.
//!
//! # Protocol flow
//!
//! ```text
//! Roster → Opinion (round 1) → Deliberation (rounds 2..R) → FinalVote → Tally
//!    │                                                                    │
//!    └─ empty → NoAdvisorsAvailable                          Decision ────┘
//! ```
//!
//! Rounds are sequential; advisor calls within a round run concurrently
//! and join at a round barrier. The vote interpreter turns each final
//! response into a verdict with a reject-biased default.

pub mod engine;
pub mod interpreter;
pub mod transcript;

pub use engine::{DebateConfig, DebateEngine, Decision, Vote};
pub use interpreter::interpret;
pub use transcript::{Task, Transcript, TranscriptEntry};
