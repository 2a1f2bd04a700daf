//! Debate engine — drives the multi-round opinion/deliberation/vote protocol.
//!
//! One debate runs strictly sequentially in rounds; within a round every
//! advisor is queried concurrently and the round joins before the next one
//! starts. Transcript order is roster order regardless of completion order,
//! so identical inputs produce identical transcripts.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::interpreter;
use super::transcript::{excerpt, Task, Transcript};
use crate::advisor::{Advisor, Message};
use crate::error::{AdvisorError, CouncilError};

/// Substitute opinion for an advisor whose call failed mid-round.
const FAILED_OPINION: &str = "(advisor did not respond this round)";

/// Fixed rationale for an advisor whose final-vote call failed.
const FAILED_VOTE_RATIONALE: &str = "failed to vote";

/// Rationale excerpt length in the synthesized decision summary.
const RATIONALE_EXCERPT_CHARS: usize = 200;

/// Tunables for one debate. Fixed at debate start, never changed mid-debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    /// Opinion + deliberation rounds before the final vote (minimum 1).
    pub rounds: u32,
    /// Consensus ratio required for approval.
    pub threshold: f64,
    /// Per-advisor-call timeout.
    pub call_timeout: Duration,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            rounds: 2,
            threshold: 0.5,
            call_timeout: Duration::from_secs(120),
        }
    }
}

/// One advisor's final verdict. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub advisor: String,
    pub approved: bool,
    /// Raw rationale text from the advisor (or the failure sentinel).
    pub rationale: String,
}

/// Terminal result of one debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub approved: bool,
    /// Fraction of cast votes that approved, in [0, 1].
    pub consensus: f64,
    /// Exactly one vote per advisor available at debate start, roster order.
    pub votes: Vec<Vote>,
    /// Synthesized summary: counts plus per-advisor rationale excerpts.
    pub reasoning: String,
}

impl Decision {
    pub fn approvals(&self) -> usize {
        self.votes.iter().filter(|v| v.approved).count()
    }
}

/// Runs the N-round debate protocol over a roster snapshot.
#[derive(Debug, Clone)]
pub struct DebateEngine {
    config: DebateConfig,
}

impl DebateEngine {
    pub fn new(config: DebateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Run a complete debate over `roster` and produce a Decision.
    ///
    /// Individual advisor failures degrade to placeholder opinions or
    /// default-reject votes; only an empty roster fails the debate.
    pub async fn run(
        &self,
        roster: &[Arc<dyn Advisor>],
        task: &Task,
    ) -> Result<Decision, CouncilError> {
        if roster.is_empty() {
            return Err(CouncilError::NoAdvisorsAvailable);
        }

        info!(
            task = %task.id,
            advisors = roster.len(),
            rounds = self.config.rounds,
            "debate started"
        );

        let mut transcript = Transcript::new(task);

        // Round 1: independent opinions on the bare task.
        let prompt = transcript.opinion_prompt();
        let opinions = self.query_round(roster, &prompt).await;
        for (advisor, text) in roster.iter().zip(opinions) {
            transcript.record(1, advisor.name(), text);
        }

        // Rounds 2..R: deliberation over the accumulated transcript.
        // Results append only after the join, so same-round peers stay
        // invisible to each other.
        for round in 2..=self.config.rounds.max(1) {
            let prompt = transcript.deliberation_prompt(round);
            let refinements = self.query_round(roster, &prompt).await;
            for (advisor, text) in roster.iter().zip(refinements) {
                transcript.record(round, advisor.name(), text);
            }
        }

        // Final vote over the full transcript.
        let prompt = transcript.final_vote_prompt();
        let votes = self.collect_votes(roster, &prompt).await;

        let decision = self.tally(votes);
        info!(
            task = %task.id,
            approved = decision.approved,
            consensus = decision.consensus,
            "debate complete"
        );
        Ok(decision)
    }

    /// Ask every advisor the same prompt concurrently; join before returning.
    ///
    /// `join_all` preserves input order, so the result vector aligns with
    /// the roster and the transcript stays deterministic.
    async fn query_round(&self, roster: &[Arc<dyn Advisor>], prompt: &str) -> Vec<String> {
        let calls = roster.iter().map(|advisor| {
            let messages = vec![Message::user(prompt.to_string())];
            async move {
                match self.call_advisor(advisor.as_ref(), &messages).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(advisor = advisor.name(), error = %e, "advisor call failed");
                        FAILED_OPINION.to_string()
                    }
                }
            }
        });
        join_all(calls).await
    }

    async fn collect_votes(&self, roster: &[Arc<dyn Advisor>], prompt: &str) -> Vec<Vote> {
        let calls = roster.iter().map(|advisor| {
            let messages = vec![Message::user(prompt.to_string())];
            async move {
                match self.call_advisor(advisor.as_ref(), &messages).await {
                    Ok(text) => {
                        let approved = interpreter::interpret(&text);
                        debug!(advisor = advisor.name(), approved, "vote cast");
                        Vote {
                            advisor: advisor.name().to_string(),
                            approved,
                            rationale: text.trim().to_string(),
                        }
                    }
                    Err(e) => {
                        warn!(advisor = advisor.name(), error = %e, "final vote call failed");
                        Vote {
                            advisor: advisor.name().to_string(),
                            approved: false,
                            rationale: FAILED_VOTE_RATIONALE.to_string(),
                        }
                    }
                }
            }
        });
        join_all(calls).await
    }

    async fn call_advisor(
        &self,
        advisor: &dyn Advisor,
        messages: &[Message],
    ) -> Result<String, AdvisorError> {
        match tokio::time::timeout(self.config.call_timeout, advisor.chat(messages)).await {
            Ok(result) => result,
            Err(_) => Err(AdvisorError::Timeout {
                advisor: advisor.name().to_string(),
                timeout: self.config.call_timeout,
            }),
        }
    }

    /// Compute the consensus ratio over cast votes and synthesize reasoning.
    fn tally(&self, votes: Vec<Vote>) -> Decision {
        let total = votes.len();
        let approvals = votes.iter().filter(|v| v.approved).count();
        // Denominator is the cast-vote count, never the configured roster.
        let consensus = approvals as f64 / total as f64;
        let approved = consensus >= self.config.threshold;

        let mut reasoning = format!(
            "Council {} with {}/{} approvals ({:.0}% consensus, threshold {:.0}%).\n",
            if approved { "approved" } else { "rejected" },
            approvals,
            total,
            consensus * 100.0,
            self.config.threshold * 100.0,
        );
        for vote in &votes {
            reasoning.push_str(&format!(
                "- {} [{}]: {}\n",
                vote.advisor,
                if vote.approved { "APPROVE" } else { "REJECT" },
                excerpt(&vote.rationale, RATIONALE_EXCERPT_CHARS),
            ));
        }

        Decision {
            approved,
            consensus,
            votes,
            reasoning,
        }
    }
}

impl Default for DebateEngine {
    fn default() -> Self {
        Self::new(DebateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Advisor that replays a fixed script of responses, one per call.
    struct ScriptedAdvisor {
        name: String,
        script: Mutex<Vec<Result<String, String>>>,
    }

    impl ScriptedAdvisor {
        fn new(name: &str, script: Vec<Result<&str, &str>>) -> Arc<dyn Advisor> {
            Arc::new(Self {
                name: name.to_string(),
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
            })
        }

        /// Same response for every round including the final vote.
        fn repeating(name: &str, response: &str) -> Arc<dyn Advisor> {
            Self::new(name, vec![Ok(response); 8])
        }

        fn failing(name: &str) -> Arc<dyn Advisor> {
            Self::new(name, vec![Err("connection refused"); 8])
        }
    }

    #[async_trait]
    impl Advisor for ScriptedAdvisor {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn chat(&self, _messages: &[Message]) -> Result<String, AdvisorError> {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(AdvisorError::RequestFailed("script exhausted".to_string()));
            }
            script.remove(0).map_err(AdvisorError::RequestFailed)
        }
    }

    fn task() -> Task {
        Task::new("evaluate the change", "diff attached", vec![])
    }

    fn engine() -> DebateEngine {
        DebateEngine::default()
    }

    #[tokio::test]
    async fn empty_roster_fails_the_debate() {
        let err = engine().run(&[], &task()).await.unwrap_err();
        assert!(matches!(err, CouncilError::NoAdvisorsAvailable));
    }

    #[tokio::test]
    async fn unanimous_approval_reaches_full_consensus() {
        let roster = vec![
            ScriptedAdvisor::repeating("a", "VOTE: APPROVE — looks good"),
            ScriptedAdvisor::repeating("b", "VOTE: APPROVE"),
            ScriptedAdvisor::repeating("c", "VOTE: APPROVE, no concerns"),
        ];
        let decision = engine().run(&roster, &task()).await.unwrap();
        assert!(decision.approved);
        assert!((decision.consensus - 1.0).abs() < f64::EPSILON);
        assert_eq!(decision.votes.len(), 3);
    }

    #[tokio::test]
    async fn failed_advisor_still_yields_exactly_one_vote() {
        let roster = vec![
            ScriptedAdvisor::repeating("a", "I approve this"),
            ScriptedAdvisor::failing("b"),
        ];
        let decision = engine().run(&roster, &task()).await.unwrap();

        assert_eq!(decision.votes.len(), 2);
        assert_eq!(decision.votes[0].advisor, "a");
        assert!(decision.votes[0].approved);
        assert_eq!(decision.votes[1].advisor, "b");
        assert!(!decision.votes[1].approved);
        assert_eq!(decision.votes[1].rationale, "failed to vote");
        assert!((decision.consensus - 0.5).abs() < f64::EPSILON);
        // Exact-equality boundary: 0.5 >= 0.5.
        assert!(decision.approved);
    }

    #[tokio::test]
    async fn all_failures_default_to_unanimous_reject() {
        let roster = vec![ScriptedAdvisor::failing("a"), ScriptedAdvisor::failing("b")];
        let decision = engine().run(&roster, &task()).await.unwrap();
        assert!(!decision.approved);
        assert_eq!(decision.consensus, 0.0);
        assert_eq!(decision.votes.len(), 2);
        assert!(decision.votes.iter().all(|v| !v.approved));
    }

    #[tokio::test]
    async fn threshold_above_ratio_rejects() {
        let config = DebateConfig {
            threshold: 0.75,
            ..Default::default()
        };
        let roster = vec![
            ScriptedAdvisor::repeating("a", "VOTE: APPROVE"),
            ScriptedAdvisor::repeating("b", "VOTE: REJECT"),
        ];
        let decision = DebateEngine::new(config).run(&roster, &task()).await.unwrap();
        assert!((decision.consensus - 0.5).abs() < f64::EPSILON);
        assert!(!decision.approved);
    }

    #[tokio::test]
    async fn votes_stay_in_roster_order() {
        let roster = vec![
            ScriptedAdvisor::repeating("zeta", "VOTE: APPROVE"),
            ScriptedAdvisor::repeating("alpha", "VOTE: REJECT"),
            ScriptedAdvisor::repeating("mid", "VOTE: APPROVE"),
        ];
        let decision = engine().run(&roster, &task()).await.unwrap();
        let names: Vec<&str> = decision.votes.iter().map(|v| v.advisor.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn reasoning_summarizes_counts_and_rationales() {
        let roster = vec![
            ScriptedAdvisor::repeating("a", "VOTE: APPROVE — solid tests"),
            ScriptedAdvisor::repeating("b", "VOTE: REJECT — missing docs"),
        ];
        let decision = engine().run(&roster, &task()).await.unwrap();
        assert!(decision.reasoning.contains("1/2 approvals"));
        assert!(decision.reasoning.contains("a [APPROVE]"));
        assert!(decision.reasoning.contains("b [REJECT]"));
        assert!(decision.reasoning.contains("missing docs"));
    }

    #[tokio::test]
    async fn single_round_config_skips_deliberation() {
        // Two calls per advisor: one opinion, one final vote.
        let roster = vec![ScriptedAdvisor::new(
            "solo",
            vec![Ok("looks fine"), Ok("VOTE: APPROVE")],
        )];
        let config = DebateConfig {
            rounds: 1,
            ..Default::default()
        };
        let decision = DebateEngine::new(config).run(&roster, &task()).await.unwrap();
        assert!(decision.approved);
        assert_eq!(decision.votes.len(), 1);
    }

    #[tokio::test]
    async fn opinion_failure_degrades_but_vote_counts() {
        // Round 1 fails, deliberation and final vote succeed.
        let roster = vec![ScriptedAdvisor::new(
            "flaky",
            vec![Err("timeout"), Ok("reconsidered"), Ok("VOTE: APPROVE")],
        )];
        let decision = engine().run(&roster, &task()).await.unwrap();
        assert!(decision.approved);
        assert_eq!(decision.votes.len(), 1);
    }
}
