//! Task description and the cumulative debate transcript.
//!
//! The transcript is the shared context that grows round by round: the
//! formatted task, then every advisor's contribution labelled by advisor
//! and round number. Prompt templates for each protocol phase live here so
//! the engine stays a pure driver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One debate's subject. Created per invocation, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// What the council is being asked to evaluate.
    pub description: String,
    /// Free-form supporting context (recent conversation, diff, notes).
    pub context: String,
    /// Resource identifiers touched by the proposed change.
    pub affected_resources: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        context: impl Into<String>,
        affected_resources: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            context: context.into(),
            affected_resources,
            created_at: Utc::now(),
        }
    }
}

/// One advisor's contribution in one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub round: u32,
    pub advisor: String,
    pub text: String,
}

/// Cumulative record of a debate: task header plus labelled contributions.
///
/// Entries for a round are appended only after the whole round joins, so
/// same-round participants never see each other's output.
#[derive(Debug, Clone)]
pub struct Transcript {
    header: String,
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new(task: &Task) -> Self {
        Self {
            header: format_task(task),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, round: u32, advisor: &str, text: String) {
        self.entries.push(TranscriptEntry {
            round,
            advisor: advisor.to_string(),
            text,
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Full transcript text: task header plus every labelled contribution.
    pub fn render(&self) -> String {
        let mut out = self.header.clone();
        for entry in &self.entries {
            out.push_str(&format!(
                "\n### Round {} — {}\n\n{}\n",
                entry.round, entry.advisor, entry.text
            ));
        }
        out
    }

    /// Round-1 prompt: independent assessment of the task.
    pub fn opinion_prompt(&self) -> String {
        format!(
            "{}\nYou are one advisor on a review council. Independently assess this \
             task: evaluate quality and risks, suggest concrete improvements, and \
             state whether you currently lean toward approval or rejection.\n",
            self.header
        )
    }

    /// Deliberation prompt: refine in light of the other advisors.
    pub fn deliberation_prompt(&self, round: u32) -> String {
        format!(
            "{}\nThis is deliberation round {}. Above is the debate so far, \
             including the other advisors' positions. Refine your own position in \
             light of theirs: note where you now agree, where you still disagree \
             and why, and what would change your mind.\n",
            self.render(),
            round
        )
    }

    /// Final-vote prompt: demands the explicit verdict token.
    pub fn final_vote_prompt(&self) -> String {
        format!(
            "{}\nThe debate is closed. Cast your final vote. Respond with exactly \
             one line starting with `VOTE: APPROVE` or `VOTE: REJECT`, followed by \
             a brief justification.\n",
            self.render()
        )
    }
}

fn format_task(task: &Task) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Council Review: {}\n\n", task.description));
    out.push_str(&format!("**Task ID:** {}\n\n", task.id));
    if !task.context.is_empty() {
        out.push_str(&format!("## Context\n\n{}\n\n", task.context));
    }
    if !task.affected_resources.is_empty() {
        out.push_str("## Affected Resources\n");
        for resource in &task.affected_resources {
            out.push_str(&format!("- `{}`\n", resource));
        }
        out.push('\n');
    }
    out
}

/// Truncate to at most `max` characters on a char boundary, marking the cut.
pub fn excerpt(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new(
            "Add retry logic to the uploader",
            "The uploader currently fails hard on transient errors.",
            vec!["src/upload.rs".to_string()],
        )
    }

    #[test]
    fn task_header_includes_description_and_resources() {
        let transcript = Transcript::new(&task());
        let prompt = transcript.opinion_prompt();
        assert!(prompt.contains("Add retry logic"));
        assert!(prompt.contains("src/upload.rs"));
        assert!(prompt.contains("approval or rejection"));
    }

    #[test]
    fn render_labels_entries_by_advisor_and_round() {
        let mut transcript = Transcript::new(&task());
        transcript.record(1, "architect", "looks risky".to_string());
        transcript.record(2, "manager", "agreed".to_string());

        let rendered = transcript.render();
        let pos_r1 = rendered.find("Round 1 — architect").unwrap();
        let pos_r2 = rendered.find("Round 2 — manager").unwrap();
        assert!(pos_r1 < pos_r2);
        assert!(rendered.contains("looks risky"));
    }

    #[test]
    fn final_vote_prompt_demands_the_token() {
        let transcript = Transcript::new(&task());
        assert!(transcript.final_vote_prompt().contains("VOTE: APPROVE"));
    }

    #[test]
    fn empty_context_is_omitted() {
        let task = Task::new("goal", "", vec![]);
        let transcript = Transcript::new(&task);
        assert!(!transcript.render().contains("## Context"));
        assert!(!transcript.render().contains("## Affected Resources"));
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("short", 200), "short");
        let long = "é".repeat(300);
        let cut = excerpt(&long, 200);
        assert_eq!(cut.chars().count(), 201); // 200 chars + ellipsis
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn excerpt_trims_whitespace() {
        assert_eq!(excerpt("  padded  ", 200), "padded");
    }
}
