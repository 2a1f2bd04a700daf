//! Vote interpreter — free text in, boolean verdict out.
//!
//! Deterministic and deliberately conservative: an explicit `VOTE:` marker
//! wins outright; otherwise whole-word lexicon matching decides, and
//! anything ambiguous (both lexicons, neither, empty input) is a rejection.
//! Unclear responses must never auto-approve.

use std::sync::LazyLock;

use regex::Regex;

static EXPLICIT_VOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bVOTE\s*:\s*(APPROVE|REJECT)\b").expect("explicit vote pattern")
});

static APPROVE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(APPROVE|APPROVED|ACCEPT|ACCEPTED|LGTM)\b").expect("approve lexicon")
});

static REJECT_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(REJECT|REJECTED|DENY|DENIED)\b").expect("reject lexicon")
});

/// Parse an advisor's final-round response into an approve/reject verdict.
pub fn interpret(text: &str) -> bool {
    if let Some(captures) = EXPLICIT_VOTE.captures(text) {
        return captures[1].eq_ignore_ascii_case("APPROVE");
    }

    let approves = APPROVE_WORDS.is_match(text);
    let rejects = REJECT_WORDS.is_match(text);
    // One-sided match decides; both, neither, or empty default to reject.
    matches!((approves, rejects), (true, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_marker_wins() {
        assert!(interpret("VOTE: APPROVE — solid work"));
        assert!(!interpret("VOTE: REJECT — too risky"));
        assert!(interpret("vote: approve"));
        assert!(interpret("My decision is VOTE:APPROVE."));
    }

    #[test]
    fn explicit_marker_overrides_lexicon_noise() {
        // The body argues both ways; the marker decides.
        assert!(interpret(
            "Some reviewers would reject this, but VOTE: APPROVE overall."
        ));
        assert!(!interpret(
            "VOTE: REJECT. I wanted to approve but the tests are missing."
        ));
    }

    #[test]
    fn one_sided_lexicon_decides() {
        assert!(interpret("I approve this change."));
        assert!(interpret("Accepted, ship it."));
        assert!(interpret("LGTM"));
        assert!(!interpret("This should be rejected."));
        assert!(!interpret("Denied — missing error handling."));
    }

    #[test]
    fn whole_word_matching_only() {
        // "disapprove"/"rejection" contain lexicon words as substrings but
        // not as whole words with both boundaries.
        assert!(!interpret("I disapprove of the style but won't block."));
        assert!(!interpret("The rejection rate metric is unrelated."));
    }

    #[test]
    fn ambiguous_defaults_to_reject() {
        assert!(!interpret("I approve parts of it but reject the rest."));
        assert!(!interpret("Interesting proposal, needs more thought."));
        assert!(!interpret(""));
        assert!(!interpret("   \n\t  "));
    }

    #[test]
    fn deterministic_on_identical_input() {
        let text = "I approve this with minor reservations.";
        let first = interpret(text);
        for _ in 0..10 {
            assert_eq!(interpret(text), first);
        }
    }

    #[test]
    fn vote_rejected_falls_through_to_lexicon() {
        // Not an exact marker token, but the reject lexicon catches it.
        assert!(!interpret("VOTE: REJECTED"));
    }
}
