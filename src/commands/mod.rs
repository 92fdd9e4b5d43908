//! Command Recognition
//!
//! Maps raw chat text onto the five vote command forms. Matching is
//! case-sensitive and requires a `!` or `/` prefix; anything that is not an
//! exact match parses to nothing and the bot stays quiet.

use regex::Regex;
use std::sync::LazyLock;

static START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(!|/)vote\s(-s)\s(.+)$").expect("valid start regex"));
static CHOICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(!|/)vote\s(-c)\s(.+)$").expect("valid choice regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(!|/)vote\s(-t)\s(\d)$").expect("valid timeframe regex"));
static SUBMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(!|/)vote\s(submit)$").expect("valid submit regex"));
static CAST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(!|/)vote\s(\d)$").expect("valid cast regex"));

/// A recognized vote command with its argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteCommand {
    /// `!vote -s <question>` -- start a draft session
    Start { question: String },
    /// `!vote -c <choice>` -- append a choice to the draft
    AddChoice { choice: String },
    /// `!vote -t <digit>` -- set the voting window in minutes
    SetTimeframe { minutes: String },
    /// `!vote submit` -- freeze the draft and open voting
    Submit,
    /// `!vote <digit>` -- cast a vote
    Cast { choice: String },
}

/// Parse a chat message into a vote command, if it is one.
pub fn parse(text: &str) -> Option<VoteCommand> {
    if let Some(caps) = START_RE.captures(text) {
        return Some(VoteCommand::Start {
            question: caps[3].to_string(),
        });
    }
    if let Some(caps) = CHOICE_RE.captures(text) {
        return Some(VoteCommand::AddChoice {
            choice: caps[3].to_string(),
        });
    }
    if let Some(caps) = TIME_RE.captures(text) {
        return Some(VoteCommand::SetTimeframe {
            minutes: caps[3].to_string(),
        });
    }
    if SUBMIT_RE.is_match(text) {
        return Some(VoteCommand::Submit);
    }
    if let Some(caps) = CAST_RE.captures(text) {
        return Some(VoteCommand::Cast {
            choice: caps[2].to_string(),
        });
    }
    None
}
