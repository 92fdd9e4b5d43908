//! Vote Session
//!
//! The persisted state of one vote: question, choices, voting window, vote
//! counts and voters, plus the draft/open flag.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder occupying choice index 0. Never shown, never votable; keeps
/// displayed choice numbers 1-based.
const PLACEHOLDER: &str = "";

/// One vote session. At most one exists per scope at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteSession {
    /// Session identity; countdown tasks use it to detect replacement.
    pub id: String,

    /// Chat context (room/channel) the session belongs to.
    pub scope: String,

    /// The question being voted on. Immutable after creation.
    pub question: String,

    /// Choice texts. Index 0 is a reserved placeholder; valid vote indices
    /// are `1..=len-1`.
    pub choices: Vec<String>,

    /// Voting window in minutes. Editable only while in draft.
    pub timeframe: u32,

    /// Vote counts per choice index. Empty until submission.
    #[serde(default)]
    pub votes: BTreeMap<usize, u64>,

    /// Usernames that have voted. Grows monotonically.
    #[serde(default)]
    pub voters: BTreeSet<String>,

    /// False while in draft, true once open for voting. One-way.
    pub submitted: bool,

    /// Voting deadline. Set exactly once at submission.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl VoteSession {
    /// Create a new draft session.
    pub fn new(scope: impl Into<String>, question: impl Into<String>, timeframe: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scope: scope.into(),
            question: question.into(),
            choices: vec![PLACEHOLDER.to_string()],
            timeframe,
            votes: BTreeMap::new(),
            voters: BTreeSet::new(),
            submitted: false,
            end_time: None,
        }
    }

    /// Append a choice. Draft only; callers check `submitted` first.
    pub fn add_choice(&mut self, choice: impl Into<String>) {
        self.choices.push(choice.into());
    }

    /// Indices that may be voted for (everything but the placeholder).
    pub fn valid_indices(&self) -> std::ops::Range<usize> {
        1..self.choices.len()
    }

    /// Whether `index` names a real choice.
    pub fn is_valid_choice(&self, index: usize) -> bool {
        index >= 1 && index < self.choices.len()
    }

    /// Real choices with their displayed 1-based indices.
    pub fn numbered_choices(&self) -> impl Iterator<Item = (usize, &str)> {
        self.choices
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| (i, c.as_str()))
    }

    /// Freeze the draft and open voting.
    ///
    /// Adds one minute to the timeframe to compensate for the rounding loss
    /// on the first countdown tick, fixes the deadline, and zeroes every
    /// valid choice's count.
    pub fn submit(&mut self, now: DateTime<Utc>) {
        self.timeframe += 1;
        self.end_time = Some(now + Duration::minutes(i64::from(self.timeframe)));
        for index in self.valid_indices() {
            self.votes.insert(index, 0);
        }
        self.submitted = true;
    }

    /// Record a vote. Returns false without mutating when the session is
    /// not open, the voter already voted, or the index is not a real
    /// choice.
    pub fn record_vote(&mut self, index: usize, username: &str) -> bool {
        if !self.submitted || self.voters.contains(username) || !self.is_valid_choice(index) {
            return false;
        }
        *self.votes.entry(index).or_insert(0) += 1;
        self.voters.insert(username.to_string());
        true
    }

    /// Whole minutes until the deadline. Zero or negative means the window
    /// has elapsed (or the session was never submitted).
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        match self.end_time {
            Some(end) => (end - now).num_minutes(),
            None => 0,
        }
    }
}
