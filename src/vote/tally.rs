//! Vote Tally
//!
//! Pure winner calculation over a session's recorded counts.

use super::session::VoteSession;

/// A winning choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    /// Choice index as displayed to voters.
    pub index: usize,
    /// Choice text.
    pub choice: String,
    /// Number of votes received.
    pub count: u64,
}

/// Outcome of tallying a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyOutcome {
    /// A choice received the most votes.
    Winner(Winner),
    /// Every count was zero, or voting never opened.
    NoVotes,
}

impl TallyOutcome {
    /// The announcement text for this outcome.
    pub fn announcement(&self) -> String {
        match self {
            TallyOutcome::Winner(w) => {
                let noun = if w.count == 1 { "vote" } else { "votes" };
                format!("Vote is over! '{}' wins with {} {}", w.choice, w.count, noun)
            }
            TallyOutcome::NoVotes => "Vote is over! No votes were cast.".to_string(),
        }
    }
}

/// Tally a session's votes.
///
/// Iterates choice indices in ascending order keeping the strictly greatest
/// count, so ties resolve to the lowest index. Zero counts never win.
pub fn tally(session: &VoteSession) -> TallyOutcome {
    let mut winner: Option<Winner> = None;
    for (&index, &count) in &session.votes {
        if count == 0 {
            continue;
        }
        let leading = winner.as_ref().map(|w| w.count).unwrap_or(0);
        if count > leading {
            if let Some(choice) = session.choices.get(index) {
                winner = Some(Winner {
                    index,
                    choice: choice.clone(),
                    count,
                });
            }
        }
    }
    match winner {
        Some(w) => TallyOutcome::Winner(w),
        None => TallyOutcome::NoVotes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn open_session(choices: &[&str]) -> VoteSession {
        let mut session = VoteSession::new("room", "Pizza?", 3);
        for choice in choices {
            session.add_choice(*choice);
        }
        session.submit(Utc::now());
        session
    }

    #[test]
    fn test_highest_count_wins() {
        let mut session = open_session(&["Yes", "No"]);
        session.record_vote(1, "alice");
        session.record_vote(1, "bob");
        session.record_vote(2, "carol");

        let outcome = tally(&session);
        assert_eq!(
            outcome,
            TallyOutcome::Winner(Winner {
                index: 1,
                choice: "Yes".to_string(),
                count: 2,
            })
        );
    }

    #[test]
    fn test_tie_resolves_to_lowest_index() {
        let mut session = open_session(&["Yes", "No", "Maybe"]);
        session.record_vote(2, "alice");
        session.record_vote(3, "bob");

        let outcome = tally(&session);
        assert_eq!(
            outcome,
            TallyOutcome::Winner(Winner {
                index: 2,
                choice: "No".to_string(),
                count: 1,
            })
        );
    }

    #[test]
    fn test_all_zero_counts_yield_no_votes() {
        let session = open_session(&["Yes", "No"]);
        assert_eq!(tally(&session), TallyOutcome::NoVotes);
    }

    #[test]
    fn test_unsubmitted_session_yields_no_votes() {
        let session = VoteSession::new("room", "Pizza?", 3);
        assert_eq!(tally(&session), TallyOutcome::NoVotes);
    }

    #[test]
    fn test_announcement_pluralizes() {
        let mut session = open_session(&["Yes", "No"]);
        session.record_vote(1, "alice");
        assert_eq!(
            tally(&session).announcement(),
            "Vote is over! 'Yes' wins with 1 vote"
        );

        session.record_vote(1, "bob");
        assert_eq!(
            tally(&session).announcement(),
            "Vote is over! 'Yes' wins with 2 votes"
        );
    }

    #[test]
    fn test_no_votes_announcement() {
        assert_eq!(
            TallyOutcome::NoVotes.announcement(),
            "Vote is over! No votes were cast."
        );
    }
}
