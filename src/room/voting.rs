//! Democratic end/kick ballots.

use std::time::Duration;

use tokio::time::Instant;

use crate::protocol::{Proposal, UserId, VotingView};

#[derive(Debug, Clone)]
pub(crate) struct Voting {
    pub proposal: Proposal,
    proposer_name: String,
    votes_for: Vec<UserId>,
    against: Vec<UserId>,
    /// Ballots registered by `new` rather than cast.
    preset: usize,
    pub deadline: Instant,
}

impl Voting {
    /// The proposer counts as a vote for; a kick target as a vote against.
    pub fn new(
        proposal: Proposal,
        proposer: UserId,
        proposer_name: impl Into<String>,
        now: Instant,
        window: Duration,
    ) -> Self {
        let against = match proposal {
            Proposal::Kick { target } => vec![target],
            Proposal::End => Vec::new(),
        };
        let preset = 1 + against.len();
        Self {
            proposal,
            proposer_name: proposer_name.into(),
            votes_for: vec![proposer],
            against,
            preset,
            deadline: now + window,
        }
    }

    pub fn has_voted(&self, user: UserId) -> bool {
        self.votes_for.contains(&user) || self.against.contains(&user)
    }

    /// Record a ballot. Returns `false` for a repeat voter.
    pub fn cast(&mut self, user: UserId, in_favor: bool) -> bool {
        if self.has_voted(user) {
            return false;
        }
        if in_favor {
            self.votes_for.push(user);
        } else {
            self.against.push(user);
        }
        true
    }

    /// A majority of the whole roster is for, or every connected player has
    /// voted.
    pub fn is_decided(&self, roster: usize, connected: usize) -> bool {
        self.votes_for.len() * 2 > roster || self.ballots() >= connected
    }

    /// Ties do not pass.
    pub fn passed(&self) -> bool {
        self.votes_for.len() > self.against.len()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn ballots(&self) -> usize {
        self.votes_for.len() + self.against.len()
    }

    /// Someone besides the proposer (and a kick target) has voted.
    pub fn is_touched(&self) -> bool {
        self.ballots() > self.preset
    }

    pub fn view(&self, viewer: UserId, now: Instant) -> VotingView {
        let vote = if self.votes_for.contains(&viewer) {
            Some(true)
        } else if self.against.contains(&viewer) {
            Some(false)
        } else {
            None
        };
        let left = self.deadline.saturating_duration_since(now);
        VotingView {
            ends_in_ms: u64::try_from(left.as_millis()).unwrap_or(u64::MAX),
            by: self.proposer_name.clone(),
            proposal: self.proposal,
            votes_for: self.votes_for.len(),
            against: self.against.len(),
            vote,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(120);

    fn end_vote(now: Instant) -> Voting {
        Voting::new(Proposal::End, 1, "Ada", now, WINDOW)
    }

    #[tokio::test(start_paused = true)]
    async fn proposer_and_kick_target_are_preregistered() {
        let now = Instant::now();
        let kick = Voting::new(Proposal::Kick { target: 9 }, 1, "Ada", now, WINDOW);
        assert!(kick.has_voted(1));
        assert!(kick.has_voted(9));
        assert_eq!(kick.view(9, now).vote, Some(false));
        assert_eq!(kick.view(1, now).vote, Some(true));
        assert_eq!(kick.view(5, now).vote, None);
        assert_eq!(kick.view(5, now).by, "Ada");
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_ballots_are_ignored() {
        let mut voting = end_vote(Instant::now());
        assert!(voting.cast(2, false));
        assert!(!voting.cast(2, true));
        assert!(!voting.cast(1, false));
        assert_eq!(voting.ballots(), 2);
        assert!(!voting.passed());
    }

    #[tokio::test(start_paused = true)]
    async fn decided_by_strict_majority_of_roster() {
        for roster in 2..=10usize {
            let mut voting = end_vote(Instant::now());
            let mut user = 2;
            // Nobody else is connected to force the all-voted branch.
            while voting.ballots() < roster && !voting.is_decided(roster, usize::MAX) {
                voting.cast(user, true);
                user += 1;
            }
            assert_eq!(voting.ballots(), roster / 2 + 1, "roster {roster}");
            assert!(voting.passed());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn decided_once_every_connected_player_voted() {
        let mut voting = end_vote(Instant::now());
        assert!(!voting.is_decided(4, 3));
        voting.cast(2, false);
        assert!(!voting.is_decided(4, 3));
        voting.cast(3, false);
        assert!(voting.is_decided(4, 3));
        assert!(!voting.passed());
    }

    #[tokio::test(start_paused = true)]
    async fn tie_does_not_pass() {
        let mut voting = end_vote(Instant::now());
        voting.cast(2, false);
        assert!(voting.is_decided(2, 2));
        assert!(!voting.passed());
    }

    #[tokio::test(start_paused = true)]
    async fn only_cast_ballots_touch_a_vote() {
        let now = Instant::now();
        let mut end = end_vote(now);
        assert!(!end.is_touched());
        end.cast(2, false);
        assert!(end.is_touched());

        let mut kick = Voting::new(Proposal::Kick { target: 9 }, 1, "Ada", now, WINDOW);
        assert_eq!(kick.ballots(), 2);
        assert!(!kick.is_touched());
        assert!(!kick.cast(9, true));
        assert!(!kick.is_touched());
        kick.cast(3, true);
        assert!(kick.is_touched());
        assert!(kick.passed());
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_window() {
        let now = Instant::now();
        let voting = end_vote(now);
        assert!(!voting.is_expired(now));
        assert_eq!(voting.view(1, now).ends_in_ms, 120_000);
        assert!(voting.is_expired(now + WINDOW));
        assert_eq!(voting.view(1, now + WINDOW * 2).ends_in_ms, 0);
    }
}
