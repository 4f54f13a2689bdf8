//! Poll/vote subsystem: one active query at a time, one vote per identity.

use chrono::Utc;
use protocol::{ClientId, Query, ServerEvent};
use std::collections::HashMap;

/// Tracks the active query and each identity's current choice.
#[derive(Debug, Default)]
pub struct PollState {
    current: Option<Query>,
    votes: HashMap<ClientId, String>,
}

impl PollState {
    pub fn current(&self) -> Option<&Query> {
        self.current.as_ref()
    }

    /// Recorded choice of `id` for the active query.
    pub fn vote_of(&self, id: ClientId) -> Option<&str> {
        self.votes.get(&id).map(String::as_str)
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Replace the active query and discard all votes for the old one.
    /// Blank questions and option lists with fewer than two entries are
    /// rejected silently.
    pub fn submit_query(
        &mut self,
        question: String,
        options: Vec<String>,
        time_to_decide: f64,
    ) -> Option<ServerEvent> {
        if question.trim().is_empty() || options.len() < 2 {
            return None;
        }
        let query = Query {
            question,
            options,
            time_to_decide,
            created_at: Utc::now().timestamp_millis(),
        };
        self.current = Some(query.clone());
        self.votes.clear();
        Some(ServerEvent::Query(query))
    }

    /// Record `voter`'s choice for the active query, overwriting any earlier
    /// choice. Votes with no active query, or naming a question that is no
    /// longer the active one, are dropped. The event carries the question so
    /// consumers can correlate (no tally is computed here).
    pub fn submit_vote(
        &mut self,
        voter: ClientId,
        question: Option<String>,
        vote: String,
    ) -> Option<ServerEvent> {
        let active = self.current.as_ref()?.question.clone();
        if question.is_some_and(|q| q != active) {
            return None;
        }
        self.votes.insert(voter, vote.clone());
        Some(ServerEvent::Vote {
            id: voter,
            question: active,
            vote,
        })
    }
}
