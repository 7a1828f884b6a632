//! Suggestion-box search with supersession. Each keystroke gets a monotone
//! ticket; a response is applied only if its ticket is still the newest, so
//! a slow early request can never overwrite the result of a later one.

use flashnews_types::api::UserSummary;

/// Queries shorter than this never hit the server.
pub const MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct SearchSession {
    latest: u64,
    query: String,
    results: Vec<UserSummary>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a keystroke. Returns a ticket to attach to the outgoing
    /// request, or None when the query is below the threshold (the
    /// suggestion list is cleared and no request should be made).
    pub fn keystroke(&mut self, query: &str) -> Option<Ticket> {
        let query = query.trim();
        self.latest += 1;
        self.query = query.to_string();

        if query.len() < MIN_QUERY_LEN {
            self.results.clear();
            return None;
        }
        Some(Ticket(self.latest))
    }

    /// Apply a response. Stale responses (a newer keystroke has been seen)
    /// are discarded and false is returned.
    pub fn accept(&mut self, ticket: Ticket, results: Vec<UserSummary>) -> bool {
        if ticket.0 != self.latest {
            return false;
        }
        self.results = results;
        true
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[UserSummary] {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(name: &str) -> UserSummary {
        UserSummary {
            user_id: Uuid::new_v4(),
            username: name.into(),
            bio: None,
            profile_picture: None,
        }
    }

    #[test]
    fn short_queries_do_not_search() {
        let mut session = SearchSession::new();
        assert!(session.keystroke("al").is_none());
        assert!(session.keystroke("").is_none());
        assert!(session.keystroke("ali").is_some());
    }

    #[test]
    fn short_query_clears_previous_results() {
        let mut session = SearchSession::new();
        let ticket = session.keystroke("alice").unwrap();
        assert!(session.accept(ticket, vec![user("alice")]));
        assert_eq!(session.results().len(), 1);

        assert!(session.keystroke("al").is_none());
        assert!(session.results().is_empty());
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut session = SearchSession::new();
        let first = session.keystroke("ali").unwrap();
        let second = session.keystroke("alic").unwrap();

        // The older request resolves after the newer one.
        assert!(session.accept(second, vec![user("alice")]));
        assert!(!session.accept(first, vec![user("alina"), user("ali")]));

        assert_eq!(session.results().len(), 1);
        assert_eq!(session.results()[0].username, "alice");
    }

    #[test]
    fn out_of_order_arrival_keeps_newest() {
        let mut session = SearchSession::new();
        let first = session.keystroke("bob").unwrap();
        let second = session.keystroke("bobb").unwrap();

        // Newer response lands first; the older one must not clobber it.
        assert!(session.accept(second, vec![user("bobby")]));
        assert!(!session.accept(first, vec![user("bob"), user("bobby")]));
        assert_eq!(session.results()[0].username, "bobby");
    }
}
