use cora_core::Domain;
use std::collections::HashMap;

/// Domain currently assigned to each session.
///
/// Entries are created on a session's first message, replaced on a confirmed
/// handoff and dropped on reset.
#[derive(Debug, Clone, Default)]
pub struct SessionDomains {
    domains: HashMap<String, Domain>,
}

impl SessionDomains {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<Domain> {
        self.domains.get(session_id).copied()
    }

    /// Record `domain` for the session, returning the previous one.
    pub fn assign(&mut self, session_id: &str, domain: Domain) -> Option<Domain> {
        self.domains.insert(session_id.to_string(), domain)
    }

    pub fn remove(&mut self, session_id: &str) -> Option<Domain> {
        self.domains.remove(session_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Domain assigned to `session_id`, if any.
#[must_use]
pub fn current_domain(state: &SessionDomains, session_id: &str) -> Option<Domain> {
    state.get(session_id)
}
