//! Lifecycle events
//!
//! Every log line the crate emits names one of these.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    ConfigLoaded,

    // Row store
    StoreOpenBegin,
    StoreOpenComplete,
    CommitAppended,
    /// A commit could not be made durable and was discarded
    CommitFailed,
    /// Commit log failed validation on replay (FATAL)
    LogCorruption,

    // Mutations
    MutationBegin,
    MutationCommit,
    MutationRejected,
    MutationConflict,
    MutationRetry,

    // Verification
    VerifyComplete,
    /// Invariant check failed (FATAL)
    VerifyFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreOpenBegin => "STORE_OPEN_BEGIN",
            Event::StoreOpenComplete => "STORE_OPEN_COMPLETE",
            Event::CommitAppended => "COMMIT_APPENDED",
            Event::CommitFailed => "COMMIT_FAILED",
            Event::LogCorruption => "LOG_CORRUPTION",
            Event::MutationBegin => "MUTATION_BEGIN",
            Event::MutationCommit => "MUTATION_COMMIT",
            Event::MutationRejected => "MUTATION_REJECTED",
            Event::MutationConflict => "MUTATION_CONFLICT",
            Event::MutationRetry => "MUTATION_RETRY",
            Event::VerifyComplete => "VERIFY_COMPLETE",
            Event::VerifyFailed => "VERIFY_FAILED",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::LogCorruption | Event::VerifyFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_events() {
        assert!(Event::LogCorruption.is_fatal());
        assert!(Event::VerifyFailed.is_fatal());
        assert!(!Event::MutationConflict.is_fatal());
    }

    #[test]
    fn test_event_names_are_upper_snake() {
        for event in [Event::ConfigLoaded, Event::MutationRetry, Event::StoreOpenComplete] {
            let name = event.as_str();
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }
}
