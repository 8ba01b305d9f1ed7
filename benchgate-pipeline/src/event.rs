//! Triggering events.

use crate::workflow::Triggers;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An event that may start a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TriggerEvent {
    /// Commits pushed to a branch.
    Push {
        /// Branch name without `refs/heads/`.
        branch: String,
    },
    /// A pull request was opened or updated.
    PullRequest,
}

impl TriggerEvent {
    /// Push to `branch`.
    pub fn push(branch: impl Into<String>) -> Self {
        let branch = branch.into();
        let branch = branch
            .strip_prefix("refs/heads/")
            .map(str::to_string)
            .unwrap_or(branch);
        TriggerEvent::Push { branch }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerEvent::Push { branch } => write!(f, "push to {branch}"),
            TriggerEvent::PullRequest => f.write_str("pull request"),
        }
    }
}

impl Triggers {
    /// Whether `event` starts a run.
    pub fn matches(&self, event: &TriggerEvent) -> bool {
        match event {
            TriggerEvent::Push { branch } => self
                .push
                .iter()
                .any(|pattern| pattern == "*" || pattern == branch),
            TriggerEvent::PullRequest => self.pull_request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triggers() -> Triggers {
        Triggers {
            push: vec!["main".into()],
            pull_request: true,
        }
    }

    #[test]
    fn push_to_main_only() {
        assert!(triggers().matches(&TriggerEvent::push("main")));
        assert!(triggers().matches(&TriggerEvent::push("refs/heads/main")));
        assert!(!triggers().matches(&TriggerEvent::push("feature/x")));
    }

    #[test]
    fn every_pull_request() {
        assert!(triggers().matches(&TriggerEvent::PullRequest));
        let push_only = Triggers {
            pull_request: false,
            ..triggers()
        };
        assert!(!push_only.matches(&TriggerEvent::PullRequest));
    }

    #[test]
    fn wildcard_branch() {
        let any = Triggers {
            push: vec!["*".into()],
            pull_request: false,
        };
        assert!(any.matches(&TriggerEvent::push("release")));
    }
}
