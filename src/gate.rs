//! Early-exit predicates evaluated before any schema is loaded.
//!
//! Every rejection is benign: the pipeline stops and reports why, but nothing
//! is surfaced as an error.

use crate::core::branch_name;
use crate::environment::{NormalizedConfig, Notifications, NotificationsConfig};
use std::fmt;

/// Why an invocation stopped before dispatching anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The pushed ref is not a branch head (a tag, a note, ...).
    NotABranchPush { git_ref: String },
    /// The repository has no readable configuration.
    MissingConfig,
    /// The selected environment has notifications turned off.
    NotificationsDisabled { environment: String },
    /// The selected environment tracks a different branch.
    BranchMismatch { expected: String, actual: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotABranchPush { git_ref } => {
                write!(f, "ref \"{}\" is not a branch push", git_ref)
            }
            SkipReason::MissingConfig => write!(f, "missing config file"),
            SkipReason::NotificationsDisabled { environment } => {
                write!(f, "notifications disabled for environment \"{}\"", environment)
            }
            SkipReason::BranchMismatch { expected, actual } => write!(
                f,
                "received branch \"{}\" doesn't match expected branch \"{}\"",
                actual, expected
            ),
        }
    }
}

/// The ref must name a branch head. Returns the branch.
pub fn check_branch_push(git_ref: &str) -> Result<&str, SkipReason> {
    match branch_name(git_ref) {
        Some(branch) if !branch.is_empty() => Ok(branch),
        _ => Err(SkipReason::NotABranchPush {
            git_ref: git_ref.to_string(),
        }),
    }
}

/// Notifications must be enabled and the branch must match.
pub fn check_environment<'a>(
    config: &'a NormalizedConfig,
    branch: &str,
) -> Result<&'a Notifications, SkipReason> {
    let notifications = match &config.notifications {
        NotificationsConfig::Enabled(notifications) => notifications,
        NotificationsConfig::Disabled => {
            return Err(SkipReason::NotificationsDisabled {
                environment: config.name.clone(),
            })
        }
    };

    if config.branch != branch {
        return Err(SkipReason::BranchMismatch {
            expected: config.branch.clone(),
            actual: branch.to_string(),
        });
    }

    Ok(notifications)
}
