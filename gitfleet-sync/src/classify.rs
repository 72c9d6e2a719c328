//! Synchronization state classification.
//!
//! Two pure steps:
//! 1. [`upstream_position`]: compare local, upstream and merge-base refs.
//! 2. [`classify`]: map (clean, untracked, position) to
//!    (category, status, action).
//!
//! Any combination outside the table is `Skipped` / `Error` / `None`.

use std::fmt;

use serde::Serialize;

use crate::vcs::VcsOp;

/// Where the local branch tip sits relative to its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UpstreamPosition {
    UpToDate,
    Ahead,
    Behind,
    Unknown,
}

/// Coarse lifecycle bucket of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    Skipped,
    Pending,
    Scheduled,
    Complete,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Skipped => write!(f, "skipped"),
            Category::Pending => write!(f, "pending"),
            Category::Scheduled => write!(f, "scheduled"),
            Category::Complete => write!(f, "complete"),
        }
    }
}

/// Fine-grained sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Status {
    #[serde(rename = "Up-To-Date")]
    UpToDate,
    Ahead,
    Behind,
    Dirty,
    DirtyAhead,
    DirtyBehind,
    Untracked,
    UntrackedAhead,
    UntrackedBehind,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::UpToDate => "Up-To-Date",
            Status::Ahead => "Ahead",
            Status::Behind => "Behind",
            Status::Dirty => "Dirty",
            Status::DirtyAhead => "DirtyAhead",
            Status::DirtyBehind => "DirtyBehind",
            Status::Untracked => "Untracked",
            Status::UntrackedAhead => "UntrackedAhead",
            Status::UntrackedBehind => "UntrackedBehind",
            Status::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Recommended reconciliation for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    None,
    Pull,
    Push,
    #[serde(rename = "Add-Commit-Push")]
    AddCommitPush,
    #[serde(rename = "Stash-Pull-Pop-Commit-Push")]
    StashPullPopCommitPush,
}

impl Action {
    /// True when executing the action creates a commit.
    pub fn commits(self) -> bool {
        matches!(self, Action::AddCommitPush | Action::StashPullPopCommitPush)
    }

    /// Ordered adapter calls implementing the action.
    pub fn steps(self, message: &str) -> Vec<VcsOp> {
        let commit = || VcsOp::Commit {
            message: message.to_string(),
        };
        match self {
            Action::None => vec![],
            Action::Pull => vec![VcsOp::Pull],
            Action::Push => vec![VcsOp::Push],
            Action::AddCommitPush => vec![VcsOp::Add, commit(), VcsOp::Push],
            Action::StashPullPopCommitPush => vec![
                VcsOp::Add,
                VcsOp::Stash,
                VcsOp::Pull,
                VcsOp::StashPop,
                VcsOp::Add,
                commit(),
                VcsOp::Push,
            ],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::None => "None",
            Action::Pull => "Pull",
            Action::Push => "Push",
            Action::AddCommitPush => "Add-Commit-Push",
            Action::StashPullPopCommitPush => "Stash-Pull-Pop-Commit-Push",
        };
        f.write_str(label)
    }
}

/// Derived classification of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Classification {
    pub category: Category,
    pub status: Status,
    pub action: Action,
}

impl Classification {
    /// The error / skip outcome.
    pub const ERROR: Classification = Classification {
        category: Category::Skipped,
        status: Status::Error,
        action: Action::None,
    };

    fn pending(status: Status, action: Action) -> Self {
        Self {
            category: Category::Pending,
            status,
            action,
        }
    }
}

/// Compare refs. Empty refs never match anything.
pub fn upstream_position(local: &str, upstream: &str, merge_base: &str) -> UpstreamPosition {
    if local.is_empty() || upstream.is_empty() {
        return UpstreamPosition::Unknown;
    }
    if local == upstream {
        return UpstreamPosition::UpToDate;
    }
    if local == merge_base {
        return UpstreamPosition::Behind;
    }
    if upstream == merge_base {
        return UpstreamPosition::Ahead;
    }
    UpstreamPosition::Unknown
}

/// Total and pure: every input maps to exactly one classification.
pub fn classify(clean: bool, untracked: bool, position: UpstreamPosition) -> Classification {
    use Action as A;
    use Status as S;
    use UpstreamPosition as P;

    match (clean, untracked, position) {
        (true, false, P::UpToDate) => Classification {
            category: Category::Complete,
            status: S::UpToDate,
            action: A::None,
        },
        (true, false, P::Ahead) => Classification::pending(S::Ahead, A::Push),
        (true, false, P::Behind) => Classification::pending(S::Behind, A::Pull),
        (false, false, P::UpToDate) => Classification::pending(S::Dirty, A::AddCommitPush),
        (false, false, P::Ahead) => Classification::pending(S::DirtyAhead, A::AddCommitPush),
        (false, false, P::Behind) => {
            Classification::pending(S::DirtyBehind, A::StashPullPopCommitPush)
        }
        (_, true, P::UpToDate) => Classification::pending(S::Untracked, A::AddCommitPush),
        (_, true, P::Ahead) => Classification::pending(S::UntrackedAhead, A::AddCommitPush),
        (false, true, P::Behind) => {
            Classification::pending(S::UntrackedBehind, A::StashPullPopCommitPush)
        }
        _ => Classification::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use UpstreamPosition as P;

    #[rstest]
    #[case("a", "a", "a", P::UpToDate)]
    #[case("a", "b", "a", P::Behind)]
    #[case("a", "b", "b", P::Ahead)]
    #[case("a", "b", "c", P::Unknown)]
    #[case("", "", "", P::Unknown)]
    #[case("a", "", "a", P::Unknown)]
    fn positions(
        #[case] local: &str,
        #[case] upstream: &str,
        #[case] base: &str,
        #[case] expected: UpstreamPosition,
    ) {
        assert_eq!(upstream_position(local, upstream, base), expected);
    }

    #[rstest]
    #[case(true, false, P::UpToDate, Category::Complete, Status::UpToDate, Action::None)]
    #[case(true, false, P::Ahead, Category::Pending, Status::Ahead, Action::Push)]
    #[case(true, false, P::Behind, Category::Pending, Status::Behind, Action::Pull)]
    #[case(false, false, P::UpToDate, Category::Pending, Status::Dirty, Action::AddCommitPush)]
    #[case(false, false, P::Ahead, Category::Pending, Status::DirtyAhead, Action::AddCommitPush)]
    #[case(
        false,
        false,
        P::Behind,
        Category::Pending,
        Status::DirtyBehind,
        Action::StashPullPopCommitPush
    )]
    #[case(true, true, P::UpToDate, Category::Pending, Status::Untracked, Action::AddCommitPush)]
    #[case(false, true, P::UpToDate, Category::Pending, Status::Untracked, Action::AddCommitPush)]
    #[case(true, true, P::Ahead, Category::Pending, Status::UntrackedAhead, Action::AddCommitPush)]
    #[case(false, true, P::Ahead, Category::Pending, Status::UntrackedAhead, Action::AddCommitPush)]
    #[case(
        false,
        true,
        P::Behind,
        Category::Pending,
        Status::UntrackedBehind,
        Action::StashPullPopCommitPush
    )]
    #[case(true, true, P::Behind, Category::Skipped, Status::Error, Action::None)]
    #[case(true, false, P::Unknown, Category::Skipped, Status::Error, Action::None)]
    #[case(false, true, P::Unknown, Category::Skipped, Status::Error, Action::None)]
    fn table(
        #[case] clean: bool,
        #[case] untracked: bool,
        #[case] position: UpstreamPosition,
        #[case] category: Category,
        #[case] status: Status,
        #[case] action: Action,
    ) {
        let got = classify(clean, untracked, position);
        assert_eq!(
            got,
            Classification {
                category,
                status,
                action
            }
        );
    }

    #[test]
    fn classify_is_total_and_pure() {
        let positions = [P::UpToDate, P::Ahead, P::Behind, P::Unknown];
        for clean in [true, false] {
            for untracked in [true, false] {
                for position in positions {
                    let first = classify(clean, untracked, position);
                    assert_eq!(first, classify(clean, untracked, position));
                    if position == P::Unknown {
                        assert_eq!(first, Classification::ERROR);
                    }
                }
            }
        }
    }

    #[test]
    fn stash_pull_pop_sequence_is_ordered() {
        let names: Vec<_> = Action::StashPullPopCommitPush
            .steps("msg")
            .iter()
            .map(|op| op.name())
            .collect();
        assert_eq!(
            names,
            vec!["add", "stash", "pull", "stash-pop", "add", "commit", "push"]
        );
        assert!(Action::None.steps("msg").is_empty());
        assert!(!Action::Pull.commits());
    }
}
