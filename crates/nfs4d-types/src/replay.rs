use serde::{Deserialize, Serialize};

/// The priority class a reconnect-replay op is assigned for batch
/// scheduling (§4.11, §9's "Replay-batch priority" design note).
///
/// Ordered: `Critical` sorts lowest and is scheduled first, matching the
/// derived [`Ord`] the replay queue's binary heap relies on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug)]
pub enum ReplayPriority {
    Critical,
    High,
    Normal,
    Low,
    Background,
}

impl ReplayPriority {
    /// The priority class a [`crate::MutatingProcedure`] is replayed at:
    /// metadata-changing ops are `Critical`, writes `High`, attribute
    /// changes `Low`; everything else the journal can carry (reads are
    /// not journaled, so they never reach this classifier, but
    /// `Normal`/`Background` are available for future op kinds) defaults
    /// to `Normal`.
    pub fn for_procedure(procedure: crate::MutatingProcedure) -> Self {
        use crate::MutatingProcedure as P;
        match procedure {
            P::Create | P::Remove | P::Rename | P::Mkdir | P::Rmdir | P::Symlink => {
                ReplayPriority::Critical
            }
            P::Write => ReplayPriority::High,
            P::SetAttr => ReplayPriority::Low,
        }
    }
}

/// The phase the recovery engine's crash-recovery and per-client-reclaim
/// state machines are in, reported in logs and exposed as externally
/// observable state (§4.11).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum RecoveryPhase {
    Scan,
    Analyze,
    Restore,
    Verify,
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MutatingProcedure;

    #[test]
    fn priority_ordering_puts_critical_first() {
        assert!(ReplayPriority::Critical < ReplayPriority::High);
        assert!(ReplayPriority::High < ReplayPriority::Normal);
        assert!(ReplayPriority::Normal < ReplayPriority::Low);
        assert!(ReplayPriority::Low < ReplayPriority::Background);
    }

    #[test]
    fn metadata_ops_are_critical() {
        assert_eq!(
            ReplayPriority::for_procedure(MutatingProcedure::Mkdir),
            ReplayPriority::Critical
        );
        assert_eq!(
            ReplayPriority::for_procedure(MutatingProcedure::Write),
            ReplayPriority::High
        );
        assert_eq!(
            ReplayPriority::for_procedure(MutatingProcedure::SetAttr),
            ReplayPriority::Low
        );
    }
}
