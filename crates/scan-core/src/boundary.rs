// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Domain boundary enforcement (§4.12).
//!
//! Data flows one direction: Perception → Decision → Ledger. This module is
//! the runtime half of that rule (module layering in this crate's own
//! dependency graph is the compile-time half); every cross-domain access
//! is checked against a fixed legal-edge set and recorded for audit,
//! mirroring how access-control checks are done elsewhere in this codebase
//! against a declared set of legal operations rather than an ad hoc `if`.

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::error::CoreError;

/// The three domains data moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Domain {
    /// Raw sensor/ARKit-adjacent input. Out of scope for this crate's math,
    /// but its boundary with Decision is enforced here.
    Perception,
    /// Admission, bucketing, fusion — this crate's core.
    Decision,
    /// Durable evidence grid and audit trail.
    Ledger,
}

/// How a cross-domain violation is handled (§6, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementPolicy {
    /// Log the violation and allow the access to proceed.
    Warn,
    /// Reject the access with a typed error.
    HardFail,
}

/// One recorded cross-domain access attempt, legal or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    /// Origin domain.
    pub from: Domain,
    /// Destination domain.
    pub to: Domain,
    /// Whether this edge is in the legal set.
    pub allowed: bool,
}

fn is_legal_edge(from: Domain, to: Domain) -> bool {
    from == to || matches!(
        (from, to),
        (Domain::Perception, Domain::Decision) | (Domain::Decision, Domain::Ledger)
    )
}

/// Single-writer authority that checks and records cross-domain accesses.
///
/// Holds its own audit trail behind a mutex rather than requiring external
/// synchronization, since boundary checks are typically called from
/// scattered call sites rather than through one actor inbox.
#[derive(Debug)]
pub struct BoundaryEnforcer {
    policy: EnforcementPolicy,
    access_log: Mutex<Vec<AccessRecord>>,
}

impl BoundaryEnforcer {
    /// Constructs an enforcer under the given policy.
    #[must_use]
    pub fn new(policy: EnforcementPolicy) -> Self {
        Self {
            policy,
            access_log: Mutex::new(Vec::new()),
        }
    }

    /// Checks and records a transition from `from` to `to`.
    ///
    /// Under [`EnforcementPolicy::Warn`], illegal edges are logged and the
    /// call still returns `Ok(())`. Under [`EnforcementPolicy::HardFail`],
    /// illegal edges return [`CoreError::BoundaryViolation`].
    pub fn check(&self, from: Domain, to: Domain) -> Result<(), CoreError> {
        let allowed = is_legal_edge(from, to);
        if let Ok(mut log) = self.access_log.lock() {
            log.push(AccessRecord { from, to, allowed });
        }
        if allowed {
            return Ok(());
        }
        match self.policy {
            EnforcementPolicy::Warn => {
                tracing::warn!(?from, ?to, "domain boundary violation (warn policy)");
                Ok(())
            }
            EnforcementPolicy::HardFail => Err(CoreError::BoundaryViolation { from, to }),
        }
    }

    /// Returns a snapshot of every access recorded so far, in call order.
    #[must_use]
    pub fn access_log(&self) -> Vec<AccessRecord> {
        self.access_log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Returns the full legal-edge set, for audit tooling or documentation
    /// generation — not consulted by [`Self::check`] itself, which inlines
    /// the same rule via [`is_legal_edge`].
    #[must_use]
    pub fn legal_edges() -> BTreeSet<(Domain, Domain)> {
        let domains = [Domain::Perception, Domain::Decision, Domain::Ledger];
        let mut edges = BTreeSet::new();
        for &from in &domains {
            for &to in &domains {
                if is_legal_edge(from, to) {
                    edges.insert((from, to));
                }
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_flow_is_legal() {
        let enforcer = BoundaryEnforcer::new(EnforcementPolicy::HardFail);
        assert!(enforcer.check(Domain::Perception, Domain::Decision).is_ok());
        assert!(enforcer.check(Domain::Decision, Domain::Ledger).is_ok());
    }

    #[test]
    fn identity_flow_is_always_legal() {
        let enforcer = BoundaryEnforcer::new(EnforcementPolicy::HardFail);
        for d in [Domain::Perception, Domain::Decision, Domain::Ledger] {
            assert!(enforcer.check(d, d).is_ok());
        }
    }

    #[test]
    fn reverse_flow_hard_fails() {
        let enforcer = BoundaryEnforcer::new(EnforcementPolicy::HardFail);
        let err = enforcer.check(Domain::Ledger, Domain::Decision).unwrap_err();
        assert!(matches!(err, CoreError::BoundaryViolation { .. }));
    }

    #[test]
    fn reverse_flow_warn_policy_proceeds() {
        let enforcer = BoundaryEnforcer::new(EnforcementPolicy::Warn);
        assert!(enforcer.check(Domain::Ledger, Domain::Perception).is_ok());
        assert_eq!(enforcer.access_log().len(), 1);
        assert!(!enforcer.access_log()[0].allowed);
    }

    #[test]
    fn skip_connection_perception_to_ledger_is_illegal() {
        let enforcer = BoundaryEnforcer::new(EnforcementPolicy::HardFail);
        assert!(enforcer.check(Domain::Perception, Domain::Ledger).is_err());
    }

    #[test]
    fn legal_edges_matches_spec_set() {
        let edges = BoundaryEnforcer::legal_edges();
        assert!(edges.contains(&(Domain::Perception, Domain::Decision)));
        assert!(edges.contains(&(Domain::Decision, Domain::Ledger)));
        assert!(!edges.contains(&(Domain::Perception, Domain::Ledger)));
        assert!(!edges.contains(&(Domain::Ledger, Domain::Decision)));
    }
}
