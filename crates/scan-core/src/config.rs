// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! SSOT constant bundle and configuration profiles (§6, §9).
//!
//! Every threshold the admission pipeline, duplicate detector, and fusion
//! math consult lives in exactly one place: [`SsotConstants`]. Constants are
//! immutable at runtime (`pub const` associated items on each profile) and
//! participate in [`SsotConstants::profile_hash`], so drift between a running
//! session and the profile it was bound to at session start is detectable.

use crate::ident::{sha256, Hash};

/// One of the four fixed configuration profiles (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProfileName {
    /// Conservative capacity/novelty thresholds; favors fewer, higher-quality patches.
    Conservative,
    /// The default, balanced profile.
    Standard,
    /// Aggressive capacity/novelty thresholds; favors coverage speed.
    Extreme,
    /// Deterministic, tight-tolerance profile used by test harnesses.
    Lab,
}

/// Sensor-facing sub-config (out-of-scope hardware tuning surfaced here only
/// so it participates in the profile hash; no sensor math lives in this crate).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorConfig {
    /// Minimum accepted pose confidence from ARKit, in `[0,1]`.
    pub min_pose_confidence: f64,
}

/// Admission state-machine tuning (SOFT/HARD thresholds, EEB budget).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateMachineConfig {
    /// Total Evidence Energy Budget for a session.
    pub eeb_base_budget: f64,
    /// Minimum EEB quantum charged per accepted patch.
    pub eeb_min_quantum: f64,
    /// Patch count at which SOFT limiting begins.
    pub soft_limit_patch_count: u64,
    /// Patch count at which HARD limiting (SATURATED) begins.
    pub hard_limit_patch_count: u64,
    /// Remaining-EEB fraction at which SOFT limiting begins.
    pub soft_budget_threshold: f64,
    /// Remaining-EEB fraction at which HARD limiting (SATURATED) begins.
    pub hard_budget_threshold: f64,
}

/// Information-gain/novelty acceptance thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualityConfig {
    /// Minimum information gain to survive SOFT limiting, in `[0,1]`.
    pub ig_min_soft: f64,
    /// Minimum novelty to survive SOFT limiting, in `[0,1]`.
    pub novelty_min_soft: f64,
}

/// Dual-anchor session tuning (out-of-scope pairing logic; kept for profile-hash completeness).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DualAnchorConfig {
    /// Maximum anchor drift, in meters, before a re-anchor is requested.
    pub max_anchor_drift_m: f64,
}

/// Two-phase frame-decision gate tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TwoPhaseGateConfig {
    /// Timeout, in milliseconds, after which a pending two-phase commit is reaped.
    pub two_phase_commit_timeout_ms: u64,
}

/// Privacy/exclusion-region tuning (PIZ accounting participates in
/// provenance hashing; no anonymization math lives in this crate).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrivacyConfig {
    /// Whether privacy-excluded-zone area is subtracted from coverage.
    pub exclude_piz_from_coverage: bool,
}

/// Coverage/rate-limiting performance tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerformanceConfig {
    /// EMA smoothing factor for coverage, in `(0,1]`.
    pub coverage_ema_alpha: f64,
    /// Maximum coverage delta emitted per second of wall-clock time.
    pub max_coverage_delta_per_sec: f64,
    /// Maximum number of cells the evidence grid may hold.
    pub max_cells: usize,
}

/// Test-harness-only tuning (shadow verifier, golden replay).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestingConfig {
    /// Whether the zero-trig shadow verifier is active.
    pub shadow_verify_enabled: bool,
}

/// Recovery/replay tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecoveryConfig {
    /// Whether a best-effort persistence flush is attempted after commit.
    pub persist_on_commit: bool,
}

/// Domain boundary enforcement tuning (§4.12).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DomainBoundaryConfig {
    /// `true` ⇒ `hardFail`; `false` ⇒ `warn`.
    pub hard_fail: bool,
}

/// Duplicate-detector and fusion tolerances that are not profile-tunable but
/// still SSOT-owned (fixed across all profiles so decision hashes stay
/// comparable session-to-session regardless of profile).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedConstants {
    /// Pose quantization epsilon for duplicate-signature binning.
    pub pose_eps: f64,
    /// Coverage-cell quantization size for duplicate-signature binning.
    pub coverage_cell_size: f64,
    /// Radiance quantization multiplier for duplicate-signature binning.
    pub radiance_binning: f64,
    /// Tolerance for Dempster–Shafer sum-to-one and combine-commutativity checks.
    pub ds_epsilon: f64,
    /// Conflict mass `K` at/above which the Yager fallback branch is taken.
    pub ds_conflict_switch: f64,
}

/// Per-level coverage weight table (§4.6, §9 Open Question — consolidated here).
pub const LEVEL_WEIGHTS: [f64; 7] = [0.0, 0.2, 0.5, 0.7, 0.8, 0.9, 1.0];

/// The full SSOT constant bundle bound to one [`ProfileName`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SsotConstants {
    /// Which profile this bundle was built from.
    pub profile: ProfileName,
    /// Schema/version identifier for this constant layout; bump on any field change.
    pub schema_version_id: u32,
    /// Sensor sub-config.
    pub sensor: SensorConfig,
    /// Admission state-machine sub-config.
    pub state_machine: StateMachineConfig,
    /// Information-gain/novelty sub-config.
    pub quality: QualityConfig,
    /// Dual-anchor sub-config.
    pub dual_anchor: DualAnchorConfig,
    /// Two-phase gate sub-config.
    pub two_phase_gate: TwoPhaseGateConfig,
    /// Privacy sub-config.
    pub privacy: PrivacyConfig,
    /// Performance sub-config.
    pub performance: PerformanceConfig,
    /// Testing sub-config.
    pub testing: TestingConfig,
    /// Recovery sub-config.
    pub recovery: RecoveryConfig,
    /// Domain boundary sub-config.
    pub domain_boundary: DomainBoundaryConfig,
    /// Fixed (non-profile-tunable) constants.
    pub fixed: FixedConstants,
}

impl SsotConstants {
    /// Returns the bundle for `profile`.
    #[must_use]
    pub fn for_profile(profile: ProfileName) -> Self {
        match profile {
            ProfileName::Conservative => Self::conservative(),
            ProfileName::Standard => Self::standard(),
            ProfileName::Extreme => Self::extreme(),
            ProfileName::Lab => Self::lab(),
        }
    }

    const fn fixed() -> FixedConstants {
        FixedConstants {
            pose_eps: 0.01,
            coverage_cell_size: 0.05,
            radiance_binning: 255.0,
            ds_epsilon: 1e-6,
            ds_conflict_switch: 0.95,
        }
    }

    /// Balanced default profile.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            profile: ProfileName::Standard,
            schema_version_id: 1,
            sensor: SensorConfig {
                min_pose_confidence: 0.6,
            },
            state_machine: StateMachineConfig {
                eeb_base_budget: 1000.0,
                eeb_min_quantum: 1.0,
                soft_limit_patch_count: 800,
                hard_limit_patch_count: 1000,
                soft_budget_threshold: 0.2,
                hard_budget_threshold: 0.0,
            },
            quality: QualityConfig {
                ig_min_soft: 0.3,
                novelty_min_soft: 0.3,
            },
            dual_anchor: DualAnchorConfig {
                max_anchor_drift_m: 0.5,
            },
            two_phase_gate: TwoPhaseGateConfig {
                two_phase_commit_timeout_ms: 2_000,
            },
            privacy: PrivacyConfig {
                exclude_piz_from_coverage: true,
            },
            performance: PerformanceConfig {
                coverage_ema_alpha: 0.1,
                max_coverage_delta_per_sec: 0.2,
                max_cells: 200_000,
            },
            testing: TestingConfig {
                shadow_verify_enabled: false,
            },
            recovery: RecoveryConfig {
                persist_on_commit: true,
            },
            domain_boundary: DomainBoundaryConfig { hard_fail: true },
            fixed: Self::fixed(),
        }
    }

    /// Stricter profile: lower caps, higher quality bar.
    #[must_use]
    pub const fn conservative() -> Self {
        let mut c = Self::standard();
        c.profile = ProfileName::Conservative;
        c.state_machine.soft_limit_patch_count = 500;
        c.state_machine.hard_limit_patch_count = 650;
        c.quality.ig_min_soft = 0.45;
        c.quality.novelty_min_soft = 0.45;
        c
    }

    /// Looser profile: higher caps, lower quality bar, favors coverage speed.
    #[must_use]
    pub const fn extreme() -> Self {
        let mut c = Self::standard();
        c.profile = ProfileName::Extreme;
        c.state_machine.soft_limit_patch_count = 1_500;
        c.state_machine.hard_limit_patch_count = 2_000;
        c.quality.ig_min_soft = 0.15;
        c.quality.novelty_min_soft = 0.15;
        c
    }

    /// Deterministic, tight-tolerance profile for test harnesses.
    #[must_use]
    pub const fn lab() -> Self {
        let mut c = Self::standard();
        c.profile = ProfileName::Lab;
        c.state_machine.eeb_base_budget = 10.0;
        c.state_machine.eeb_min_quantum = 1.0;
        c.state_machine.soft_limit_patch_count = 6;
        c.state_machine.hard_limit_patch_count = 10;
        c.testing.shadow_verify_enabled = true;
        c
    }

    /// Canonical bytes for this bundle, used as the input to
    /// [`SsotConstants::profile_hash`]. Field order is fixed; adding a field
    /// requires a new `schema_version_id`.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(160);
        out.push(self.profile as u8);
        out.extend_from_slice(&self.schema_version_id.to_be_bytes());
        out.extend_from_slice(&self.sensor.min_pose_confidence.to_be_bytes());
        out.extend_from_slice(&self.state_machine.eeb_base_budget.to_be_bytes());
        out.extend_from_slice(&self.state_machine.eeb_min_quantum.to_be_bytes());
        out.extend_from_slice(&self.state_machine.soft_limit_patch_count.to_be_bytes());
        out.extend_from_slice(&self.state_machine.hard_limit_patch_count.to_be_bytes());
        out.extend_from_slice(&self.state_machine.soft_budget_threshold.to_be_bytes());
        out.extend_from_slice(&self.state_machine.hard_budget_threshold.to_be_bytes());
        out.extend_from_slice(&self.quality.ig_min_soft.to_be_bytes());
        out.extend_from_slice(&self.quality.novelty_min_soft.to_be_bytes());
        out.extend_from_slice(&self.dual_anchor.max_anchor_drift_m.to_be_bytes());
        out.extend_from_slice(
            &self
                .two_phase_gate
                .two_phase_commit_timeout_ms
                .to_be_bytes(),
        );
        out.push(u8::from(self.privacy.exclude_piz_from_coverage));
        out.extend_from_slice(&self.performance.coverage_ema_alpha.to_be_bytes());
        out.extend_from_slice(&self.performance.max_coverage_delta_per_sec.to_be_bytes());
        out.extend_from_slice(&(self.performance.max_cells as u64).to_be_bytes());
        out.push(u8::from(self.testing.shadow_verify_enabled));
        out.push(u8::from(self.recovery.persist_on_commit));
        out.push(u8::from(self.domain_boundary.hard_fail));
        out.extend_from_slice(&self.fixed.pose_eps.to_be_bytes());
        out.extend_from_slice(&self.fixed.coverage_cell_size.to_be_bytes());
        out.extend_from_slice(&self.fixed.radiance_binning.to_be_bytes());
        out.extend_from_slice(&self.fixed.ds_epsilon.to_be_bytes());
        out.extend_from_slice(&self.fixed.ds_conflict_switch.to_be_bytes());
        out
    }

    /// SHA-256 of [`SsotConstants::canonical_bytes`]; the binding a session
    /// records at startup so later drift can be detected.
    #[must_use]
    pub fn profile_hash(&self) -> Hash {
        sha256(&self.canonical_bytes())
    }
}

/// Binding of a profile hash recorded at session start, for drift detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileBinding {
    bound_hash: Hash,
}

impl ProfileBinding {
    /// Records the binding for `constants` at session start.
    #[must_use]
    pub fn bind(constants: &SsotConstants) -> Self {
        Self {
            bound_hash: constants.profile_hash(),
        }
    }

    /// Returns `true` if `constants` still matches the bound profile hash.
    #[must_use]
    pub fn check(&self, constants: &SsotConstants) -> bool {
        self.bound_hash == constants.profile_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_hash_is_stable_and_profile_sensitive() {
        let a = SsotConstants::standard();
        let b = SsotConstants::standard();
        assert_eq!(a.profile_hash(), b.profile_hash());
        let c = SsotConstants::extreme();
        assert_ne!(a.profile_hash(), c.profile_hash());
    }

    #[test]
    fn binding_detects_drift() {
        let mut constants = SsotConstants::standard();
        let binding = ProfileBinding::bind(&constants);
        assert!(binding.check(&constants));
        constants.quality.ig_min_soft = 0.9;
        assert!(!binding.check(&constants));
    }

    #[test]
    fn level_weights_are_monotone_and_anchored() {
        assert_eq!(LEVEL_WEIGHTS[0], 0.0);
        assert_eq!(LEVEL_WEIGHTS[6], 1.0);
        for w in LEVEL_WEIGHTS.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }
}
