// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical, bit-exact byte layouts used for content addressing and
//! idempotency (§6).
//!
//! Every layout here is frozen at its stated version: adding a field means a
//! new `layoutVersion`, never widening the existing one in place. Encoding
//! never relies on language-level "omit if `None`" behavior — every optional
//! field is preceded by an explicit `u8` presence tag.

use crate::ident::{sha256, Hash};
use crate::model::{AdmissionDecision, BuildMode, HardFuseTrigger, RejectReason};

const ALIGNMENT: usize = 16;

fn pad_to_alignment(buf: &mut Vec<u8>) {
    let rem = buf.len() % ALIGNMENT;
    if rem != 0 {
        buf.extend(std::iter::repeat(0u8).take(ALIGNMENT - rem));
    }
}

/// Best-effort description of the limiter/throttle snapshot carried in the
/// decision hash layout when `throttleStatsTag == 1`. Field set is not
/// pinned by the source spec beyond "a struct"; fixed here at four `u16`s
/// and frozen under layout v1 like everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Tokens remaining in the limiter at decision time.
    pub tokens_remaining: u16,
    /// Ticks remaining in the current sliding window.
    pub window_remaining_ticks: u16,
    /// Attempts recorded so far in the current window.
    pub attempts_in_window: u16,
    /// Reserved for future use; always `0` under layout v1.
    pub reserved: u16,
}

impl ThrottleStats {
    fn encode(self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.tokens_remaining.to_be_bytes());
        buf.extend_from_slice(&self.window_remaining_ticks.to_be_bytes());
        buf.extend_from_slice(&self.attempts_in_window.to_be_bytes());
        buf.extend_from_slice(&self.reserved.to_be_bytes());
    }
}

/// Decision hash input layout v1 (§6): the fixed-width, big-endian, presence
/// tagged byte layout whose SHA-256 becomes `AdmissionDecision::decisionHash`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionHashInputV1 {
    /// Schema version of the decision itself (distinct from `layoutVersion`).
    pub decision_schema_version: u16,
    /// Identifies which capacity tier produced this decision.
    pub tier_id: u16,
    /// Schema version of whatever produced `tier_id` (profile-hash epoch).
    pub other_schema_version: u16,
    /// Truncated (first 8 bytes, big-endian) SSOT profile hash.
    pub policy_hash: u64,
    /// Truncated (first 8 bytes, big-endian) session identity hash.
    pub session_stable_id: u64,
    /// Truncated (first 8 bytes, big-endian) candidate identity hash.
    pub candidate_stable_id: u64,
    /// Signed, fixed-point-scaled value score (e.g. `eebDelta * 1000`).
    pub value_score: i64,
    /// Per-flow counters; length becomes `flowBucketCount` (max 255).
    pub per_flow_counters: Vec<u16>,
    /// Limiter snapshot, if one was available at decision time.
    pub throttle_stats: Option<ThrottleStats>,
    /// Build-mode-derived degradation level (`Normal=0, Damping=1, Saturated=2`).
    pub degradation_level: u8,
    /// Hard fuse trigger, if this decision carries one.
    pub degradation_reason: Option<HardFuseTrigger>,
    /// Reject reason, if this decision is a rejection.
    pub reject_reason: Option<RejectReason>,
}

impl DecisionHashInputV1 {
    /// Builds the layout-v1 input from an [`AdmissionDecision`] plus the
    /// identity/policy context needed to populate the generic fields that
    /// `AdmissionDecision` itself does not carry.
    #[must_use]
    pub fn from_decision(
        decision: &AdmissionDecision,
        policy_hash: &Hash,
        session_id: &Hash,
    ) -> Self {
        Self {
            decision_schema_version: 1,
            tier_id: 0,
            other_schema_version: 1,
            policy_hash: be_u64_prefix(policy_hash),
            session_stable_id: be_u64_prefix(session_id),
            candidate_stable_id: be_u64_prefix(&sha256(decision.candidate_id.as_bytes())),
            #[allow(clippy::cast_possible_truncation)]
            value_score: (decision.eeb_delta * 1000.0).round() as i64,
            per_flow_counters: Vec::new(),
            throttle_stats: None,
            degradation_level: match decision.build_mode {
                BuildMode::Normal => 0,
                BuildMode::Damping => 1,
                BuildMode::Saturated => 2,
            },
            degradation_reason: decision.hard_fuse_trigger,
            reject_reason: decision.reject_reason,
        }
    }

    /// Encodes this value into the frozen layout-v1 byte sequence.
    ///
    /// # Panics
    /// Panics if `per_flow_counters` exceeds 255 entries — the format's `u8`
    /// count field cannot represent more.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        assert!(
            self.per_flow_counters.len() <= 255,
            "flowBucketCount overflow: {} entries",
            self.per_flow_counters.len()
        );
        let mut buf = Vec::with_capacity(64);
        buf.push(1u8); // layoutVersion
        buf.extend_from_slice(&self.decision_schema_version.to_be_bytes());
        buf.extend_from_slice(&self.tier_id.to_be_bytes());
        buf.extend_from_slice(&self.other_schema_version.to_be_bytes());
        buf.extend_from_slice(&self.policy_hash.to_be_bytes());
        buf.extend_from_slice(&self.session_stable_id.to_be_bytes());
        buf.extend_from_slice(&self.candidate_stable_id.to_be_bytes());
        buf.extend_from_slice(&self.value_score.to_be_bytes());
        #[allow(clippy::cast_possible_truncation)]
        buf.push(self.per_flow_counters.len() as u8);
        for counter in &self.per_flow_counters {
            buf.extend_from_slice(&counter.to_be_bytes());
        }
        match self.throttle_stats {
            Some(stats) => {
                buf.push(1);
                stats.encode(&mut buf);
            }
            None => buf.push(0),
        }
        buf.push(self.degradation_level);
        match self.degradation_reason {
            Some(trigger) => {
                buf.push(1);
                buf.push(hard_fuse_trigger_tag(trigger));
            }
            None => buf.push(0),
        }
        match self.reject_reason {
            Some(reason) => {
                buf.push(1);
                buf.push(reject_reason_tag(reason));
            }
            None => buf.push(0),
        }
        pad_to_alignment(&mut buf);
        buf
    }

    /// SHA-256 of [`Self::encode`].
    #[must_use]
    pub fn decision_hash(&self) -> Hash {
        sha256(&self.encode())
    }
}

fn hard_fuse_trigger_tag(trigger: HardFuseTrigger) -> u8 {
    match trigger {
        HardFuseTrigger::PatchCountHard => 0,
        HardFuseTrigger::EebHard => 1,
    }
}

fn reject_reason_tag(reason: RejectReason) -> u8 {
    match reason {
        RejectReason::Duplicate => 0,
        RejectReason::HardCap => 1,
        RejectReason::LowGainSoft => 2,
        RejectReason::RedundantCoverage => 3,
    }
}

fn be_u64_prefix(hash: &Hash) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&hash[..8]);
    u64::from_be_bytes(buf)
}

/// `resultTag` of the extension-result idempotency layout: whether the
/// operation extended state or was denied outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionResultTag {
    /// The operation extended tracked state.
    Extended,
    /// The operation was denied.
    Denied,
}

/// Extension result idempotency layout v1 (§6). `alreadyProcessed` callers
/// must re-emit these exact bytes unchanged; this type carries the
/// already-encoded snapshot so a second call cannot accidentally re-derive
/// (and potentially diverge from) the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionResultIdempotencyV1 {
    tag: ExtensionResultTag,
    snapshot: Vec<u8>,
}

impl ExtensionResultIdempotencyV1 {
    /// Builds a fresh (first-time) idempotency record from a snapshot
    /// payload (typically the relevant [`DecisionHashInputV1::encode`] bytes).
    #[must_use]
    pub fn new(tag: ExtensionResultTag, snapshot: Vec<u8>) -> Self {
        Self { tag, snapshot }
    }

    /// Encodes this record into the frozen layout-v1 byte sequence.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + self.snapshot.len());
        buf.push(1u8); // layoutVersion
        buf.push(match self.tag {
            ExtensionResultTag::Extended => 0,
            ExtensionResultTag::Denied => 1,
        });
        #[allow(clippy::cast_possible_truncation)]
        buf.extend_from_slice(&(self.snapshot.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.snapshot);
        pad_to_alignment(&mut buf);
        buf
    }

    /// Returns the already-encoded snapshot bytes. `alreadyProcessed` wrappers
    /// call this (never [`Self::encode`] freshly re-derived from new state)
    /// so a replay is guaranteed byte-identical to the original.
    #[must_use]
    pub fn snapshot_bytes(&self) -> &[u8] {
        &self.snapshot
    }
}

/// Marker type grouping the canonical encoders; exists so call sites read
/// `CanonicalEncoder::decision_hash(..)` rather than a bare free function,
/// matching the "protocol + concrete implementation" style used throughout.
pub struct CanonicalEncoder;

impl CanonicalEncoder {
    /// Computes a decision hash directly from an [`AdmissionDecision`] plus
    /// identity context, without exposing the intermediate layout value.
    #[must_use]
    pub fn decision_hash(
        decision: &AdmissionDecision,
        policy_hash: &Hash,
        session_id: &Hash,
    ) -> Hash {
        DecisionHashInputV1::from_decision(decision, policy_hash, session_id).decision_hash()
    }
}
