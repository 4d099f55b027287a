// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic zero-trig direction bucketing (§4.1).
//!
//! Maps a normalized direction `(dx, dy, dz)` onto a phi bucket (12 buckets
//! of 15° spanning `[-90°, 90°]`) and a theta bucket (24 buckets of 15°
//! spanning `[0°, 360°)`), without calling `asin`, `atan2`, `sin`, or `cos`
//! at runtime. The boundary constants below are the exact values of those
//! functions at multiples of 15°, folded in at compile time — never
//! recomputed on the hot path — so the bucketing is bit-identical across
//! every platform this code ever runs on.

/// Exact `sin(k * 15° - 90°)` for `k = 0..=12`: the 13 boundaries splitting
/// `φ ∈ [-90°, 90°]` into 12 buckets.
const PHI_SIN_BOUNDARIES: [f64; 13] = [
    -1.0,
    -0.965_925_826_289_068_3,
    -0.866_025_403_784_438_6,
    -0.707_106_781_186_547_6,
    -0.5,
    -0.258_819_045_102_520_74,
    0.0,
    0.258_819_045_102_520_74,
    0.5,
    0.707_106_781_186_547_6,
    0.866_025_403_784_438_6,
    0.965_925_826_289_068_3,
    1.0,
];

/// Exact `(sin(k * 15°), cos(k * 15°))` for `k = 0..=23`: the 24 unit
/// vectors theta bucketing projects a normalized `(dx, dz)` onto.
const THETA_UNIT_VECTORS: [(f64, f64); 24] = [
    (0.0, 1.0),
    (0.258_819_045_102_520_74, 0.965_925_826_289_068_3),
    (0.5, 0.866_025_403_784_438_6),
    (0.707_106_781_186_547_6, 0.707_106_781_186_547_6),
    (0.866_025_403_784_438_6, 0.5),
    (0.965_925_826_289_068_3, 0.258_819_045_102_520_74),
    (1.0, 0.0),
    (0.965_925_826_289_068_3, -0.258_819_045_102_520_74),
    (0.866_025_403_784_438_6, -0.5),
    (0.707_106_781_186_547_6, -0.707_106_781_186_547_6),
    (0.5, -0.866_025_403_784_438_6),
    (0.258_819_045_102_520_74, -0.965_925_826_289_068_3),
    (0.0, -1.0),
    (-0.258_819_045_102_520_74, -0.965_925_826_289_068_3),
    (-0.5, -0.866_025_403_784_438_6),
    (-0.707_106_781_186_547_6, -0.707_106_781_186_547_6),
    (-0.866_025_403_784_438_6, -0.5),
    (-0.965_925_826_289_068_3, -0.258_819_045_102_520_74),
    (-1.0, 0.0),
    (-0.965_925_826_289_068_3, 0.258_819_045_102_520_74),
    (-0.866_025_403_784_438_6, 0.5),
    (-0.707_106_781_186_547_6, 0.707_106_781_186_547_6),
    (-0.5, 0.866_025_403_784_438_6),
    (-0.258_819_045_102_520_74, 0.965_925_826_289_068_3),
];

/// Minimum `(dx, dz)` length below which theta bucketing falls back to
/// bucket 0 (deterministic policy for the near-gimbal case).
const THETA_DEGENERATE_EPS: f64 = 1e-10;

/// Computes the phi bucket (`0..=11`) for a `dy` component in `[-1, 1]`.
///
/// `dy` is clamped into range first. Implemented as a binary search over
/// [`PHI_SIN_BOUNDARIES`] for the largest index `i` with `boundary[i] <= dy`;
/// the result is that index, clamped to `11` (the boundary array has one
/// more entry than there are buckets).
#[must_use]
pub fn phi_bucket(dy: f64) -> u8 {
    let dy = dy.clamp(-1.0, 1.0);
    // `partition_point` returns the first index where the predicate is
    // false, i.e. the count of boundaries `<= dy` (boundaries are sorted
    // ascending and distinct), so `count - 1` is the largest satisfying index.
    let count = PHI_SIN_BOUNDARIES.partition_point(|&b| b <= dy);
    let idx = count.saturating_sub(1);
    u8::try_from(idx.min(11)).unwrap_or(11)
}

/// Computes the theta bucket (`0..=23`) for a direction's `(dx, dz)`
/// components, scanning all 24 candidate unit vectors.
///
/// Returns bucket `0` if `(dx, dz)` has length below
/// [`THETA_DEGENERATE_EPS`] (the gimbal fallback).
#[must_use]
pub fn theta_bucket_full(dx: f64, dz: f64) -> u8 {
    let len_sq = dx * dx + dz * dz;
    if len_sq < THETA_DEGENERATE_EPS * THETA_DEGENERATE_EPS {
        return 0;
    }
    let len = len_sq.sqrt();
    let (nx, nz) = (dx / len, dz / len);
    argmax_dot(&THETA_UNIT_VECTORS, nx, nz)
}

/// Computes the theta bucket the same way as [`theta_bucket_full`], but
/// first narrows the 24 candidates to the 7 nearest a coarse quadrant guess
/// (keyed by the signs of `nx`/`nz`) before taking the argmax. Must always
/// agree with [`theta_bucket_full`]; this is exercised as a property test.
#[must_use]
pub fn theta_bucket_optimized(dx: f64, dz: f64) -> u8 {
    let len_sq = dx * dx + dz * dz;
    if len_sq < THETA_DEGENERATE_EPS * THETA_DEGENERATE_EPS {
        return 0;
    }
    let len = len_sq.sqrt();
    let (nx, nz) = (dx / len, dz / len);

    let candidates: [usize; 7] = match (nx >= 0.0, nz >= 0.0) {
        (true, true) => [0, 1, 2, 3, 4, 5, 6],
        (true, false) => [6, 7, 8, 9, 10, 11, 12],
        (false, false) => [12, 13, 14, 15, 16, 17, 18],
        (false, true) => [18, 19, 20, 21, 22, 23, 0],
    };

    let mut best_idx = candidates[0];
    let mut best_dot = f64::NEG_INFINITY;
    for &idx in &candidates {
        let (ux, uz) = THETA_UNIT_VECTORS[idx];
        let dot = nx * ux + nz * uz;
        if dot > best_dot {
            best_dot = dot;
            best_idx = idx;
        }
    }
    u8::try_from(best_idx).unwrap_or(0)
}

fn argmax_dot(vectors: &[(f64, f64); 24], nx: f64, nz: f64) -> u8 {
    let mut best_idx = 0usize;
    let mut best_dot = f64::NEG_INFINITY;
    for (idx, &(ux, uz)) in vectors.iter().enumerate() {
        let dot = nx * ux + nz * uz;
        if dot > best_dot {
            best_dot = dot;
            best_idx = idx;
        }
    }
    u8::try_from(best_idx).unwrap_or(0)
}

/// Running tally of shadow-verifier comparisons (§4.1).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShadowStats {
    /// Total comparisons performed.
    pub total_comparisons: u64,
    /// Count of phi-bucket mismatches between the zero-trig and asin paths.
    pub phi_mismatches: u64,
    /// Count of theta-bucket mismatches between the zero-trig and atan2 paths.
    pub theta_mismatches: u64,
}

/// Debug/test-only shadow path that recomputes bucket indices using the
/// banned transcendental functions and cross-checks them against the
/// canonical zero-trig path. The canonical path remains authoritative
/// regardless of outcome; a nonzero mismatch count is a fatal test failure.
#[derive(Debug, Default)]
pub struct ShadowVerifier {
    stats: ShadowStats,
}

impl ShadowVerifier {
    /// Constructs a verifier with zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the accumulated statistics.
    #[must_use]
    pub fn stats(&self) -> ShadowStats {
        self.stats
    }

    /// Cross-checks `phi_bucket(dy)` against an `asin`-based computation.
    ///
    /// # Panics
    /// Panics if the shadow path disagrees with the canonical path — this
    /// is a fatal test failure per §7, never a recoverable condition.
    pub fn verify_phi(&mut self, dy: f64) -> u8 {
        let canonical = phi_bucket(dy);
        self.stats.total_comparisons += 1;
        let clamped = dy.clamp(-1.0, 1.0);
        let phi_deg = clamped.asin().to_degrees();
        let shadow = (((phi_deg + 90.0) / 15.0).floor() as i64).clamp(0, 11);
        #[allow(clippy::cast_sign_loss)]
        let shadow = shadow as u8;
        if shadow != canonical {
            self.stats.phi_mismatches += 1;
            assert_eq!(
                shadow, canonical,
                "zero-trig phi bucket diverged from asin shadow path at dy={dy}"
            );
        }
        canonical
    }

    /// Cross-checks `theta_bucket_full(dx, dz)` against an `atan2`-based
    /// computation.
    ///
    /// # Panics
    /// Panics if the shadow path disagrees with the canonical path.
    pub fn verify_theta(&mut self, dx: f64, dz: f64) -> u8 {
        let canonical = theta_bucket_full(dx, dz);
        self.stats.total_comparisons += 1;
        let len_sq = dx * dx + dz * dz;
        if len_sq < THETA_DEGENERATE_EPS * THETA_DEGENERATE_EPS {
            return canonical;
        }
        let theta_deg = dx.atan2(dz).to_degrees();
        let theta_deg = if theta_deg < 0.0 {
            theta_deg + 360.0
        } else {
            theta_deg
        };
        #[allow(clippy::cast_sign_loss)]
        let shadow = ((theta_deg / 15.0).round() as i64).rem_euclid(24) as u8;
        if shadow != canonical {
            self.stats.theta_mismatches += 1;
            assert_eq!(
                shadow, canonical,
                "zero-trig theta bucket diverged from atan2 shadow path at dx={dx}, dz={dz}"
            );
        }
        canonical
    }
}

/// Compact 24-bit set of observed theta bucket indices, packed into the low
/// 24 bits of a `u32` (the upper 8 bits must always be zero).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThetaBucketBitset(u32);

impl ThetaBucketBitset {
    const WIDTH: u32 = 24;
    const MASK: u32 = (1u32 << Self::WIDTH) - 1;

    /// Constructs an empty bitset.
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    /// Marks `bucket` (`0..=23`) as observed.
    ///
    /// # Panics
    /// Panics if `bucket >= 24`.
    pub fn insert(&mut self, bucket: u8) {
        assert!(bucket < 24, "theta bucket {bucket} out of range");
        self.0 |= 1u32 << bucket;
    }

    /// Returns whether `bucket` has been observed.
    #[must_use]
    pub fn contains(&self, bucket: u8) -> bool {
        bucket < 24 && (self.0 & (1u32 << bucket)) != 0
    }

    /// Returns the number of distinct observed buckets.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Clears all observations.
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Raw bit representation (upper 8 bits always zero).
    #[must_use]
    pub fn to_bits(&self) -> u32 {
        self.0
    }

    /// Reconstructs from raw bits, masking off any invalid high bits.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & Self::MASK)
    }

    /// Iterates filled bucket indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..24u8).filter(move |&b| self.contains(b))
    }

    /// Circular span: `24 - maxGap`, where the gap set includes the
    /// wrap-around gap. Empty/singleton sets have span 0; a full bitset has
    /// span 24.
    #[must_use]
    pub fn circular_span(&self) -> u32 {
        circular_span(self.iter().collect(), 24)
    }
}

/// Compact 12-bit set of observed phi bucket indices, packed into the low 12
/// bits of a `u16`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhiBucketBitset(u16);

impl PhiBucketBitset {
    const MASK: u16 = (1u16 << 12) - 1;

    /// Constructs an empty bitset.
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    /// Marks `bucket` (`0..=11`) as observed.
    ///
    /// # Panics
    /// Panics if `bucket >= 12`.
    pub fn insert(&mut self, bucket: u8) {
        assert!(bucket < 12, "phi bucket {bucket} out of range");
        self.0 |= 1u16 << bucket;
    }

    /// Returns whether `bucket` has been observed.
    #[must_use]
    pub fn contains(&self, bucket: u8) -> bool {
        bucket < 12 && (self.0 & (1u16 << bucket)) != 0
    }

    /// Returns the number of distinct observed buckets.
    #[must_use]
    pub fn count(&self) -> u32 {
        u32::from(self.0.count_ones())
    }

    /// Clears all observations.
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Raw bit representation (upper 4 bits always zero).
    #[must_use]
    pub fn to_bits(&self) -> u16 {
        self.0
    }

    /// Reconstructs from raw bits, masking off any invalid high bits.
    #[must_use]
    pub fn from_bits(bits: u16) -> Self {
        Self(bits & Self::MASK)
    }

    /// Iterates filled bucket indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..12u8).filter(move |&b| self.contains(b))
    }

    /// Linear span: `last - first`, not `+1`; zero for empty/singleton sets.
    #[must_use]
    pub fn linear_span(&self) -> u32 {
        let filled: Vec<u8> = self.iter().collect();
        if filled.len() < 2 {
            return 0;
        }
        u32::from(*filled.last().unwrap_or(&0) - filled[0])
    }
}

fn circular_span(filled: Vec<u8>, width: u8) -> u32 {
    if filled.len() < 2 {
        return 0;
    }
    let mut max_gap: i32 = 0;
    for pair in filled.windows(2) {
        let gap = i32::from(pair[1]) - i32::from(pair[0]) - 1;
        max_gap = max_gap.max(gap);
    }
    let first = i32::from(filled[0]);
    let last = i32::from(*filled.last().unwrap_or(&0));
    let wrap_gap = (i32::from(width) - last - 1) + first;
    max_gap = max_gap.max(wrap_gap);
    u32::try_from(i32::from(width) - max_gap).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn phi_bucket_exact_endpoints_and_center() {
        assert_eq!(phi_bucket(-1.0), 0);
        assert_eq!(phi_bucket(0.0), 6);
        assert_eq!(phi_bucket(1.0), 11);
    }

    #[test]
    fn phi_bucket_boundaries_map_to_k() {
        for k in 0..12u8 {
            let dy = PHI_SIN_BOUNDARIES[k as usize];
            assert_eq!(phi_bucket(dy), k);
        }
        // the 13th boundary (dy = 1.0) clamps into bucket 11, not 12.
        assert_eq!(phi_bucket(PHI_SIN_BOUNDARIES[12]), 11);
    }

    #[test]
    fn theta_degenerate_direction_falls_back_to_zero() {
        assert_eq!(theta_bucket_full(0.0, 0.0), 0);
        assert_eq!(theta_bucket_optimized(1e-12, 1e-12), 0);
    }

    #[test]
    fn theta_bucket_matches_unit_vectors_exactly() {
        for (k, &(ux, uz)) in THETA_UNIT_VECTORS.iter().enumerate() {
            assert_eq!(theta_bucket_full(ux, uz), k as u8);
            assert_eq!(theta_bucket_optimized(ux, uz), k as u8);
        }
    }

    proptest! {
        #[test]
        fn optimized_theta_matches_full(dx in -1.0f64..1.0, dz in -1.0f64..1.0) {
            prop_assume!(dx * dx + dz * dz > 1e-8);
            prop_assert_eq!(theta_bucket_full(dx, dz), theta_bucket_optimized(dx, dz));
        }

        #[test]
        fn phi_bucket_is_monotone_nondecreasing(a in -1.0f64..1.0, b in -1.0f64..1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(phi_bucket(lo) <= phi_bucket(hi));
        }
    }

    #[test]
    fn theta_bitset_circular_span_laws() {
        let mut bs = ThetaBucketBitset::new();
        assert_eq!(bs.circular_span(), 0);
        bs.insert(5);
        assert_eq!(bs.circular_span(), 0);
        for b in 0..24u8 {
            bs.insert(b);
        }
        assert_eq!(bs.circular_span(), 24);
    }

    #[test]
    fn theta_bitset_masks_invalid_high_bits_on_deserialize() {
        let bs = ThetaBucketBitset::from_bits(0xFFFF_FFFF);
        assert_eq!(bs.to_bits(), ThetaBucketBitset::MASK);
        assert_eq!(bs.count(), 24);
    }

    #[test]
    fn phi_bitset_linear_span_laws() {
        let mut bs = PhiBucketBitset::new();
        assert_eq!(bs.linear_span(), 0);
        bs.insert(3);
        assert_eq!(bs.linear_span(), 0);
        bs.insert(9);
        assert_eq!(bs.linear_span(), 6);
    }

    #[test]
    fn iteration_is_ascending() {
        let mut bs = ThetaBucketBitset::new();
        for b in [7, 2, 19, 0] {
            bs.insert(b);
        }
        let collected: Vec<u8> = bs.iter().collect();
        assert_eq!(collected, vec![0, 2, 7, 19]);
    }
}
