// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Grid cell and spatial key types (§3, §4.6).

use crate::mass::DsMassFunction;

/// Coarseness level of a grid cell. `L0` is coarsest (weight `0.0`, never
/// contributes to coverage); `L6` is finest (weight `1.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Level {
    /// Coarsest level; contributes `0.0` coverage weight.
    L0 = 0,
    /// Level 1.
    L1 = 1,
    /// Level 2.
    L2 = 2,
    /// Level 3.
    L3 = 3,
    /// Level 4.
    L4 = 4,
    /// Level 5.
    L5 = 5,
    /// Finest level; contributes full `1.0` coverage weight.
    L6 = 6,
}

impl Level {
    /// Looks up this level's coverage weight in [`scan_core::config::LEVEL_WEIGHTS`].
    #[must_use]
    pub fn weight(self) -> f64 {
        scan_core::config::LEVEL_WEIGHTS[self as usize]
    }
}

/// `(mortonCode, level)`: the ordered key an [`crate::grid::EvidenceGrid`]
/// indexes cells by. Ordering is derived (Morton code first, level as
/// tiebreaker), which is exactly the deterministic iteration order §4.6
/// requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialKey {
    /// Bit-interleaved spatial coordinate (see [`crate::morton`]).
    pub morton_code: u64,
    /// Coarseness level.
    pub level: Level,
}

impl SpatialKey {
    /// Constructs a key.
    #[must_use]
    pub fn new(morton_code: u64, level: Level) -> Self {
        Self { morton_code, level }
    }
}

/// Nine bounded `[0,1]` per-dimension scores attached to a cell (surface
/// normal confidence, texture richness, etc. — the specific dimensions are
/// owned by the out-of-scope perception layer; this crate only guarantees
/// the bound).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimensionalScoreSet(pub [f64; 9]);

impl DimensionalScoreSet {
    /// Clamps every channel into `[0,1]`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self(self.0.map(|v| v.clamp(0.0, 1.0)))
    }
}

/// One occupied grid cell (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridCell {
    /// Identity of the patch that created/most recently updated this cell.
    pub patch_id: uuid::Uuid,
    /// Quantized integer position (see [`crate::morton::quantize`]).
    pub quantized_position: [i64; 3],
    /// Nine bounded per-dimension scores.
    pub dimensional_score_set: DimensionalScoreSet,
    /// Current belief mass.
    pub ds: DsMassFunction,
    /// Coarseness level.
    pub level: Level,
    /// Bitmask of observation directions; two independent bits set means
    /// "observed from ≥2 distinct directions" (theta/phi bucket indices
    /// folded into a single word by the caller).
    pub directional_mask: u32,
    /// Wall-clock time of the most recent update, milliseconds.
    pub last_updated_millis: u64,
}

impl GridCell {
    /// Whether this cell has been observed from at least two distinct
    /// directions (two or more bits set in `directional_mask`).
    #[must_use]
    pub fn has_multi_directional_observation(&self) -> bool {
        self.directional_mask.count_ones() >= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spatial_key_orders_by_morton_then_level() {
        let a = SpatialKey::new(5, Level::L0);
        let b = SpatialKey::new(5, Level::L1);
        let c = SpatialKey::new(6, Level::L0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn level_weights_are_anchored() {
        assert_eq!(Level::L0.weight(), 0.0);
        assert_eq!(Level::L6.weight(), 1.0);
    }

    #[test]
    fn multi_directional_detection_needs_two_bits() {
        let mut cell = GridCell {
            patch_id: uuid::Uuid::nil(),
            quantized_position: [0, 0, 0],
            dimensional_score_set: DimensionalScoreSet([0.0; 9]),
            ds: DsMassFunction::vacuous(),
            level: Level::L0,
            directional_mask: 0,
            last_updated_millis: 0,
        };
        assert!(!cell.has_multi_directional_observation());
        cell.directional_mask = 0b1;
        assert!(!cell.has_multi_directional_observation());
        cell.directional_mask = 0b101;
        assert!(cell.has_multi_directional_observation());
    }
}
