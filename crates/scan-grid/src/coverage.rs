// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Coverage estimation: EMA smoothing plus an anti-jitter rate limiter
//! over the evidence grid's raw coverage figure (§4.8).

use crate::grid::EvidenceGrid;

/// Computes raw coverage: `Σ_cells (levelWeight(cell.level) · cell.ds.occupied) / maxCells`.
/// The denominator is the configured budget, not the active count — this
/// is "fraction of potential fill", not "average of what's there".
#[must_use]
pub fn raw_coverage(grid: &EvidenceGrid) -> f64 {
    if grid.max_cells() == 0 {
        return 0.0;
    }
    let sum: f64 = grid
        .all_active_cells()
        .map(|(_, cell)| cell.level.weight() * cell.ds.occupied)
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let denom = grid.max_cells() as f64;
    (sum / denom).clamp(0.0, 1.0)
}

/// EMA-smoothed, rate-limited coverage signal (§4.8). Holds its own state
/// so repeated calls form a single authority's turn sequence, matching the
/// "single mutator" concurrency model (§5).
#[derive(Debug, Clone, Copy)]
pub struct CoverageEstimator {
    alpha: f64,
    max_delta_per_sec: f64,
    smoothed: Option<f64>,
    emitted: Option<f64>,
}

impl CoverageEstimator {
    /// Constructs an estimator with empty EMA/limiter state.
    #[must_use]
    pub fn new(alpha: f64, max_delta_per_sec: f64) -> Self {
        Self {
            alpha,
            max_delta_per_sec,
            smoothed: None,
            emitted: None,
        }
    }

    /// Computes `raw_coverage(grid)`, folds it into the EMA, clamps the
    /// result to the anti-jitter band around the previously emitted value,
    /// and returns the value to surface to the user. Always in `[0,1]`.
    pub fn update(&mut self, grid: &EvidenceGrid, delta_seconds: f64) -> f64 {
        let raw = raw_coverage(grid);
        let smoothed = match self.smoothed {
            Some(prev) => self.alpha * raw + (1.0 - self.alpha) * prev,
            None => raw,
        };
        self.smoothed = Some(smoothed);

        let max_step = self.max_delta_per_sec * delta_seconds.max(0.0);
        let emitted = match self.emitted {
            Some(prev) => (smoothed - prev).clamp(-max_step, max_step) + prev,
            None => smoothed,
        };
        let emitted = emitted.clamp(0.0, 1.0);
        self.emitted = Some(emitted);
        emitted
    }

    /// Clears both the EMA state and the rate limiter's previous-emitted
    /// value; the next [`Self::update`] starts fresh from raw coverage.
    pub fn reset(&mut self) {
        self.smoothed = None;
        self.emitted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{DimensionalScoreSet, GridCell, Level};
    use crate::grid::{EvidenceGridDeltaBatch, GridOp};
    use crate::mass::DsMassFunction;
    use crate::cell::SpatialKey;

    fn occupied_cell(occupied: f64, level: Level) -> GridCell {
        GridCell {
            patch_id: uuid::Uuid::nil(),
            quantized_position: [0, 0, 0],
            dimensional_score_set: DimensionalScoreSet([0.0; 9]),
            ds: DsMassFunction {
                occupied,
                free: 0.0,
                unknown: 1.0 - occupied,
            },
            level,
            directional_mask: 0,
            last_updated_millis: 0,
        }
    }

    #[test]
    fn empty_grid_has_zero_coverage() {
        let grid = EvidenceGrid::new(100);
        assert_eq!(raw_coverage(&grid), 0.0);
    }

    #[test]
    fn all_l0_grid_has_zero_coverage() {
        let mut grid = EvidenceGrid::new(10);
        let mut batch = EvidenceGridDeltaBatch::new(10);
        for i in 0..5 {
            batch.push(GridOp::Insert(
                SpatialKey::new(i, Level::L0),
                occupied_cell(1.0, Level::L0),
            ));
        }
        grid.apply(&batch);
        assert_eq!(raw_coverage(&grid), 0.0);
    }

    #[test]
    fn scenario_s7_coverage_convergence() {
        let mut grid = EvidenceGrid::new(200);
        let mut batch = EvidenceGridDeltaBatch::new(200);
        for i in 0..200 {
            batch.push(GridOp::Insert(
                SpatialKey::new(i, Level::L5),
                occupied_cell(0.95, Level::L5),
            ));
        }
        grid.apply(&batch);

        let mut estimator = CoverageEstimator::new(0.1, 0.2);
        let mut coverage = 0.0;
        for _ in 0..50 {
            coverage = estimator.update(&grid, 0.2);
        }
        assert!(coverage >= 0.80, "coverage {coverage} did not converge");
    }

    #[test]
    fn rate_limiter_bounds_step_size() {
        let mut grid = EvidenceGrid::new(10);
        let mut estimator = CoverageEstimator::new(1.0, 0.1);
        let first = estimator.update(&grid, 1.0);
        assert_eq!(first, 0.0);

        let mut batch = EvidenceGridDeltaBatch::new(10);
        for i in 0..10 {
            batch.push(GridOp::Insert(
                SpatialKey::new(i, Level::L6),
                occupied_cell(1.0, Level::L6),
            ));
        }
        grid.apply(&batch);
        let second = estimator.update(&grid, 1.0);
        assert!(second - first <= 0.1 + 1e-9);
    }

    #[test]
    fn reset_clears_ema_and_limiter_state() {
        let grid = EvidenceGrid::new(10);
        let mut estimator = CoverageEstimator::new(0.5, 1.0);
        estimator.update(&grid, 1.0);
        estimator.reset();
        assert!(estimator.smoothed.is_none());
        assert!(estimator.emitted.is_none());
    }
}
