// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `EvidenceGrid`: bounded, tombstone-evicting spatial hash (§4.6).

use std::collections::BTreeMap;

use crate::cell::{GridCell, SpatialKey};

/// One queued mutation against an [`EvidenceGrid`].
#[derive(Debug, Clone, PartialEq)]
pub enum GridOp {
    /// Add a new cell (behaves as [`GridOp::Update`] if the key already exists).
    Insert(SpatialKey, GridCell),
    /// Replace a cell's state. `lastUpdatedMillis` must not regress.
    Update(SpatialKey, GridCell),
    /// Mark a key as evicted (tombstone).
    Evict(SpatialKey),
}

impl GridOp {
    /// Drop priority ordinal: lower drops first on batch overflow
    /// (`Evict < Update < Insert`, §4.6).
    fn drop_priority(&self) -> u8 {
        match self {
            Self::Evict(_) => 0,
            Self::Update(..) => 1,
            Self::Insert(..) => 2,
        }
    }
}

/// Bounded queue of [`GridOp`]s awaiting [`EvidenceGrid::apply`].
#[derive(Debug, Clone, Default)]
pub struct EvidenceGridDeltaBatch {
    ops: Vec<GridOp>,
    capacity: usize,
}

impl EvidenceGridDeltaBatch {
    /// Constructs an empty batch bounded to `capacity` operations.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            ops: Vec::new(),
            capacity,
        }
    }

    /// Enqueues `op`, dropping the lowest-drop-priority operation already
    /// queued if this would exceed capacity (deterministic: ties broken by
    /// earliest-enqueued-first).
    pub fn push(&mut self, op: GridOp) {
        self.ops.push(op);
        while self.ops.len() > self.capacity {
            let Some((idx, _)) = self
                .ops
                .iter()
                .enumerate()
                .min_by_key(|(idx, op)| (op.drop_priority(), *idx))
            else {
                break;
            };
            self.ops.remove(idx);
        }
    }

    /// The queued operations, in enqueue order.
    #[must_use]
    pub fn ops(&self) -> &[GridOp] {
        &self.ops
    }
}

/// Ordered, bounded-capacity spatial hash of [`GridCell`]s keyed by
/// [`SpatialKey`]. Iteration is deterministic ascending-key order;
/// eviction is oldest-`lastUpdatedMillis`-first with tombstones retained
/// until [`EvidenceGrid::compact`].
#[derive(Debug, Clone)]
pub struct EvidenceGrid {
    cells: BTreeMap<SpatialKey, GridCell>,
    tombstones: BTreeMap<SpatialKey, ()>,
    max_cells: usize,
}

impl EvidenceGrid {
    /// Constructs an empty grid bounded to `max_cells` active cells.
    #[must_use]
    pub fn new(max_cells: usize) -> Self {
        Self {
            cells: BTreeMap::new(),
            tombstones: BTreeMap::new(),
            max_cells,
        }
    }

    /// Configured cell budget.
    #[must_use]
    pub fn max_cells(&self) -> usize {
        self.max_cells
    }

    /// Number of active (non-tombstoned) cells.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.cells.len()
    }

    /// All active cells, in deterministic ascending-key order. Two
    /// successive calls without an intervening [`Self::apply`] return
    /// identical sequences.
    pub fn all_active_cells(&self) -> impl Iterator<Item = (&SpatialKey, &GridCell)> {
        self.cells.iter()
    }

    /// Whether `key` has been tombstoned (evicted, not yet compacted).
    #[must_use]
    pub fn is_tombstoned(&self, key: &SpatialKey) -> bool {
        self.tombstones.contains_key(key)
    }

    /// Applies a batch of operations in enqueued order, then enforces the
    /// cell budget by evicting oldest-`lastUpdatedMillis`-first (ties
    /// broken by ascending key).
    pub fn apply(&mut self, batch: &EvidenceGridDeltaBatch) {
        for op in batch.ops() {
            match op {
                GridOp::Insert(key, cell) | GridOp::Update(key, cell) => {
                    if let Some(existing) = self.cells.get(key) {
                        assert!(
                            cell.last_updated_millis >= existing.last_updated_millis,
                            "lastUpdatedMillis regressed for key {key:?}"
                        );
                    }
                    self.tombstones.remove(key);
                    self.cells.insert(*key, *cell);
                }
                GridOp::Evict(key) => {
                    self.cells.remove(key);
                    self.tombstones.insert(*key, ());
                }
            }
        }
        self.enforce_capacity();
    }

    fn enforce_capacity(&mut self) {
        while self.cells.len() > self.max_cells {
            let Some((&oldest_key, _)) = self
                .cells
                .iter()
                .min_by_key(|(key, cell)| (cell.last_updated_millis, **key))
            else {
                break;
            };
            self.cells.remove(&oldest_key);
            self.tombstones.insert(oldest_key, ());
        }
    }

    /// Drops all tombstone records, forgetting which keys were ever
    /// evicted. Active cells are unaffected.
    pub fn compact(&mut self) {
        self.tombstones.clear();
    }
}
