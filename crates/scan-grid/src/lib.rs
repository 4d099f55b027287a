// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! scan-grid: the Morton-coded evidence grid, Dempster-Shafer mass fusion,
//! and coverage estimation (§4.6, §4.7, §4.8).
//!
//! This crate is downstream of `scan-core`: it reuses `scan-core`'s SSOT
//! level-weight table and identifier types but owns no admission or
//! capacity-control logic of its own.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

/// Grid cell and spatial key types (§3, §4.6).
pub mod cell;
/// Coverage estimation: EMA smoothing plus anti-jitter rate limiting (§4.8).
pub mod coverage;
/// `EvidenceGrid` and its batched delta application (§4.6).
pub mod grid;
/// Dempster-Shafer belief mass and fusion (§4.7).
pub mod mass;
/// Spatial quantization and Morton coding (§4.6).
pub mod morton;

pub use cell::{DimensionalScoreSet, GridCell, Level, SpatialKey};
pub use coverage::{raw_coverage, CoverageEstimator};
pub use grid::{EvidenceGrid, EvidenceGridDeltaBatch, GridOp};
pub use mass::{dempster_combine, DsMassFunction, DEFAULT_DS_CONFLICT_SWITCH};
pub use morton::{decode as morton_decode, encode as morton_encode, quantize, AXIS_BIAS};
