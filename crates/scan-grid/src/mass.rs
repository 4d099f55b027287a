// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dempster-Shafer belief mass and fusion (§4.7).

/// A non-negative `(occupied, free, unknown)` triple summing to `1.0`
/// within `DS_EPSILON`. NaN/Inf components are never constructed directly;
/// use [`DsMassFunction::sanitized`] at any external boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DsMassFunction {
    /// Belief mass assigned to "occupied".
    pub occupied: f64,
    /// Belief mass assigned to "free".
    pub free: f64,
    /// Belief mass assigned to "unknown".
    pub unknown: f64,
}

impl DsMassFunction {
    /// The vacuous mass `(0, 0, 1)`: total ignorance.
    #[must_use]
    pub const fn vacuous() -> Self {
        Self {
            occupied: 0.0,
            free: 0.0,
            unknown: 1.0,
        }
    }

    /// Returns `self` unchanged if all three components are finite and
    /// non-negative, otherwise the vacuous mass (§4.7 "NaN/Inf inputs must
    /// be mapped to vacuous").
    #[must_use]
    pub fn sanitized(self) -> Self {
        let finite_nonneg = self.occupied.is_finite()
            && self.free.is_finite()
            && self.unknown.is_finite()
            && self.occupied >= 0.0
            && self.free >= 0.0
            && self.unknown >= 0.0;
        if finite_nonneg {
            self
        } else {
            Self::vacuous()
        }
    }

    /// Whether `occupied + free + unknown == 1.0` within `epsilon`.
    #[must_use]
    pub fn sums_to_one(&self, epsilon: f64) -> bool {
        (self.occupied + self.free + self.unknown - 1.0).abs() <= epsilon
    }

    /// Maps a monotone `[0,1]` verdict strength to a mass: `1.0` → mostly
    /// occupied, `0.5` → mostly unknown, `0.0` → small free mass with high
    /// unknown (§4.7 "Verdict → mass mapping").
    #[must_use]
    pub fn from_delta_multiplier(delta_multiplier: f64) -> Self {
        let d = delta_multiplier.clamp(0.0, 1.0);
        // Linear ramp: occupied grows with d, free shrinks toward 0 as d
        // grows, unknown fills whatever's left. At d=0.5 this yields
        // (0.25, 0.25, 0.5) — "mostly unknown" as specified.
        let occupied = 0.5 * d;
        let free = 0.5 * (1.0 - d);
        let unknown = 1.0 - occupied - free;
        Self {
            occupied,
            free,
            unknown,
        }
        .sanitized()
    }

    /// Reliability discount (§4.7): `r=0` yields vacuous, `r=1` preserves
    /// `self`. Preserves the sum-to-one invariant for any `r ∈ [0,1]`.
    #[must_use]
    pub fn discount(self, r: f64) -> Self {
        let r = r.clamp(0.0, 1.0);
        let m = self.sanitized();
        Self {
            occupied: r * m.occupied,
            free: r * m.free,
            unknown: 1.0 - r * (m.occupied + m.free),
        }
    }
}

/// Conflict mass `K` at/above which [`dempster_combine`] takes the Yager
/// fallback branch instead of renormalizing.
pub const DEFAULT_DS_CONFLICT_SWITCH: f64 = 0.95;

/// Combines two belief masses per Dempster's rule, falling back to the
/// Yager rule when conflict mass `K >= conflict_switch` (§4.7). NaN/Inf
/// inputs are sanitized to vacuous before combination. Commutative in `m1`
/// and `m2`.
#[must_use]
pub fn dempster_combine(m1: DsMassFunction, m2: DsMassFunction, conflict_switch: f64) -> DsMassFunction {
    let a = m1.sanitized();
    let b = m2.sanitized();

    let k = a.occupied * b.free + a.free * b.occupied;

    if k < conflict_switch {
        let denom = 1.0 - k;
        DsMassFunction {
            occupied: (a.occupied * b.occupied + a.occupied * b.unknown + a.unknown * b.occupied)
                / denom,
            free: (a.free * b.free + a.free * b.unknown + a.unknown * b.free) / denom,
            unknown: (a.unknown * b.unknown) / denom,
        }
    } else {
        DsMassFunction {
            occupied: a.occupied * b.occupied + a.occupied * b.unknown + a.unknown * b.occupied,
            free: a.free * b.free + a.free * b.unknown + a.unknown * b.free,
            unknown: a.unknown * b.unknown + k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_mass() -> impl Strategy<Value = DsMassFunction> {
        (0.0f64..1.0, 0.0f64..1.0).prop_map(|(a, b)| {
            let occupied = a * (1.0 - b);
            let free = b * (1.0 - a);
            let unknown = 1.0 - occupied - free;
            DsMassFunction {
                occupied,
                free,
                unknown,
            }
        })
    }

    #[test]
    fn nan_inputs_sanitize_to_vacuous() {
        let m = DsMassFunction {
            occupied: f64::NAN,
            free: 0.2,
            unknown: 0.8,
        };
        assert_eq!(m.sanitized(), DsMassFunction::vacuous());
    }

    #[test]
    fn discount_zero_is_vacuous_one_is_identity() {
        let m = DsMassFunction {
            occupied: 0.6,
            free: 0.3,
            unknown: 0.1,
        };
        assert_eq!(m.discount(0.0), DsMassFunction::vacuous());
        let preserved = m.discount(1.0);
        assert!((preserved.occupied - m.occupied).abs() < 1e-12);
        assert!((preserved.free - m.free).abs() < 1e-12);
    }

    #[test]
    fn yager_branch_assigns_conflict_to_unknown() {
        let m1 = DsMassFunction {
            occupied: 0.85,
            free: 0.1,
            unknown: 0.05,
        };
        let m2 = DsMassFunction {
            occupied: 0.1,
            free: 0.85,
            unknown: 0.05,
        };
        let k = m1.occupied * m2.free + m1.free * m2.occupied;
        let combined = dempster_combine(m1, m2, DEFAULT_DS_CONFLICT_SWITCH);
        if k >= DEFAULT_DS_CONFLICT_SWITCH {
            assert!(combined.unknown > 0.0);
        }
        assert!(combined.sums_to_one(1e-6));
    }

    proptest! {
        #[test]
        fn combine_is_commutative(m1 in arb_mass(), m2 in arb_mass()) {
            let ab = dempster_combine(m1, m2, DEFAULT_DS_CONFLICT_SWITCH);
            let ba = dempster_combine(m2, m1, DEFAULT_DS_CONFLICT_SWITCH);
            prop_assert!((ab.occupied - ba.occupied).abs() < 1e-9);
            prop_assert!((ab.free - ba.free).abs() < 1e-9);
            prop_assert!((ab.unknown - ba.unknown).abs() < 1e-9);
        }

        #[test]
        fn combine_preserves_sum_to_one(m1 in arb_mass(), m2 in arb_mass()) {
            let combined = dempster_combine(m1, m2, DEFAULT_DS_CONFLICT_SWITCH);
            prop_assert!(combined.sums_to_one(1e-6));
        }

        #[test]
        fn discount_preserves_sum_to_one(m in arb_mass(), r in 0.0f64..1.0) {
            prop_assert!(m.discount(r).sums_to_one(1e-9));
        }
    }
}
