// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Quantized token-bucket rate limiter (§4.11).
//!
//! Ticks are an opaque, caller-supplied monotonic counter — not wall-clock
//! milliseconds — so callers can drive this deterministically in tests via
//! [`crate::clock::SequenceClock`] or a raw counter. Every failure mode this
//! module defines is fatal: a limiter that could roll back or overflow has
//! already lost the ability to bound anything, so there is nothing to
//! recover into.

/// Fatal limiter failure (§6, §7). All variants panic at the call site;
/// this type exists so the panic message is structured and the condition
/// has a name, not so callers can catch and recover from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterFault {
    /// `advanceTo` was called with a tick earlier than the last observed tick.
    TickRollback,
    /// Refill or window-reset arithmetic would overflow.
    ArithOverflow,
    /// `attemptsInWindow` saturated at `u32::MAX` (retry storm).
    AttemptsSaturated,
}

impl std::fmt::Display for LimiterFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::TickRollback => "TICK_ROLLBACK",
            Self::ArithOverflow => "LIMITER_ARITH_OVERFLOW",
            Self::AttemptsSaturated => "LIMITER_ARITH_OVERFLOW: attempts saturated",
        };
        f.write_str(msg)
    }
}

/// Sliding-window, fractional-token-refill rate limiter.
///
/// Window is `[startTick, startTick + windowTicks)`, left-closed right-open.
/// Call [`Self::advance_to`] before every [`Self::consume`].
#[derive(Debug, Clone, Copy)]
pub struct QuantizedTokenLimiter {
    start_tick: u64,
    window_ticks: u64,
    last_tick: u64,
    max_tokens: f64,
    refill_rate_per_tick: f64,
    tokens: f64,
    attempts_in_window: u32,
}

impl QuantizedTokenLimiter {
    /// Constructs a limiter starting at `initial_tick` with an empty window
    /// and a full token bucket.
    #[must_use]
    pub fn new(
        initial_tick: u64,
        window_ticks: u64,
        max_tokens: f64,
        refill_rate_per_tick: f64,
    ) -> Self {
        Self {
            start_tick: initial_tick,
            window_ticks,
            last_tick: initial_tick,
            max_tokens,
            refill_rate_per_tick,
            tokens: max_tokens,
            attempts_in_window: 0,
        }
    }

    /// Tokens currently available.
    #[must_use]
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Attempts recorded in the current window.
    #[must_use]
    pub fn attempts_in_window(&self) -> u32 {
        self.attempts_in_window
    }

    /// Advances the limiter's clock to `now`, sliding the window and
    /// refilling tokens as needed.
    ///
    /// # Panics
    /// Panics (fatal, per §7) on tick rollback or refill-arithmetic overflow.
    pub fn advance_to(&mut self, now: u64) {
        assert!(
            now >= self.last_tick,
            "{}: now={now} < last_tick={}",
            LimiterFault::TickRollback,
            self.last_tick
        );

        if now >= self.start_tick + self.window_ticks {
            self.start_tick = now;
            self.attempts_in_window = 0;
        }

        let delta = now - self.last_tick;
        let refill = checked_refill(delta, self.refill_rate_per_tick);
        self.tokens = (self.tokens + refill).min(self.max_tokens);
        self.last_tick = now;
    }

    /// Attempts to consume one token.
    ///
    /// Increments `attemptsInWindow` before checking tokens, per spec —
    /// even a denied attempt counts toward the window's attempt tally.
    ///
    /// # Panics
    /// Panics (fatal, per §7) if `attemptsInWindow` would saturate `u32::MAX`.
    pub fn consume(&mut self) -> bool {
        self.attempts_in_window = self
            .attempts_in_window
            .checked_add(1)
            .unwrap_or_else(|| panic!("{}", LimiterFault::AttemptsSaturated));

        if self.tokens > 0.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

fn checked_refill(delta_ticks: u64, refill_rate_per_tick: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let delta = delta_ticks as f64;
    let refill = delta * refill_rate_per_tick;
    assert!(
        refill.is_finite(),
        "{}: refill overflowed to {refill}",
        LimiterFault::ArithOverflow
    );
    refill
}
