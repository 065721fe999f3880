//! Odometer over the free coefficients of one mask pair
//!
//! Digits are the free positions, numerator first (constant-term end least
//! significant), rolling over into the denominator. A free digit runs
//! `1..n` and carries back to 1; the locked digit walks its
//! representative set and carries back to the first representative.

use super::mask::{Lock, PlannedPair, SearchPlan, Side};
use crate::algebra::{Element, Poly, ONE};

/// Position of the sweep: what to check next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumeratorState {
    /// Index of the current pair in the plan.
    pub pair: usize,
    /// Next numerator to check.
    pub f: Poly,
    /// Next denominator to check.
    pub g: Poly,
    /// Index into the locked position's representative set.
    pub lock_cursor: usize,
    /// Candidates accounted for so far.
    pub count: u64,
    /// Denominator values, cached for the current denominator.
    pub g_values: Option<Vec<Element>>,
}

/// Outcome of stepping the odometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A numerator digit moved; the denominator is unchanged.
    Numerator,
    /// The numerator wrapped and a denominator digit moved.
    Denominator,
    /// Every digit wrapped: the pair is finished.
    Exhausted,
}

impl EnumeratorState {
    /// State at the first candidate of pair `pair` (or past the end).
    pub fn start(plan: &SearchPlan, pair: usize, count: u64) -> Self {
        let mut state = Self {
            pair,
            f: Vec::new(),
            g: Vec::new(),
            lock_cursor: 0,
            count,
            g_values: None,
        };
        state.reset_to_pair(plan);
        state
    }

    /// True once every pair has been swept.
    pub fn is_done(&self, plan: &SearchPlan) -> bool {
        self.pair >= plan.pairs().len()
    }

    /// Move to the first candidate of the following pair.
    pub fn next_pair(&mut self, plan: &SearchPlan) {
        self.pair += 1;
        self.reset_to_pair(plan);
    }

    fn reset_to_pair(&mut self, plan: &SearchPlan) {
        self.lock_cursor = 0;
        self.g_values = None;
        if let Some(pair) = plan.pairs().get(self.pair) {
            self.f = plan.initial_numerator(&pair.masks.f);
            self.g = plan.initial_denominator(&pair.masks.g);
        }
    }

    /// Step to the next candidate.
    pub fn advance(&mut self, plan: &SearchPlan) -> Advance {
        let Some(pair) = plan.pairs().get(self.pair) else {
            return Advance::Exhausted;
        };
        for &pos in &pair.f_digits {
            if !self.increment(plan, pair, Side::Numerator, pos) {
                return Advance::Numerator;
            }
        }
        self.advance_denominator_digits(plan, pair)
    }

    /// Skip the rest of the numerator sweep and step the denominator.
    ///
    /// Only valid while the numerator is at its initial values.
    pub fn advance_denominator(&mut self, plan: &SearchPlan) -> Advance {
        match plan.pairs().get(self.pair) {
            Some(pair) => self.advance_denominator_digits(plan, pair),
            None => Advance::Exhausted,
        }
    }

    fn advance_denominator_digits(&mut self, plan: &SearchPlan, pair: &PlannedPair) -> Advance {
        for &pos in &pair.g_digits {
            if !self.increment(plan, pair, Side::Denominator, pos) {
                self.g_values = None;
                return Advance::Denominator;
            }
        }
        Advance::Exhausted
    }

    /// Increment one digit; returns true on carry.
    fn increment(&mut self, plan: &SearchPlan, pair: &PlannedPair, side: Side, pos: usize) -> bool {
        let locked = pair.lock == Some(Lock { side, position: pos });
        let poly = match side {
            Side::Numerator => &mut self.f,
            Side::Denominator => &mut self.g,
        };
        if locked {
            let reps = plan.representatives().get(pos);
            self.lock_cursor += 1;
            match reps.get(self.lock_cursor) {
                Some(value) => {
                    poly[pos] = value;
                    false
                }
                None => {
                    self.lock_cursor = 0;
                    poly[pos] = reps.get(0).unwrap_or(ONE);
                    true
                }
            }
        } else {
            poly[pos] += 1;
            if poly[pos] == plan.order() {
                poly[pos] = ONE;
                true
            } else {
                false
            }
        }
    }
}
