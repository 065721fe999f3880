//! Coefficient masks and the search plan
//!
//! A mask marks which coefficient positions of a polynomial sweep over the
//! nonzero field elements; every other position stays pinned. The plan is
//! the ordered list of numerator/denominator mask pairs a run visits, each
//! with its locked position and the number of candidates it covers.

use std::fmt;

use bitvec::prelude::*;
use tracing::{debug, info};

use super::closure::ShiftClosure;
use crate::algebra::{Element, Poly, ONE, ZERO};
use crate::orbit::RepresentativeTable;
use crate::SearchConfig;

/// Free/pinned flags over the coefficient positions of one polynomial.
///
/// Position 0 is the leading coefficient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoefficientMask {
    bits: BitVec,
}

impl CoefficientMask {
    /// Mask of `len` positions with nothing free.
    pub fn pinned(len: usize) -> Self {
        Self {
            bits: bitvec![0; len],
        }
    }

    /// Mask for a degree-`degree` polynomial where bit `i` of `subset`
    /// frees position `degree - 1 - i`.
    pub fn from_subset(degree: usize, subset: u64) -> Self {
        let mut mask = Self::pinned(degree + 1);
        for i in 0..degree.min(64) {
            if (subset >> i) & 1 == 1 {
                mask.set_free(degree - 1 - i, true);
            }
        }
        mask
    }

    /// Number of positions (degree + 1).
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True for a zero-length mask.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// True if `position` sweeps.
    pub fn is_free(&self, position: usize) -> bool {
        self.bits.get(position).map_or(false, |bit| *bit)
    }

    /// Mark `position` free or pinned.
    pub fn set_free(&mut self, position: usize, free: bool) {
        if position < self.bits.len() {
            self.bits.set(position, free);
        }
    }

    /// True if at least one position sweeps.
    pub fn has_free(&self) -> bool {
        self.bits.any()
    }

    /// Free positions from the constant term towards the leading term;
    /// this is the odometer's digit order, least significant first.
    pub fn free_positions(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = self.bits.iter_ones().collect();
        positions.reverse();
        positions
    }

    /// Parse the `0`/`1` text produced by `Display`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut bits = BitVec::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '0' => bits.push(false),
                '1' => bits.push(true),
                _ => return None,
            }
        }
        Some(Self { bits })
    }
}

impl fmt::Display for CoefficientMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter() {
            f.write_str(if *bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Which mask family a pair belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Ordinary masks.
    Primary,
    /// Polynomial masks freeing the second coefficient when p > 2 divides
    /// the degree; closed under shifts.
    Supplemental,
}

impl Phase {
    /// Checkpoint flag: `true` for the supplemental phase.
    pub fn as_flag(self) -> bool {
        matches!(self, Phase::Supplemental)
    }

    /// Inverse of [`Phase::as_flag`].
    pub fn from_flag(flag: bool) -> Self {
        if flag {
            Phase::Supplemental
        } else {
            Phase::Primary
        }
    }
}

/// Numerator and denominator masks swept together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskPair {
    /// Numerator mask.
    pub f: CoefficientMask,
    /// Denominator mask.
    pub g: CoefficientMask,
    /// Mask family.
    pub phase: Phase,
}

impl fmt::Display for MaskPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.f, self.g)
    }
}

/// Numerator or denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The numerator f.
    Numerator,
    /// The denominator g.
    Denominator,
}

/// Position whose values are restricted to its representative set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lock {
    /// Polynomial holding the locked coefficient.
    pub side: Side,
    /// Coefficient position.
    pub position: usize,
}

/// One entry of the plan.
#[derive(Debug, Clone)]
pub struct PlannedPair {
    /// Masks swept.
    pub masks: MaskPair,
    /// Locked position, `None` in unreduced mode.
    pub lock: Option<Lock>,
    /// Numerator digits, least significant first.
    pub f_digits: Vec<usize>,
    /// Denominator digits, least significant first.
    pub g_digits: Vec<usize>,
    /// Candidates per denominator value (the whole numerator sweep).
    pub numerator_block: u64,
    /// Candidates covered by this pair.
    pub size: u64,
}

/// Search shape: polynomials or fractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Denominator fixed to 1.
    Polynomial,
    /// Denominator of degree at least 1.
    Fraction,
}

/// Ordered mask pairs and everything the odometer needs to sweep them.
#[derive(Debug, Clone)]
pub struct SearchPlan {
    mode: SearchMode,
    p: u32,
    order: u32,
    f_degree: usize,
    g_degree: usize,
    fixed_values: Vec<(usize, Element)>,
    pairs: Vec<PlannedPair>,
    reps: RepresentativeTable,
}

impl SearchPlan {
    /// Build the plan for `config`; `reps` must cover every position of
    /// both polynomials.
    pub fn new(config: &SearchConfig, reps: RepresentativeTable) -> Self {
        let p = config.p;
        let (f_degree, g_degree) = (config.f_degree, config.g_degree);
        let order = reps.full_range() as u32 + 1;
        let mode = if g_degree == 0 {
            SearchMode::Polynomial
        } else {
            SearchMode::Fraction
        };

        let mut zero_positions: Vec<usize> = config
            .fixed_zero_degrees
            .iter()
            .map(|&d| f_degree - d)
            .collect();
        let mut fixed_values = Vec::new();
        for (&degree, &value) in &config.fixed_degrees {
            if value == ZERO {
                zero_positions.push(f_degree - degree);
            } else {
                fixed_values.push((f_degree - degree, value));
            }
        }

        let constrain = |masks: Vec<CoefficientMask>| -> Vec<CoefficientMask> {
            let mut kept: Vec<CoefficientMask> = Vec::new();
            for mut mask in masks {
                for &pos in &zero_positions {
                    mask.set_free(pos, false);
                }
                if fixed_values.iter().any(|&(pos, _)| mask.is_free(pos)) {
                    continue;
                }
                if !kept.contains(&mask) {
                    kept.push(mask);
                }
            }
            kept
        };

        let mut pairs = Vec::new();
        match mode {
            SearchMode::Fraction => {
                let f_masks = constrain(fraction_numerator_masks(f_degree));
                let g_masks = fraction_denominator_masks(p, g_degree);
                for g in &g_masks {
                    for f in &f_masks {
                        pairs.push(MaskPair {
                            f: f.clone(),
                            g: g.clone(),
                            phase: Phase::Primary,
                        });
                    }
                }
            }
            SearchMode::Polynomial => {
                let (primary, supplemental) = polynomial_masks(p, f_degree);
                let primary: Vec<_> = constrain(primary)
                    .into_iter()
                    .filter(CoefficientMask::has_free)
                    .collect();
                let supplemental: Vec<_> = constrain(supplemental)
                    .into_iter()
                    .filter(|m| m.is_free(1))
                    .collect();
                let g = CoefficientMask::pinned(1);
                for (masks, phase) in [(primary, Phase::Primary), (supplemental, Phase::Supplemental)] {
                    for f in masks {
                        pairs.push(MaskPair {
                            f,
                            g: g.clone(),
                            phase,
                        });
                    }
                }
            }
        }

        let pairs = pairs
            .into_iter()
            .map(|masks| plan_pair(masks, &reps, config.reduce))
            .collect();

        let plan = Self {
            mode,
            p,
            order,
            f_degree,
            g_degree,
            fixed_values,
            pairs,
            reps,
        };
        info!(
            pairs = plan.pairs.len(),
            total = plan.total(),
            mode = ?plan.mode,
            reduce = config.reduce,
            "search plan ready"
        );
        plan
    }

    /// Polynomial or fraction search.
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Field order n.
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Numerator degree.
    pub fn f_degree(&self) -> usize {
        self.f_degree
    }

    /// Denominator degree (0 in polynomial mode).
    pub fn g_degree(&self) -> usize {
        self.g_degree
    }

    /// Planned pairs in sweep order.
    pub fn pairs(&self) -> &[PlannedPair] {
        &self.pairs
    }

    /// Representative sets used for the lock.
    pub fn representatives(&self) -> &RepresentativeTable {
        &self.reps
    }

    /// Candidates checked by a complete run, including the base candidate.
    pub fn total(&self) -> u64 {
        let base = u64::from(self.base_candidate().is_some());
        self.pairs
            .iter()
            .fold(base, |acc, pair| acc.saturating_add(pair.size))
    }

    /// `[1, 0, …, 0]` with fixed values, checked before the first pair in
    /// polynomial mode.
    pub fn base_candidate(&self) -> Option<Poly> {
        match self.mode {
            SearchMode::Polynomial => {
                Some(self.initial_numerator(&CoefficientMask::pinned(self.f_degree + 1)))
            }
            SearchMode::Fraction => None,
        }
    }

    /// Numerator at the start of a sweep: leading 1, free positions 1,
    /// fixed values in place, everything else 0.
    pub fn initial_numerator(&self, mask: &CoefficientMask) -> Poly {
        let mut f = initial_poly(mask);
        for &(pos, value) in &self.fixed_values {
            f[pos] = value;
        }
        f
    }

    /// Denominator at the start of a sweep.
    pub fn initial_denominator(&self, mask: &CoefficientMask) -> Poly {
        initial_poly(mask)
    }

    /// Closure applied to candidates accepted in `pair`.
    pub fn shift_closure(&self, pair: &PlannedPair) -> ShiftClosure {
        match (self.mode, pair.masks.phase) {
            (_, Phase::Supplemental) => ShiftClosure::Polynomial,
            (SearchMode::Fraction, Phase::Primary) if self.g_degree % self.p as usize == 0 => {
                ShiftClosure::Fraction
            }
            _ => ShiftClosure::None,
        }
    }

    /// Index of the pair with this phase and mask text.
    pub fn find_pair(&self, phase: Phase, masks: &str) -> Option<usize> {
        self.pairs
            .iter()
            .position(|pair| pair.masks.phase == phase && pair.masks.to_string() == masks)
    }
}

fn initial_poly(mask: &CoefficientMask) -> Poly {
    let mut poly = vec![ZERO; mask.len()];
    for pos in mask.free_positions() {
        poly[pos] = ONE;
    }
    poly[0] = ONE;
    poly
}

fn plan_pair(masks: MaskPair, reps: &RepresentativeTable, reduce: bool) -> PlannedPair {
    let lock = if reduce {
        choose_lock(&masks, reps)
    } else {
        None
    };
    let range = reps.full_range() as u64;
    let digit_range = |side: Side, pos: usize| match lock {
        Some(l) if l.side == side && l.position == pos => reps.get(pos).len() as u64,
        _ => range,
    };
    let f_digits = masks.f.free_positions();
    let g_digits = masks.g.free_positions();
    let numerator_block = f_digits
        .iter()
        .fold(1u64, |acc, &pos| acc.saturating_mul(digit_range(Side::Numerator, pos)));
    let size = g_digits.iter().fold(numerator_block, |acc, &pos| {
        acc.saturating_mul(digit_range(Side::Denominator, pos))
    });
    debug!(masks = %masks, ?lock, size, "planned mask pair");
    PlannedPair {
        masks,
        lock,
        f_digits,
        g_digits,
        numerator_block,
        size,
    }
}

/// Free position with the smallest representative set; numerator positions
/// are scanned before denominator positions and the first minimum wins.
pub fn choose_lock(masks: &MaskPair, reps: &RepresentativeTable) -> Option<Lock> {
    let numerator = (0..masks.f.len())
        .filter(|&pos| masks.f.is_free(pos))
        .map(|position| Lock {
            side: Side::Numerator,
            position,
        });
    let denominator = (0..masks.g.len())
        .filter(|&pos| masks.g.is_free(pos))
        .map(|position| Lock {
            side: Side::Denominator,
            position,
        });
    let mut best: Option<(Lock, usize)> = None;
    for lock in numerator.chain(denominator) {
        let size = reps.get(lock.position).len();
        if best.map_or(true, |(_, smallest)| size < smallest) {
            best = Some((lock, size));
        }
    }
    best.map(|(lock, _)| lock)
}

/// Numerator masks in fraction mode: every subset of the middle positions,
/// constant term pinned to 0.
pub fn fraction_numerator_masks(f_degree: usize) -> Vec<CoefficientMask> {
    if f_degree == 1 {
        return vec![CoefficientMask::pinned(2)];
    }
    (0..1u64 << (f_degree - 1))
        .map(|subset| CoefficientMask::from_subset(f_degree, subset))
        .collect()
}

/// Denominator masks in fraction mode: the constant term always sweeps and
/// the shift normalization pins part of the middle.
pub fn fraction_denominator_masks(p: u32, g_degree: usize) -> Vec<CoefficientMask> {
    if g_degree == 1 {
        let mut mask = CoefficientMask::pinned(2);
        mask.set_free(1, true);
        return vec![mask];
    }
    let divisible = g_degree % p as usize == 0;
    let gap = if divisible && p == 2 {
        gap_start(g_degree)
    } else {
        None
    };
    (0..1u64 << (g_degree - 1))
        .map(|subset| CoefficientMask::from_subset(g_degree, subset))
        .filter(|mask| {
            if !divisible {
                !mask.is_free(1)
            } else if p > 2 {
                !(mask.is_free(1) && mask.is_free(2))
            } else {
                match gap {
                    None => true,
                    Some(gap) => !(mask.is_free(g_degree - gap) && mask.is_free(g_degree - gap + 1)),
                }
            }
        })
        .map(|mut mask| {
            mask.set_free(g_degree, true);
            mask
        })
        .collect()
}

/// `2^⌊log2 d⌋ - 1`, or `None` when `d + 2` is a power of two.
fn gap_start(degree: usize) -> Option<usize> {
    if (degree + 2) & (degree + 1) == 0 {
        return None;
    }
    let mut power = 1;
    while 2 * power <= degree {
        power *= 2;
    }
    Some(power - 1)
}

/// Polynomial-mode masks: `(primary, supplemental)`.
pub fn polynomial_masks(p: u32, degree: usize) -> (Vec<CoefficientMask>, Vec<CoefficientMask>) {
    let mut primary: Vec<CoefficientMask> = if degree >= 3 {
        (1..1u64 << (degree - 2))
            .map(|subset| CoefficientMask::from_subset(degree, subset))
            .collect()
    } else {
        Vec::new()
    };
    let mut supplemental = Vec::new();
    if degree % p as usize == 0 {
        if p == 2 {
            let mut second_only = CoefficientMask::pinned(degree + 1);
            second_only.set_free(1, true);
            let with_second: Vec<_> = primary
                .iter()
                .cloned()
                .map(|mut mask| {
                    mask.set_free(1, true);
                    mask
                })
                .collect();
            primary.push(second_only);
            primary.extend(with_second);
        } else {
            supplemental = (0..1u64 << (degree - 3))
                .map(|subset| {
                    let mut mask = CoefficientMask::from_subset(degree, subset);
                    mask.set_free(1, true);
                    mask
                })
                .collect();
        }
    }
    (primary, supplemental)
}
