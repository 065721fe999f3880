//! Equivalence classes of accepted candidates
//!
//! Every accepted candidate is expanded to the set of candidates it is
//! equivalent to, and the whole set is reported and marked found at once.

use std::collections::BTreeSet;
use std::fmt;

use crate::algebra::{ArithmeticError, Element, Poly, PolyRing, ZERO};

/// A numerator/denominator pair, ordered structurally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Candidate {
    /// Numerator coefficients, leading first.
    pub numerator: Poly,
    /// Denominator coefficients, leading first (`[1]` for polynomials).
    pub denominator: Poly,
}

impl Candidate {
    /// Pair `f / g`.
    pub fn new(numerator: Poly, denominator: Poly) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {}",
            Coefficients(&self.numerator),
            Coefficients(&self.denominator)
        )
    }
}

/// Space-separated coefficient list, as written in result and checkpoint files.
#[derive(Debug, Clone, Copy)]
pub struct Coefficients<'a>(pub &'a [Element]);

impl fmt::Display for Coefficients<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Candidates equivalent to one accepted candidate, in deterministic order.
pub type EquivalenceClass = BTreeSet<Candidate>;

/// Shift maps added on top of the F/G closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftClosure {
    /// F and G maps only.
    None,
    /// `f(x+b) + c·g(x+b) / g(x+b)` with `c` cancelling the numerator constant.
    Fraction,
    /// `f(x+b)` with the constant term cleared.
    Polynomial,
}

/// Close `f / g` under the F-map, then the G-map, then the shift maps.
pub fn closure(
    ring: &PolyRing<'_>,
    f: &[Element],
    g: &[Element],
    shift: ShiftClosure,
) -> Result<EquivalenceClass, ArithmeticError> {
    let start = Candidate::new(f.to_vec(), g.to_vec());
    let f_orbit = cycle(start, |c| {
        Candidate::new(ring.f_map(&c.numerator), ring.f_map(&c.denominator))
    });

    let mut class = EquivalenceClass::new();
    for member in f_orbit {
        class.extend(cycle(member, |c| {
            Candidate::new(ring.g_map(&c.numerator), ring.g_map(&c.denominator))
        }));
    }

    match shift {
        ShiftClosure::None => Ok(class),
        ShiftClosure::Fraction => {
            let mut shifted = EquivalenceClass::new();
            for member in &class {
                for b in ring.field().elements() {
                    shifted.insert(fraction_shift(ring, member, b)?);
                }
            }
            Ok(shifted)
        }
        ShiftClosure::Polynomial => {
            let mut shifted = EquivalenceClass::new();
            for member in &class {
                for b in ring.field().elements() {
                    let mut numerator = ring.shift(&member.numerator, b);
                    if let Some(constant) = numerator.last_mut() {
                        *constant = ZERO;
                    }
                    shifted.insert(Candidate::new(numerator, member.denominator.clone()));
                }
            }
            Ok(shifted)
        }
    }
}

/// Apply `step` until the orbit returns to a seen element.
fn cycle(start: Candidate, step: impl Fn(&Candidate) -> Candidate) -> Vec<Candidate> {
    let mut seen = BTreeSet::new();
    let mut orbit = Vec::new();
    let mut current = start;
    while seen.insert(current.clone()) {
        let next = step(&current);
        orbit.push(current);
        current = next;
    }
    orbit
}

fn fraction_shift(
    ring: &PolyRing<'_>,
    candidate: &Candidate,
    b: Element,
) -> Result<Candidate, ArithmeticError> {
    let field = ring.field();
    let f = ring.shift(&candidate.numerator, b);
    let g = ring.shift(&candidate.denominator, b);
    let f_constant = f.last().copied().unwrap_or(ZERO);
    let g_constant = g.last().copied().unwrap_or(ZERO);
    let c = field.div(field.neg(f_constant), g_constant)?;
    let numerator = ring.add(&f, &ring.scale(&g, c));
    Ok(Candidate::new(numerator, g))
}
