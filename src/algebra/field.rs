//! Table-driven arithmetic in GF(p^r)
//!
//! Elements are `u32` indices: 0 is the additive identity and index
//! `k >= 1` stands for the residue `x^(k-1)` modulo the defining
//! polynomial, so 1 is the multiplicative identity. Every operation is a
//! constant-time table lookup.

use std::ops::Range;

use thiserror::Error;

use super::builder::{residue_lookup, FieldPolynomial};

/// Index of a field element.
pub type Element = u32;

/// Additive identity.
pub const ZERO: Element = 0;

/// Multiplicative identity.
pub const ONE: Element = 1;

/// Arithmetic failures inside the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    /// Attempted to divide by the zero element or the zero polynomial.
    #[error("division by zero")]
    DivisionByZero,
}

/// Immutable GF(p^r) with precomputed operation tables.
///
/// Built once by [`FieldBuilder`](super::FieldBuilder) and shared by
/// reference; it carries no interior mutability and is `Send + Sync`.
#[derive(Debug, Clone)]
pub struct Field {
    p: u32,
    r: u32,
    n: u32,
    irreducible: FieldPolynomial,
    residues: Vec<FieldPolynomial>,
    add: Vec<Element>,
    mul: Vec<Element>,
    pow: Vec<Element>,
    neg: Vec<Element>,
    inv: Vec<Element>,
}

impl Field {
    pub(crate) fn from_residues(
        p: u32,
        r: u32,
        irreducible: FieldPolynomial,
        residues: Vec<FieldPolynomial>,
    ) -> Self {
        let n = residues.len();
        let lookup = residue_lookup(&residues);
        let digits: Vec<Vec<u32>> = residues
            .iter()
            .map(|res| {
                let mut d = res.coeffs().to_vec();
                d.resize(r as usize, 0);
                d
            })
            .collect();

        let mut add = vec![ZERO; n * n];
        let mut mul = vec![ZERO; n * n];
        for a in 0..n {
            for b in a..n {
                let code = digits[a]
                    .iter()
                    .zip(&digits[b])
                    .rev()
                    .fold(0usize, |acc, (&x, &y)| {
                        acc * p as usize + ((x + y) % p) as usize
                    });
                let sum = lookup[code];
                add[a * n + b] = sum;
                add[b * n + a] = sum;

                let product = residues[a].mul(&residues[b]).rem(&irreducible);
                let prod = lookup[product.code()];
                mul[a * n + b] = prod;
                mul[b * n + a] = prod;
            }
        }

        let neg = (0..n)
            .map(|a| {
                (0..n)
                    .find(|&b| add[a * n + b] == ZERO)
                    .unwrap_or(0) as Element
            })
            .collect();
        let mut inv = vec![ZERO; n];
        for a in 1..n {
            inv[a] = (1..n).find(|&b| mul[a * n + b] == ONE).unwrap_or(0) as Element;
        }

        let mut pow = vec![ZERO; n * n];
        for a in 0..n {
            pow[a * n] = ONE;
            for e in 1..n {
                pow[a * n + e] = mul[pow[a * n + e - 1] as usize * n + a];
            }
        }

        Self {
            p,
            r,
            n: n as u32,
            irreducible,
            residues,
            add,
            mul,
            pow,
            neg,
            inv,
        }
    }

    /// Characteristic p.
    pub fn characteristic(&self) -> u32 {
        self.p
    }

    /// Extension degree r.
    pub fn degree(&self) -> u32 {
        self.r
    }

    /// Number of elements n = p^r.
    pub fn order(&self) -> u32 {
        self.n
    }

    /// Primitive polynomial defining the field.
    pub fn irreducible(&self) -> &FieldPolynomial {
        &self.irreducible
    }

    /// Residue polynomial behind element `k`.
    pub fn residue(&self, k: Element) -> &FieldPolynomial {
        &self.residues[k as usize]
    }

    /// All elements in index order.
    pub fn elements(&self) -> Range<Element> {
        0..self.n
    }

    /// All nonzero elements in index order.
    pub fn nonzero(&self) -> Range<Element> {
        1..self.n
    }

    /// True if `a` is a valid element index.
    pub fn contains(&self, a: Element) -> bool {
        a < self.n
    }

    #[inline]
    fn idx(&self, a: Element, b: Element) -> usize {
        a as usize * self.n as usize + b as usize
    }

    /// `a + b`
    #[inline]
    pub fn add(&self, a: Element, b: Element) -> Element {
        self.add[self.idx(a, b)]
    }

    /// `a - b`
    #[inline]
    pub fn sub(&self, a: Element, b: Element) -> Element {
        self.add(a, self.neg(b))
    }

    /// `-a`
    #[inline]
    pub fn neg(&self, a: Element) -> Element {
        self.neg[a as usize]
    }

    /// `a * b`
    #[inline]
    pub fn mul(&self, a: Element, b: Element) -> Element {
        self.mul[self.idx(a, b)]
    }

    /// Multiplicative inverse of `a`.
    #[inline]
    pub fn inverse(&self, a: Element) -> Result<Element, ArithmeticError> {
        if a == ZERO {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(self.inv[a as usize])
    }

    /// `a / b`
    #[inline]
    pub fn div(&self, a: Element, b: Element) -> Result<Element, ArithmeticError> {
        Ok(self.mul(a, self.inverse(b)?))
    }

    /// `a^e`, with `0^0 = 1`.
    ///
    /// Exponents past the table width are folded back through the cyclic
    /// multiplicative group, so any `u64` exponent is accepted.
    pub fn pow(&self, a: Element, e: u64) -> Element {
        let n = self.n as u64;
        let e = if e < n {
            e
        } else if a == ZERO {
            return ZERO;
        } else {
            (e - 1) % (n - 1) + 1
        };
        self.pow[self.idx(a, e as Element)]
    }

    /// `x^i` for the primitive root `x` of the defining polynomial.
    ///
    /// This is element `i + 1` whenever `i + 1 < n`; larger `i` wrap around
    /// the multiplicative group.
    #[inline]
    pub fn generator_power(&self, i: usize) -> Element {
        (i as u64 % (self.n as u64 - 1)) as Element + 1
    }

    /// Frobenius automorphism `a -> a^p`.
    #[inline]
    pub fn frobenius(&self, a: Element) -> Element {
        self.pow(a, self.p as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::FieldBuilder;

    fn gf(p: u32, r: u32) -> Field {
        FieldBuilder::new(p, r).seed(1).build().unwrap()
    }

    #[test]
    fn test_identities() {
        let f = gf(3, 2);
        for a in f.elements() {
            assert_eq!(f.add(a, ZERO), a);
            assert_eq!(f.mul(a, ONE), a);
            assert_eq!(f.mul(a, ZERO), ZERO);
            assert_eq!(f.add(a, f.neg(a)), ZERO);
        }
    }

    #[test]
    fn test_index_is_power_of_generator() {
        // element k >= 1 is x^(k-1), so multiplying k by x (= element 2) gives k + 1
        let f = gf(2, 3);
        for k in 1..f.order() - 1 {
            assert_eq!(f.mul(k, 2), k + 1);
        }
        assert_eq!(f.mul(f.order() - 1, 2), ONE);
    }

    #[test]
    fn test_division_by_zero_is_typed() {
        let f = gf(5, 1);
        assert_eq!(f.div(3, ZERO), Err(ArithmeticError::DivisionByZero));
        assert_eq!(f.inverse(ZERO), Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn test_pow_wraps_large_exponents() {
        let f = gf(2, 4);
        for a in f.nonzero() {
            assert_eq!(f.pow(a, 15), ONE);
            assert_eq!(f.pow(a, 16), a);
            assert_eq!(f.pow(a, 15 * 1000 + 3), f.pow(a, 3));
        }
        assert_eq!(f.pow(ZERO, 0), ONE);
        assert_eq!(f.pow(ZERO, 100), ZERO);
    }

    #[test]
    fn test_frobenius_is_additive() {
        let f = gf(3, 3);
        for a in f.elements() {
            for b in f.elements() {
                assert_eq!(
                    f.frobenius(f.add(a, b)),
                    f.add(f.frobenius(a), f.frobenius(b))
                );
            }
        }
    }

    #[test]
    fn test_prime_field_matches_integers() {
        // GF(7): index 0 is 0, index k is g^(k-1) for the generator g = root of x + c
        let f = gf(7, 1);
        let as_int = |a: Element| f.residue(a).coeffs().first().copied().unwrap_or(0);
        for a in f.elements() {
            for b in f.elements() {
                assert_eq!(as_int(f.add(a, b)), (as_int(a) + as_int(b)) % 7);
                assert_eq!(as_int(f.mul(a, b)), (as_int(a) * as_int(b)) % 7);
            }
        }
    }
}
