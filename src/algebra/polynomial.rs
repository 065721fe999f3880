//! Polynomials over GF(p^r) as used by the search
//!
//! Coefficients are field elements stored leading-first: position 0 is
//! the highest-degree coefficient and the last position is the constant
//! term. The zero polynomial is `[0]`.

use super::field::{ArithmeticError, Element, Field, ONE, ZERO};

/// Search polynomial: field-element coefficients, leading coefficient first.
pub type Poly = Vec<Element>;

/// Polynomial arithmetic routed through the tables of one field.
#[derive(Debug, Clone, Copy)]
pub struct PolyRing<'f> {
    field: &'f Field,
}

impl<'f> PolyRing<'f> {
    /// Wrap a field.
    pub fn new(field: &'f Field) -> Self {
        Self { field }
    }

    /// Underlying field.
    pub fn field(&self) -> &'f Field {
        self.field
    }

    /// Sum, aligned at the constant term. The result is not trimmed.
    pub fn add(&self, a: &[Element], b: &[Element]) -> Poly {
        let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
        let offset = long.len() - short.len();
        let mut out = long.to_vec();
        for (i, &c) in short.iter().enumerate() {
            out[offset + i] = self.field.add(long[offset + i], c);
        }
        out
    }

    /// Difference `a - b`, aligned at the constant term, leading zeros trimmed.
    pub fn sub(&self, a: &[Element], b: &[Element]) -> Poly {
        let len = a.len().max(b.len());
        let (pad_a, pad_b) = (len - a.len(), len - b.len());
        let out = (0..len)
            .map(|i| {
                let x = if i >= pad_a { a[i - pad_a] } else { ZERO };
                let y = if i >= pad_b { b[i - pad_b] } else { ZERO };
                self.field.sub(x, y)
            })
            .collect();
        trim(out)
    }

    /// Multiply every coefficient by `c`.
    pub fn scale(&self, p: &[Element], c: Element) -> Poly {
        p.iter().map(|&a| self.field.mul(a, c)).collect()
    }

    /// Multiply by `x` (append a zero constant term).
    pub fn mul_x(&self, p: &[Element]) -> Poly {
        let mut out = p.to_vec();
        out.push(ZERO);
        out
    }

    /// Product, trimmed.
    pub fn mul(&self, a: &[Element], b: &[Element]) -> Poly {
        if a.is_empty() || b.is_empty() {
            return vec![ZERO];
        }
        let mut out = vec![ZERO; a.len() + b.len() - 1];
        for (i, &x) in a.iter().enumerate() {
            if x == ZERO {
                continue;
            }
            for (j, &y) in b.iter().enumerate() {
                out[i + j] = self.field.add(out[i + j], self.field.mul(x, y));
            }
        }
        trim(out)
    }

    /// Quotient and remainder of `a / b`.
    ///
    /// A constant divisor `c` yields `(a / c, [0])`.
    pub fn div_rem(&self, a: &[Element], b: &[Element]) -> Result<(Poly, Poly), ArithmeticError> {
        let b = trim(b.to_vec());
        if is_zero(&b) {
            return Err(ArithmeticError::DivisionByZero);
        }
        let lead_inv = self.field.inverse(b[0])?;
        let d = b.len() - 1;
        if d == 0 {
            return Ok((self.scale(&trim(a.to_vec()), lead_inv), vec![ZERO]));
        }

        let mut rem = trim(a.to_vec());
        if rem.len() <= d {
            return Ok((vec![ZERO], rem));
        }
        let mut quotient = vec![ZERO; rem.len() - d];
        let q_len = quotient.len();
        while !is_zero(&rem) && rem.len() > d {
            let factor = self.field.mul(rem[0], lead_inv);
            let shift = rem.len() - 1 - d;
            quotient[q_len - 1 - shift] = factor;
            for (i, &c) in b.iter().enumerate() {
                rem[i] = self.field.sub(rem[i], self.field.mul(c, factor));
            }
            rem = trim(rem);
        }
        Ok((trim(quotient), rem))
    }

    /// Remainder of `a / b`.
    pub fn rem(&self, a: &[Element], b: &[Element]) -> Result<Poly, ArithmeticError> {
        self.div_rem(a, b).map(|(_, r)| r)
    }

    /// Euclidean GCD.
    ///
    /// When the last nonzero remainder is a constant the result is exactly
    /// `[1]`; otherwise it is that remainder, not normalized.
    pub fn gcd(&self, a: &[Element], b: &[Element]) -> Poly {
        let mut prev = trim(a.to_vec());
        let mut cur = trim(b.to_vec());
        while !is_zero(&cur) {
            let next = match self.rem(&prev, &cur) {
                Ok(r) => r,
                Err(ArithmeticError::DivisionByZero) => break,
            };
            prev = cur;
            cur = next;
        }
        if prev.len() == 1 {
            vec![ONE]
        } else {
            prev
        }
    }

    /// `p(x)` by Horner's rule.
    #[inline]
    pub fn eval(&self, p: &[Element], x: Element) -> Element {
        p.iter()
            .fold(ZERO, |acc, &c| self.field.add(self.field.mul(acc, x), c))
    }

    /// `p(x)` for every element `x`, in index order.
    pub fn eval_all(&self, p: &[Element]) -> Vec<Element> {
        self.field.elements().map(|x| self.eval(p, x)).collect()
    }

    /// `p(x + b)`, same length as `p`.
    pub fn shift(&self, p: &[Element], b: Element) -> Poly {
        let Some((&constant, rest)) = p.split_last() else {
            return vec![ZERO];
        };
        let mut result = vec![constant];
        let mut binomial = vec![ONE];
        for &coeff in rest.iter().rev() {
            // binomial <- binomial * (x + b)
            binomial = self.add(&self.mul_x(&binomial), &self.scale(&binomial, b));
            result = self.add(&self.scale(&binomial, coeff), &result);
        }
        result
    }

    /// F-map: multiply the coefficient at position `i` by `x^i`.
    pub fn f_map(&self, p: &[Element]) -> Poly {
        p.iter()
            .enumerate()
            .map(|(i, &c)| self.field.mul(c, self.field.generator_power(i)))
            .collect()
    }

    /// G-map: apply the Frobenius automorphism to every coefficient.
    pub fn g_map(&self, p: &[Element]) -> Poly {
        p.iter().map(|&c| self.field.frobenius(c)).collect()
    }
}

/// True for the constant polynomial 1.
pub fn is_one(p: &[Element]) -> bool {
    p == [ONE]
}

/// True for the zero polynomial in any padded form.
pub fn is_zero(p: &[Element]) -> bool {
    p.iter().all(|&c| c == ZERO)
}

/// Drop leading zero coefficients; all-zero input becomes `[0]`.
pub fn trim(mut p: Poly) -> Poly {
    match p.iter().position(|&c| c != ZERO) {
        Some(0) => p,
        Some(k) => p.split_off(k),
        None => vec![ZERO],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::FieldBuilder;

    fn gf(p: u32, r: u32) -> Field {
        FieldBuilder::new(p, r).seed(5).build().unwrap()
    }

    #[test]
    fn test_add_aligns_constant_terms() {
        let field = gf(2, 2);
        let ring = PolyRing::new(&field);
        // (x^2 + x) + (x + 1) = x^2 + 1
        assert_eq!(ring.add(&[1, 1, 0], &[1, 1]), vec![1, 0, 1]);
        // untrimmed: x + x = 0x + 0
        assert_eq!(ring.add(&[1, 0], &[1, 0]), vec![0, 0]);
    }

    #[test]
    fn test_sub_trims() {
        let field = gf(3, 1);
        let ring = PolyRing::new(&field);
        assert_eq!(ring.sub(&[1, 2, 1], &[1, 2, 1]), vec![0]);
        assert_eq!(ring.sub(&[1, 2, 1], &[1, 0, 0]), vec![2, 1]);
    }

    #[test]
    fn test_div_rem_by_constant() {
        let field = gf(5, 1);
        let ring = PolyRing::new(&field);
        let a = vec![3, 2, 4];
        let (q, r) = ring.div_rem(&a, &[3]).unwrap();
        assert_eq!(r, vec![ZERO]);
        assert_eq!(ring.scale(&q, 3), a);
        assert_eq!(ring.div_rem(&a, &[0, 0]), Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn test_div_rem_reconstructs() {
        let field = gf(3, 2);
        let ring = PolyRing::new(&field);
        let a = vec![4, 0, 7, 2, 5];
        let b = vec![2, 3, 1];
        let (q, r) = ring.div_rem(&a, &b).unwrap();
        assert!(r.len() < b.len() || is_zero(&r));
        assert_eq!(trim(ring.add(&ring.mul(&q, &b), &r)), a);
    }

    #[test]
    fn test_gcd_of_coprime_linears_is_one() {
        let field = gf(2, 1);
        let ring = PolyRing::new(&field);
        assert_eq!(ring.gcd(&[1, 0], &[1, 1]), vec![ONE]);
    }

    #[test]
    fn test_gcd_finds_common_factor() {
        let field = gf(3, 1);
        let ring = PolyRing::new(&field);
        let common = vec![1, 2];
        let a = ring.mul(&common, &[1, 1]);
        let b = ring.mul(&common, &[1, 0, 1]);
        let g = ring.gcd(&a, &b);
        assert_eq!(g.len(), 2);
        assert!(is_zero(&ring.rem(&a, &g).unwrap()));
        assert!(is_zero(&ring.rem(&b, &g).unwrap()));
    }

    #[test]
    fn test_shift_matches_pointwise_evaluation() {
        let field = gf(2, 3);
        let ring = PolyRing::new(&field);
        let p = vec![1, 3, 0, 5];
        for b in field.elements() {
            let shifted = ring.shift(&p, b);
            assert_eq!(shifted.len(), p.len());
            for x in field.elements() {
                assert_eq!(ring.eval(&shifted, x), ring.eval(&p, field.add(x, b)));
            }
        }
    }

    #[test]
    fn test_maps_keep_leading_coefficient() {
        let field = gf(3, 2);
        let ring = PolyRing::new(&field);
        let p = vec![1, 4, 0, 6];
        assert_eq!(ring.f_map(&p)[0], 1);
        assert_eq!(ring.g_map(&p)[0], 1);
        assert_eq!(ring.g_map(&p)[2], 0);
    }

    #[test]
    fn test_eval_all_of_constant() {
        let field = gf(5, 1);
        let ring = PolyRing::new(&field);
        assert!(ring.eval_all(&[3]).iter().all(|&v| v == 3));
    }
}
