//! Construction of GF(p^r) from a primitive polynomial over GF(p)
//!
//! The builder samples monic degree-r polynomials until one is both
//! irreducible and primitive, lists the field elements as the residues
//! `0, x^0, x^1, …, x^(n-2)` modulo that polynomial, and derives the
//! arithmetic tables from polynomial arithmetic on those residues.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::field::{Element, Field};

/// Largest field order the table-based representation accepts.
pub const MAX_ORDER: u32 = 1 << 12;

/// Rejected random candidates tolerated before the builder starts warning.
pub const DEFAULT_ATTEMPT_LIMIT: usize = 10_000;

/// Errors raised while constructing a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The characteristic is not a prime number.
    #[error("{0} is not a prime")]
    NotPrime(u32),

    /// The extension degree must be at least one.
    #[error("invalid exponent {0}: must be at least 1")]
    InvalidExponent(u32),

    /// p^r exceeds the table budget.
    #[error("field of order {p}^{r} exceeds the supported maximum of {max} elements")]
    FieldTooLarge {
        /// Characteristic.
        p: u32,
        /// Extension degree.
        r: u32,
        /// Supported maximum order.
        max: u32,
    },

    /// A supplied defining polynomial has a nontrivial factor.
    #[error("{0} is a reducible polynomial")]
    Reducible(String),

    /// A supplied defining polynomial does not generate the multiplicative group.
    #[error("{0} is not a primitive polynomial")]
    NotPrimitive(String),

    /// A supplied coefficient list is malformed.
    #[error("invalid defining polynomial: {0}")]
    InvalidCoefficient(String),
}

/// Polynomial over GF(p) with integer coefficients, lowest degree first.
///
/// Leading zero coefficients are trimmed on construction, so the zero
/// polynomial has no coefficients and every other polynomial ends in a
/// nonzero coefficient.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPolynomial {
    coeffs: Vec<u32>,
    modulus: u32,
}

impl FieldPolynomial {
    /// Build from coefficients (lowest degree first), reducing them mod `modulus`.
    pub fn new(coeffs: Vec<u32>, modulus: u32) -> Self {
        let mut coeffs: Vec<u32> = coeffs.into_iter().map(|c| c % modulus).collect();
        while coeffs.last() == Some(&0) {
            coeffs.pop();
        }
        Self { coeffs, modulus }
    }

    /// The zero polynomial.
    pub fn zero(modulus: u32) -> Self {
        Self {
            coeffs: Vec::new(),
            modulus,
        }
    }

    /// The constant polynomial 1.
    pub fn one(modulus: u32) -> Self {
        Self::monomial(0, modulus)
    }

    /// `x^k`.
    pub fn monomial(k: usize, modulus: u32) -> Self {
        let mut coeffs = vec![0; k + 1];
        coeffs[k] = 1;
        Self { coeffs, modulus }
    }

    /// Degree, or `None` for the zero polynomial.
    pub fn degree(&self) -> Option<usize> {
        self.coeffs.len().checked_sub(1)
    }

    /// Coefficients, lowest degree first.
    pub fn coeffs(&self) -> &[u32] {
        &self.coeffs
    }

    /// Characteristic the coefficients live in.
    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    /// True for the zero polynomial.
    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// True for the constant polynomial 1.
    pub fn is_one(&self) -> bool {
        self.coeffs == [1]
    }

    /// Sum.
    pub fn add(&self, other: &Self) -> Self {
        let len = self.coeffs.len().max(other.coeffs.len());
        let coeffs = (0..len)
            .map(|i| (self.coeff(i) + other.coeff(i)) % self.modulus)
            .collect();
        Self::new(coeffs, self.modulus)
    }

    /// Difference `self - other`.
    pub fn sub(&self, other: &Self) -> Self {
        let len = self.coeffs.len().max(other.coeffs.len());
        let m = self.modulus;
        let coeffs = (0..len)
            .map(|i| (self.coeff(i) + m - other.coeff(i)) % m)
            .collect();
        Self::new(coeffs, m)
    }

    /// Product.
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::zero(self.modulus);
        }
        let m = self.modulus as u64;
        let mut coeffs = vec![0u64; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, &a) in self.coeffs.iter().enumerate() {
            for (j, &b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] = (coeffs[i + j] + a as u64 * b as u64) % m;
            }
        }
        Self::new(coeffs.into_iter().map(|c| c as u32).collect(), self.modulus)
    }

    /// Euclidean division, `None` when `divisor` is zero.
    pub fn div_rem(&self, divisor: &Self) -> Option<(Self, Self)> {
        let d = divisor.degree()?;
        let m = self.modulus;
        let lead_inv = inverse_mod(divisor.coeffs[d], m);
        let mut quotient = vec![0u32; self.coeffs.len().saturating_sub(d).max(1)];
        let mut rem = self.coeffs.clone();

        while rem.len() > d {
            let top = rem.len() - 1;
            let factor = (rem[top] as u64 * lead_inv as u64 % m as u64) as u32;
            let shift = top - d;
            quotient[shift] = factor;
            for (i, &c) in divisor.coeffs.iter().enumerate() {
                let sub = (c as u64 * factor as u64 % m as u64) as u32;
                rem[shift + i] = (rem[shift + i] + m - sub) % m;
            }
            while rem.last() == Some(&0) {
                rem.pop();
            }
        }

        Some((Self::new(quotient, m), Self::new(rem, m)))
    }

    /// Remainder modulo `divisor`, which must be nonzero.
    pub fn rem(&self, divisor: &Self) -> Self {
        self.div_rem(divisor)
            .map(|(_, r)| r)
            .unwrap_or_else(|| self.clone())
    }

    /// Greatest common divisor (not normalized).
    pub fn gcd(&self, other: &Self) -> Self {
        let mut a = self.clone();
        let mut b = other.clone();
        while !b.is_zero() {
            let r = a.rem(&b);
            a = b;
            b = r;
        }
        a
    }

    /// `self^exp mod modulus` by square-and-multiply.
    pub fn pow_mod(&self, mut exp: u64, modulus: &Self) -> Self {
        let mut result = Self::one(self.modulus).rem(modulus);
        let mut base = self.rem(modulus);
        while exp > 0 {
            if exp & 1 == 1 {
                result = result.mul(&base).rem(modulus);
            }
            base = base.mul(&base).rem(modulus);
            exp >>= 1;
        }
        result
    }

    /// Parse the `x^2 + 2x + 1` rendering produced by `Display`.
    pub fn parse(text: &str, modulus: u32) -> Option<Self> {
        let mut coeffs: Vec<u32> = Vec::new();
        for term in text.split('+').map(str::trim) {
            let (coeff, power): (u32, usize) = match term.find('x') {
                None => (term.parse().ok()?, 0),
                Some(i) => {
                    let coeff = if i == 0 { 1 } else { term[..i].parse().ok()? };
                    let rest = &term[i + 1..];
                    let power = if rest.is_empty() {
                        1
                    } else {
                        rest.strip_prefix('^')?.parse().ok()?
                    };
                    (coeff, power)
                }
            };
            if coeffs.len() <= power {
                coeffs.resize(power + 1, 0);
            }
            coeffs[power] = (coeffs[power] + coeff % modulus) % modulus;
        }
        Some(Self::new(coeffs, modulus))
    }

    /// Base-p digit code of a residue of degree < r; used as a table index.
    pub(crate) fn code(&self) -> usize {
        self.coeffs
            .iter()
            .rev()
            .fold(0usize, |acc, &c| acc * self.modulus as usize + c as usize)
    }

    fn coeff(&self, i: usize) -> u32 {
        self.coeffs.get(i).copied().unwrap_or(0)
    }
}

impl fmt::Display for FieldPolynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let mut terms = Vec::new();
        for (k, &c) in self.coeffs.iter().enumerate().rev() {
            if c == 0 {
                continue;
            }
            let coeff = if c == 1 && k > 0 {
                String::new()
            } else {
                c.to_string()
            };
            terms.push(match k {
                0 => coeff,
                1 => format!("{coeff}x"),
                _ => format!("{coeff}x^{k}"),
            });
        }
        write!(f, "{}", terms.join(" + "))
    }
}

/// Builder for GF(p^r).
///
/// ```
/// use permsearch::algebra::FieldBuilder;
///
/// let field = FieldBuilder::new(2, 3).seed(7).build().unwrap();
/// assert_eq!(field.order(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    p: u32,
    r: u32,
    seed: Option<u64>,
    irreducible: Option<Vec<u32>>,
    attempt_limit: usize,
}

impl FieldBuilder {
    /// Start building GF(p^r).
    pub fn new(p: u32, r: u32) -> Self {
        Self {
            p,
            r,
            seed: None,
            irreducible: None,
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
        }
    }

    /// Fix the random seed so the chosen polynomial is reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Use this defining polynomial (lowest degree first, monic) instead of a random one.
    pub fn irreducible(mut self, coeffs: Vec<u32>) -> Self {
        self.irreducible = Some(coeffs);
        self
    }

    /// Number of rejected candidates after which a warning is logged.
    pub fn attempt_limit(mut self, limit: usize) -> Self {
        self.attempt_limit = limit.max(1);
        self
    }

    /// Validate parameters, find the defining polynomial and derive the tables.
    pub fn build(self) -> Result<Field, FieldError> {
        let (p, r) = (self.p, self.r);
        if !is_prime(p) {
            return Err(FieldError::NotPrime(p));
        }
        if r == 0 {
            return Err(FieldError::InvalidExponent(r));
        }
        let n = (p as u64)
            .checked_pow(r)
            .filter(|&n| n <= MAX_ORDER as u64)
            .ok_or(FieldError::FieldTooLarge {
                p,
                r,
                max: MAX_ORDER,
            })? as u32;

        let irreducible = match &self.irreducible {
            Some(coeffs) => self.check_supplied(coeffs, n)?,
            None => self.find_random_primitive(n),
        };
        info!(p, r, order = n, polynomial = %irreducible, "constructed field");

        let residues = enumerate_residues(&irreducible, n);
        Ok(Field::from_residues(p, r, irreducible, residues))
    }

    fn check_supplied(&self, coeffs: &[u32], n: u32) -> Result<FieldPolynomial, FieldError> {
        if coeffs.len() != self.r as usize + 1 {
            return Err(FieldError::InvalidCoefficient(format!(
                "expected {} coefficients for degree {}, got {}",
                self.r + 1,
                self.r,
                coeffs.len()
            )));
        }
        if let Some(&c) = coeffs.iter().find(|&&c| c >= self.p) {
            return Err(FieldError::InvalidCoefficient(format!(
                "coefficient {c} is not below {}",
                self.p
            )));
        }
        if coeffs.last() != Some(&1) {
            return Err(FieldError::InvalidCoefficient(
                "defining polynomial must be monic".to_string(),
            ));
        }
        let poly = FieldPolynomial::new(coeffs.to_vec(), self.p);
        if is_reducible(&poly) {
            return Err(FieldError::Reducible(poly.to_string()));
        }
        if !is_primitive(&poly, n) {
            return Err(FieldError::NotPrimitive(poly.to_string()));
        }
        Ok(poly)
    }

    fn find_random_primitive(&self, n: u32) -> FieldPolynomial {
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut attempts = 0usize;
        loop {
            let candidate = random_monic(&mut rng, self.p, self.r as usize);
            if !is_reducible(&candidate) && is_primitive(&candidate, n) {
                debug!(attempts, polynomial = %candidate, "found primitive polynomial");
                return candidate;
            }
            attempts += 1;
            if attempts % self.attempt_limit == 0 {
                warn!(
                    attempts,
                    p = self.p,
                    r = self.r,
                    "primitive polynomial search is taking longer than expected"
                );
            }
        }
    }
}

fn random_monic(rng: &mut ChaCha8Rng, p: u32, r: usize) -> FieldPolynomial {
    let mut coeffs: Vec<u32> = (0..r).map(|_| rng.gen_range(0..p)).collect();
    coeffs.push(1);
    FieldPolynomial::new(coeffs, p)
}

/// True if `poly` shares a factor with `x^(p^i) - x` for some `1 <= i < deg`.
pub fn is_reducible(poly: &FieldPolynomial) -> bool {
    let p = poly.modulus();
    let Some(deg) = poly.degree() else {
        return true;
    };
    let x = FieldPolynomial::monomial(1, p);
    let mut frob = x.rem(poly);
    for _ in 1..deg {
        frob = frob.pow_mod(p as u64, poly);
        if frob.sub(&x).gcd(poly).degree().unwrap_or(0) > 0 {
            return true;
        }
    }
    false
}

/// True if `x` has multiplicative order exactly `n - 1` modulo `poly`.
pub fn is_primitive(poly: &FieldPolynomial, n: u32) -> bool {
    let p = poly.modulus();
    let x = FieldPolynomial::monomial(1, p);
    let order = (n - 1) as u64;
    if !x.pow_mod(order, poly).is_one() {
        return false;
    }
    prime_factors(order)
        .into_iter()
        .all(|q| !x.pow_mod(order / q, poly).is_one())
}

/// Trial-division primality test.
pub fn is_prime(n: u32) -> bool {
    if n < 2 {
        return false;
    }
    let n = n as u64;
    (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
}

fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            factors.push(d);
            while n % d == 0 {
                n /= d;
            }
        }
        d += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

fn inverse_mod(a: u32, m: u32) -> u32 {
    // Fermat: a^(m-2) mod m
    let (mut base, mut exp, mut acc) = (a as u64 % m as u64, m.saturating_sub(2) as u64, 1u64);
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc * base % m as u64;
        }
        base = base * base % m as u64;
        exp >>= 1;
    }
    acc as u32
}

/// `[0, x^0, x^1, …, x^(n-2)] mod irreducible`.
fn enumerate_residues(irreducible: &FieldPolynomial, n: u32) -> Vec<FieldPolynomial> {
    let p = irreducible.modulus();
    let x = FieldPolynomial::monomial(1, p);
    let mut residues = Vec::with_capacity(n as usize);
    residues.push(FieldPolynomial::zero(p));
    let mut current = FieldPolynomial::one(p).rem(irreducible);
    while residues.len() < n as usize {
        residues.push(current.clone());
        current = current.mul(&x).rem(irreducible);
    }
    residues
}

/// Element index of every residue, addressed by its digit code.
pub(crate) fn residue_lookup(residues: &[FieldPolynomial]) -> Vec<Element> {
    let mut lookup = vec![0; residues.len()];
    for (k, residue) in residues.iter().enumerate() {
        lookup[residue.code()] = k as Element;
    }
    lookup
}
