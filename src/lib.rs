//! # Permutation polynomial search over GF(p^r)
//!
//! This library searches for normalized permutation polynomials and
//! permutation rational functions `f/g` over a finite field: candidates
//! for which `x -> f(x)/g(x)` is a bijection of the field.
//!
//! ## Core Algorithm
//!
//! 1. **Table arithmetic**: GF(p^r) is built from a random primitive
//!    polynomial and every operation becomes a table lookup
//! 2. **Normalization masks**: coefficient positions that shift and
//!    scaling symmetries can pin are never swept
//! 3. **Locked coefficient**: one free coefficient only visits the least
//!    representatives of its Frobenius/scaling classes
//! 4. **Closure**: each accepted candidate is expanded to its whole
//!    equivalence class, so nothing is reported twice
//! 5. **Checkpointing**: the sweep position is persisted and a resumed run
//!    continues exactly where the previous one stopped
//!
//! ## Usage Example
//!
//! ```no_run
//! use permsearch::{Search, SearchConfig, SearchOptions};
//!
//! let config = SearchConfig::new(2, 3, 5, 0);
//! let outcome = Search::new(config, SearchOptions::default())?.run()?;
//! println!("{} found", outcome.summary().found);
//! # Ok::<(), permsearch::SearchError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod algebra;      // Finite-field tables and polynomial arithmetic
pub mod orbit;        // Frobenius orbits and lock representatives
pub mod search;       // Mask plan, odometer, closure and driver
pub mod ledger;       // Result file and checkpoint persistence
pub mod permutations; // Expansion of results into explicit permutations

// Re-exports for convenience
pub use algebra::{ArithmeticError, Element, Field, FieldBuilder, FieldError, FieldPolynomial};
pub use ledger::{CheckpointStore, LedgerError, ResultFileName};
pub use search::{Search, SearchMode, SearchOptions, SearchOutcome, SearchSummary};

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use thiserror::Error;

/// Largest numerator degree a search accepts.
pub const MAX_DEGREE: usize = 21;

/// Most middle coefficient positions the numerator and denominator masks
/// may range over together. The plan holds one pair per combination.
pub const MAX_MASK_POSITIONS: usize = 20;

/// Parameters of one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Field characteristic p
    pub p: u32,

    /// Extension degree r
    pub r: u32,

    /// Numerator degree
    pub f_degree: usize,

    /// Denominator degree; 0 searches polynomials
    pub g_degree: usize,

    /// Numerator degrees whose coefficient is fixed to zero
    pub fixed_zero_degrees: BTreeSet<usize>,

    /// Numerator degrees whose coefficient is fixed to a nonzero element
    pub fixed_degrees: BTreeMap<usize, Element>,

    /// Report every accepted candidate at info level
    pub verbose: bool,

    /// Restrict the locked coefficient to class representatives
    pub reduce: bool,

    /// Seed for the primitive polynomial search
    pub seed: Option<u64>,
}

impl SearchConfig {
    /// Search over GF(p^r) for `f_degree`/`g_degree` fractions
    /// (`g_degree == 0` for polynomials), reduced, no fixed coefficients.
    pub fn new(p: u32, r: u32, f_degree: usize, g_degree: usize) -> Self {
        Self {
            p,
            r,
            f_degree,
            g_degree,
            fixed_zero_degrees: BTreeSet::new(),
            fixed_degrees: BTreeMap::new(),
            verbose: false,
            reduce: true,
            seed: None,
        }
    }

    /// Fix the numerator coefficient of `degree` to `value`.
    pub fn fix(&mut self, degree: usize, value: Element) -> &mut Self {
        if value == 0 {
            self.fixed_degrees.remove(&degree);
            self.fixed_zero_degrees.insert(degree);
        } else {
            self.fixed_zero_degrees.remove(&degree);
            self.fixed_degrees.insert(degree, value);
        }
        self
    }

    /// Polynomial or fraction search.
    pub fn mode(&self) -> SearchMode {
        self.file_name().mode()
    }

    /// File names this search reads and writes.
    pub fn file_name(&self) -> ResultFileName {
        ResultFileName {
            p: self.p,
            r: self.r,
            f_degree: self.f_degree,
            g_degree: self.g_degree,
        }
    }

    /// Check field, degree and fixed-coefficient preconditions.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !algebra::is_prime(self.p) {
            return Err(FieldError::NotPrime(self.p).into());
        }
        if self.r == 0 {
            return Err(FieldError::InvalidExponent(self.r).into());
        }
        let order = (self.p as u64).saturating_pow(self.r);
        if order > algebra::MAX_ORDER as u64 {
            return Err(FieldError::FieldTooLarge {
                p: self.p,
                r: self.r,
                max: algebra::MAX_ORDER,
            }
            .into());
        }
        if self.f_degree == 0 {
            return Err(SearchError::InvalidConfig(
                "numerator degree must be at least 1".to_string(),
            ));
        }
        if self.f_degree > MAX_DEGREE {
            return Err(SearchError::InvalidConfig(format!(
                "numerator degree {} exceeds the maximum of {MAX_DEGREE}",
                self.f_degree
            )));
        }
        let mask_positions = (self.f_degree - 1) + self.g_degree.saturating_sub(1);
        if mask_positions > MAX_MASK_POSITIONS {
            return Err(SearchError::InvalidConfig(format!(
                "degrees {} and {} give {mask_positions} mask positions, more than {MAX_MASK_POSITIONS}",
                self.f_degree, self.g_degree
            )));
        }
        if self.g_degree > 0 && self.f_degree <= self.g_degree {
            return Err(SearchError::InvalidConfig(format!(
                "numerator degree {} must exceed denominator degree {}",
                self.f_degree, self.g_degree
            )));
        }
        for &degree in self.fixed_zero_degrees.iter().chain(self.fixed_degrees.keys()) {
            if degree >= self.f_degree {
                return Err(SearchError::InvalidConfig(format!(
                    "fixed degree {degree} must be below the numerator degree {}",
                    self.f_degree
                )));
            }
        }
        for (&degree, &value) in &self.fixed_degrees {
            if value as u64 >= order {
                return Err(SearchError::InvalidConfig(format!(
                    "fixed value {value} for degree {degree} is not an element of GF({}^{})",
                    self.p, self.r
                )));
            }
            if self.fixed_zero_degrees.contains(&degree) {
                return Err(SearchError::InvalidConfig(format!(
                    "degree {degree} is fixed to both zero and {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Errors that can occur during a search
#[derive(Error, Debug)]
pub enum SearchError {
    /// A precondition on the search parameters does not hold
    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),

    /// The field could not be built
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Reading or writing the ledger failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A finished search already owns the result file
    #[error("A completed search already wrote {}; delete its checkpoint to start over", path.display())]
    ResultFileCollision {
        /// Result file of the finished search
        path: PathBuf,
    },

    /// Field arithmetic failed
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        assert!(SearchConfig::new(2, 3, 5, 0).validate().is_ok());
        assert!(SearchConfig::new(3, 2, 4, 2).validate().is_ok());
    }

    #[test]
    fn test_field_preconditions() {
        assert!(matches!(
            SearchConfig::new(6, 1, 3, 0).validate(),
            Err(SearchError::Field(FieldError::NotPrime(6)))
        ));
        assert!(matches!(
            SearchConfig::new(2, 0, 3, 0).validate(),
            Err(SearchError::Field(FieldError::InvalidExponent(0)))
        ));
        assert!(matches!(
            SearchConfig::new(3, 9, 3, 0).validate(),
            Err(SearchError::Field(FieldError::FieldTooLarge { .. }))
        ));
    }

    #[test]
    fn test_degree_preconditions() {
        assert!(matches!(
            SearchConfig::new(2, 2, 0, 0).validate(),
            Err(SearchError::InvalidConfig(_))
        ));
        assert!(matches!(
            SearchConfig::new(2, 2, 3, 3).validate(),
            Err(SearchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_mask_plan_size_is_bounded() {
        assert!(SearchConfig::new(2, 1, MAX_DEGREE, 0).validate().is_ok());
        assert!(SearchConfig::new(2, 1, MAX_DEGREE + 1, 0).validate().is_err());
        assert!(SearchConfig::new(2, 1, 12, 10).validate().is_ok());
        assert!(matches!(
            SearchConfig::new(2, 1, 13, 10).validate(),
            Err(SearchError::InvalidConfig(_))
        ));
        assert!(SearchConfig::new(2, 1, 32, 31).validate().is_err());
    }

    #[test]
    fn test_fixed_coefficient_preconditions() {
        let mut config = SearchConfig::new(2, 2, 4, 1);
        config.fix(4, 1);
        assert!(config.validate().is_err());

        let mut config = SearchConfig::new(2, 2, 4, 1);
        config.fix(2, 4);
        assert!(config.validate().is_err());

        let mut config = SearchConfig::new(2, 2, 4, 1);
        config.fix(2, 3).fix(1, 0);
        assert!(config.validate().is_ok());
        assert!(config.fixed_zero_degrees.contains(&1));
    }
}
