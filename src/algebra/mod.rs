//! Finite-field arithmetic
//!
//! - [`FieldBuilder`] picks a primitive polynomial and derives the tables
//! - [`Field`] answers every element operation by table lookup
//! - [`PolyRing`] does polynomial arithmetic on top of a borrowed field

mod builder;
mod field;
mod polynomial;

pub use builder::{
    is_prime, is_primitive, is_reducible, FieldBuilder, FieldError, FieldPolynomial,
    DEFAULT_ATTEMPT_LIMIT, MAX_ORDER,
};
pub use field::{ArithmeticError, Element, Field, ONE, ZERO};
pub use polynomial::{is_one, is_zero, trim, Poly, PolyRing};
