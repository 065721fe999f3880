//! Field construction, arithmetic tables and orbit structure

use std::collections::BTreeSet;

use permsearch::algebra::{
    is_primitive, is_reducible, ArithmeticError, FieldBuilder, FieldError, FieldPolynomial,
    PolyRing, ONE, ZERO,
};
use permsearch::orbit::{compute_orbits, RepresentativeTable};
use test_case::test_case;

#[test_case(2, 1, 2)]
#[test_case(2, 4, 16)]
#[test_case(3, 3, 27)]
#[test_case(5, 2, 25)]
#[test_case(7, 1, 7)]
#[test_case(2, 8, 256)]
fn field_order_is_p_to_the_r(p: u32, r: u32, n: u32) {
    let field = FieldBuilder::new(p, r).seed(2).build().unwrap();
    assert_eq!(field.order(), n);
    assert_eq!(field.characteristic(), p);
    assert_eq!(field.degree(), r);
}

#[test_case(1, 2, FieldError::NotPrime(1) ; "one is not prime")]
#[test_case(9, 1, FieldError::NotPrime(9) ; "nine is not prime")]
#[test_case(3, 0, FieldError::InvalidExponent(0) ; "zero exponent")]
fn bad_field_parameters(p: u32, r: u32, expected: FieldError) {
    let err = FieldBuilder::new(p, r).build().unwrap_err();
    assert_eq!(err.to_string(), expected.to_string());
}

#[test]
fn oversized_field_is_rejected() {
    let err = FieldBuilder::new(2, 13).build().unwrap_err();
    assert!(matches!(err, FieldError::FieldTooLarge { p: 2, r: 13, .. }));
}

#[test_case(vec![1, 1, 1], 2, false ; "x^2 + x + 1 over GF(2)")]
#[test_case(vec![1, 0, 1], 2, true ; "x^2 + 1 over GF(2)")]
#[test_case(vec![1, 1, 0, 1], 2, false ; "x^3 + x + 1 over GF(2)")]
#[test_case(vec![1, 0, 1], 3, false ; "x^2 + 1 over GF(3)")]
#[test_case(vec![2, 0, 1], 3, true ; "x^2 + 2 over GF(3)")]
fn reducibility(coeffs: Vec<u32>, p: u32, reducible: bool) {
    assert_eq!(is_reducible(&FieldPolynomial::new(coeffs, p)), reducible);
}

#[test]
fn irreducible_but_not_primitive() {
    // x^2 + 1 is irreducible over GF(3) but x has order 4, not 8
    let poly = FieldPolynomial::new(vec![1, 0, 1], 3);
    assert!(!is_reducible(&poly));
    assert!(!is_primitive(&poly, 9));
    let err = FieldBuilder::new(3, 2).irreducible(vec![1, 0, 1]).build().unwrap_err();
    assert!(matches!(err, FieldError::NotPrimitive(_)));
}

#[test_case(2, 3)]
#[test_case(3, 2)]
#[test_case(5, 1)]
fn inverses_are_unique(p: u32, r: u32) {
    let field = FieldBuilder::new(p, r).seed(4).build().unwrap();
    for a in field.nonzero() {
        let inverses: Vec<_> = field.nonzero().filter(|&b| field.mul(a, b) == ONE).collect();
        assert_eq!(inverses, vec![field.inverse(a).unwrap()]);
    }
    assert_eq!(field.inverse(ZERO), Err(ArithmeticError::DivisionByZero));
}

#[test]
fn gcd_of_x_and_x_plus_one_over_gf2() {
    let field = FieldBuilder::new(2, 1).build().unwrap();
    let ring = PolyRing::new(&field);
    assert_eq!(ring.gcd(&[1, 0], &[1, 1]), vec![ONE]);
}

#[test_case(2, 4)]
#[test_case(3, 2)]
#[test_case(2, 6)]
#[test_case(5, 3)]
fn orbits_partition_the_field(p: u32, r: u32) {
    let field = FieldBuilder::new(p, r).seed(8).build().unwrap();
    let orbits = compute_orbits(&field);

    let mut seen = BTreeSet::new();
    for orbit in &orbits {
        assert_eq!(r as usize % orbit.len(), 0, "orbit size must divide r");
        for &a in orbit.members() {
            assert!(seen.insert(a), "element {a} in two orbits");
            assert!(orbit.members().contains(&field.frobenius(a)));
        }
    }
    assert_eq!(seen.len(), field.order() as usize);
    assert_eq!(orbits[0].members(), &[ZERO]);
    assert_eq!(orbits[1].members(), &[ONE]);
}

#[test_case(2, 4)]
#[test_case(3, 3)]
fn representative_sets_cover_each_class_once(p: u32, r: u32) {
    let field = FieldBuilder::new(p, r).seed(6).build().unwrap();
    let table = RepresentativeTable::new(&field, 5);
    assert_eq!(table.full_range(), field.order() as usize - 1);
    for position in 0..=5 {
        let reps = table.get(position);
        assert_eq!(reps.get(0), Some(ONE));

        // close each representative under Frobenius and scaling by x^position
        let step = field.generator_power(position);
        let mut covered = BTreeSet::new();
        for &rep in reps.values() {
            let mut frontier = vec![rep];
            while let Some(a) = frontier.pop() {
                if covered.insert(a) {
                    frontier.push(field.frobenius(a));
                    frontier.push(field.mul(a, step));
                }
            }
        }
        let nonzero: BTreeSet<_> = field.nonzero().collect();
        assert_eq!(covered, nonzero, "position {position}");
    }
}
