//! Frobenius orbits and per-position representative sets
//!
//! A coefficient at position `i` of a candidate is acted on by two maps:
//! the Frobenius automorphism and multiplication by `x^i` (the F-map).
//! Fixing one coefficient to the least element of its class under both
//! maps keeps exactly one member of every equivalence class in the sweep.

use std::collections::BTreeSet;

use bitvec::prelude::*;

use crate::algebra::{Element, Field, ZERO};

/// Sorted set of elements closed under `a -> a^p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orbit(Vec<Element>);

impl Orbit {
    /// Least element.
    pub fn least(&self) -> Element {
        self.0[0]
    }

    /// Members in ascending order.
    pub fn members(&self) -> &[Element] {
        &self.0
    }

    /// Orbit size; always divides r.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Orbits are never empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Partition the field into Frobenius orbits, ordered by least element.
pub fn compute_orbits(field: &Field) -> Vec<Orbit> {
    let mut visited = bitvec![0; field.order() as usize];
    let mut orbits = Vec::new();
    for start in field.elements() {
        if visited[start as usize] {
            continue;
        }
        let mut members = Vec::new();
        let mut current = start;
        while !visited.replace(current as usize, true) {
            members.push(current);
            current = field.frobenius(current);
        }
        members.sort_unstable();
        orbits.push(Orbit(members));
    }
    orbits
}

/// Least nonzero representatives for one coefficient position, ascending.
///
/// The first value is always 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepresentativeSet(Vec<Element>);

impl RepresentativeSet {
    /// Value at `cursor`.
    pub fn get(&self, cursor: usize) -> Option<Element> {
        self.0.get(cursor).copied()
    }

    /// Number of representatives.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a valid field.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Representatives in ascending order.
    pub fn values(&self) -> &[Element] {
        &self.0
    }
}

/// Representatives for position `position`: classes under Frobenius and
/// multiplication by `x^position`.
pub fn representatives(field: &Field, orbits: &[Orbit], position: usize) -> RepresentativeSet {
    let step = field.generator_power(position);
    let mut spent = bitvec![0; field.order() as usize];
    let mut reps = BTreeSet::new();
    for orbit in orbits {
        if spent[orbit.least() as usize] {
            continue;
        }
        let mut least = orbit.least();
        for &start in orbit.members() {
            let mut current = start;
            while !spent.replace(current as usize, true) {
                least = least.min(current);
                current = field.mul(current, step);
            }
        }
        if least != ZERO {
            reps.insert(least);
        }
    }
    RepresentativeSet(reps.into_iter().collect())
}

/// Representative sets for positions `0..=max_position`, computed once per run.
#[derive(Debug, Clone)]
pub struct RepresentativeTable {
    sets: Vec<RepresentativeSet>,
    full_range: usize,
}

impl RepresentativeTable {
    /// Compute the sets for every position up to `max_position`.
    pub fn new(field: &Field, max_position: usize) -> Self {
        let orbits = compute_orbits(field);
        let sets = (0..=max_position)
            .map(|i| representatives(field, &orbits, i))
            .collect();
        Self {
            sets,
            full_range: field.order() as usize - 1,
        }
    }

    /// Set for `position`.
    pub fn get(&self, position: usize) -> &RepresentativeSet {
        &self.sets[position]
    }

    /// Size of the unlocked range of a free coefficient (n - 1).
    pub fn full_range(&self) -> usize {
        self.full_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::FieldBuilder;

    #[test]
    fn test_first_orbits_are_zero_and_one() {
        let field = FieldBuilder::new(2, 4).seed(3).build().unwrap();
        let orbits = compute_orbits(&field);
        assert_eq!(orbits[0].members(), &[0]);
        assert_eq!(orbits[1].members(), &[1]);
    }

    #[test]
    fn test_position_zero_reps_are_orbit_minima() {
        // multiplication by x^0 = 1 leaves Frobenius orbits unchanged
        let field = FieldBuilder::new(3, 2).seed(3).build().unwrap();
        let orbits = compute_orbits(&field);
        let reps = representatives(&field, &orbits, 0);
        let minima: Vec<Element> = orbits.iter().map(Orbit::least).filter(|&m| m != 0).collect();
        assert_eq!(reps.values(), minima.as_slice());
    }

    #[test]
    fn test_generator_position_collapses_to_one() {
        // x^1 generates the multiplicative group, so every nonzero class merges
        let field = FieldBuilder::new(2, 3).seed(3).build().unwrap();
        let table = RepresentativeTable::new(&field, 2);
        assert_eq!(table.get(1).values(), &[1]);
        assert_eq!(table.full_range(), 7);
    }

    #[test]
    fn test_reps_start_at_one() {
        let field = FieldBuilder::new(5, 2).seed(3).build().unwrap();
        let table = RepresentativeTable::new(&field, 6);
        for i in 0..=6 {
            assert_eq!(table.get(i).get(0), Some(1));
        }
    }
}
