// src/descriptors/fingerprint.rs
//! Morgan / ECFP4 circular fingerprint folded to 2048 bits.
//!
//! Every heavy atom starts from an integer invariant (degree, element, H
//! count, charge, isotope, ring membership). Each iteration folds in the
//! sorted `(bond order, neighbour identifier)` pairs, so after two rounds an
//! identifier describes the radius-2 environment around the atom.
//! Identifiers from radius 0, 1 and 2 are all folded into the bit vector.
//! An environment that covers exactly the same bonds as one already emitted
//! is skipped, the standard ECFP duplicate removal.
//!
//! Hashing uses a fixed 32-bit `hash_combine`, so bit positions are stable
//! across platforms and compiler versions.
//!
//! # Examples
//!
//! ```
//! use bbbp::Molecule;
//! use bbbp::descriptors::fingerprint::{encode, FINGERPRINT_BITS};
//!
//! let ethanol = Molecule::from_smiles("CCO").unwrap();
//! let fp = encode(Some(&ethanol));
//! assert!(fp.count_ones() > 0);
//! assert_eq!(fp.to_array().len(), FINGERPRINT_BITS);
//!
//! // No molecule, no bits.
//! assert_eq!(encode(None).count_ones(), 0);
//! ```

use std::collections::{BTreeSet, HashSet};

use ndarray::Array1;

use crate::molecule::Molecule;

/// Length of the folded fingerprint.
pub const FINGERPRINT_BITS: usize = 2048;

/// Number of neighbourhood expansions (ECFP4).
pub const MORGAN_RADIUS: usize = 2;

const WORDS: usize = FINGERPRINT_BITS / 64;

/// A 2048-bit binary fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    words: [u64; WORDS],
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self { words: [0; WORDS] }
    }
}

impl Fingerprint {
    /// All-zero fingerprint.
    pub fn zeros() -> Self {
        Self::default()
    }

    fn set(&mut self, bit: usize) {
        self.words[bit / 64] |= 1 << (bit % 64);
    }

    /// Whether `bit` is on. Out-of-range bits read as off.
    pub fn get(&self, bit: usize) -> bool {
        bit < FINGERPRINT_BITS && self.words[bit / 64] & (1 << (bit % 64)) != 0
    }

    /// Number of bits set.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of the bits set, ascending.
    pub fn active_bits(&self) -> Vec<usize> {
        (0..FINGERPRINT_BITS).filter(|&b| self.get(b)).collect()
    }

    /// Dense 0.0 / 1.0 vector, the layout the feature assembler expects.
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from_iter((0..FINGERPRINT_BITS).map(|b| if self.get(b) { 1.0 } else { 0.0 }))
    }
}

/// Fingerprint a molecule; `None` gives the all-zero vector.
pub fn encode(mol: Option<&Molecule>) -> Fingerprint {
    let mut fp = Fingerprint::zeros();
    if let Some(mol) = mol {
        for bit in morgan_bits(mol, MORGAN_RADIUS, FINGERPRINT_BITS) {
            fp.set(bit);
        }
    }
    fp
}

/// Active bit indices of a Morgan fingerprint with arbitrary radius and length.
pub fn morgan_bits(mol: &Molecule, radius: usize, n_bits: usize) -> Vec<usize> {
    if n_bits == 0 {
        return Vec::new();
    }
    let n = mol.atom_count();
    let words = mol.bond_count().div_ceil(64).max(1);

    let mut ids: Vec<u32> = (0..n).map(|i| atom_invariant(mol, i)).collect();
    let mut envs: Vec<Vec<u64>> = vec![vec![0; words]; n];
    let mut seen: HashSet<Vec<u64>> = HashSet::new();
    let mut bits: BTreeSet<usize> = ids.iter().map(|&id| id as usize % n_bits).collect();

    for layer in 1..=radius {
        let mut next_ids = Vec::with_capacity(n);
        let mut next_envs = Vec::with_capacity(n);
        for atom in 0..n {
            let mut nbrs: Vec<(u32, u32)> = mol
                .neighbor_bonds(atom)
                .iter()
                .map(|&(nbr, b)| (mol.bond(b).order.code(), ids[nbr]))
                .collect();
            nbrs.sort_unstable();

            let mut seed = layer as u32;
            hash_combine(&mut seed, ids[atom]);
            for (code, id) in nbrs {
                hash_combine(&mut seed, code);
                hash_combine(&mut seed, id);
            }

            let mut env = envs[atom].clone();
            for &(nbr, b) in mol.neighbor_bonds(atom) {
                env[b / 64] |= 1 << (b % 64);
                for (w, o) in env.iter_mut().zip(&envs[nbr]) {
                    *w |= o;
                }
            }
            next_ids.push(seed);
            next_envs.push(env);
        }

        // Among identical environments the lowest identifier wins.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            next_envs[a]
                .cmp(&next_envs[b])
                .then(next_ids[a].cmp(&next_ids[b]))
        });
        for atom in order {
            let env = &next_envs[atom];
            if env.iter().all(|&w| w == 0) {
                continue;
            }
            if seen.insert(env.clone()) {
                bits.insert(next_ids[atom] as usize % n_bits);
            }
        }

        ids = next_ids;
        envs = next_envs;
    }

    bits.into_iter().collect()
}

fn atom_invariant(mol: &Molecule, idx: usize) -> u32 {
    let atom = mol.atom(idx);
    let mut seed = 0u32;
    hash_combine(&mut seed, mol.degree(idx) as u32);
    hash_combine(&mut seed, u32::from(atom.element.number));
    hash_combine(&mut seed, u32::from(atom.hydrogens));
    hash_combine(&mut seed, i32::from(atom.charge) as u32);
    hash_combine(&mut seed, u32::from(atom.isotope.unwrap_or(0)));
    hash_combine(&mut seed, u32::from(mol.is_ring_atom(idx)));
    seed
}

fn hash_combine(seed: &mut u32, value: u32) {
    *seed ^= value
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn fp(smiles: &str) -> Fingerprint {
        encode(Some(&Molecule::from_smiles(smiles).unwrap()))
    }

    #[test]
    fn absent_molecule_is_all_zero() {
        let empty = encode(None);
        assert_eq!(empty.count_ones(), 0);
        assert!(empty.to_array().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn independent_of_atom_order() {
        assert_eq!(fp("OCC"), fp("CCO"));
        assert_eq!(fp("c1ccccc1O"), fp("Oc1ccccc1"));
        assert_eq!(fp("C1=CC=CC=C1"), fp("c1ccccc1"));
    }

    #[test]
    fn bit_count_is_bounded_by_environments() {
        let mol = Molecule::from_smiles("CC(=O)Oc1ccccc1C(=O)O").unwrap();
        let bits = encode(Some(&mol)).count_ones();
        assert!(bits > 0);
        assert!(bits <= (MORGAN_RADIUS + 1) * mol.atom_count());
    }

    #[test]
    fn benzene_has_few_distinct_environments() {
        // One atom type, and every radius-1 and radius-2 environment is alike.
        assert!(fp("c1ccccc1").count_ones() <= 3);
    }

    #[test]
    fn different_molecules_differ() {
        assert_ne!(fp("CCO"), fp("CCN"));
        assert_ne!(fp("c1ccccc1"), fp("C1CCCCC1"));
    }

    #[test]
    fn dense_view_matches_active_bits() {
        let f = fp("CCN(CC)CC");
        let dense = f.to_array();
        for bit in f.active_bits() {
            assert_eq!(dense[bit], 1.0);
        }
        assert_eq!(dense.sum() as usize, f.count_ones());
    }

    #[test]
    fn hash_combine_is_stable() {
        let mut seed = 0u32;
        hash_combine(&mut seed, 6);
        assert_eq!(seed, 0x9e37_79bf);
    }
}
