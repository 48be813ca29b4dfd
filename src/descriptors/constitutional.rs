// src/descriptors/constitutional.rs
//! Constitutional descriptors: counts read straight off the molecular graph.
//!
//! | Descriptor        | Meaning                                                |
//! |-------------------|--------------------------------------------------------|
//! | NumRotatableBonds | Non-ring single bonds between two non-terminal atoms   |
//! | NumAromaticRings  | SSSR rings whose bonds are all aromatic                |
//!
//! # Quick Start
//!
//! ```
//! use bbbp::Molecule;
//! use bbbp::descriptors::constitutional::constitutional_descriptors;
//!
//! let mol = Molecule::from_smiles("c1ccccc1CCO").unwrap();
//! let desc = constitutional_descriptors(&mol);
//! assert_eq!(desc.num_rotatable_bonds, 2);
//! assert_eq!(desc.num_aromatic_rings, 1);
//! ```
//!
//! # Real-World Examples
//!
//! ```
//! use bbbp::Molecule;
//! use bbbp::descriptors::constitutional::constitutional_descriptors;
//!
//! // Caffeine is rigid and both of its fused rings are aromatic.
//! let caffeine = Molecule::from_smiles("CN1C=NC2=C1C(=O)N(C(=O)N2C)C").unwrap();
//! let desc = constitutional_descriptors(&caffeine);
//! assert_eq!(desc.num_aromatic_rings, 2);
//! assert_eq!(desc.num_rotatable_bonds, 0);
//! ```

use crate::molecule::{BondOrder, Molecule};

/// Container for the constitutional descriptors used by the feature schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstitutionalDescriptors {
    /// Number of rotatable single bonds
    pub num_rotatable_bonds: usize,
    /// Number of aromatic rings in the SSSR
    pub num_aromatic_rings: usize,
}

/// Compute both constitutional descriptors.
pub fn constitutional_descriptors(mol: &Molecule) -> ConstitutionalDescriptors {
    ConstitutionalDescriptors {
        num_rotatable_bonds: count_rotatable_bonds(mol),
        num_aromatic_rings: count_aromatic_rings(mol),
    }
}

// ————————————————————————————————————————————————————————————————————————
// Internal helpers
// ————————————————————————————————————————————————————————————————————————

/// A bond is rotatable when it is:
/// - single and outside every ring
/// - between two atoms that each have another heavy neighbour
/// - not touching a triple-bonded atom (rotation there changes nothing)
/// - not the C–N bond of an amide
pub fn count_rotatable_bonds(mol: &Molecule) -> usize {
    (0..mol.bond_count())
        .filter(|&idx| {
            let bond = mol.bond(idx);
            if bond.order != BondOrder::Single || mol.is_ring_bond(idx) {
                return false;
            }
            let (a, b) = (bond.begin, bond.end);
            if mol.degree(a) < 2 || mol.degree(b) < 2 {
                return false;
            }
            if mol.has_bond_order(a, BondOrder::Triple)
                || mol.has_bond_order(b, BondOrder::Triple)
            {
                return false;
            }
            !is_amide_bond(mol, a, b)
        })
        .count()
}

fn is_amide_bond(mol: &Molecule, a: usize, b: usize) -> bool {
    let carbonyl = |c: usize| {
        mol.atom(c).element.number == 6
            && mol
                .neighbors(c)
                .any(|(n, bond)| bond.order == BondOrder::Double && mol.atom(n).element.number == 8)
    };
    let nitrogen = |n: usize| mol.atom(n).element.number == 7;
    (carbonyl(a) && nitrogen(b)) || (carbonyl(b) && nitrogen(a))
}

/// Rings of the SSSR made entirely of aromatic bonds.
pub fn count_aromatic_rings(mol: &Molecule) -> usize {
    mol.rings()
        .iter()
        .filter(|ring| {
            ring.bonds()
                .iter()
                .all(|&b| mol.bond(b).order == BondOrder::Aromatic)
        })
        .count()
}

// ————————————————————————————————————————————————————————————————————————
// Tests
// ————————————————————————————————————————————————————————————————————————
#[cfg(test)]
mod tests {
    use super::*;

    fn desc(smiles: &str) -> ConstitutionalDescriptors {
        constitutional_descriptors(&Molecule::from_smiles(smiles).unwrap())
    }

    #[test]
    fn benzene() {
        let d = desc("c1ccccc1");
        assert_eq!(d.num_aromatic_rings, 1);
        assert_eq!(d.num_rotatable_bonds, 0);
    }

    #[test]
    fn aspirin_kekule_and_aromatic_agree() {
        let kekule = desc("CC(=O)OC1=CC=CC=C1C(=O)O");
        let aromatic = desc("CC(=O)Oc1ccccc1C(=O)O");
        assert_eq!(kekule, aromatic);
        assert_eq!(kekule.num_rotatable_bonds, 3);
        assert_eq!(kekule.num_aromatic_rings, 1);
    }

    #[test]
    fn terminal_and_ring_bonds_do_not_rotate() {
        assert_eq!(desc("CC").num_rotatable_bonds, 0);
        assert_eq!(desc("CCCC").num_rotatable_bonds, 1);
        assert_eq!(desc("C1CCCCC1").num_rotatable_bonds, 0);
    }

    #[test]
    fn amide_and_alkyne_bonds_are_excluded() {
        // N-methylpropanamide: C-C(=O) rotates, C(=O)-N does not, N-CH3 is terminal.
        assert_eq!(desc("CCC(=O)NC").num_rotatable_bonds, 1);
        assert_eq!(desc("CC#CC").num_rotatable_bonds, 0);
    }

    #[test]
    fn saturated_and_partial_rings_are_not_aromatic() {
        assert_eq!(desc("C1CCCCC1").num_aromatic_rings, 0);
        assert_eq!(desc("C1CCc2ccccc2C1").num_aromatic_rings, 1); // tetralin
        assert_eq!(desc("c1ccc2ccccc2c1").num_aromatic_rings, 2);
    }
}
