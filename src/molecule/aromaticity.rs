//! Hückel aromaticity perception for rings written in Kekulé form.
//!
//! Rings already written with lowercase atoms are trusted as aromatic.
//! Every other SSSR ring, and every pair of fused SSSR rings that fails on
//! its own, is scored on the input bond orders (never on the result of
//! another ring's perception) so the outcome does not depend on the order
//! rings are visited in.

use super::rings::RingInfo;
use super::{Atom, Bond, BondOrder};

pub(crate) fn perceive(
    atoms: &mut [Atom],
    bonds: &mut [Bond],
    adjacency: &[Vec<(usize, usize)>],
    info: &RingInfo,
) {
    let electrons = |ring_atoms: &mut dyn Iterator<Item = usize>| -> Option<u32> {
        ring_atoms
            .map(|a| pi_electrons(atoms, bonds, adjacency, &info.ring_bonds, a))
            .sum()
    };
    let huckel = |e: Option<u32>| matches!(e, Some(e) if e % 4 == 2);

    // Lowercase rings are aromatic already; mixed rings stay as written.
    let candidates: Vec<usize> = (0..info.rings.len())
        .filter(|&i| !info.rings[i].atoms().iter().any(|&a| atoms[a].aromatic))
        .collect();
    let mut aromatic: Vec<bool> = vec![false; info.rings.len()];
    for &i in &candidates {
        aromatic[i] = huckel(electrons(&mut info.rings[i].atoms().iter().copied()));
    }

    // Two fused rings can only be aromatic together (azulene).
    let mut fused = Vec::new();
    for (k, &i) in candidates.iter().enumerate() {
        for &j in &candidates[k + 1..] {
            let (a, b) = (&info.rings[i], &info.rings[j]);
            if aromatic[i] || aromatic[j] || !a.bonds().iter().any(|&x| b.contains_bond(x)) {
                continue;
            }
            let mut union: Vec<usize> = a.atoms().iter().chain(b.atoms()).copied().collect();
            union.sort_unstable();
            union.dedup();
            if huckel(electrons(&mut union.into_iter())) {
                fused.extend([i, j]);
            }
        }
    }
    for i in fused {
        aromatic[i] = true;
    }

    for (idx, _) in aromatic.iter().enumerate().filter(|&(_, &on)| on) {
        let ring = &info.rings[idx];
        for &a in ring.atoms() {
            atoms[a].aromatic = true;
        }
        for &b in ring.bonds() {
            bonds[b].order = BondOrder::Aromatic;
        }
    }
}

/// Electrons an atom donates to a ring's pi system, or `None` when the atom
/// rules the ring out (sp3 carbon, exocyclic C=C, triple bond).
fn pi_electrons(
    atoms: &[Atom],
    bonds: &[Bond],
    adjacency: &[Vec<(usize, usize)>],
    ring_bonds: &[bool],
    atom: usize,
) -> Option<u32> {
    let a = &atoms[atom];
    let mut endocyclic_double = false;
    let mut exocyclic_double = None;
    for &(nbr, b) in &adjacency[atom] {
        match bonds[b].order {
            BondOrder::Double if ring_bonds[b] => endocyclic_double = true,
            BondOrder::Double => exocyclic_double = Some(atoms[nbr].element.number),
            BondOrder::Triple => return None,
            _ => {}
        }
    }
    if endocyclic_double {
        return Some(1);
    }
    if let Some(partner) = exocyclic_double {
        // C=O, C=N, C=S pull their electron out of the ring.
        return (a.element.number == 6 && matches!(partner, 7 | 8 | 16)).then_some(0);
    }

    let connections = adjacency[atom].len() + usize::from(a.hydrogens);
    match (a.element.number, a.charge) {
        (7 | 15, 0) if connections == 3 => Some(2),
        (8 | 16 | 34 | 52, 0) if connections == 2 => Some(2),
        (6, -1) if connections == 3 => Some(2),
        (6, 1) if connections == 3 => Some(0),
        (5, 0) if connections == 3 => Some(0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::Molecule;

    fn aromatic_atoms(smiles: &str) -> usize {
        Molecule::from_smiles(smiles)
            .unwrap()
            .atoms()
            .iter()
            .filter(|a| a.aromatic)
            .count()
    }

    #[test]
    fn heteroaromatics_in_kekule_form() {
        assert_eq!(aromatic_atoms("C1=CC=NC=C1"), 6); // pyridine
        assert_eq!(aromatic_atoms("C1=COC=C1"), 5); // furan
        assert_eq!(aromatic_atoms("C1=CSC=C1"), 5); // thiophene
        assert_eq!(aromatic_atoms("O=C1C=CC=CN1"), 6); // 2-pyridone
    }

    #[test]
    fn fused_kekule_system() {
        assert_eq!(aromatic_atoms("C1=CC=C2C=CC=CC2=C1"), 10); // naphthalene
        assert_eq!(aromatic_atoms("C1CC2=CC=CC=C2C1"), 6); // indane
    }

    #[test]
    fn fused_perimeter_counts_for_azulene() {
        assert_eq!(aromatic_atoms("C1=CC=C2C=CC=C2C=C1"), 10);
        assert_eq!(aromatic_atoms("C1=CC2=CC=CC2=C1"), 0); // pentalene, 8 electrons
    }

    #[test]
    fn non_huckel_rings_are_left_alone() {
        assert_eq!(aromatic_atoms("C1=CC=C1"), 0);
        assert_eq!(aromatic_atoms("C1=CC=CC=CC=C1"), 0);
        assert_eq!(aromatic_atoms("C1=CCC=C1"), 0);
    }
}
