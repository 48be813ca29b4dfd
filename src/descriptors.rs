//! Molecular descriptor calculations.
//!
//! Everything here works on a parsed, ring- and aromaticity-perceived
//! [`Molecule`]. The nine-slot descriptor vector has a fixed layout that the
//! scaler and the trained networks depend on:
//!
//! | Slot | Name              | Source                               |
//! |------|-------------------|--------------------------------------|
//! | 0    | MolWt             | [`physicochemical::molecular_weight`]|
//! | 1    | MolMR             | Wildman–Crippen MR                   |
//! | 2    | TPSA              | [`physicochemical::tpsa`]            |
//! | 3    | MolLogP           | Wildman–Crippen logP                 |
//! | 4    | NumRotatableBonds | [`constitutional::count_rotatable_bonds`] |
//! | 5    | NumHDonors        | [`physicochemical::h_bond_donors`]   |
//! | 6    | NumHAcceptors     | [`physicochemical::h_bond_acceptors`]|
//! | 7    | NumAromaticRings  | [`constitutional::count_aromatic_rings`] |
//! | 8    | Reserved          | always `0.0`                         |
//!
//! The fingerprint lives in [`fingerprint`].

pub mod constitutional;
pub mod fingerprint;
pub mod physicochemical;

use ndarray::Array1;

use crate::molecule::Molecule;
use constitutional::constitutional_descriptors;
use physicochemical::physchem_descriptors;

/// Number of descriptor slots, reserved slot included.
pub const DESCRIPTOR_COUNT: usize = 9;

/// Column names in slot order.
pub const DESCRIPTOR_NAMES: [&str; DESCRIPTOR_COUNT] = [
    "MolWt",
    "MolMR",
    "TPSA",
    "MolLogP",
    "NumRotatableBonds",
    "NumHDonors",
    "NumHAcceptors",
    "NumAromaticRings",
    "Reserved",
];

/// The eight computed descriptors of one molecule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descriptors {
    /// Molecular weight (Daltons)
    pub mol_wt: f64,
    /// Wildman–Crippen molar refractivity
    pub mol_mr: f64,
    /// Topological polar surface area (Å²)
    pub tpsa: f64,
    /// Wildman–Crippen logP
    pub mol_log_p: f64,
    /// Rotatable bond count
    pub num_rotatable_bonds: usize,
    /// Hydrogen bond donors
    pub num_h_donors: usize,
    /// Hydrogen bond acceptors
    pub num_h_acceptors: usize,
    /// Aromatic rings in the SSSR
    pub num_aromatic_rings: usize,
}

impl Descriptors {
    /// Compute every descriptor of `mol`.
    ///
    /// ```
    /// use bbbp::{Descriptors, Molecule};
    ///
    /// let benzene = Molecule::from_smiles("c1ccccc1").unwrap();
    /// let d = Descriptors::compute(&benzene);
    /// assert_eq!(d.num_aromatic_rings, 1);
    /// assert_eq!(d.num_h_donors, 0);
    /// ```
    pub fn compute(mol: &Molecule) -> Self {
        let phys = physchem_descriptors(mol);
        let cons = constitutional_descriptors(mol);
        Self {
            mol_wt: phys.mol_wt,
            mol_mr: phys.mol_mr,
            tpsa: phys.tpsa,
            mol_log_p: phys.mol_log_p,
            num_rotatable_bonds: cons.num_rotatable_bonds,
            num_h_donors: phys.h_bond_donors,
            num_h_acceptors: phys.h_bond_acceptors,
            num_aromatic_rings: cons.num_aromatic_rings,
        }
    }

    /// Lay the descriptors out in slot order.
    pub fn to_vector(&self) -> DescriptorVector {
        DescriptorVector([
            self.mol_wt,
            self.mol_mr,
            self.tpsa,
            self.mol_log_p,
            self.num_rotatable_bonds as f64,
            self.num_h_donors as f64,
            self.num_h_acceptors as f64,
            self.num_aromatic_rings as f64,
            0.0,
        ])
    }
}

/// Nine descriptor values in [`DESCRIPTOR_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DescriptorVector(pub [f64; DESCRIPTOR_COUNT]);

impl DescriptorVector {
    /// All slots zero.
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Values in slot order.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Value by column name.
    pub fn get(&self, name: &str) -> Option<f64> {
        DESCRIPTOR_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.0[i])
    }

    /// Owned ndarray view.
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from_iter(self.0)
    }
}

/// Descriptor vector of an optional molecule; `None` gives nine zeros.
pub fn extract(mol: Option<&Molecule>) -> DescriptorVector {
    mol.map_or_else(DescriptorVector::zeros, |m| Descriptors::compute(m).to_vector())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn absent_molecule_gives_zeros() {
        let v = extract(None);
        assert!(v.as_slice().iter().all(|&x| x == 0.0));
        assert_eq!(v.as_slice().len(), DESCRIPTOR_COUNT);
    }

    #[test]
    fn slots_follow_names() {
        let mol = Molecule::from_smiles("CCO").unwrap();
        let v = extract(Some(&mol));
        assert_relative_eq!(v.get("MolWt").unwrap(), 46.069, epsilon = 1e-3);
        assert_relative_eq!(v.get("TPSA").unwrap(), 20.23, epsilon = 1e-9);
        assert_eq!(v.get("NumHDonors"), Some(1.0));
        assert_eq!(v.get("NumHAcceptors"), Some(1.0));
        assert_eq!(v.get("NumAromaticRings"), Some(0.0));
        assert_eq!(v.get("Reserved"), Some(0.0));
        assert_eq!(v.get("Nope"), None);
    }

    #[test]
    fn reserved_slot_is_always_zero() {
        for smiles in ["c1ccccc1", "CN1C=NC2=C1C(=O)N(C(=O)N2C)C", "[NH4+]"] {
            let mol = Molecule::from_smiles(smiles).unwrap();
            assert_eq!(extract(Some(&mol)).0[8], 0.0);
        }
    }

    #[test]
    fn descriptors_are_finite() {
        let mol = Molecule::from_smiles("CC(C)Cc1ccc(cc1)C(C)C(=O)O").unwrap();
        assert!(extract(Some(&mol)).as_slice().iter().all(|x| x.is_finite()));
    }
}
