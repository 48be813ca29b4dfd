//! Molecular graph built from SMILES.
//!
//! A [`Molecule`] is either fully built or not built at all: the parser,
//! ring perception and aromaticity perception all run inside
//! [`Molecule::from_smiles`], and any failure surfaces as a [`SmilesError`].
//! Hydrogens are never stored as atoms; every heavy atom carries its total
//! hydrogen count instead.

mod aromaticity;
mod rings;
mod smiles;

use thiserror::Error;

use crate::element::{self, Element};

pub use rings::Ring;

/// Errors raised while turning a SMILES string into a [`Molecule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmilesError {
    /// Nothing to parse.
    #[error("empty SMILES string")]
    Empty,

    /// A character that has no meaning at this position.
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar {
        /// Offending character.
        ch: char,
        /// Character offset in the input.
        pos: usize,
    },

    /// Element symbol not present in the element table.
    #[error("unknown element: {0}")]
    UnknownElement(String),

    /// A `[` without a matching `]`.
    #[error("unclosed bracket atom starting at position {0}")]
    UnclosedBracket(usize),

    /// Bracket content that is not `[isotope? symbol chiral? hcount? charge? class?]`.
    #[error("invalid bracket atom: [{0}]")]
    InvalidBracket(String),

    /// `(` / `)` mismatch or a branch with no atom to hang from.
    #[error("unbalanced branch at position {0}")]
    UnbalancedBranch(usize),

    /// A ring-closure digit that was opened but never closed.
    #[error("unclosed ring bond {0}")]
    UnclosedRing(u16),

    /// Both ends of a ring closure specify different bond symbols.
    #[error("conflicting bond symbols on ring closure {0}")]
    RingBondConflict(u16),

    /// A bond symbol that is not followed by an atom or ring closure.
    #[error("dangling bond at position {0}")]
    DanglingBond(usize),

    /// The same pair of atoms is connected twice (or an atom to itself).
    #[error("atoms {0} and {1} are bonded more than once")]
    DuplicateBond(usize, usize),

    /// A lowercase aromatic atom that is not part of any ring.
    #[error("aromatic atom {0} is not in a ring")]
    AromaticOutsideRing(usize),
}

/// Bond multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BondOrder {
    /// Single bond (`-` or implicit).
    Single,
    /// Double bond (`=`).
    Double,
    /// Triple bond (`#`).
    Triple,
    /// Delocalised bond inside an aromatic ring (`:` or implicit between aromatic atoms).
    Aromatic,
}

impl BondOrder {
    /// Valence units consumed on each end. Aromatic bonds count as one; the
    /// extra delocalised unit is accounted for per atom.
    pub fn valence(self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
        }
    }

    /// Small stable code used by hashing and canonical ranking.
    pub(crate) fn code(self) -> u32 {
        match self {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Aromatic => 12,
        }
    }
}

/// A heavy atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    /// Element data.
    pub element: &'static Element,
    /// Part of an aromatic ring (written lowercase).
    pub aromatic: bool,
    /// Formal charge.
    pub charge: i8,
    /// Mass number when given explicitly, e.g. `[13C]`.
    pub isotope: Option<u16>,
    /// Total attached hydrogens (implicit + bracket count + folded `[H]` atoms).
    pub hydrogens: u8,
}

/// An edge between two atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    /// First atom index.
    pub begin: usize,
    /// Second atom index.
    pub end: usize,
    /// Bond order.
    pub order: BondOrder,
}

impl Bond {
    /// The atom on the other side of `atom`.
    pub fn other(&self, atom: usize) -> usize {
        if self.begin == atom {
            self.end
        } else {
            self.begin
        }
    }
}

/// Parsed, ring- and aromaticity-perceived molecular graph.
#[derive(Debug, Clone)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    /// `(neighbour, bond index)` per atom, in bond-creation order.
    adjacency: Vec<Vec<(usize, usize)>>,
    rings: Vec<Ring>,
    ring_bond: Vec<bool>,
    ring_atom: Vec<bool>,
}

impl Molecule {
    /// Parse a SMILES string.
    ///
    /// ```
    /// use bbbp::Molecule;
    ///
    /// let benzene = Molecule::from_smiles("C1=CC=CC=C1").unwrap();
    /// assert_eq!(benzene.atom_count(), 6);
    /// assert!(benzene.atoms().iter().all(|a| a.aromatic && a.hydrogens == 1));
    /// ```
    pub fn from_smiles(smiles: &str) -> Result<Self, SmilesError> {
        smiles::parse(smiles)
    }

    /// Assemble a molecule from atoms and bonds, then perceive rings and
    /// aromaticity. Hydrogen counts must already be final.
    pub(crate) fn build(mut atoms: Vec<Atom>, mut bonds: Vec<Bond>) -> Result<Self, SmilesError> {
        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (idx, bond) in bonds.iter().enumerate() {
            if bond.begin == bond.end
                || adjacency[bond.begin].iter().any(|&(n, _)| n == bond.end)
            {
                return Err(SmilesError::DuplicateBond(bond.begin, bond.end));
            }
            adjacency[bond.begin].push((bond.end, idx));
            adjacency[bond.end].push((bond.begin, idx));
        }

        let info = rings::perceive(&adjacency, bonds.len());

        if let Some(idx) = (0..atoms.len()).find(|&i| atoms[i].aromatic && !info.ring_atoms[i]) {
            return Err(SmilesError::AromaticOutsideRing(idx));
        }
        // An implicit bond between two aromatic atoms of different rings
        // (biphenyl) is an ordinary single bond.
        for (idx, bond) in bonds.iter_mut().enumerate() {
            if bond.order == BondOrder::Aromatic && !info.ring_bonds[idx] {
                bond.order = BondOrder::Single;
            }
        }

        aromaticity::perceive(&mut atoms, &mut bonds, &adjacency, &info);

        Ok(Molecule {
            atoms,
            bonds,
            adjacency,
            rings: info.rings,
            ring_bond: info.ring_bonds,
            ring_atom: info.ring_atoms,
        })
    }

    /// All heavy atoms.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// All bonds between heavy atoms.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Atom at `idx`.
    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    /// Bond at `idx`.
    pub fn bond(&self, idx: usize) -> &Bond {
        &self.bonds[idx]
    }

    /// Number of heavy atoms.
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Number of bonds between heavy atoms.
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// `(neighbour index, bond)` pairs for `atom`.
    pub fn neighbors(&self, atom: usize) -> impl Iterator<Item = (usize, &Bond)> + '_ {
        self.adjacency[atom]
            .iter()
            .map(move |&(nbr, b)| (nbr, &self.bonds[b]))
    }

    /// `(neighbour index, bond index)` pairs for `atom`.
    pub(crate) fn neighbor_bonds(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[atom]
    }

    /// Number of heavy neighbours.
    pub fn degree(&self, atom: usize) -> usize {
        self.adjacency[atom].len()
    }

    /// Smallest set of smallest rings.
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Whether bond `idx` lies on any ring.
    pub fn is_ring_bond(&self, idx: usize) -> bool {
        self.ring_bond[idx]
    }

    /// Whether atom `idx` lies on any ring.
    pub fn is_ring_atom(&self, idx: usize) -> bool {
        self.ring_atom[idx]
    }

    /// Whether `atom` has a bond of the given order.
    pub fn has_bond_order(&self, atom: usize, order: BondOrder) -> bool {
        self.neighbors(atom).any(|(_, b)| b.order == order)
    }

    /// Sum of bond valences to heavy neighbours (aromatic bonds count one).
    pub fn bond_valence(&self, atom: usize) -> u8 {
        self.neighbors(atom)
            .fold(0u8, |acc, (_, b)| acc.saturating_add(b.order.valence()))
    }

    /// Hydrogens an unbracketed atom written in this molecule would imply.
    pub(crate) fn implied_hydrogens(&self, atom: usize) -> u8 {
        let a = &self.atoms[atom];
        element::implied_hydrogens(a.element, a.aromatic, self.bond_valence(atom))
    }

    /// Total hydrogen count over all atoms.
    pub fn hydrogen_count(&self) -> usize {
        self.atoms.iter().map(|a| usize::from(a.hydrogens)).sum()
    }
}
