//! Canonical SMILES.
//!
//! Atoms are ranked by iterative refinement of graph invariants (element,
//! isotope, charge, aromaticity, hydrogens, degree, ring membership, then
//! neighbour ranks and bond orders). Remaining ties inside a fragment are
//! broken by trying each atom of the lowest tied class, refining again, and
//! keeping the smallest resulting string. The writer walks each fragment
//! depth-first with an explicit stack, always taking neighbours in rank
//! order, and fragments are joined in sorted order, so any two spellings of
//! the same molecule produce the same string. The output is non-isomeric:
//! stereo markers do not survive.
//!
//! ```
//! use bbbp::canonical::{standardize, Standardized};
//!
//! let a = standardize("OCC").canonical().unwrap().to_string();
//! let b = standardize("C(O)C").canonical().unwrap().to_string();
//! assert_eq!(a, b);
//! assert!(matches!(standardize("C1CC"), Standardized::Rejected(_)));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::molecule::{BondOrder, Molecule, SmilesError};

/// A canonical SMILES string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalSmiles(String);

impl CanonicalSmiles {
    /// The string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalSmiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalSmiles {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Outcome of [`standardize`]: a canonical molecule or the reason it was rejected.
#[derive(Debug, Clone)]
pub enum Standardized {
    /// Parsed and canonicalized. The molecule is the parse of the input.
    Canonical(CanonicalSmiles, Molecule),
    /// The input is not a valid molecule.
    Rejected(SmilesError),
}

impl Standardized {
    /// Canonical string, if accepted.
    pub fn canonical(&self) -> Option<&CanonicalSmiles> {
        match self {
            Standardized::Canonical(smiles, _) => Some(smiles),
            Standardized::Rejected(_) => None,
        }
    }

    /// Parsed molecule, if accepted.
    pub fn molecule(&self) -> Option<&Molecule> {
        match self {
            Standardized::Canonical(_, mol) => Some(mol),
            Standardized::Rejected(_) => None,
        }
    }

    /// Whether the input was accepted.
    pub fn is_canonical(&self) -> bool {
        matches!(self, Standardized::Canonical(..))
    }
}

/// Parse `raw` and return its canonical form, or the parse failure.
///
/// Never panics on malformed input.
pub fn standardize(raw: &str) -> Standardized {
    match Molecule::from_smiles(raw.trim()) {
        Ok(mol) => Standardized::Canonical(canonical_smiles(&mol), mol),
        Err(err) => Standardized::Rejected(err),
    }
}

/// Canonical SMILES of an already parsed molecule.
///
/// Each connected fragment is written on its own and the fragments are
/// joined in sorted order.
pub fn canonical_smiles(mol: &Molecule) -> CanonicalSmiles {
    let base = refined_ranks(mol);
    let mut parts: Vec<String> = fragments(mol)
        .iter()
        .map(|atoms| {
            let mut budget = MAX_TIE_BRANCHES;
            best_fragment(mol, atoms, base.clone(), &mut budget)
        })
        .collect();
    parts.sort_unstable();
    CanonicalSmiles(parts.join("."))
}

/// Upper bound on tie-break branches explored per fragment. Past it the
/// first tied atom is taken without comparing alternatives.
const MAX_TIE_BRANCHES: usize = 1024;

fn refined_ranks(mol: &Molecule) -> Vec<usize> {
    let n = mol.atom_count();
    let invariants: Vec<[i64; 7]> = (0..n)
        .map(|i| {
            let a = mol.atom(i);
            [
                i64::from(a.element.number),
                i64::from(a.isotope.unwrap_or(0)),
                i64::from(a.charge),
                i64::from(a.aromatic),
                i64::from(a.hydrogens),
                mol.degree(i) as i64,
                i64::from(mol.is_ring_atom(i)),
            ]
        })
        .collect();
    let mut ranks = dense_ranks(&invariants);
    refine(mol, &mut ranks);
    ranks
}

/// Lexicographically smallest string over every way of breaking the
/// remaining ties inside one fragment.
fn best_fragment(
    mol: &Molecule,
    atoms: &[usize],
    ranks: Vec<usize>,
    budget: &mut usize,
) -> String {
    let Some(tied) = lowest_tied_rank(&ranks, atoms.iter().copied()) else {
        return Writer::new(mol, &ranks).write_fragment(atoms);
    };
    let candidates: Vec<usize> = atoms
        .iter()
        .copied()
        .filter(|&i| ranks[i] == tied)
        .collect();
    let mut best: Option<String> = None;
    for (k, &chosen) in candidates.iter().enumerate() {
        if k > 0 && *budget == 0 {
            break;
        }
        *budget = budget.saturating_sub(1);
        let s = best_fragment(mol, atoms, promote(mol, &ranks, chosen), budget);
        if best.as_ref().map_or(true, |b| s < *b) {
            best = Some(s);
        }
    }
    best.unwrap_or_default()
}

/// Give `chosen` the lowest rank of its class and refine again.
fn promote(mol: &Molecule, ranks: &[usize], chosen: usize) -> Vec<usize> {
    let keys: Vec<(usize, bool)> = (0..ranks.len())
        .map(|i| (ranks[i], i != chosen))
        .collect();
    let mut next = dense_ranks(&keys);
    refine(mol, &mut next);
    next
}

/// Lowest rank shared by two or more of `atoms`.
fn lowest_tied_rank(ranks: &[usize], atoms: impl Iterator<Item = usize>) -> Option<usize> {
    let mut counts = vec![0usize; ranks.len()];
    for i in atoms {
        counts[ranks[i]] += 1;
    }
    counts.iter().position(|&c| c > 1)
}

/// Connected components, each listed in ascending atom index.
fn fragments(mol: &Molecule) -> Vec<Vec<usize>> {
    let n = mol.atom_count();
    let mut seen = vec![false; n];
    let mut out = Vec::new();
    for seed in 0..n {
        if seen[seed] {
            continue;
        }
        seen[seed] = true;
        let mut stack = vec![seed];
        let mut atoms = Vec::new();
        while let Some(cur) = stack.pop() {
            atoms.push(cur);
            for (nbr, _) in mol.neighbors(cur) {
                if !seen[nbr] {
                    seen[nbr] = true;
                    stack.push(nbr);
                }
            }
        }
        atoms.sort_unstable();
        out.push(atoms);
    }
    out
}

fn refine(mol: &Molecule, ranks: &mut Vec<usize>) {
    let n = ranks.len();
    let mut classes = ranks.iter().copied().max().map_or(0, |m| m + 1);
    loop {
        let keys: Vec<(usize, Vec<(usize, u32)>)> = (0..n)
            .map(|i| {
                let mut env: Vec<(usize, u32)> = mol
                    .neighbors(i)
                    .map(|(nbr, bond)| (ranks[nbr], bond.order.code()))
                    .collect();
                env.sort_unstable();
                (ranks[i], env)
            })
            .collect();
        let next = dense_ranks(&keys);
        let next_classes = next.iter().copied().max().map_or(0, |m| m + 1);
        *ranks = next;
        if next_classes == classes {
            return;
        }
        classes = next_classes;
    }
}

/// Rank each key by its position among the distinct sorted keys.
fn dense_ranks<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    let mut ranks = vec![0; keys.len()];
    let mut current = 0;
    for w in 0..order.len() {
        if w > 0 && keys[order[w]] != keys[order[w - 1]] {
            current += 1;
        }
        ranks[order[w]] = current;
    }
    ranks
}

/// One step of the iterative writer.
enum Step {
    /// Write the bond from `parent` (if any) and then `atom`.
    Enter {
        atom: usize,
        from: Option<(usize, usize)>,
        branch: bool,
    },
    /// Close a branch.
    Close,
}

struct Writer<'a> {
    mol: &'a Molecule,
    ranks: &'a [usize],
    visited: Vec<bool>,
    bond_used: Vec<bool>,
    /// DFS tree children per atom, in write order.
    children: Vec<Vec<(usize, usize)>>,
    /// Ring-closure bonds touching each atom.
    closures: Vec<Vec<usize>>,
    /// Ring digit currently assigned to an open closure bond.
    digit_of: Vec<Option<u16>>,
    digits_in_use: Vec<bool>,
    out: String,
}

impl<'a> Writer<'a> {
    fn new(mol: &'a Molecule, ranks: &'a [usize]) -> Self {
        let n = mol.atom_count();
        Writer {
            mol,
            ranks,
            visited: vec![false; n],
            bond_used: vec![false; mol.bond_count()],
            children: vec![Vec::new(); n],
            closures: vec![Vec::new(); n],
            digit_of: vec![None; mol.bond_count()],
            digits_in_use: Vec::new(),
            out: String::new(),
        }
    }

    /// Write one connected fragment, starting at a terminal atom where there is one.
    fn write_fragment(mut self, atoms: &[usize]) -> String {
        let Some(root) = atoms
            .iter()
            .copied()
            .min_by_key(|&i| (self.mol.degree(i), self.ranks[i]))
        else {
            return self.out;
        };
        self.discover(root);
        self.emit(root);
        self.out
    }

    fn sorted_neighbors(&self, atom: usize) -> Vec<(usize, usize)> {
        let mut nbrs = self.mol.neighbor_bonds(atom).to_vec();
        nbrs.sort_by_key(|&(nbr, _)| self.ranks[nbr]);
        nbrs
    }

    /// First pass: fix the spanning tree and the ring-closure bonds.
    fn discover(&mut self, root: usize) {
        self.visited[root] = true;
        // (atom, neighbours in rank order, next slot)
        let mut stack = vec![(root, self.sorted_neighbors(root), 0usize)];
        while let Some((atom, nbrs, next)) = stack.last_mut() {
            let Some(&(nbr, bond)) = nbrs.get(*next) else {
                stack.pop();
                continue;
            };
            *next += 1;
            let atom = *atom;
            if self.bond_used[bond] {
                continue;
            }
            self.bond_used[bond] = true;
            if self.visited[nbr] {
                self.closures[atom].push(bond);
                self.closures[nbr].push(bond);
            } else {
                self.children[atom].push((nbr, bond));
                self.visited[nbr] = true;
                let nbr_nbrs = self.sorted_neighbors(nbr);
                stack.push((nbr, nbr_nbrs, 0));
            }
        }
    }

    /// Second pass: write atoms, ring digits and branches.
    fn emit(&mut self, root: usize) {
        let mut steps = vec![Step::Enter {
            atom: root,
            from: None,
            branch: false,
        }];
        while let Some(step) = steps.pop() {
            let (atom, from, branch) = match step {
                Step::Close => {
                    self.out.push(')');
                    continue;
                }
                Step::Enter { atom, from, branch } => (atom, from, branch),
            };
            if branch {
                self.out.push('(');
            }
            if let Some((parent, bond)) = from {
                let symbol = self.bond_symbol(bond, parent, atom);
                self.out.push_str(symbol);
            }
            self.emit_atom(atom);

            let children = std::mem::take(&mut self.children[atom]);
            let last = children.len().saturating_sub(1);
            for (i, (child, bond)) in children.into_iter().enumerate().rev() {
                let branch = i != last;
                if branch {
                    steps.push(Step::Close);
                }
                steps.push(Step::Enter {
                    atom: child,
                    from: Some((atom, bond)),
                    branch,
                });
            }
        }
    }

    /// Atom symbol followed by its ring-closure digits.
    fn emit_atom(&mut self, atom: usize) {
        let symbol = self.atom_symbol(atom);
        self.out.push_str(&symbol);

        let mut closing: Vec<(u16, usize)> = Vec::new();
        let mut opening: Vec<(usize, usize)> = Vec::new();
        for &bond in &self.closures[atom] {
            match self.digit_of[bond] {
                Some(d) => closing.push((d, bond)),
                None => opening.push((self.ranks[self.mol.bond(bond).other(atom)], bond)),
            }
        }
        closing.sort_unstable();
        opening.sort_unstable();

        let mut released = Vec::new();
        for (digit, bond) in closing {
            push_ring_digit(&mut self.out, digit);
            self.digit_of[bond] = None;
            released.push(digit);
        }
        for (_, bond) in opening {
            let digit = self.take_digit();
            let partner = self.mol.bond(bond).other(atom);
            let symbol = self.bond_symbol(bond, atom, partner);
            self.out.push_str(symbol);
            push_ring_digit(&mut self.out, digit);
            self.digit_of[bond] = Some(digit);
        }
        for digit in released {
            self.digits_in_use[usize::from(digit)] = false;
        }
    }

    fn take_digit(&mut self) -> u16 {
        let free = (1..self.digits_in_use.len()).find(|&d| !self.digits_in_use[d]);
        let digit = match free {
            Some(d) => d,
            None => self.digits_in_use.len().max(1),
        };
        if self.digits_in_use.len() <= digit {
            self.digits_in_use.resize(digit + 1, false);
        }
        self.digits_in_use[digit] = true;
        digit as u16
    }

    fn bond_symbol(&self, bond: usize, a: usize, b: usize) -> &'static str {
        let both_aromatic = self.mol.atom(a).aromatic && self.mol.atom(b).aromatic;
        match self.mol.bond(bond).order {
            BondOrder::Single if both_aromatic => "-",
            BondOrder::Single => "",
            BondOrder::Double => "=",
            BondOrder::Triple => "#",
            BondOrder::Aromatic if both_aromatic => "",
            BondOrder::Aromatic => ":",
        }
    }

    fn atom_symbol(&self, atom: usize) -> String {
        let a = self.mol.atom(atom);
        let symbol = if a.aromatic {
            a.element.symbol.to_ascii_lowercase()
        } else {
            a.element.symbol.to_string()
        };
        let plain = a.element.is_organic_subset()
            && a.charge == 0
            && a.isotope.is_none()
            && a.hydrogens == self.mol.implied_hydrogens(atom);
        if plain {
            return symbol;
        }

        let mut s = String::from("[");
        if let Some(iso) = a.isotope {
            s.push_str(&iso.to_string());
        }
        s.push_str(&symbol);
        match a.hydrogens {
            0 => {}
            1 => s.push('H'),
            h => {
                s.push('H');
                s.push_str(&h.to_string());
            }
        }
        match a.charge {
            0 => {}
            1 => s.push('+'),
            -1 => s.push('-'),
            c if c > 0 => {
                s.push('+');
                s.push_str(&c.to_string());
            }
            c => {
                s.push('-');
                s.push_str(&(-i16::from(c)).to_string());
            }
        }
        s.push(']');
        s
    }
}

fn push_ring_digit(out: &mut String, digit: u16) {
    if digit < 10 {
        out.push_str(&digit.to_string());
    } else {
        out.push('%');
        out.push_str(&format!("{digit:02}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(s: &str) -> String {
        standardize(s)
            .canonical()
            .unwrap_or_else(|| panic!("rejected {s}"))
            .to_string()
    }

    const CORPUS: &[&str] = &[
        "CCO",
        "CC(=O)Oc1ccccc1C(=O)O",
        "CN1C=NC2=C1C(=O)N(C(=O)N2C)C",
        "CN1CCC[C@H]1c2cccnc2",
        "c1ccc2ccccc2c1",
        "C1CC2CCC1CC2",
        "O=C1CCCN1",
        "[NH4+].[Cl-]",
        "OC(=O)C(F)(F)F",
        "CC(C)Cc1ccc(cc1)C(C)C(=O)O",
        "C#N",
        "c1ccc(cc1)-c1ccccc1",
        "[2H]C([2H])([2H])O",
        "CN1CCN(CC1)C1=Nc2cc(Cl)ccc2Nc2ccccc12",
        "OC1CCCCC1N",
    ];

    #[test]
    fn canonicalization_is_idempotent() {
        for s in CORPUS {
            let once = canon(s);
            let twice = canon(&once);
            assert_eq!(once, twice, "not idempotent for {s}");
        }
    }

    #[test]
    fn different_spellings_agree() {
        assert_eq!(canon("OCC"), canon("CCO"));
        assert_eq!(canon("C(C)O"), canon("CCO"));
        assert_eq!(canon("C1=CC=CC=C1"), canon("c1ccccc1"));
        assert_eq!(canon("c1ccccc1O"), canon("Oc1ccccc1"));
        assert_eq!(canon("C1CCCCC1C"), canon("CC1CCCCC1"));
        assert_eq!(canon("[Cl-].[NH4+]"), canon("[NH4+].[Cl-]"));
        assert_eq!(canon("C1=CNC=C1"), canon("c1cc[nH]c1"));
        assert_eq!(canon("C1=CC=C2C=CC=C2C=C1"), canon("c1ccc2cccc2cc1"));
    }

    #[test]
    fn simple_forms() {
        assert_eq!(canon("C"), "C");
        assert_eq!(canon("O=C=O"), "O=C=O");
        assert_eq!(canon("c1ccccc1"), "c1ccccc1");
        assert_eq!(canon("C1=CNC=C1"), "c1cc[nH]c1");
    }

    #[test]
    fn brackets_are_kept_only_when_needed() {
        assert_eq!(canon("[CH4]"), "C");
        assert_eq!(canon("[OH2]"), "O");
        assert!(canon("[NH4+]").starts_with("[NH4+]"));
        assert!(canon("[13CH4]").contains("[13CH4]"));
    }

    #[test]
    fn rejects_without_panicking() {
        for bad in ["", "C1CC", "C(", "[Zz]", "c1cccc", "CC)"] {
            assert!(!standardize(bad).is_canonical(), "accepted {bad}");
        }
    }

    /// Rewrite `smiles` with atoms visited in a scrambled order.
    fn respell(smiles: &str, seed: usize) -> String {
        let mol = Molecule::from_smiles(smiles).unwrap();
        let n = mol.atom_count();
        let ranks: Vec<usize> = (0..n).map(|i| (i * 7 + seed) % n).collect();
        let dense = dense_ranks(&ranks);
        let mut parts: Vec<String> = fragments(&mol)
            .iter()
            .map(|atoms| Writer::new(&mol, &dense).write_fragment(atoms))
            .collect();
        if seed % 2 == 1 {
            parts.reverse();
        }
        parts.join(".")
    }

    #[test]
    fn scrambled_spellings_agree() {
        let extra = [
            "C1CC1.C1CCC1",
            "C1CCCCCC1.C1CCCCC1",
            "C1CC2CC1C2",
            "CC(C)(C)c1ccc(cc1)C(C)(C)C",
            "C12C3C4C1C5C2C3C45",
        ];
        for s in CORPUS.iter().copied().chain(extra) {
            let expected = canon(s);
            for seed in 0..12 {
                let spelled = respell(s, seed);
                assert_eq!(canon(&spelled), expected, "{s} spelled as {spelled}");
            }
        }
    }

    #[test]
    fn fragments_are_written_in_sorted_order() {
        assert_eq!(canon("C1CC1.C1CCC1"), canon("C1CCC1.C1CC1"));
        assert_eq!(canon("C1CCCCCC1.C1CCCCC1"), canon("C1CCCCC1.C1CCCCCC1"));
        assert_eq!(canon("O.CC"), "CC.O");
    }

    #[test]
    fn long_chains_do_not_recurse() {
        let chain = "C".repeat(2000);
        assert_eq!(canon(&chain), chain);
        let rings = "C1CC1".repeat(400);
        assert!(standardize(&rings).is_canonical());
    }
}
