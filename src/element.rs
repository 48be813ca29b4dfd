//! Periodic-table data needed by the parser and the descriptor code.
//!
//! Only elements that show up in drug-like chemistry (plus common counterions)
//! are listed. Anything outside this table is rejected at parse time.

/// Static data for one chemical element.
#[derive(Debug, PartialEq, Eq)]
pub struct Element {
    /// Element symbol with canonical capitalisation, e.g. `"Cl"`.
    pub symbol: &'static str,
    /// Atomic number.
    pub number: u8,
    /// Standard atomic weight in milli-Daltons (stored as an integer so the
    /// struct stays `Eq`).
    mass_milli: u32,
    /// Allowed valences for organic-subset (unbracketed) atoms, lowest first.
    /// Empty for elements that must always be written in brackets.
    pub valences: &'static [u8],
    /// Whether the element may appear as a lowercase aromatic atom.
    pub aromatic_capable: bool,
}

impl Element {
    /// Standard (average) atomic weight in Daltons.
    pub fn mass(&self) -> f64 {
        f64::from(self.mass_milli) / 1000.0
    }

    /// Whether the element belongs to the SMILES organic subset
    /// (B, C, N, O, P, S, F, Cl, Br, I).
    pub fn is_organic_subset(&self) -> bool {
        !self.valences.is_empty()
    }

    /// Hydrogen, the one element that gets folded into its neighbour.
    pub fn is_hydrogen(&self) -> bool {
        self.number == 1
    }

    pub(crate) fn is_halogen(&self) -> bool {
        matches!(self.number, 9 | 17 | 35 | 53)
    }
}

macro_rules! element {
    ($sym:literal, $num:literal, $mass:literal, [$($v:literal),*], $arom:literal) => {
        Element {
            symbol: $sym,
            number: $num,
            mass_milli: $mass,
            valences: &[$($v),*],
            aromatic_capable: $arom,
        }
    };
}

static ELEMENTS: &[Element] = &[
    element!("H", 1, 1008, [], false),
    element!("He", 2, 4003, [], false),
    element!("Li", 3, 6941, [], false),
    element!("Be", 4, 9012, [], false),
    element!("B", 5, 10811, [3], true),
    element!("C", 6, 12011, [4], true),
    element!("N", 7, 14007, [3, 5], true),
    element!("O", 8, 15999, [2], true),
    element!("F", 9, 18998, [1], false),
    element!("Ne", 10, 20180, [], false),
    element!("Na", 11, 22990, [], false),
    element!("Mg", 12, 24305, [], false),
    element!("Al", 13, 26982, [], false),
    element!("Si", 14, 28086, [], false),
    element!("P", 15, 30974, [3, 5], true),
    element!("S", 16, 32065, [2, 4, 6], true),
    element!("Cl", 17, 35453, [1], false),
    element!("Ar", 18, 39948, [], false),
    element!("K", 19, 39098, [], false),
    element!("Ca", 20, 40078, [], false),
    element!("Mn", 25, 54938, [], false),
    element!("Fe", 26, 55845, [], false),
    element!("Co", 27, 58933, [], false),
    element!("Ni", 28, 58693, [], false),
    element!("Cu", 29, 63546, [], false),
    element!("Zn", 30, 65380, [], false),
    element!("Ga", 31, 69723, [], false),
    element!("Ge", 32, 72630, [], false),
    element!("As", 33, 74922, [], true),
    element!("Se", 34, 78971, [], true),
    element!("Br", 35, 79904, [1], false),
    element!("Kr", 36, 83798, [], false),
    element!("Sr", 38, 87620, [], false),
    element!("Ag", 47, 107868, [], false),
    element!("Sn", 50, 118710, [], false),
    element!("Sb", 51, 121760, [], false),
    element!("Te", 52, 127600, [], true),
    element!("I", 53, 126904, [1], false),
    element!("Xe", 54, 131293, [], false),
    element!("Ba", 56, 137327, [], false),
    element!("Gd", 64, 157250, [], false),
    element!("Pt", 78, 195084, [], false),
    element!("Au", 79, 196967, [], false),
    element!("Hg", 80, 200592, [], false),
    element!("Pb", 82, 207200, [], false),
    element!("Bi", 83, 208980, [], false),
];

/// Look up an element by its (case-sensitive) symbol.
pub fn by_symbol(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

/// Number of hydrogens an unbracketed atom carries implicitly.
///
/// `bond_valence` is the sum of bond orders to heavy neighbours with aromatic
/// bonds counted as one. Aromatic atoms spend one more valence unit on the
/// delocalised system and only ever use their lowest valence.
pub(crate) fn implied_hydrogens(element: &Element, aromatic: bool, bond_valence: u8) -> u8 {
    if aromatic {
        let used = bond_valence.saturating_add(1);
        return match element.valences.first() {
            Some(&v) if v >= used => v - used,
            _ => 0,
        };
    }
    element
        .valences
        .iter()
        .find(|&&v| v >= bond_valence)
        .map(|&v| v - bond_valence)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(by_symbol("Cl").map(|e| e.number), Some(17));
        assert!(by_symbol("CL").is_none());
        assert!(by_symbol("Xx").is_none());
    }

    #[test]
    fn implicit_hydrogens_follow_default_valences() {
        let c = by_symbol("C").unwrap();
        let n = by_symbol("N").unwrap();
        let s = by_symbol("S").unwrap();
        assert_eq!(implied_hydrogens(c, false, 1), 3);
        assert_eq!(implied_hydrogens(c, true, 2), 1);
        assert_eq!(implied_hydrogens(c, true, 3), 0);
        assert_eq!(implied_hydrogens(n, true, 2), 0);
        assert_eq!(implied_hydrogens(n, false, 4), 1);
        assert_eq!(implied_hydrogens(s, false, 3), 1);
        assert_eq!(implied_hydrogens(s, true, 2), 0);
    }
}
