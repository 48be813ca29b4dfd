//! SMILES reader.
//!
//! Supports the full topology layer of OpenSMILES: organic-subset and
//! bracket atoms, branches, ring closures (including `%nn`), explicit bond
//! symbols and dot-separated fragments. Stereo markers are accepted and
//! discarded.

use std::collections::BTreeMap;

use crate::element::{self, Element};

use super::{Atom, Bond, BondOrder, Molecule, SmilesError};

#[derive(Debug)]
struct RawAtom {
    element: &'static Element,
    aromatic: bool,
    charge: i8,
    isotope: Option<u16>,
    /// `None` for organic-subset atoms whose count is implied by valence.
    hydrogens: Option<u8>,
}

#[derive(Default)]
struct Parser {
    atoms: Vec<RawAtom>,
    edges: Vec<(usize, usize, Option<BondOrder>)>,
    prev: Option<usize>,
    /// Bond symbol waiting for its second atom, with its position.
    pending: Option<(BondOrder, usize)>,
    branches: Vec<usize>,
    open_rings: BTreeMap<u16, (usize, Option<BondOrder>)>,
}

pub(super) fn parse(input: &str) -> Result<Molecule, SmilesError> {
    // Anything after the first whitespace is a title, as in SMILES files.
    let smiles = input.split_whitespace().next().ok_or(SmilesError::Empty)?;
    let chars: Vec<char> = smiles.chars().collect();
    let mut p = Parser::default();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '-' | '/' | '\\' | '=' | '#' | ':' => {
                if p.pending.is_some() || p.prev.is_none() {
                    return Err(SmilesError::UnexpectedChar { ch: c, pos: i });
                }
                let order = match c {
                    '=' => BondOrder::Double,
                    '#' => BondOrder::Triple,
                    ':' => BondOrder::Aromatic,
                    _ => BondOrder::Single,
                };
                p.pending = Some((order, i));
                i += 1;
            }
            '(' => {
                if let Some((_, pos)) = p.pending {
                    return Err(SmilesError::DanglingBond(pos));
                }
                let from = p.prev.ok_or(SmilesError::UnbalancedBranch(i))?;
                p.branches.push(from);
                i += 1;
            }
            ')' => {
                if let Some((_, pos)) = p.pending {
                    return Err(SmilesError::DanglingBond(pos));
                }
                p.prev = Some(p.branches.pop().ok_or(SmilesError::UnbalancedBranch(i))?);
                i += 1;
            }
            '.' => {
                if let Some((_, pos)) = p.pending {
                    return Err(SmilesError::DanglingBond(pos));
                }
                if p.prev.is_none() || !p.branches.is_empty() {
                    return Err(SmilesError::UnexpectedChar { ch: c, pos: i });
                }
                p.prev = None;
                i += 1;
            }
            '0'..='9' | '%' => {
                let (number, next) = ring_number(&chars, i)?;
                let atom = p.prev.ok_or(SmilesError::UnexpectedChar { ch: c, pos: i })?;
                p.ring_closure(number, atom)?;
                i = next;
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map(|off| i + off)
                    .ok_or(SmilesError::UnclosedBracket(i))?;
                let content: String = chars[i + 1..close].iter().collect();
                let raw = parse_bracket(&content)?;
                p.add_atom(raw);
                i = close + 1;
            }
            _ if c.is_ascii_alphabetic() => {
                let (raw, next) = organic_atom(&chars, i)?;
                p.add_atom(raw);
                i = next;
            }
            _ => return Err(SmilesError::UnexpectedChar { ch: c, pos: i }),
        }
    }

    if let Some((_, pos)) = p.pending {
        return Err(SmilesError::DanglingBond(pos));
    }
    if !p.branches.is_empty() {
        return Err(SmilesError::UnbalancedBranch(chars.len()));
    }
    if let Some((&number, _)) = p.open_rings.iter().next() {
        return Err(SmilesError::UnclosedRing(number));
    }
    if p.atoms.is_empty() {
        return Err(SmilesError::Empty);
    }

    p.finish()
}

impl Parser {
    fn add_atom(&mut self, raw: RawAtom) {
        let idx = self.atoms.len();
        self.atoms.push(raw);
        if let Some(prev) = self.prev {
            let order = self.pending.take().map(|(o, _)| o);
            self.edges.push((prev, idx, order));
        }
        self.prev = Some(idx);
    }

    fn ring_closure(&mut self, number: u16, atom: usize) -> Result<(), SmilesError> {
        let order = self.pending.take().map(|(o, _)| o);
        match self.open_rings.remove(&number) {
            Some((start, opened)) => {
                let order = match (opened, order) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(SmilesError::RingBondConflict(number));
                    }
                    (a, b) => a.or(b),
                };
                self.edges.push((start, atom, order));
            }
            None => {
                self.open_rings.insert(number, (atom, order));
            }
        }
        Ok(())
    }

    /// Resolve implicit bond orders and hydrogens, fold `[H]` atoms into
    /// their neighbours, then hand over to [`Molecule::build`].
    fn finish(self) -> Result<Molecule, SmilesError> {
        let Parser { atoms, edges, .. } = self;

        let bonds: Vec<Bond> = edges
            .into_iter()
            .map(|(begin, end, order)| {
                let order = order.unwrap_or(if atoms[begin].aromatic && atoms[end].aromatic {
                    BondOrder::Aromatic
                } else {
                    BondOrder::Single
                });
                Bond { begin, end, order }
            })
            .collect();

        let mut valence = vec![0u8; atoms.len()];
        let mut degree = vec![0usize; atoms.len()];
        for b in &bonds {
            valence[b.begin] = valence[b.begin].saturating_add(b.order.valence());
            valence[b.end] = valence[b.end].saturating_add(b.order.valence());
            degree[b.begin] += 1;
            degree[b.end] += 1;
        }

        let mut hydrogens: Vec<u8> = atoms
            .iter()
            .enumerate()
            .map(|(i, a)| {
                a.hydrogens.unwrap_or_else(|| {
                    element::implied_hydrogens(a.element, a.aromatic, valence[i])
                })
            })
            .collect();

        // A plain [H] hanging off a heavy atom becomes a hydrogen count.
        let foldable = |i: usize| {
            let a = &atoms[i];
            a.element.is_hydrogen()
                && a.isotope.is_none()
                && a.charge == 0
                && hydrogens[i] == 0
                && degree[i] == 1
        };
        let mut folded = vec![false; atoms.len()];
        for b in &bonds {
            for (h, heavy) in [(b.begin, b.end), (b.end, b.begin)] {
                if foldable(h) && !atoms[heavy].element.is_hydrogen() {
                    folded[h] = true;
                }
            }
        }
        for b in &bonds {
            if folded[b.begin] {
                hydrogens[b.end] = hydrogens[b.end].saturating_add(1);
            } else if folded[b.end] {
                hydrogens[b.begin] = hydrogens[b.begin].saturating_add(1);
            }
        }

        let mut index = vec![usize::MAX; atoms.len()];
        let mut kept = Vec::with_capacity(atoms.len());
        for (i, raw) in atoms.into_iter().enumerate() {
            if folded[i] {
                continue;
            }
            index[i] = kept.len();
            kept.push(Atom {
                element: raw.element,
                aromatic: raw.aromatic,
                charge: raw.charge,
                isotope: raw.isotope,
                hydrogens: hydrogens[i],
            });
        }
        let bonds = bonds
            .into_iter()
            .filter(|b| !folded[b.begin] && !folded[b.end])
            .map(|b| Bond {
                begin: index[b.begin],
                end: index[b.end],
                order: b.order,
            })
            .collect();

        Molecule::build(kept, bonds)
    }
}

fn ring_number(chars: &[char], i: usize) -> Result<(u16, usize), SmilesError> {
    if chars[i] != '%' {
        let digit = chars[i].to_digit(10).unwrap_or_default();
        return Ok((digit as u16, i + 1));
    }
    let digits: String = chars[i + 1..].iter().take(2).collect();
    if digits.len() == 2 && digits.chars().all(|c| c.is_ascii_digit()) {
        let number = digits
            .parse()
            .map_err(|_| SmilesError::UnexpectedChar { ch: '%', pos: i })?;
        Ok((number, i + 3))
    } else {
        Err(SmilesError::UnexpectedChar { ch: '%', pos: i })
    }
}

fn organic_atom(chars: &[char], i: usize) -> Result<(RawAtom, usize), SmilesError> {
    let c = chars[i];
    let next = chars.get(i + 1).copied();
    let (symbol, aromatic, width) = match (c, next) {
        ('C', Some('l')) => ("Cl", false, 2),
        ('B', Some('r')) => ("Br", false, 2),
        ('B', _) => ("B", false, 1),
        ('C', _) => ("C", false, 1),
        ('N', _) => ("N", false, 1),
        ('O', _) => ("O", false, 1),
        ('P', _) => ("P", false, 1),
        ('S', _) => ("S", false, 1),
        ('F', _) => ("F", false, 1),
        ('I', _) => ("I", false, 1),
        ('b', _) => ("B", true, 1),
        ('c', _) => ("C", true, 1),
        ('n', _) => ("N", true, 1),
        ('o', _) => ("O", true, 1),
        ('p', _) => ("P", true, 1),
        ('s', _) => ("S", true, 1),
        _ if c.is_ascii_uppercase() => {
            let mut sym = c.to_string();
            if let Some(n) = next.filter(|n| n.is_ascii_lowercase()) {
                sym.push(n);
            }
            return Err(SmilesError::UnknownElement(sym));
        }
        _ => return Err(SmilesError::UnexpectedChar { ch: c, pos: i }),
    };
    let element = element::by_symbol(symbol)
        .ok_or_else(|| SmilesError::UnknownElement(symbol.to_string()))?;
    Ok((
        RawAtom {
            element,
            aromatic,
            charge: 0,
            isotope: None,
            hydrogens: None,
        },
        i + width,
    ))
}

/// `[` isotope? symbol chirality? hcount? charge? class? `]`
fn parse_bracket(content: &str) -> Result<RawAtom, SmilesError> {
    let invalid = || SmilesError::InvalidBracket(content.to_string());
    let chars: Vec<char> = content.chars().collect();
    let mut i = 0;

    let digits: String = chars.iter().take_while(|c| c.is_ascii_digit()).collect();
    i += digits.len();
    let isotope = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<u16>().map_err(|_| invalid())?)
    };

    let first = *chars.get(i).ok_or_else(invalid)?;
    let second = chars.get(i + 1).copied().filter(|c| c.is_ascii_lowercase());
    let (element, aromatic) = if first.is_ascii_uppercase() {
        let two = second.and_then(|s| element::by_symbol(&format!("{first}{s}")));
        match two {
            Some(el) => {
                i += 2;
                (el, false)
            }
            None => {
                i += 1;
                let sym = first.to_string();
                let el = element::by_symbol(&sym).ok_or(SmilesError::UnknownElement(sym))?;
                (el, false)
            }
        }
    } else if first.is_ascii_lowercase() {
        let two = second
            .map(|s| format!("{first}{s}"))
            .filter(|s| matches!(s.as_str(), "se" | "as" | "te"));
        let sym = match two {
            Some(s) => {
                i += 2;
                s
            }
            None => {
                i += 1;
                first.to_string()
            }
        };
        let mut capitalised = sym.clone();
        capitalised[..1].make_ascii_uppercase();
        let el = element::by_symbol(&capitalised).ok_or(SmilesError::UnknownElement(sym))?;
        if !el.aromatic_capable {
            return Err(invalid());
        }
        (el, true)
    } else {
        return Err(invalid());
    };

    // Chirality is read and dropped.
    while chars.get(i) == Some(&'@') {
        i += 1;
    }
    let class: String = chars[i.min(chars.len())..]
        .iter()
        .take(2)
        .collect();
    if matches!(class.as_str(), "TH" | "AL" | "SP" | "TB" | "OH") {
        i += 2;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
    }

    let mut hydrogens = 0u8;
    if chars.get(i) == Some(&'H') {
        i += 1;
        let count: String = chars[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
        i += count.len();
        hydrogens = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| invalid())?
        };
    }

    let mut charge: i8 = 0;
    if let Some(&sign) = chars.get(i).filter(|c| matches!(c, '+' | '-')) {
        let unit: i8 = if sign == '+' { 1 } else { -1 };
        i += 1;
        let count: String = chars[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
        if !count.is_empty() {
            i += count.len();
            let magnitude: i8 = count.parse().map_err(|_| invalid())?;
            charge = unit * magnitude;
        } else {
            charge = unit;
            while chars.get(i) == Some(&sign) {
                charge = charge.checked_add(unit).ok_or_else(invalid)?;
                i += 1;
            }
        }
    }

    if chars.get(i) == Some(&':') {
        i += 1;
        let class_len = chars[i..].iter().take_while(|c| c.is_ascii_digit()).count();
        if class_len == 0 {
            return Err(invalid());
        }
        i += class_len;
    }

    if i != chars.len() {
        return Err(invalid());
    }

    Ok(RawAtom {
        element,
        aromatic,
        charge,
        isotope,
        hydrogens: Some(hydrogens),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_atoms() {
        let a = parse_bracket("NH4+").unwrap();
        assert_eq!((a.element.symbol, a.hydrogens, a.charge), ("N", Some(4), 1));

        let a = parse_bracket("13CH3").unwrap();
        assert_eq!((a.isotope, a.hydrogens), (Some(13), Some(3)));

        let a = parse_bracket("C@@H").unwrap();
        assert_eq!(a.hydrogens, Some(1));

        let a = parse_bracket("O--").unwrap();
        assert_eq!(a.charge, -2);

        let a = parse_bracket("Fe+2").unwrap();
        assert_eq!((a.element.symbol, a.charge), ("Fe", 2));

        let a = parse_bracket("nH").unwrap();
        assert!(a.aromatic);

        let a = parse_bracket("se").unwrap();
        assert_eq!(a.element.symbol, "Se");

        assert!(parse_bracket("").is_err());
        assert!(parse_bracket("C+x").is_err());
        assert!(parse_bracket("f").is_err());
    }

    #[test]
    fn repeated_charge_signs_cannot_overflow() {
        let content = format!("C{}", "+".repeat(200));
        assert_eq!(
            parse_bracket(&content).unwrap_err(),
            SmilesError::InvalidBracket(content.clone())
        );
        assert_eq!(parse_bracket("C+++").unwrap().charge, 3);
    }

    #[test]
    fn percent_ring_numbers() {
        let mol = parse("C%10CCCCC%10").unwrap();
        assert_eq!(mol.rings().len(), 1);
        assert!(parse("C%1CC").is_err());
    }

    #[test]
    fn ring_bond_symbols_must_agree() {
        assert!(parse("C=1CCCCC=1").is_ok());
        assert_eq!(
            parse("C=1CCCCC#1").unwrap_err(),
            SmilesError::RingBondConflict(1)
        );
    }

    #[test]
    fn title_after_whitespace_is_ignored() {
        let mol = parse("  CCO ethanol").unwrap();
        assert_eq!(mol.atom_count(), 3);
    }

    #[test]
    fn stereo_is_dropped() {
        let a = parse("F/C=C/F").unwrap();
        let b = parse("FC=CF").unwrap();
        assert_eq!(a.bonds(), b.bonds());
        assert!(parse("N[C@@H](C)C(=O)O").is_ok());
    }
}
