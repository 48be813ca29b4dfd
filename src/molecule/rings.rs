//! Ring perception: bridge detection plus a smallest-set-of-smallest-rings
//! selection over GF(2) bond vectors.

use std::collections::VecDeque;

/// One ring of the SSSR, atoms in cyclic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    atoms: Vec<usize>,
    bonds: Vec<usize>,
}

impl Ring {
    /// Atom indices in walking order.
    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    /// Bond indices, sorted.
    pub fn bonds(&self) -> &[usize] {
        &self.bonds
    }

    /// Ring size.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Never true for a perceived ring; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Whether the ring passes through `atom`.
    pub fn contains_atom(&self, atom: usize) -> bool {
        self.atoms.contains(&atom)
    }

    /// Whether the ring uses bond `bond`.
    pub fn contains_bond(&self, bond: usize) -> bool {
        self.bonds.binary_search(&bond).is_ok()
    }
}

pub(crate) struct RingInfo {
    pub rings: Vec<Ring>,
    pub ring_bonds: Vec<bool>,
    pub ring_atoms: Vec<bool>,
}

pub(crate) fn perceive(adjacency: &[Vec<(usize, usize)>], n_bonds: usize) -> RingInfo {
    let n_atoms = adjacency.len();
    let bridges = find_bridges(adjacency, n_bonds);
    let ring_bonds: Vec<bool> = bridges.iter().map(|b| !b).collect();

    let mut ring_atoms = vec![false; n_atoms];
    for (atom, nbrs) in adjacency.iter().enumerate() {
        ring_atoms[atom] = nbrs.iter().any(|&(_, b)| ring_bonds[b]);
    }

    let cyclomatic = (n_bonds + count_components(adjacency)).saturating_sub(n_atoms);
    if cyclomatic == 0 {
        return RingInfo {
            rings: Vec::new(),
            ring_bonds,
            ring_atoms,
        };
    }

    let mut candidates: Vec<Ring> = Vec::new();
    for bond in (0..n_bonds).filter(|&b| ring_bonds[b]) {
        if let Some(ring) = shortest_cycle_through(adjacency, &ring_bonds, bond) {
            if !candidates.iter().any(|c| c.bonds == ring.bonds) {
                candidates.push(ring);
            }
        }
    }
    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.bonds.cmp(&b.bonds)));

    let words = n_bonds.div_ceil(64);
    let mut basis: Vec<(usize, Vec<u64>)> = Vec::new();
    let mut rings = Vec::new();
    for ring in candidates {
        if rings.len() == cyclomatic {
            break;
        }
        let mut bits = vec![0u64; words];
        for &b in &ring.bonds {
            bits[b / 64] |= 1 << (b % 64);
        }
        for (pivot, row) in &basis {
            if bits[pivot / 64] & (1 << (pivot % 64)) != 0 {
                for (w, r) in bits.iter_mut().zip(row) {
                    *w ^= r;
                }
            }
        }
        if let Some(pivot) = lowest_set_bit(&bits) {
            // Keep the basis reduced so later candidates only need one pass.
            for (_, row) in basis.iter_mut() {
                if row[pivot / 64] & (1 << (pivot % 64)) != 0 {
                    for (r, w) in row.iter_mut().zip(&bits) {
                        *r ^= w;
                    }
                }
            }
            basis.push((pivot, bits));
            rings.push(ring);
        }
    }

    RingInfo {
        rings,
        ring_bonds,
        ring_atoms,
    }
}

fn lowest_set_bit(bits: &[u64]) -> Option<usize> {
    bits.iter()
        .enumerate()
        .find(|(_, w)| **w != 0)
        .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
}

/// BFS from one end of `bond` to the other without using `bond` itself.
fn shortest_cycle_through(
    adjacency: &[Vec<(usize, usize)>],
    ring_bonds: &[bool],
    bond: usize,
) -> Option<Ring> {
    let (start, goal) = adjacency
        .iter()
        .enumerate()
        .find_map(|(a, nbrs)| nbrs.iter().find(|&&(_, b)| b == bond).map(|&(n, _)| (a, n)))?;

    let mut came_from: Vec<Option<(usize, usize)>> = vec![None; adjacency.len()];
    let mut seen = vec![false; adjacency.len()];
    let mut queue = VecDeque::from([start]);
    seen[start] = true;
    while let Some(cur) = queue.pop_front() {
        if cur == goal {
            break;
        }
        for &(nbr, b) in &adjacency[cur] {
            if b == bond || !ring_bonds[b] || seen[nbr] {
                continue;
            }
            seen[nbr] = true;
            came_from[nbr] = Some((cur, b));
            queue.push_back(nbr);
        }
    }
    if !seen[goal] {
        return None;
    }

    let mut atoms = vec![goal];
    let mut bonds = vec![bond];
    let mut cur = goal;
    while let Some((prev, b)) = came_from[cur] {
        atoms.push(prev);
        bonds.push(b);
        cur = prev;
    }
    bonds.sort_unstable();
    Some(Ring { atoms, bonds })
}

fn count_components(adjacency: &[Vec<(usize, usize)>]) -> usize {
    let mut seen = vec![false; adjacency.len()];
    let mut count = 0;
    for start in 0..adjacency.len() {
        if seen[start] {
            continue;
        }
        count += 1;
        let mut stack = vec![start];
        seen[start] = true;
        while let Some(cur) = stack.pop() {
            for &(nbr, _) in &adjacency[cur] {
                if !seen[nbr] {
                    seen[nbr] = true;
                    stack.push(nbr);
                }
            }
        }
    }
    count
}

/// Tarjan bridge finding, iterative so deep chains cannot blow the stack.
fn find_bridges(adjacency: &[Vec<(usize, usize)>], n_bonds: usize) -> Vec<bool> {
    let n = adjacency.len();
    let mut disc = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut bridge = vec![false; n_bonds];
    let mut timer = 0;

    for root in 0..n {
        if disc[root] != usize::MAX {
            continue;
        }
        disc[root] = timer;
        low[root] = timer;
        timer += 1;
        // (atom, bond used to reach it, next adjacency slot)
        let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];
        while let Some(top) = stack.last_mut() {
            let (atom, via) = (top.0, top.1);
            if top.2 < adjacency[atom].len() {
                let (nbr, b) = adjacency[atom][top.2];
                top.2 += 1;
                if Some(b) == via {
                    continue;
                }
                if disc[nbr] == usize::MAX {
                    disc[nbr] = timer;
                    low[nbr] = timer;
                    timer += 1;
                    stack.push((nbr, Some(b), 0));
                } else {
                    low[atom] = low[atom].min(disc[nbr]);
                }
            } else {
                stack.pop();
                if let (Some(b), Some(parent)) = (via, stack.last()) {
                    let p = parent.0;
                    low[p] = low[p].min(low[atom]);
                    if low[atom] > disc[p] {
                        bridge[b] = true;
                    }
                }
            }
        }
    }
    bridge
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacency(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<(usize, usize)>> {
        let mut adj = vec![Vec::new(); n];
        for (i, &(a, b)) in edges.iter().enumerate() {
            adj[a].push((b, i));
            adj[b].push((a, i));
        }
        adj
    }

    #[test]
    fn chain_has_only_bridges() {
        let adj = adjacency(4, &[(0, 1), (1, 2), (2, 3)]);
        let info = perceive(&adj, 3);
        assert!(info.rings.is_empty());
        assert!(info.ring_bonds.iter().all(|r| !r));
    }

    #[test]
    fn methylcyclopropane() {
        let adj = adjacency(4, &[(0, 1), (1, 2), (2, 0), (0, 3)]);
        let info = perceive(&adj, 4);
        assert_eq!(info.rings.len(), 1);
        assert_eq!(info.rings[0].len(), 3);
        assert_eq!(info.ring_bonds, vec![true, true, true, false]);
        assert!(!info.ring_atoms[3]);
    }

    #[test]
    fn bicyclo_picks_two_small_rings() {
        // Two fused squares sharing edge 1-4: 0-1-4-5-0 and 1-2-3-4-1
        let adj = adjacency(
            6,
            &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (1, 4)],
        );
        let info = perceive(&adj, 7);
        assert_eq!(info.rings.len(), 2);
        assert!(info.rings.iter().all(|r| r.len() == 4));
    }
}
