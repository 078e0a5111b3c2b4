//! Dependency tracking for formula calculation
//!
//! An edge `from -> to` means the formula in `from` reads `to`. Both directions
//! are stored and kept exact inverses of each other; a key whose set would
//! become empty is removed instead. All addresses are normalized to relative
//! form on the way in.

use ahash::{AHashMap, AHashSet};
use cellgraph_core::CellAddress;
use std::collections::VecDeque;

/// Dependency graph for formula cells
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell -> cells it reads (precedents)
    dependencies: AHashMap<CellAddress, AHashSet<CellAddress>>,
    /// Cell -> cells that read it (dependents)
    dependents: AHashMap<CellAddress, AHashSet<CellAddress>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `from` reads `to`
    ///
    /// No cycle check happens here; callers consult [`has_cycle`](Self::has_cycle)
    /// first and skip the edge when it would close a loop.
    pub fn add_dependency(&mut self, from: CellAddress, to: CellAddress) {
        let (from, to) = (from.relative(), to.relative());
        self.dependencies.entry(from).or_default().insert(to);
        self.dependents.entry(to).or_default().insert(from);
    }

    /// Remove the outgoing edges of a cell
    ///
    /// Edges pointing at the cell are kept: other formulas still read it.
    pub fn remove_dependencies(&mut self, cell: CellAddress) {
        let cell = cell.relative();
        let Some(precedents) = self.dependencies.remove(&cell) else {
            return;
        };

        for precedent in precedents {
            if let Some(readers) = self.dependents.get_mut(&precedent) {
                readers.remove(&cell);
                if readers.is_empty() {
                    self.dependents.remove(&precedent);
                }
            }
        }
    }

    /// Cells that the given cell reads, in address order
    pub fn dependencies(&self, cell: CellAddress) -> Vec<CellAddress> {
        sorted(self.dependencies.get(&cell.relative()))
    }

    /// Cells that read the given cell, in address order
    pub fn dependents(&self, cell: CellAddress) -> Vec<CellAddress> {
        sorted(self.dependents.get(&cell.relative()))
    }

    /// Whether adding `from -> to` would close a cycle
    ///
    /// True when `from == to` or `from` is reachable from `to` along existing
    /// dependency edges. The search walks back from `from` through its
    /// readers, which stays short when formulas are linked in sheet order.
    pub fn has_cycle(&self, from: CellAddress, to: CellAddress) -> bool {
        let (from, to) = (from.relative(), to.relative());
        if from == to {
            return true;
        }

        let mut visited = AHashSet::new();
        let mut stack = vec![from];

        while let Some(cell) = stack.pop() {
            if cell == to {
                return true;
            }
            if !visited.insert(cell) {
                continue;
            }
            if let Some(readers) = self.dependents.get(&cell) {
                stack.extend(readers.iter().copied());
            }
        }

        false
    }

    /// Order a set of cells so each one comes after the cells it reads
    ///
    /// Only edges between members of `cells` count. Members left over because
    /// they sit on a cycle are appended in input order rather than dropped.
    /// Duplicates in the input are ignored.
    pub fn evaluation_order(&self, cells: &[CellAddress]) -> Vec<CellAddress> {
        let mut members: Vec<CellAddress> = Vec::with_capacity(cells.len());
        let mut member_set = AHashSet::with_capacity(cells.len());
        for cell in cells {
            let cell = cell.relative();
            if member_set.insert(cell) {
                members.push(cell);
            }
        }

        // Number of unprocessed in-set precedents per member
        let mut pending: AHashMap<CellAddress, usize> = members
            .iter()
            .map(|cell| {
                let count = self
                    .dependencies
                    .get(cell)
                    .map_or(0, |deps| deps.iter().filter(|d| member_set.contains(d)).count());
                (*cell, count)
            })
            .collect();

        let mut queue: VecDeque<CellAddress> = members
            .iter()
            .copied()
            .filter(|cell| pending.get(cell) == Some(&0))
            .collect();

        let mut order = Vec::with_capacity(members.len());
        let mut placed = AHashSet::with_capacity(members.len());

        while let Some(cell) = queue.pop_front() {
            order.push(cell);
            placed.insert(cell);

            for reader in sorted(self.dependents.get(&cell)) {
                if let Some(count) = pending.get_mut(&reader) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(reader);
                    }
                }
            }
        }

        if order.len() < members.len() {
            tracing::debug!(
                unresolved = members.len() - order.len(),
                "cycle left cells unordered; appending in input order"
            );
            order.extend(members.into_iter().filter(|cell| !placed.contains(cell)));
        }

        order
    }

    /// The cell itself plus everything that reads it, directly or transitively
    ///
    /// Breadth-first, so nearer dependents come first.
    pub fn dependent_closure(&self, cell: CellAddress) -> Vec<CellAddress> {
        let cell = cell.relative();
        let mut seen = AHashSet::new();
        let mut closure = Vec::new();
        let mut queue = VecDeque::from([cell]);
        seen.insert(cell);

        while let Some(current) = queue.pop_front() {
            closure.push(current);
            for reader in sorted(self.dependents.get(&current)) {
                if seen.insert(reader) {
                    queue.push_back(reader);
                }
            }
        }

        closure
    }

    /// Whether the two adjacency maps are exact inverses with no empty sets
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.dependencies.iter().all(|(from, tos)| {
            !tos.is_empty()
                && tos
                    .iter()
                    .all(|to| self.dependents.get(to).map_or(false, |s| s.contains(from)))
        });
        let backward_ok = self.dependents.iter().all(|(to, froms)| {
            !froms.is_empty()
                && froms
                    .iter()
                    .all(|from| self.dependencies.get(from).map_or(false, |s| s.contains(to)))
        });
        forward_ok && backward_ok
    }

    /// Total number of edges
    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(|deps| deps.len()).sum()
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.dependencies.clear();
        self.dependents.clear();
    }
}

fn sorted(set: Option<&AHashSet<CellAddress>>) -> Vec<CellAddress> {
    let mut cells: Vec<CellAddress> = set.map_or_else(Vec::new, |s| s.iter().copied().collect());
    cells.sort_unstable();
    cells
}
