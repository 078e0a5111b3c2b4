//! Sheet calculation engine
//!
//! Provides sheet-level formula calculation with dependency tracking and
//! incremental recalculation after single-cell edits.
//!
//! # Example
//!
//! ```rust
//! use cellgraph::prelude::*;
//!
//! let mut sheet = Sheet::new("Sheet1", 100, 26);
//! sheet.set(CellAddress::parse("A1").unwrap(), Cell::literal(10.0));
//! sheet.set(CellAddress::parse("A2").unwrap(), Cell::formula("=A1*2"));
//!
//! let mut engine = FormulaEngine::new();
//! let results = engine.evaluate_sheet(&mut sheet);
//! assert_eq!(results.len(), 1);
//!
//! let recalc = engine.update_cell(&mut sheet, CellAddress::parse("A1").unwrap(), Some(Cell::literal(5.0)));
//! assert_eq!(recalc.order.len(), 2);
//! ```

use crate::{
    evaluate_cell_cached, Cell, CellAddress, CellEvaluation, DependencyGraph, ErrorCode,
    EvalResult, ExplainTrace, FormulaExpr, ResultCache, Sheet,
};
use std::collections::BTreeMap;

/// Options for sheet calculation
#[derive(Debug, Clone, Default)]
pub struct CalculationOptions {
    /// Record an explain trace for every evaluated formula cell
    pub explain: bool,
}

/// Results of a calculation run, keyed by relative address
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalResults {
    /// Result of every evaluated formula cell
    pub results: BTreeMap<CellAddress, EvalResult>,
    /// Explain traces of cells that evaluated successfully, when enabled
    pub explain: BTreeMap<CellAddress, Vec<ExplainTrace>>,
}

impl EvalResults {
    /// Result for one cell, if it was evaluated
    pub fn get(&self, address: CellAddress) -> Option<&EvalResult> {
        self.results.get(&address.relative())
    }

    /// Number of evaluated cells
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if no cell was evaluated
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of results that are errors
    pub fn error_count(&self) -> usize {
        self.results.values().filter(|r| r.is_error()).count()
    }

    /// Iterate results in address order
    pub fn iter(&self) -> impl Iterator<Item = (&CellAddress, &EvalResult)> {
        self.results.iter()
    }

    fn insert(&mut self, address: CellAddress, evaluation: CellEvaluation) {
        if let Some(trace) = evaluation.explain {
            self.explain.insert(address, trace);
        }
        self.results.insert(address, evaluation.result);
    }
}

/// Outcome of [`FormulaEngine::update_cell`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recalculation {
    /// The edited cell followed by everything that depends on it, in
    /// evaluation order
    pub order: Vec<CellAddress>,
    /// New results of the formula cells in `order`
    pub results: EvalResults,
}

/// The calculation engine
///
/// Owns the dependency graph of one sheet and the latest result of each
/// formula cell. Create one engine per sheet; run
/// [`evaluate_sheet`](Self::evaluate_sheet) after loading and
/// [`update_cell`](Self::update_cell) for each edit afterwards. Editing the
/// sheet behind the engine's back leaves those results stale until the next
/// `evaluate_sheet`.
#[derive(Debug, Clone, Default)]
pub struct FormulaEngine {
    options: CalculationOptions,
    /// Dependency graph built from formulas
    graph: DependencyGraph,
    /// Latest results, read by references instead of re-evaluating
    cache: ResultCache,
}

impl FormulaEngine {
    /// Create an engine with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom options
    pub fn with_options(options: CalculationOptions) -> Self {
        Self {
            options,
            graph: DependencyGraph::new(),
            cache: ResultCache::default(),
        }
    }

    /// Calculation options in effect
    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// The current dependency graph
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Parse every formula, rebuild the graph and evaluate all formula cells
    ///
    /// Formula cells whose source does not parse are reported with a `PARSE`
    /// result after the ordered cells.
    pub fn evaluate_sheet(&mut self, sheet: &mut Sheet) -> EvalResults {
        // Phase 1: Parse formulas
        let failures = sheet.parse_formulas();
        for (address, err) in &failures {
            tracing::debug!(cell = %address, error = %err, "formula does not parse");
        }

        // Phase 2: Rebuild the dependency graph
        self.graph.clear();
        self.cache.clear();
        let mut parsed = Vec::new();
        for (address, cell) in &sheet.cells {
            if let Some(ast) = cell.ast() {
                link_precedents(&mut self.graph, *address, ast);
                parsed.push(*address);
            }
        }
        tracing::debug!(
            formulas = parsed.len(),
            edges = self.graph.edge_count(),
            "rebuilt dependency graph"
        );

        // Phase 3: Evaluate in dependency order
        let mut order = self.graph.evaluation_order(&parsed);
        order.extend(failures.iter().map(|(address, _)| *address));

        let results = self.evaluate_cells(sheet, &order);
        tracing::debug!(
            cells = results.len(),
            errors = results.error_count(),
            "evaluated sheet"
        );
        results
    }

    /// Evaluate a single cell without touching the graph
    ///
    /// Formula cells it reads come from the latest results when known.
    pub fn evaluate_cell(&self, sheet: &Sheet, address: CellAddress) -> CellEvaluation {
        evaluate_cell_cached(sheet, address, self.options.explain, &self.cache)
    }

    /// Replace or clear one cell and recalculate what depends on it
    ///
    /// `None` removes the cell. A formula that does not parse is stored as is
    /// and reported with a `PARSE` result; this never fails.
    pub fn update_cell(
        &mut self,
        sheet: &mut Sheet,
        address: CellAddress,
        cell: Option<Cell>,
    ) -> Recalculation {
        let address = address.relative();

        match cell {
            Some(mut cell) => {
                if let Err(err) = cell.ensure_parsed() {
                    tracing::debug!(cell = %address, error = %err, "formula does not parse");
                }
                sheet.set(address, cell);
            }
            None => {
                sheet.remove(address);
            }
        }

        self.graph.remove_dependencies(address);
        if let Some(ast) = sheet.get(address).and_then(Cell::ast) {
            link_precedents(&mut self.graph, address, ast);
        }
        debug_assert!(self.graph.is_consistent());

        let closure = self.graph.dependent_closure(address);
        for cell in &closure {
            self.cache.remove(cell);
        }
        let order = self.graph.evaluation_order(&closure);
        let formulas: Vec<CellAddress> = order
            .iter()
            .copied()
            .filter(|a| sheet.get(*a).map_or(false, Cell::is_formula))
            .collect();

        let results = self.evaluate_cells(sheet, &formulas);
        sheet.touch();

        tracing::debug!(
            cell = %address,
            recomputed = order.len(),
            errors = results.error_count(),
            "recalculated"
        );

        Recalculation { order, results }
    }

    /// Evaluate cells in the given order, keeping each result for the cells
    /// after it
    ///
    /// Cycle errors are not kept: whether a reference closes a loop depends on
    /// the chain it is read from.
    fn evaluate_cells(&mut self, sheet: &Sheet, cells: &[CellAddress]) -> EvalResults {
        let mut results = EvalResults::default();
        for address in cells {
            let evaluation = self.evaluate_cell(sheet, *address);
            let is_cycle = evaluation.result.error().map(|e| e.code) == Some(ErrorCode::Cycle);
            if !is_cycle {
                self.cache.insert(*address, evaluation.result.clone());
            }
            results.insert(*address, evaluation);
        }
        results
    }
}

/// Add one edge per precedent of `ast`, skipping any that would close a cycle
///
/// Skipped edges are still caught at evaluation time, where the reference
/// reports `CYCLE`.
fn link_precedents(graph: &mut DependencyGraph, address: CellAddress, ast: &FormulaExpr) {
    for precedent in ast.precedents() {
        if graph.has_cycle(address, precedent) {
            tracing::debug!(from = %address, to = %precedent, "skipping cyclic edge");
            continue;
        }
        graph.add_dependency(address, precedent);
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::EvalResults;
    use serde::ser::{Serialize, SerializeMap, Serializer};

    #[derive(serde::Serialize)]
    struct Entry<'a> {
        #[serde(flatten)]
        result: &'a crate::EvalResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        explain: Option<&'a Vec<crate::ExplainTrace>>,
    }

    /// `address -> {value}` or `{value: null, error}`, with `explain` when
    /// a trace was recorded
    impl Serialize for EvalResults {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.results.len()))?;
            for (address, result) in &self.results {
                let entry = Entry {
                    result,
                    explain: self.explain.get(address),
                };
                map.serialize_entry(&address.to_string(), &entry)?;
            }
            map.end()
        }
    }
}
