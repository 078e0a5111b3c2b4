//! End-to-end tests for sheet evaluation and incremental recalculation

use cellgraph::prelude::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn addr(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

fn sheet_with(cells: &[(&str, Cell)]) -> Sheet {
    let mut sheet = Sheet::new("Sheet1", 100, 26);
    for (a, cell) in cells {
        sheet.set(addr(a), cell.clone());
    }
    sheet
}

/// Evaluate a one-off formula placed far away from the test data
fn eval_formula(sheet: &mut Sheet, formula: &str) -> EvalResult {
    let target = addr("Z99");
    sheet.set(target, Cell::formula(formula));
    let results = FormulaEngine::new().evaluate_sheet(sheet);
    sheet.remove(target);
    results.get(target).cloned().unwrap()
}

fn number(n: f64) -> EvalResult {
    EvalResult::Value(CellValue::Number(n))
}

fn error_code(result: &EvalResult) -> Option<ErrorCode> {
    result.error().map(|e| e.code)
}

#[test]
fn test_mutual_reference_is_a_cycle() {
    let mut sheet = sheet_with(&[("A1", Cell::formula("=B1")), ("B1", Cell::formula("=A1"))]);
    let results = FormulaEngine::new().evaluate_sheet(&mut sheet);

    assert_eq!(error_code(results.get(addr("A1")).unwrap()), Some(ErrorCode::Cycle));
    assert_eq!(error_code(results.get(addr("B1")).unwrap()), Some(ErrorCode::Cycle));
}

#[test]
fn test_self_reference_is_a_cycle() {
    let mut sheet = sheet_with(&[("A1", Cell::formula("=A1+1"))]);
    let results = FormulaEngine::new().evaluate_sheet(&mut sheet);
    let err = results.get(addr("A1")).and_then(EvalResult::error).unwrap();
    assert_eq!(err.code, ErrorCode::Cycle);
    assert_eq!(err.message, "Circular reference");
}

#[test]
fn test_missing_reference_and_division_by_zero() {
    let mut sheet = sheet_with(&[("A1", Cell::formula("=Z99")), ("A2", Cell::formula("=5/0"))]);
    let results = FormulaEngine::new().evaluate_sheet(&mut sheet);

    assert_eq!(error_code(results.get(addr("A1")).unwrap()), Some(ErrorCode::Ref));
    assert_eq!(error_code(results.get(addr("A2")).unwrap()), Some(ErrorCode::Div0));
    assert_eq!(results.get(addr("A2")).unwrap().to_string(), "#DIV0");
}

#[test]
fn test_errors_propagate_through_references() {
    let mut sheet = sheet_with(&[
        ("A1", Cell::formula("=1/0")),
        ("A2", Cell::formula("=A1+1")),
        ("A3", Cell::formula("=SUM(A1:A1, 5)")),
    ]);
    let results = FormulaEngine::new().evaluate_sheet(&mut sheet);

    assert_eq!(error_code(results.get(addr("A2")).unwrap()), Some(ErrorCode::Div0));
    // Ranges skip unreadable cells
    assert_eq!(results.get(addr("A3")), Some(&number(5.0)));
}

#[test]
fn test_aggregates_over_mixed_range() {
    let mut sheet = sheet_with(&[
        ("A1", Cell::literal(1.0)),
        ("A2", Cell::literal("x")),
        ("A3", Cell::literal(3.0)),
    ]);

    assert_eq!(eval_formula(&mut sheet, "=SUM(A1:A3)"), number(4.0));
    assert_eq!(eval_formula(&mut sheet, "=AVG(A1:A3)"), number(2.0));
    assert_eq!(eval_formula(&mut sheet, "=COUNT(A1:A3)"), number(3.0));
    assert_eq!(eval_formula(&mut sheet, "=MIN(A3:A1)"), number(1.0));
    assert_eq!(eval_formula(&mut sheet, "=MAX(A1:A3)"), number(3.0));
}

#[test]
fn test_coercion() {
    let mut sheet = Sheet::new("Sheet1", 100, 26);

    assert_eq!(eval_formula(&mut sheet, "=\"5\"+3"), number(8.0));
    assert_eq!(
        eval_formula(&mut sheet, "=\"a\"+3"),
        EvalResult::Value(CellValue::String("a3".into()))
    );
    assert_eq!(
        eval_formula(&mut sheet, "=3>\"2\""),
        EvalResult::Value(CellValue::Boolean(true))
    );
}

#[test]
fn test_precedence() {
    let mut sheet = Sheet::new("Sheet1", 100, 26);

    assert_eq!(eval_formula(&mut sheet, "=2+3*4"), number(14.0));
    assert_eq!(eval_formula(&mut sheet, "=2^3^2"), number(512.0));
    assert_eq!(eval_formula(&mut sheet, "=-2^2"), number(4.0));
}

#[test]
fn test_incremental_update() {
    let mut sheet = sheet_with(&[
        ("A1", Cell::literal(1.0)),
        ("B1", Cell::formula("=A1+1")),
        ("C1", Cell::formula("=B1+1")),
    ]);
    let mut engine = FormulaEngine::new();
    engine.evaluate_sheet(&mut sheet);

    let recalc = engine.update_cell(&mut sheet, addr("A1"), EditCommand::classify("10").into_cell());
    assert_eq!(recalc.order, vec![addr("A1"), addr("B1"), addr("C1")]);
    assert_eq!(recalc.results.get(addr("B1")), Some(&number(11.0)));
    assert_eq!(recalc.results.get(addr("C1")), Some(&number(12.0)));

    let recalc = engine.update_cell(&mut sheet, addr("D1"), EditCommand::classify("5").into_cell());
    assert_eq!(recalc.order, vec![addr("D1")]);
    assert!(recalc.results.is_empty());
}

#[test]
fn test_update_with_formula_recomputes_it() {
    let mut sheet = sheet_with(&[("A1", Cell::literal(4.0))]);
    let mut engine = FormulaEngine::new();
    engine.evaluate_sheet(&mut sheet);

    let recalc = engine.update_cell(
        &mut sheet,
        addr("$B$1"),
        EditCommand::classify(" =A1*A1 ").into_cell(),
    );
    assert_eq!(recalc.order, vec![addr("B1")]);
    assert_eq!(recalc.results.get(addr("B1")), Some(&number(16.0)));

    // The new edge is live
    let recalc = engine.update_cell(&mut sheet, addr("A1"), Some(Cell::literal(5.0)));
    assert_eq!(recalc.results.get(addr("B1")), Some(&number(25.0)));
}

#[test]
fn test_range_endpoint_edges() {
    let mut sheet = sheet_with(&[
        ("A1", Cell::literal(1.0)),
        ("A2", Cell::literal(2.0)),
        ("A3", Cell::literal(3.0)),
        ("B1", Cell::formula("=SUM(A1:A3)")),
    ]);
    let mut engine = FormulaEngine::new();
    engine.evaluate_sheet(&mut sheet);

    let recalc = engine.update_cell(&mut sheet, addr("A3"), Some(Cell::literal(30.0)));
    assert_eq!(recalc.results.get(addr("B1")), Some(&number(33.0)));

    // Interior cells are not linked
    let recalc = engine.update_cell(&mut sheet, addr("A2"), Some(Cell::literal(20.0)));
    assert_eq!(recalc.order, vec![addr("A2")]);
}

/// `A1 = 1` and every cell below it reads the one above, plus one
fn long_chain(rows: u32) -> Sheet {
    let mut sheet = Sheet::new("Sheet1", rows, 26);
    sheet.set(addr("A1"), Cell::literal(1.0));
    for row in 2..=rows {
        sheet.set(addr(&format!("A{}", row)), Cell::formula(&format!("=A{}+1", row - 1)));
    }
    sheet
}

#[test]
fn test_long_chain_full_evaluation() {
    let mut sheet = long_chain(10_000);
    let results = FormulaEngine::new().evaluate_sheet(&mut sheet);

    assert_eq!(results.len(), 9_999);
    assert_eq!(results.error_count(), 0);
    assert_eq!(results.get(addr("A10000")), Some(&number(10_000.0)));
}

#[test]
fn test_long_chain_incremental_update() {
    let mut sheet = long_chain(10_000);
    let mut engine = FormulaEngine::new();
    engine.evaluate_sheet(&mut sheet);

    let recalc = engine.update_cell(&mut sheet, addr("A1"), Some(Cell::literal(5.0)));
    assert_eq!(recalc.order.len(), 10_000);
    assert_eq!(recalc.order[0], addr("A1"));
    assert_eq!(recalc.results.len(), 9_999);
    assert_eq!(recalc.results.get(addr("A10000")), Some(&number(10_004.0)));

    // Editing the tail reads the rest of the chain from earlier results
    let recalc = engine.update_cell(
        &mut sheet,
        addr("A10000"),
        EditCommand::classify("=A9999*2").into_cell(),
    );
    assert_eq!(recalc.order, vec![addr("A10000")]);
    assert_eq!(recalc.results.get(addr("A10000")), Some(&number(20_006.0)));
    assert_eq!(engine.evaluate_cell(&sheet, addr("A10000")).result, number(20_006.0));
}

#[test]
fn test_shared_precedents_evaluate_once() {
    let mut sheet = sheet_with(&[("A1", Cell::literal(1.0))]);
    for row in 2..=60 {
        let formula = format!("=A{0}+A{0}", row - 1);
        sheet.set(addr(&format!("A{}", row)), Cell::formula(&formula));
    }
    let results = FormulaEngine::new().evaluate_sheet(&mut sheet);

    assert_eq!(results.get(addr("A60")), Some(&number(2f64.powi(59))));
}

#[test]
fn test_breaking_a_cycle_leaves_skipped_reader_stale() {
    let mut sheet = sheet_with(&[]);
    let mut engine = FormulaEngine::new();
    engine.evaluate_sheet(&mut sheet);

    engine.update_cell(&mut sheet, addr("A1"), EditCommand::classify("=B1").into_cell());
    let recalc = engine.update_cell(&mut sheet, addr("B1"), EditCommand::classify("=A1").into_cell());
    assert_eq!(recalc.order, vec![addr("B1"), addr("A1")]);
    assert_eq!(error_code(recalc.results.get(addr("A1")).unwrap()), Some(ErrorCode::Cycle));
    assert_eq!(error_code(recalc.results.get(addr("B1")).unwrap()), Some(ErrorCode::Cycle));

    // B1 -> A1 was never linked, so B1 is not recomputed here
    let recalc = engine.update_cell(&mut sheet, addr("A1"), Some(Cell::literal(5.0)));
    assert_eq!(recalc.order, vec![addr("A1")]);
    assert!(recalc.results.is_empty());

    // Reading B1 again, or a full pass, sees the broken cycle
    assert_eq!(engine.evaluate_cell(&sheet, addr("B1")).result, number(5.0));
    let results = engine.evaluate_sheet(&mut sheet);
    assert_eq!(results.get(addr("B1")), Some(&number(5.0)));
}

#[test]
fn test_evaluate_sheet_is_repeatable() {
    let mut sheet = sheet_with(&[
        ("A1", Cell::literal(1.0)),
        ("A2", Cell::formula("=A1*2")),
        ("A3", Cell::formula("=SUM(A1:A2)")),
        ("B1", Cell::formula("=B2")),
        ("B2", Cell::formula("=B1")),
        ("C1", Cell::formula("=(")),
    ]);
    let mut engine = FormulaEngine::new();
    let first = engine.evaluate_sheet(&mut sheet);
    let second = engine.evaluate_sheet(&mut sheet);

    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[test]
fn test_explain_trace() {
    let sheet = sheet_with(&[
        ("A1", Cell::literal(1.0)),
        ("A2", Cell::literal(2.0)),
        ("B1", Cell::literal(10.0)),
        ("C1", Cell::formula("=B1+SUM(A1:A2)")),
    ]);
    let engine = FormulaEngine::with_options(CalculationOptions { explain: true });
    let eval = engine.evaluate_cell(&sheet, addr("C1"));

    assert_eq!(eval.result, number(13.0));
    let trace = eval.explain.unwrap();
    let deps: Vec<Vec<CellAddress>> = trace.iter().map(|t| t.dependencies.clone()).collect();
    assert_eq!(
        deps,
        vec![vec![addr("B1")], vec![addr("A1")], vec![addr("A2")], vec![]]
    );
    assert_eq!(trace[3].ranges, vec![CellRange::parse("A1:A2").unwrap()]);
    assert!(trace.iter().all(|t| t.cell == addr("C1")));
}

/// One edit in a generated session: a literal or a formula reading an earlier row
#[derive(Debug, Clone)]
enum Edit {
    Literal(f64),
    Formula(String),
    Clear,
}

fn edit_strategy(row: u32) -> BoxedStrategy<Edit> {
    let literal = (-100i32..100).prop_map(|n| Edit::Literal(n as f64));
    if row == 1 {
        return prop_oneof![literal, Just(Edit::Clear)].boxed();
    }
    // Ranges span at most two rows so every cell they read is an endpoint
    let formula = (1..row, 1..row, 0usize..3).prop_map(move |(a, b, kind)| {
        Edit::Formula(match kind {
            0 => format!("=A{}+1", a),
            1 => format!("=A{}*A{}", a, b),
            _ => format!("=SUM(A{}:A{})", a, (a + 1).min(row - 1)),
        })
    });
    prop_oneof![literal, formula, Just(Edit::Clear)].boxed()
}

fn session_strategy() -> impl Strategy<Value = Vec<(u32, Edit)>> {
    prop::collection::vec((1u32..7).prop_flat_map(|row| (Just(row), edit_strategy(row))), 1..25)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After every edit, the incrementally recomputed cells agree with a full
    /// evaluation and every formula whose value changed was recomputed
    #[test]
    fn prop_incremental_matches_full(session in session_strategy()) {
        let mut sheet = Sheet::new("Sheet1", 100, 26);
        let mut engine = FormulaEngine::new();
        let mut previous: BTreeMap<CellAddress, EvalResult> =
            engine.evaluate_sheet(&mut sheet).results;

        for (row, edit) in session {
            let address = CellAddress::new(row - 1, 0);
            let cell = match edit {
                Edit::Literal(n) => Some(Cell::literal(n)),
                Edit::Formula(src) => Some(Cell::formula(src)),
                Edit::Clear => None,
            };
            let recalc = engine.update_cell(&mut sheet, address, cell);

            let full = FormulaEngine::new().evaluate_sheet(&mut sheet.clone()).results;
            for (cell, result) in recalc.results.iter() {
                prop_assert_eq!(Some(result), full.get(cell));
            }
            for (cell, result) in &full {
                if previous.get(cell) != Some(result) {
                    prop_assert!(
                        recalc.order.contains(cell),
                        "{} changed but was not recomputed", cell
                    );
                }
            }
            prop_assert!(engine.graph().is_consistent());
            previous = full;
        }
    }
}
